//! Configuration loading and validation.
//!
//! Reads every key the run needs through [`ConfigPort`] and rejects bad
//! values before any backtest starts. Loading and validation share one code
//! path, so a configuration that validates always loads.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::backtest::{DEFAULT_INITIAL_CAPITAL, RunConfig};
use crate::domain::error::SimError;
use crate::domain::signal::RebalanceFrequency;
use crate::domain::strategy::rebalance::DEFAULT_SIZING_LOOKBACK;
use crate::domain::strategy::sizing::MIN_SIZING_RETURNS;
use crate::domain::strategy::{
    BuyAndHold, MeanReversion, Momentum, PositionSizing, STRATEGY_NAMES, ScheduledRebalance,
    Strategy, TargetWeights,
};
use crate::ports::config_port::ConfigPort;

const DEFAULT_LOOKBACK_PERIOD: i64 = 20;
const DEFAULT_TOP_N: i64 = 2;
const DEFAULT_WINDOW: i64 = 20;
const DEFAULT_NUM_STD: f64 = 2.0;
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Validates `[backtest]` and every enabled strategy section. Sections that
/// nothing reads are logged, not rejected.
pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    let run = load_run_config(config)?;
    load_strategies(config, &run)?;
    for section in unknown_sections(config) {
        warn!(section = %section, "ignoring unknown config section");
    }
    Ok(())
}

/// Section names that are neither `backtest`, `strategies`, nor a strategy.
pub fn unknown_sections(config: &dyn ConfigPort) -> Vec<String> {
    config
        .sections()
        .into_iter()
        .filter(|s| {
            let s = s.as_str();
            s != "backtest" && s != "strategies" && s != "default" && !STRATEGY_NAMES.contains(&s)
        })
        .collect()
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, SimError> {
    let initial_capital = match config.get_string("backtest", "initial_capital") {
        Some(_) => get_f64(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?,
        None => return Err(SimError::missing("backtest", "initial_capital")),
    };

    let run = RunConfig {
        initial_capital,
        commission_rate: get_f64(config, "backtest", "commission_rate", 0.0)?,
        slippage_rate: get_f64(config, "backtest", "slippage_rate", 0.0)?,
        rebalance_frequency: get_parsed(
            config,
            "backtest",
            "rebalance_frequency",
            RebalanceFrequency::Monthly,
        )?,
        position_sizing: get_parsed(config, "backtest", "position_sizing", PositionSizing::EqualWeight)?,
        start_date: get_date(config, "backtest", "start_date")?,
        end_date: get_date(config, "backtest", "end_date")?,
    };
    run.validate()?;
    Ok(run)
}

/// Names listed in `[strategies] enabled`, in order.
pub fn enabled_strategies(config: &dyn ConfigPort) -> Result<Vec<String>, SimError> {
    let raw = config
        .get_string("strategies", "enabled")
        .ok_or_else(|| SimError::missing("strategies", "enabled"))?;

    let names: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(SimError::invalid("strategies", "enabled", "no strategies listed"));
    }
    for name in &names {
        if !STRATEGY_NAMES.contains(&name.as_str()) {
            return Err(SimError::invalid(
                "strategies",
                "enabled",
                format!("unknown strategy '{name}' (expected one of {})", STRATEGY_NAMES.join(", ")),
            ));
        }
    }
    Ok(names)
}

pub fn load_strategies(config: &dyn ConfigPort, run: &RunConfig) -> Result<Vec<Strategy>, SimError> {
    enabled_strategies(config)?
        .iter()
        .map(|name| load_strategy(config, run, name))
        .collect()
}

/// Builds one strategy from its config section. Missing keys take defaults.
pub fn load_strategy(config: &dyn ConfigPort, run: &RunConfig, name: &str) -> Result<Strategy, SimError> {
    let strategy = match name {
        "buy_and_hold" => BuyAndHold {
            split_evenly: get_bool(config, "buy_and_hold", "split_evenly", false)?,
        }
        .into(),
        "rebalance" => {
            let targets = match config.get_string("rebalance", "weights") {
                Some(raw) => TargetWeights::Fixed(parse_weights(&raw)?),
                None => TargetWeights::Sizing {
                    rule: run.position_sizing,
                    lookback: get_count(
                        config,
                        "rebalance",
                        "sizing_lookback",
                        DEFAULT_SIZING_LOOKBACK as i64,
                        MIN_SIZING_RETURNS,
                    )?,
                },
            };
            ScheduledRebalance {
                frequency: run.rebalance_frequency,
                targets,
            }
            .into()
        }
        "momentum" => Momentum {
            lookback_period: get_count(config, "momentum", "lookback_period", DEFAULT_LOOKBACK_PERIOD, 1)?,
            top_n: get_count(config, "momentum", "top_n", DEFAULT_TOP_N, 1)?,
            frequency: get_parsed(config, "momentum", "rebalance_frequency", RebalanceFrequency::Daily)?,
        }
        .into(),
        "mean_reversion" => {
            let num_std = get_f64(config, "mean_reversion", "num_std", DEFAULT_NUM_STD)?;
            if !(num_std.is_finite() && num_std > 0.0) {
                return Err(SimError::invalid(
                    "mean_reversion",
                    "num_std",
                    format!("must be positive, got {num_std}"),
                ));
            }
            MeanReversion {
                window: get_count(config, "mean_reversion", "window", DEFAULT_WINDOW, 2)?,
                num_std,
            }
            .into()
        }
        other => {
            return Err(SimError::invalid(
                "strategies",
                "enabled",
                format!("unknown strategy '{other}'"),
            ));
        }
    };
    Ok(strategy)
}

/// Parses `AAA:0.6, BBB:0.4`.
fn parse_weights(raw: &str) -> Result<BTreeMap<String, f64>, SimError> {
    let invalid = |reason: String| SimError::invalid("rebalance", "weights", reason);

    let mut weights = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (ticker, value) = entry
            .split_once(':')
            .ok_or_else(|| invalid(format!("expected TICKER:WEIGHT, got '{entry}'")))?;
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(invalid(format!("missing ticker in '{entry}'")));
        }
        let weight: f64 = value
            .trim()
            .parse()
            .map_err(|_| invalid(format!("weight for {ticker} is not a number")))?;
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(invalid(format!("weight for {ticker} must be non-negative")));
        }
        if weights.insert(ticker.to_string(), weight).is_some() {
            return Err(invalid(format!("duplicate ticker {ticker}")));
        }
    }

    if weights.is_empty() {
        return Err(invalid("no weights listed".to_string()));
    }
    let total: f64 = weights.values().sum();
    if total > 1.0 + WEIGHT_SUM_TOLERANCE {
        return Err(invalid(format!("weights sum to {total}, must be at most 1")));
    }
    Ok(weights)
}

fn get_f64(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, SimError> {
    get_parsed(config, section, key, default)
}

fn get_parsed<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, SimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SimError::invalid(section, key, format!("'{}': {e}", raw.trim()))),
    }
}

/// Integer parameter that must be at least `min`.
fn get_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: usize,
) -> Result<usize, SimError> {
    let value: i64 = get_parsed(config, section, key, default)?;
    match usize::try_from(value) {
        Ok(v) if v >= min => Ok(v),
        _ => Err(SimError::invalid(
            section,
            key,
            format!("must be an integer of at least {min}, got {value}"),
        )),
    }
}

fn get_bool(config: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, SimError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(SimError::invalid(section, key, format!("'{other}' is not a boolean"))),
        },
    }
}

fn get_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>, SimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| SimError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::signal::SignalGenerator;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const FULL: &str = r#"
[backtest]
initial_capital = 100000.0
commission_rate = 0.001
slippage_rate = 0.0005
rebalance_frequency = quarterly
position_sizing = risk_parity
start_date = 2020-01-01
end_date = 2024-12-31

[strategies]
enabled = buy_and_hold, rebalance, momentum, mean_reversion

[momentum]
lookback_period = 10
top_n = 3
rebalance_frequency = weekly

[mean_reversion]
window = 15
num_std = 1.5
"#;

    #[test]
    fn unknown_sections_are_reported_but_accepted() {
        let config = make_config(&format!("{FULL}\n[database]\nconninfo = x\n"));
        assert_eq!(unknown_sections(&config), vec!["database"]);
        assert!(validate_run_config(&config).is_ok());
        assert!(unknown_sections(&make_config(FULL)).is_empty());
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_run_config(&make_config(FULL)).is_ok());
    }

    #[test]
    fn loads_run_config_fields() {
        let run = load_run_config(&make_config(FULL)).unwrap();
        assert_eq!(run.initial_capital, 100_000.0);
        assert_eq!(run.commission_rate, 0.001);
        assert_eq!(run.rebalance_frequency, RebalanceFrequency::Quarterly);
        assert_eq!(run.position_sizing, PositionSizing::RiskParity);
        assert_eq!(run.start_date, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(run.end_date, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn loads_strategies_in_order() {
        let config = make_config(FULL);
        let run = load_run_config(&config).unwrap();
        let strategies = load_strategies(&config, &run).unwrap();
        let names: Vec<&str> = strategies.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["buy_and_hold", "rebalance", "momentum", "mean_reversion"]);

        assert_eq!(
            strategies[2],
            Strategy::Momentum(Momentum {
                lookback_period: 10,
                top_n: 3,
                frequency: RebalanceFrequency::Weekly,
            })
        );
        assert_eq!(strategies[3], Strategy::MeanReversion(MeanReversion::new(15, 1.5)));
        assert_eq!(
            strategies[1],
            Strategy::ScheduledRebalance(ScheduledRebalance {
                frequency: RebalanceFrequency::Quarterly,
                targets: TargetWeights::Sizing {
                    rule: PositionSizing::RiskParity,
                    lookback: DEFAULT_SIZING_LOOKBACK,
                },
            })
        );
    }

    #[test]
    fn missing_initial_capital_fails() {
        let err = load_run_config(&make_config("[backtest]\ncommission_rate = 0\n")).unwrap_err();
        assert!(matches!(err, SimError::ConfigMissing { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn initial_capital_zero_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = 0\n")).unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn non_numeric_capital_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = lots\n")).unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn combined_costs_of_one_or_more_fail() {
        let err = load_run_config(&make_config(
            "[backtest]\ninitial_capital = 100\ncommission_rate = 0.5\nslippage_rate = 0.5\n",
        ))
        .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "commission_rate"));
    }

    #[test]
    fn negative_commission_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = 100\ncommission_rate = -0.1\n"))
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "commission_rate"));
    }

    #[test]
    fn unknown_frequency_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = 100\nrebalance_frequency = hourly\n"))
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "rebalance_frequency"));
    }

    #[test]
    fn unknown_sizing_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = 100\nposition_sizing = kelly\n"))
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "position_sizing"));
    }

    #[test]
    fn invalid_date_format_fails() {
        let err = load_run_config(&make_config("[backtest]\ninitial_capital = 100\nstart_date = 2020/01/01\n"))
            .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let err = load_run_config(&make_config(
            "[backtest]\ninitial_capital = 100\nstart_date = 2024-12-31\nend_date = 2020-01-01\n",
        ))
        .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_enabled_fails() {
        let err = validate_run_config(&make_config("[backtest]\ninitial_capital = 100\n")).unwrap_err();
        assert!(matches!(err, SimError::ConfigMissing { key, .. } if key == "enabled"));
    }

    #[test]
    fn unknown_strategy_fails() {
        let err = validate_run_config(&make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = momentum, pairs_trading\n",
        ))
        .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "enabled"));
    }

    #[test]
    fn zero_top_n_fails() {
        let err = validate_run_config(&make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = momentum\n[momentum]\ntop_n = 0\n",
        ))
        .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn non_positive_num_std_fails() {
        let err = validate_run_config(&make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = mean_reversion\n[mean_reversion]\nnum_std = 0\n",
        ))
        .unwrap_err();
        assert!(matches!(err, SimError::ConfigInvalid { key, .. } if key == "num_std"));
    }

    #[test]
    fn disabled_sections_are_not_checked() {
        let config = make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = buy_and_hold\n[momentum]\ntop_n = -4\n",
        );
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn fixed_weights_parse() {
        let config = make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = rebalance\n[rebalance]\nweights = AAA:0.6, BBB:0.4\n",
        );
        let run = load_run_config(&config).unwrap();
        let strategy = load_strategy(&config, &run, "rebalance").unwrap();
        let Strategy::ScheduledRebalance(ScheduledRebalance {
            targets: TargetWeights::Fixed(weights),
            ..
        }) = strategy
        else {
            panic!("expected fixed weights");
        };
        assert_eq!(weights.get("AAA"), Some(&0.6));
        assert_eq!(weights.get("BBB"), Some(&0.4));
    }

    #[test]
    fn weights_over_one_fail() {
        assert!(parse_weights("AAA:0.7, BBB:0.4").is_err());
        assert!(parse_weights("AAA:-0.1").is_err());
        assert!(parse_weights("AAA").is_err());
        assert!(parse_weights("AAA:0.5, AAA:0.1").is_err());
    }

    #[test]
    fn split_evenly_flag() {
        let config = make_config(
            "[backtest]\ninitial_capital = 100\n[strategies]\nenabled = buy_and_hold\n[buy_and_hold]\nsplit_evenly = yes\n",
        );
        let run = load_run_config(&config).unwrap();
        assert_eq!(
            load_strategy(&config, &run, "buy_and_hold").unwrap(),
            Strategy::BuyAndHold(BuyAndHold { split_evenly: true })
        );
    }
}
