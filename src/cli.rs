//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvPriceSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReportAdapter;
use crate::adapters::summary_table::SummaryTableAdapter;
use crate::domain::backtest::{BacktestResult, Backtester, RunConfig};
use crate::domain::comparison::{SummaryRow, compare};
use crate::domain::config_validation::{
    enabled_strategies, load_run_config, load_strategies, load_strategy, validate_run_config,
};
use crate::domain::error::SimError;
use crate::domain::price_table::PriceTable;
use crate::ports::price_port::PriceSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "simtrader", about = "Portfolio strategy backtesting simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Wide CSV of prices: date,TICKER1,TICKER2,...
        #[arg(short, long)]
        prices: PathBuf,
        /// Strategy to run (default: first enabled)
        #[arg(short, long)]
        strategy: Option<String>,
        /// Write the JSON result document here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run every enabled strategy and compare them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: PathBuf,
        /// Write the summary table as CSV here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write all result documents as JSON here
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show tickers and date range of a price file
    Info {
        #[arg(short, long)]
        prices: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            prices,
            strategy,
            output,
        } => run_backtest(&config, &prices, strategy.as_deref(), output.as_deref()),
        Command::Compare {
            config,
            prices,
            output,
            json,
        } => run_compare(&config, &prices, output.as_deref(), json.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { prices } => run_info(&prices),
    }
}

fn fail(err: &SimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn load_prices(path: &Path) -> Result<PriceTable, ExitCode> {
    eprintln!("Loading prices from {}", path.display());
    let table = CsvPriceSource::new(path)
        .fetch_prices(&[], None, None)
        .map_err(|e| fail(&e))?;
    eprintln!(
        "  {} tickers, {} dates",
        table.tickers().len(),
        table.len()
    );
    Ok(table)
}

fn run_backtest(
    config_path: &Path,
    prices_path: &Path,
    strategy_name: Option<&str>,
    output_path: Option<&Path>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let run_config = match load_run_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    // Stage 2: Resolve strategy
    let enabled = match enabled_strategies(&adapter) {
        Ok(names) => names,
        Err(e) => return fail(&e),
    };
    let name = match strategy_name {
        Some(name) => name.trim().to_lowercase(),
        None => enabled[0].clone(),
    };
    if !enabled.contains(&name) {
        return fail(&SimError::invalid(
            "strategies",
            "enabled",
            format!("strategy '{name}' is not enabled (enabled: {})", enabled.join(", ")),
        ));
    }
    let strategy = match load_strategy(&adapter, &run_config, &name) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    // Stage 3: Load prices
    let table = match load_prices(prices_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    // Stage 4: Run
    eprintln!("Running backtest: {name}");
    let result = match Backtester::new(run_config).run(&table, &strategy) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    print_summary(&result);

    // Stage 5: Write report
    if let Some(path) = output_path {
        if let Err(e) = JsonReportAdapter.write(&result, path) {
            return fail(&e);
        }
        eprintln!("\nResult written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn print_summary(result: &BacktestResult) {
    eprintln!("\n=== {} ===", result.strategy);
    eprintln!("Final Value:      {:.2}", result.final_value);
    eprintln!("Total Return:     {:.2}%", result.total_return_pct);
    eprintln!("Annualized:       {:.2}%", result.annualized_return_pct);
    eprintln!("Volatility:       {:.2}%", result.volatility_pct);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", result.sortino_ratio);
    eprintln!("Max Drawdown:     {:.2}%", result.max_drawdown_pct);
    eprintln!("Total Trades:     {}", result.num_trades);
    if result.skipped_trades > 0 {
        eprintln!("Skipped Trades:   {}", result.skipped_trades);
    }
}

fn run_compare(
    config_path: &Path,
    prices_path: &Path,
    output_path: Option<&Path>,
    json_path: Option<&Path>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let run_config: RunConfig = match load_run_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let strategies = match load_strategies(&adapter, &run_config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let table = match load_prices(prices_path) {
        Ok(t) => t,
        Err(code) => return code,
    };

    eprintln!("Comparing {} strategies", strategies.len());
    let comparison = compare(&table, &run_config, &strategies);
    for failure in comparison.failures() {
        eprintln!("warning: {} failed: {}", failure.strategy, failure.error);
    }

    let rows: Vec<SummaryRow> = comparison.summary();
    if rows.is_empty() {
        return fail(&SimError::EmptyResult);
    }
    println!("{}", SummaryTableAdapter::render(&rows));
    if let Some(best) = comparison.best_by_sharpe() {
        eprintln!("Best Sharpe ratio: {} ({:.2})", best.strategy, best.sharpe_ratio);
    }

    if let Some(path) = output_path {
        if let Err(e) = SummaryTableAdapter.write_comparison(&comparison, path) {
            return fail(&e);
        }
        eprintln!("Summary written to: {}", path.display());
    }
    if let Some(path) = json_path {
        if let Err(e) = JsonReportAdapter.write_comparison(&comparison, path) {
            return fail(&e);
        }
        eprintln!("Results written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_run_config(&adapter) {
        Ok(()) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            warn!(error = %e, "configuration rejected");
            fail(&e)
        }
    }
}

fn run_info(prices_path: &Path) -> ExitCode {
    let source = CsvPriceSource::new(prices_path);
    let tickers = match source.list_tickers() {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    match source.get_data_range() {
        Ok(Some((first, last, rows))) => {
            println!("Tickers: {}", tickers.join(", "));
            println!("Range:   {first} to {last} ({rows} dates)");
            ExitCode::SUCCESS
        }
        Ok(None) => fail(&SimError::EmptyResult),
        Err(e) => fail(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backtest_args() {
        let cli = Cli::try_parse_from([
            "simtrader", "backtest", "-c", "run.ini", "-p", "prices.csv", "-s", "momentum", "-o", "out.json",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config,
                prices,
                strategy,
                output,
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(prices, PathBuf::from("prices.csv"));
                assert_eq!(strategy.as_deref(), Some("momentum"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_compare_args() {
        let cli = Cli::try_parse_from([
            "simtrader", "compare", "--config", "run.ini", "--prices", "p.csv", "--json", "all.json",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Compare { output: None, json: Some(_), .. }
        ));
    }

    #[test]
    fn backtest_requires_prices() {
        assert!(Cli::try_parse_from(["simtrader", "backtest", "-c", "run.ini"]).is_err());
    }
}
