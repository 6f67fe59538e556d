//! Domain error types.
//!
//! [`SimError`] is the fatal/terminal error returned across the crate
//! boundary. [`TradeError`] is the recoverable, per-trade failure the ledger
//! and execution simulator report; the orchestrator turns those into
//! [`Diagnostic`] records instead of aborting the run.

use chrono::NaiveDate;
use serde::Serialize;

/// Top-level error type for simtrader.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error("backtest produced an empty equity curve")]
    EmptyResult,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        SimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SimError::ConfigParse { .. }
                | SimError::ConfigMissing { .. }
                | SimError::ConfigInvalid { .. }
        )
    }

    /// An empty result is terminal for the run but not a crash; everything
    /// else aborts.
    pub fn severity(&self) -> Severity {
        match self {
            SimError::EmptyResult => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        let code: u8 = match err {
            SimError::Io(_) => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::Data { .. } | SimError::Csv(_) => 3,
            SimError::EmptyResult => 4,
            SimError::Json(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Recoverable failure of a single ledger mutation or execution step.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("insufficient funds for {ticker}: need {required:.2}, have {available:.2}")]
    InsufficientFunds {
        ticker: String,
        required: f64,
        available: f64,
    },

    #[error("invalid position for {ticker}: {reason}")]
    InvalidPosition { ticker: String, reason: String },

    #[error("missing price for {ticker}")]
    MissingPrice { ticker: String },
}

impl TradeError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            TradeError::InsufficientFunds { .. } => DiagnosticKind::InsufficientFunds,
            TradeError::InvalidPosition { .. } => DiagnosticKind::InvalidPosition,
            TradeError::MissingPrice { .. } => DiagnosticKind::MissingPrice,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            TradeError::InsufficientFunds { ticker, .. }
            | TradeError::InvalidPosition { ticker, .. }
            | TradeError::MissingPrice { ticker } => ticker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Recoverable,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InsufficientFunds,
    InvalidPosition,
    MissingPrice,
}

/// A skipped action observed during a run, attached to the result document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub date: NaiveDate,
    pub ticker: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn recoverable(date: NaiveDate, err: &TradeError) -> Self {
        Diagnostic {
            date,
            ticker: err.ticker().to_string(),
            severity: Severity::Recoverable,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// True for skips that dropped a buy or sell, as opposed to missing data.
    pub fn is_skipped_trade(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::InsufficientFunds | DiagnosticKind::InvalidPosition
        )
    }
}
