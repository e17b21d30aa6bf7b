pub mod config;
pub mod error;
pub mod portfolio;
pub mod time_value;
pub mod types;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "follow_on")]
pub mod follow_on;

#[cfg(feature = "reserves")]
pub mod reserves;

#[cfg(feature = "exits")]
pub mod exits;

#[cfg(feature = "pacing")]
pub mod pacing;

#[cfg(feature = "full")]
pub mod service;

pub use config::AnalysisConfig;
pub use error::FundModelError;
pub use types::*;

#[cfg(feature = "full")]
pub use service::FundAnalyzer;

/// Standard result type for all fund-model operations
pub type FundModelResult<T> = Result<T, FundModelError>;
