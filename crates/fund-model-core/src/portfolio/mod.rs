pub mod context;
pub mod model;
pub mod providers;

pub use context::{CompanyContext, FundContext};
pub use model::*;
pub use providers::{
    CompanyAnalyticsProvider, PortfolioDataset, PortfolioStore, ValuationScenarioProvider,
};
