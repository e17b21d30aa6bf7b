//! Request-level entry point.
//!
//! `FundAnalyzer` performs the single batched read for a fund, joins the
//! provider data onto each company, pins "now" and hands the immutable
//! `FundContext` to the component. An unknown fund yields an explicit error
//! record rather than `Err`.

use chrono::{NaiveDate, Utc};

use crate::config::AnalysisConfig;
use crate::error::FundModelError;
use crate::exits::planner::ExitPlanOutput;
use crate::exits::{ArrProjector, DecayingGrowthProjector};
use crate::follow_on::analysis::FollowOnAnalysis;
use crate::follow_on::{ProRataCalculator, StandardProRata};
use crate::metrics::fund_metrics::FundMetrics;
use crate::pacing::deployment::PacingAnalysis;
use crate::portfolio::{
    CompanyAnalyticsProvider, FundContext, PortfolioDataset, PortfolioStore,
    ValuationScenarioProvider,
};
use crate::reserves::forecast::ReserveForecast;
use crate::scenarios::combinator::{ScenarioModelOutput, ScenarioRequest};
use crate::scenarios::tree::{ScenarioTreeFundOutput, ScenarioTreeInput, ScenarioTreePath};
use crate::types::{error_record, ComputationOutput, Money};
use crate::{exits, follow_on, metrics, pacing, reserves, scenarios, FundModelResult};

pub struct FundAnalyzer<'a> {
    store: &'a dyn PortfolioStore,
    analytics: &'a dyn CompanyAnalyticsProvider,
    scenarios: &'a dyn ValuationScenarioProvider,
    config: AnalysisConfig,
    as_of: NaiveDate,
    pro_rata: Box<dyn ProRataCalculator + 'a>,
    projector: Box<dyn ArrProjector + 'a>,
}

impl<'a> FundAnalyzer<'a> {
    /// Fails only when `config` is invalid.
    pub fn new(
        store: &'a dyn PortfolioStore,
        analytics: &'a dyn CompanyAnalyticsProvider,
        scenarios: &'a dyn ValuationScenarioProvider,
        config: AnalysisConfig,
    ) -> FundModelResult<Self> {
        config.validate()?;
        let projector = DecayingGrowthProjector::new(config.arr_growth_decay);
        Ok(FundAnalyzer {
            store,
            analytics,
            scenarios,
            config,
            as_of: Utc::now().date_naive(),
            pro_rata: Box::new(StandardProRata),
            projector: Box::new(projector),
        })
    }

    /// All three providers backed by one in-memory dataset.
    pub fn for_dataset(dataset: &'a PortfolioDataset, config: AnalysisConfig) -> FundModelResult<Self> {
        FundAnalyzer::new(dataset, dataset, dataset, config)
    }

    /// Pin "now" so results are reproducible.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_pro_rata_calculator(mut self, calculator: impl ProRataCalculator + 'a) -> Self {
        self.pro_rata = Box::new(calculator);
        self
    }

    pub fn with_arr_projector(mut self, projector: impl ArrProjector + 'a) -> Self {
        self.projector = Box::new(projector);
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// One store read, joined with analytics and scenario cap tables.
    pub fn load(&self, fund_id: &str) -> FundModelResult<Option<FundContext>> {
        if fund_id.trim().is_empty() {
            return Err(FundModelError::InvalidInput {
                field: "fund_id".into(),
                reason: "Fund id must not be empty".into(),
            });
        }
        Ok(self.store.fetch_fund_snapshot(fund_id)?.map(|snapshot| {
            FundContext::new(snapshot, self.as_of)
                .with_analytics(self.analytics)
                .with_cap_tables(self.scenarios)
        }))
    }

    pub fn calculate_fund_metrics(&self, fund_id: &str) -> FundModelResult<ComputationOutput<FundMetrics>> {
        match self.load(fund_id)? {
            Some(ctx) => metrics::fund_metrics::calculate_fund_metrics(&ctx, &self.config),
            None => Ok(fund_not_found("Fund metrics", fund_id)),
        }
    }

    pub fn model_fund_scenarios(
        &self,
        fund_id: &str,
        request: &ScenarioRequest,
    ) -> FundModelResult<ComputationOutput<ScenarioModelOutput>> {
        match self.load(fund_id)? {
            Some(ctx) => scenarios::combinator::model_fund_scenarios(&ctx, request, &self.config),
            None => Ok(fund_not_found("Portfolio scenario combinations", fund_id)),
        }
    }

    /// Evaluate caller-built tree paths against this fund's full portfolio.
    pub fn evaluate_scenario_tree_on_fund(
        &self,
        fund_id: &str,
        paths: Vec<ScenarioTreePath>,
        total_invested: Option<Money>,
    ) -> FundModelResult<ComputationOutput<ScenarioTreeFundOutput>> {
        let Some(ctx) = self.load(fund_id)? else {
            return Ok(fund_not_found("Scenario tree on fund", fund_id));
        };
        let input = ScenarioTreeInput {
            paths,
            fund_size: ctx.fund.fund_size,
            companies: ctx.companies.into_iter().map(|c| c.company).collect(),
            total_invested,
        };
        scenarios::tree::evaluate_scenario_tree_on_fund(&input, &self.config)
    }

    pub fn analyze_follow_on(
        &self,
        fund_id: &str,
        company_id: &str,
    ) -> FundModelResult<ComputationOutput<FollowOnAnalysis>> {
        match self.load(fund_id)? {
            Some(ctx) => follow_on::analyze_follow_on(&ctx, company_id, self.pro_rata.as_ref(), &self.config),
            None => Ok(fund_not_found("Follow-on analysis", fund_id)),
        }
    }

    pub fn forecast_reserves(&self, fund_id: &str) -> FundModelResult<ComputationOutput<ReserveForecast>> {
        match self.load(fund_id)? {
            Some(ctx) => reserves::forecast_reserves(&ctx, &self.config),
            None => Ok(fund_not_found("Reserve forecast", fund_id)),
        }
    }

    pub fn plan_exits(&self, fund_id: &str) -> FundModelResult<ComputationOutput<ExitPlanOutput>> {
        match self.load(fund_id)? {
            Some(ctx) => exits::plan_exits(&ctx, self.projector.as_ref(), &self.config),
            None => Ok(fund_not_found("Exit planning", fund_id)),
        }
    }

    pub fn analyze_pacing(&self, fund_id: &str) -> FundModelResult<ComputationOutput<PacingAnalysis>> {
        match self.load(fund_id)? {
            Some(ctx) => pacing::analyze_pacing(&ctx, &self.config),
            None => Ok(fund_not_found("Deployment pacing", fund_id)),
        }
    }
}

fn fund_not_found<T: serde::Serialize + Default>(methodology: &str, fund_id: &str) -> ComputationOutput<T> {
    error_record(methodology, FundModelError::not_found("Fund", fund_id).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::{Fund, FundSnapshot};
    use rust_decimal_macros::dec;

    fn dataset() -> PortfolioDataset {
        PortfolioDataset::single(FundSnapshot {
            fund: Fund {
                id: "f1".into(),
                name: "Fund I".into(),
                fund_size: dec!(100),
                start_date: None,
            },
            companies: vec![],
        })
    }

    #[test]
    fn test_unknown_fund_is_error_record() {
        let data = dataset();
        let analyzer = FundAnalyzer::for_dataset(&data, AnalysisConfig::default()).unwrap();
        let out = analyzer.forecast_reserves("nope").unwrap();
        assert_eq!(out.error.as_deref(), Some("Fund not found: nope"));
        assert!(out.result.obligations.is_empty());
    }

    #[test]
    fn test_empty_fund_id_rejected() {
        let data = dataset();
        let analyzer = FundAnalyzer::for_dataset(&data, AnalysisConfig::default()).unwrap();
        assert!(matches!(
            analyzer.calculate_fund_metrics(""),
            Err(FundModelError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let data = dataset();
        let config = AnalysisConfig {
            quarter_days: 0,
            ..Default::default()
        };
        assert!(FundAnalyzer::for_dataset(&data, config).is_err());
    }

    #[test]
    fn test_as_of_is_pinned() {
        let data = dataset();
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let analyzer = FundAnalyzer::for_dataset(&data, AnalysisConfig::default())
            .unwrap()
            .with_as_of(day);
        assert_eq!(analyzer.load("f1").unwrap().unwrap().as_of, day);
    }
}
