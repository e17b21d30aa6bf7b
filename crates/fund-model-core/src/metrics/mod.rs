pub mod fund_metrics;
