pub mod analysis;
pub mod pro_rata;

pub use analysis::analyze_follow_on;
pub use pro_rata::{ProRataCalculator, ProRataOutcome, StandardProRata};
