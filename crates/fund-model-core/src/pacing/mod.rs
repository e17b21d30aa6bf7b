pub mod deployment;

pub use deployment::analyze_pacing;
