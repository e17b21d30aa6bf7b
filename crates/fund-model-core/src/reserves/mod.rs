pub mod forecast;

pub use forecast::forecast_reserves;
