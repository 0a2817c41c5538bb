pub mod calibration;
pub mod forecast;
pub mod market;

pub use calibration::UserCalibration;
pub use forecast::{Forecast, ForecastInput};
pub use market::{Market, MarketSnapshot};
