pub mod client;
pub mod dates;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod types;

pub use client::{Backend, ClientOptions, WeatherClient};
pub use dates::{offset_days, DateOutOfRange, ForecastWindow, FORECAST_HORIZON_DAYS};
pub use error::WeatherApiError;
pub use fetch::WeatherSource;
pub use types::{CurrentConditions, ForecastEntry, ForecastResponse, WeatherRecord};
