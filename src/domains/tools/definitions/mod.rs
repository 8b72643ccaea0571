//! Tool definitions module.
//!
//! Each tool is defined in its own file together with the HTTP client for
//! the provider it wraps.

pub mod common;
pub mod random_user;
pub mod retry;
pub mod weather;

pub use random_user::{Gender, RandomUserClient, RandomUserParams, RandomUserTool};
pub use retry::{RetryPolicy, RetryState};
pub use weather::{ForecastClient, WeatherParams, WeatherTool};
