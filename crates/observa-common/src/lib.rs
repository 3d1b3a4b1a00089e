//! Observa Common - shared infrastructure
//!
//! Logging setup, configuration loading and the notification rate limiter
//! used by Observa hosts.

pub mod config;
pub mod logging;
pub mod rate_limit;

pub use config::Config;
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogFormat};
pub use rate_limit::{Clock, RateLimiter, SystemClock};
