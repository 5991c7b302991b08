//! Platform API client.
//!
//! Keep the public surface small: [`Client`] and its builder, request
//! options and configuration. The request path lives in `src/client/`.

pub mod builder;
pub mod config;
pub mod core;
pub mod error_classification;
mod execution;
mod policy;
pub mod signals;
pub mod types;

pub use builder::ClientBuilder;
pub use config::{ClientConfig, RetryPolicy};
pub use self::core::Client;
pub use signals::SignalsSnapshot;
pub use types::RequestOptions;
