//! # evalai-sdk
//!
//! AI 评测平台的客户端 API 运行时：统一的请求路径，内置重试、缓存、批处理、限流与上下文传播。
//!
//! API runtime for the AI Evaluation Platform. Every resource call goes through
//! one request path that layers retries, response caching, request batching,
//! client-side rate limiting and ambient context propagation over a pluggable
//! HTTP transport.
//!
//! ## Key Features
//!
//! - **Unified Client**: [`Client`] is the single entry point; resource facades hang off it
//! - **Classified Errors**: every failure carries an [`ErrorKind`] with a stable code and retry hint
//! - **Retries**: bounded attempts with exponential, linear or fixed backoff ([`RetryPolicy`])
//! - **Caching**: method/URL/params keyed response cache with per-resource TTLs via [`cache`]
//! - **Batching**: opt-in coalescing of GET requests into one batch call via [`batch`]
//! - **Rate Limiting**: fixed-interval FIFO slots before each send via [`resilience`]
//! - **Context**: task-scoped metadata merged into traces via [`context`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use evalai_sdk::{Client, types::CreateTraceParams};
//!
//! #[tokio::main]
//! async fn main() -> evalai_sdk::Result<()> {
//!     let client = Client::builder()
//!         .api_key("sk-...")
//!         .organization_id(42)
//!         .build()?;
//!
//!     let trace = client
//!         .traces()
//!         .create(CreateTraceParams::new("checkout flow", "trace-1"))
//!         .await?;
//!     println!("created trace {}", trace.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, configuration and the request executor |
//! | [`resources`] | Typed facades for traces, evaluations, judges, annotations, developer APIs |
//! | [`types`] | Request and response records of the platform API |
//! | [`error`] | Error type with classification context |
//! | [`error_code`] | Error kinds, wire codes and retryability |
//! | [`transport`] | HTTP transport abstraction and the reqwest implementation |
//! | [`cache`] | Response cache, keys and TTL policy |
//! | [`batch`] | Request batcher, batch executors and bulk helpers |
//! | [`resilience`] | Backoff strategies and the rate limiter |
//! | [`context`] | Ambient context metadata |
//! | [`pagination`] | Offset pagination helpers and cursors |
//! | [`telemetry`] | Leveled SDK logger over `tracing` |
//! | `integrations` | Traced wrappers for third-party calls (feature `integrations`) |

pub mod batch;
pub mod cache;
pub mod client;
pub mod context;
pub mod error;
pub mod error_code;
pub mod pagination;
pub mod prelude;
pub mod resilience;
pub mod resources;
pub mod telemetry;
pub mod transport;
pub mod types;

#[cfg(feature = "integrations")]
pub mod integrations;

pub use client::{Client, ClientBuilder, ClientConfig, RequestOptions, RetryPolicy};
pub use error::{Error, ErrorContext};
pub use error_code::ErrorKind;
pub use transport::HttpMethod;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
