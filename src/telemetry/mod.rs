//! 日志模块：每个客户端持有的请求日志记录器，基于 tracing 输出。
//!
//! Request logging.
//!
//! Every [`Client`](crate::Client) owns a [`RequestLogger`] created at
//! construction; there is no process-wide logger. Events are emitted through
//! `tracing` with the logger's prefix as a structured field, unless a custom
//! [`LogHandler`] is attached.
//!
//! [`init_tracing`] installs a formatting subscriber for tests and local
//! development.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_PREFIX: &str = "EvalAI";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Level for a response line: errors at 400+, warnings for redirects.
    pub fn for_status(status: u16) -> Self {
        match status {
            s if s >= 400 => Self::Error,
            s if s >= 300 => Self::Warn,
            _ => Self::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: Option<Value>,
    pub prefix: String,
}

/// Destination for log entries that bypasses `tracing`.
pub trait LogHandler: Send + Sync {
    fn handle(&self, entry: &LogEntry);
}

impl<F> LogHandler for F
where
    F: Fn(&LogEntry) + Send + Sync,
{
    fn handle(&self, entry: &LogEntry) {
        self(entry)
    }
}

#[derive(Clone)]
pub struct Logger {
    prefix: String,
    level: LogLevel,
    handler: Option<Arc<dyn LogHandler>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &self.prefix)
            .field("level", &self.level)
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            level,
            handler: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn LogHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Logger sharing this one's settings with `prefix` appended (`EvalAI:traces`).
    pub fn child(&self, prefix: &str) -> Logger {
        Logger {
            prefix: format!("{}:{}", self.prefix, prefix),
            ..self.clone()
        }
    }

    pub fn log(&self, level: LogLevel, message: &str, data: Option<Value>) {
        if !self.is_level_enabled(level) {
            return;
        }
        if let Some(handler) = &self.handler {
            handler.handle(&LogEntry {
                level,
                message: message.to_string(),
                timestamp: Utc::now(),
                data,
                prefix: self.prefix.clone(),
            });
            return;
        }
        let prefix = self.prefix.as_str();
        let data = data.map(|d| d.to_string()).unwrap_or_default();
        match level {
            LogLevel::Trace => trace!(prefix, data = %data, "{}", message),
            LogLevel::Debug => debug!(prefix, data = %data, "{}", message),
            LogLevel::Info => info!(prefix, data = %data, "{}", message),
            LogLevel::Warn => warn!(prefix, data = %data, "{}", message),
            LogLevel::Error => error!(prefix, data = %data, "{}", message),
        }
    }

    pub fn trace(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Trace, message, data)
    }

    pub fn debug(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Debug, message, data)
    }

    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Info, message, data)
    }

    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Warn, message, data)
    }

    pub fn error(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Error, message, data)
    }
}

/// Logs outgoing requests and their responses for one client.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    logger: Logger,
}

impl RequestLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Debug mode logs every request at debug level; otherwise only
    /// warnings and errors get through.
    pub fn for_client(debug: bool) -> Self {
        Self::new(Logger::new(if debug { LogLevel::Debug } else { LogLevel::Warn }))
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn log_request(&self, method: &str, url: &str, body: Option<&Value>) {
        if !self.logger.is_level_enabled(LogLevel::Debug) {
            return;
        }
        self.logger.debug(
            &format!("→ {} {}", method, url),
            body.map(|b| serde_json::json!({ "body": b })),
        );
    }

    pub fn log_response(&self, method: &str, url: &str, status: u16, elapsed: Duration, body: Option<&Value>) {
        let level = LogLevel::for_status(status);
        if !self.logger.is_level_enabled(level) {
            return;
        }
        self.logger.log(
            level,
            &format!("← {} {} {} ({}ms)", method, url, status, elapsed.as_millis()),
            body.map(|b| serde_json::json!({ "body": b })),
        );
    }

    /// `attempt` is the number of the attempt about to start.
    pub fn log_retry(&self, attempt: u32, max_attempts: u32, delay: Duration, code: &str, url: &str) {
        self.logger.warn(
            &format!(
                "Retrying request (attempt {}/{}) after {}ms",
                attempt, max_attempts, delay.as_millis()
            ),
            Some(serde_json::json!({ "error": code, "url": url })),
        );
    }
}

/// Install a `tracing-subscriber` formatter filtered by `filter` (falls back
/// to `RUST_LOG`). Returns false when a global subscriber is already set.
pub fn init_tracing(filter: Option<&str>) -> bool {
    use tracing_subscriber::EnvFilter;
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn capturing(level: LogLevel) -> (Logger, Arc<Mutex<Vec<LogEntry>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let logger = Logger::new(level).with_handler(Arc::new(move |e: &LogEntry| {
            sink.lock().unwrap().push(e.clone());
        }));
        (logger, seen)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, seen) = capturing(LogLevel::Warn);
        logger.debug("hidden", None);
        logger.info("hidden", None);
        logger.warn("shown", None);
        logger.error("shown", Some(json!({"k": 1})));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].data, Some(json!({"k": 1})));
    }

    #[test]
    fn test_child_prefix() {
        let (logger, seen) = capturing(LogLevel::Trace);
        logger.child("traces").trace("hi", None);
        assert_eq!(seen.lock().unwrap()[0].prefix, "EvalAI:traces");
    }

    #[test]
    fn test_response_level_by_status() {
        let (logger, seen) = capturing(LogLevel::Debug);
        let rl = RequestLogger::new(logger);
        rl.log_request("GET", "/api/traces", None);
        rl.log_response("GET", "/api/traces", 200, Duration::from_millis(12), None);
        rl.log_response("GET", "/api/traces", 302, Duration::from_millis(1), None);
        rl.log_response("GET", "/api/traces", 503, Duration::from_millis(1), None);
        let levels: Vec<_> = seen.lock().unwrap().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Debug, LogLevel::Debug, LogLevel::Warn, LogLevel::Error]);
        assert_eq!(seen.lock().unwrap()[1].message, "← GET /api/traces 200 (12ms)");
    }

    #[test]
    fn test_retry_message() {
        let (logger, seen) = capturing(LogLevel::Warn);
        RequestLogger::new(logger).log_retry(2, 3, Duration::from_millis(1000), "RATE_LIMIT_EXCEEDED", "/api/traces");
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].message, "Retrying request (attempt 2/3) after 1000ms");
        assert_eq!(seen[0].data, Some(json!({"error": "RATE_LIMIT_EXCEEDED", "url": "/api/traces"})));
    }

    #[test]
    fn test_client_logger_levels() {
        assert_eq!(RequestLogger::for_client(true).logger().level(), LogLevel::Debug);
        assert_eq!(RequestLogger::for_client(false).logger().level(), LogLevel::Warn);
    }
}
