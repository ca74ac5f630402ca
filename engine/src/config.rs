//! Engine configuration
//!
//! Configuration comes from `NIPPU_*` environment variables. Parsing and
//! validation happen once at startup and are the engine's only fatal path:
//! a missing webhook set or an unparseable value stops the process before
//! any event is accepted.
//!
//! [`Config::from_lookup`] takes the variable source as a closure so tests
//! can feed values without touching the process environment.

use crate::error::EngineError;
use nippu_core::{Category, DeliveryTarget};
use std::str::FromStr;
use std::time::Duration;

pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(3000);
pub(crate) const DEFAULT_MAX_BATCH_SIZE: usize = 10;
pub(crate) const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_millis(15_000);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub(crate) const DEFAULT_DISPATCH_CONCURRENCY: usize = 8;
pub(crate) const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Per-category webhook variables. At least one must be set.
const WEBHOOK_VARS: [(Category, &str); 3] = [
    (Category::Image, "NIPPU_WEBHOOK_IMAGE"),
    (Category::Video, "NIPPU_WEBHOOK_VIDEO"),
    (Category::Document, "NIPPU_WEBHOOK_DOCUMENT"),
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for development
    Pretty,
    /// JSON lines for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Runtime configuration for the engine binary
#[derive(Debug, Clone)]
pub struct Config {
    /// Delivery targets, one per configured category
    pub targets: Vec<DeliveryTarget>,
    /// Quiet period after which a key's buffer is flushed
    pub idle_timeout: Duration,
    /// Buffer size that triggers an immediate flush
    pub max_batch_size: usize,
    /// Upper bound on a single delivery attempt
    pub delivery_timeout: Duration,
    /// Connect timeout for outbound HTTP
    pub connect_timeout: Duration,
    /// Maximum payload deliveries in flight at once
    pub dispatch_concurrency: usize,
    /// Capacity of the flush → dispatch channel
    pub channel_capacity: usize,
    /// Webhook for outcome notifications; log-only when unset
    pub notify_webhook: Option<String>,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut targets = Vec::new();
        for (category, var) in WEBHOOK_VARS {
            if let Some(url) = lookup(var).filter(|url| !url.trim().is_empty()) {
                targets.push(DeliveryTarget::new(category, url.trim()));
            }
        }
        if targets.is_empty() {
            return Err(EngineError::Config(
                "no delivery targets configured; set at least one of NIPPU_WEBHOOK_IMAGE, \
                 NIPPU_WEBHOOK_VIDEO, NIPPU_WEBHOOK_DOCUMENT"
                    .to_string(),
            ));
        }

        let config = Self {
            targets,
            idle_timeout: Duration::from_millis(parse_var(
                &lookup,
                "NIPPU_IDLE_TIMEOUT_MS",
                DEFAULT_IDLE_TIMEOUT.as_millis() as u64,
            )?),
            max_batch_size: parse_var(&lookup, "NIPPU_MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE)?,
            delivery_timeout: Duration::from_millis(parse_var(
                &lookup,
                "NIPPU_DELIVERY_TIMEOUT_MS",
                DEFAULT_DELIVERY_TIMEOUT.as_millis() as u64,
            )?),
            connect_timeout: Duration::from_millis(parse_var(
                &lookup,
                "NIPPU_CONNECT_TIMEOUT_MS",
                DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            )?),
            dispatch_concurrency: parse_var(
                &lookup,
                "NIPPU_DISPATCH_CONCURRENCY",
                DEFAULT_DISPATCH_CONCURRENCY,
            )?,
            channel_capacity: parse_var(
                &lookup,
                "NIPPU_CHANNEL_CAPACITY",
                DEFAULT_CHANNEL_CAPACITY,
            )?,
            notify_webhook: lookup("NIPPU_NOTIFY_WEBHOOK")
                .filter(|url| !url.trim().is_empty())
                .map(|url| url.trim().to_string()),
            log_level: lookup("NIPPU_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_var(&lookup, "NIPPU_LOG_FORMAT", LogFormat::Pretty)?,
        };

        if config.max_batch_size == 0 {
            return Err(EngineError::Config(
                "NIPPU_MAX_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        if config.dispatch_concurrency == 0 {
            return Err(EngineError::Config(
                "NIPPU_DISPATCH_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if config.channel_capacity == 0 {
            return Err(EngineError::Config(
                "NIPPU_CHANNEL_CAPACITY must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, EngineError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Config(format!("invalid value '{raw}' for {name}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_defaults_with_single_target() {
        let config = Config::from_lookup(lookup_from(&[(
            "NIPPU_WEBHOOK_IMAGE",
            "http://localhost:9000/hooks/image",
        )]))
        .unwrap();

        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].category, Category::Image);
        assert_eq!(config.idle_timeout, Duration::from_millis(3000));
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.delivery_timeout, Duration::from_millis(15_000));
        assert_eq!(config.connect_timeout, Duration::from_millis(10_000));
        assert_eq!(config.dispatch_concurrency, 8);
        assert_eq!(config.channel_capacity, 1024);
        assert_eq!(config.notify_webhook, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_collects_all_configured_targets() {
        let config = Config::from_lookup(lookup_from(&[
            ("NIPPU_WEBHOOK_IMAGE", "http://localhost/i"),
            ("NIPPU_WEBHOOK_VIDEO", "http://localhost/v"),
            ("NIPPU_WEBHOOK_DOCUMENT", "http://localhost/d"),
        ]))
        .unwrap();

        let categories: Vec<Category> =
            config.targets.iter().map(|t| t.category).collect();
        assert_eq!(
            categories,
            vec![Category::Image, Category::Video, Category::Document]
        );
    }

    #[test]
    fn test_requires_at_least_one_target() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().contains("NIPPU_WEBHOOK"));
    }

    #[test]
    fn test_blank_webhook_counts_as_unset() {
        let err = Config::from_lookup(lookup_from(&[("NIPPU_WEBHOOK_IMAGE", "  ")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_overrides_and_notify_webhook() {
        let config = Config::from_lookup(lookup_from(&[
            ("NIPPU_WEBHOOK_VIDEO", "http://localhost/v"),
            ("NIPPU_IDLE_TIMEOUT_MS", "500"),
            ("NIPPU_MAX_BATCH_SIZE", "3"),
            ("NIPPU_DELIVERY_TIMEOUT_MS", "30000"),
            ("NIPPU_DISPATCH_CONCURRENCY", "2"),
            ("NIPPU_NOTIFY_WEBHOOK", "http://localhost/notify"),
            ("NIPPU_LOG_FORMAT", "json"),
            ("NIPPU_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.idle_timeout, Duration::from_millis(500));
        assert_eq!(config.max_batch_size, 3);
        assert_eq!(config.delivery_timeout, Duration::from_millis(30_000));
        assert_eq!(config.dispatch_concurrency, 2);
        assert_eq!(
            config.notify_webhook.as_deref(),
            Some("http://localhost/notify")
        );
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_rejects_unparseable_number() {
        let err = Config::from_lookup(lookup_from(&[
            ("NIPPU_WEBHOOK_IMAGE", "http://localhost/i"),
            ("NIPPU_IDLE_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("NIPPU_IDLE_TIMEOUT_MS"));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let err = Config::from_lookup(lookup_from(&[
            ("NIPPU_WEBHOOK_IMAGE", "http://localhost/i"),
            ("NIPPU_MAX_BATCH_SIZE", "0"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("NIPPU_MAX_BATCH_SIZE"));
    }

    #[test]
    fn test_log_format_parsing_is_case_insensitive() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
