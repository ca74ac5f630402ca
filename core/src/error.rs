//! Error types for NIPPU sinks

use thiserror::Error;

/// Error type for sink operations
///
/// This is the standard error type returned by [`Deliverer`](crate::Deliverer)
/// and [`Notifier`](crate::Notifier) implementations. The engine maps it onto
/// a [`DeliveryOutcome`](crate::DeliveryOutcome) when classifying a delivery
/// attempt, so the variants matter: a `Timeout` becomes a timeout outcome,
/// everything else becomes a transport failure.
///
/// # Example
///
/// ```
/// use nippu_core::SinkError;
///
/// fn connect_to_target() -> Result<(), SinkError> {
///     // Simulate connection failure
///     Err(SinkError::Connection("refused".to_string()))
/// }
///
/// match connect_to_target() {
///     Ok(_) => println!("Connected!"),
///     Err(SinkError::Connection(msg)) => println!("Connection failed: {}", msg),
///     Err(e) => println!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Initialization failed
    ///
    /// Returned when a sink fails to construct, typically during startup.
    /// Examples: TLS backend unavailable, invalid base URL.
    #[error("initialization failed: {0}")]
    Init(String),

    /// Send failed
    ///
    /// Returned when a sink fails to hand its payload to the destination.
    /// Examples: non-2xx response, server rejected request, quota exceeded.
    #[error("send failed: {0}")]
    Send(String),

    /// Connection error
    ///
    /// Returned when a network connection fails.
    /// Examples: DNS lookup failed, connection refused, TLS handshake error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Timed out
    ///
    /// Returned when the transport itself hit a deadline before the engine's
    /// own delivery timeout fired. Classified as a timeout outcome either way.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Shutdown error
    ///
    /// Returned when graceful shutdown fails.
    /// Examples: failed to flush pending requests, connection pool teardown.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}
