//! Exchange error taxonomy

use crate::data_key::ExchangeDataKey;
use thiserror::Error;

/// Errors raised by the exchange layer outside of the data path
///
/// Data-path outcomes (timeouts on `send`/`recv`, lost finish races)
/// are reported as [BroadcastStatus](crate::status::BroadcastStatus) values instead
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Sender registration or acceptance did not complete in time
    #[error("registration of {key} timed out after {timeout_ms} ms")]
    RegistrationTimeout {
        /// Identity of the channel being registered
        key: ExchangeDataKey,
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// A proxy was asked to bind a second real sender
    #[error("sender proxy {0} is already bound to a real sender")]
    SenderAlreadyBound(ExchangeDataKey),

    /// Valid call on a channel variant that does not implement it
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The exchange log collector was dropped
    #[error("exchange log sink is closed")]
    LogSinkClosed,

    /// Options failing validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Standard exchange result alias
pub type Result<T> = std::result::Result<T, ExchangeError>;
