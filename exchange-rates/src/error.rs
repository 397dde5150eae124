//! Failure taxonomy for a single rate lookup.

use rust_decimal::Decimal;

/// Outcome of one lookup attempt against the provider.
pub type RateLookupResult = Result<Decimal, RateLookupError>;

/// Why a lookup produced no rate.
#[derive(Debug, thiserror::Error)]
pub enum RateLookupError {
    /// The provider answered but gave no usable rate (bad status, empty or
    /// ambiguous body).
    #[error("{0}")]
    Unavailable(String),

    /// The circuit breaker rejected the call without reaching the provider.
    #[error("{0}")]
    CallBlocked(String),

    /// Transport failure or a payload that broke the provider contract.
    #[error("{message}")]
    Unexpected {
        message: String,
        #[source]
        cause: FailureCause,
    },
}

impl RateLookupError {
    /// Whether this outcome is recorded as a failed call by the circuit breaker.
    ///
    /// A blocked call never reached the provider, so it is not a call at all.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, RateLookupError::CallBlocked(_))
    }
}

/// Underlying cause of [`RateLookupError::Unexpected`].
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    /// Connect error, timeout, or failure while reading the body.
    #[error("request to the exchange rate provider failed")]
    Transport(#[source] reqwest::Error),

    /// The body was not the documented JSON shape, or the rate field did not
    /// hold a locale-formatted number.
    #[error("malformed exchange rate payload")]
    MalformedPayload(#[source] serde_json::Error),
}

impl FailureCause {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureCause::Transport(e) if e.is_timeout())
    }
}
