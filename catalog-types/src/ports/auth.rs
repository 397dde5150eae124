//! Bearer token validation port.

use crate::error::AuthError;

/// Decides whether a bearer token grants access to protected endpoints.
#[async_trait::async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    /// `Ok(false)` for an unknown token; `Err` only when validation itself failed.
    async fn validate(&self, token: &str) -> Result<bool, AuthError>;
}
