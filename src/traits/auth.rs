//! Remote auth service trait abstraction.

use async_trait::async_trait;

use crate::auth::{LoginResponse, TokenPair};
use crate::error::AuthError;

/// Remote auth API: password login and refresh-token exchange.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange username/password for a credential pair and the user profile.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError>;

    /// Exchange a refresh token for a new credential pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}
