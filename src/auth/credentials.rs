//! Credential material and auth service payloads.

use serde::{Deserialize, Serialize};

/// The session's authorization material.
///
/// Both halves are replaced together; an absent access token means the
/// client is unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived bearer token sent with every request.
    pub access_token: Option<String>,
    /// Longer-lived token used only to obtain a new pair.
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Response from the refresh endpoint (POST /auth/refresh).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for CredentialPair {
    fn from(pair: TokenPair) -> Self {
        CredentialPair::new(Some(pair.access_token), Some(pair.refresh_token))
    }
}

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Response from the login endpoint (POST /auth/login).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Some deployments issue access tokens only.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl LoginResponse {
    pub fn credential_pair(&self) -> CredentialPair {
        CredentialPair::new(Some(self.access_token.clone()), self.refresh_token.clone())
    }
}
