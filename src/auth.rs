use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret, Zeroize};
use serde::{Deserialize, Serialize};

/// Opaque bearer credential returned by the remote service on login.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
#[serde(transparent)]
pub struct AccessToken(pub String);

impl Zeroize for AccessToken {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}
impl CloneableSecret for AccessToken {}
impl DebugSecret for AccessToken {}
impl SerializableSecret for AccessToken {}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessTokenResponse {
    pub access_token: Secret<AccessToken>,
    #[serde(default)]
    pub token_type: Option<String>,
}
