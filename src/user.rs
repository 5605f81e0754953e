use std::{fmt, str::FromStr};

use anyhow::anyhow;
use email_address::EmailAddress;
use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret, Zeroize};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: EmailAddress,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<Url>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(user_id: UserId) -> Self {
        user_id.0
    }
}

#[derive(Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<Password>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct Password(pub String);

impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}
impl CloneableSecret for Password {}
impl DebugSecret for Password {}
impl SerializableSecret for Password {}

impl FromStr for Password {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 8 {
            return Err(anyhow!("Password must be at least 8 characters long"));
        }

        Ok(Self(s.to_string()))
    }
}

#[derive(Deserialize, Serialize, Validate)]
pub struct RegisterUserParameters {
    #[validate(length(min = 1))]
    pub username: String,
    pub email: EmailAddress,
    pub password: Secret<Password>,
    #[validate(length(min = 1))]
    pub name: String,
}

impl RegisterUserParameters {
    pub fn try_new(
        username: String,
        email: EmailAddress,
        password: Secret<Password>,
        name: String,
    ) -> Result<Self, anyhow::Error> {
        let params = Self {
            username,
            email,
            password,
            name,
        };

        params.validate()?;

        Ok(params)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct UserProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct PasswordUpdate {
    pub old_password: Secret<Password>,
    pub new_password: Secret<Password>,
}
