use std::sync::Arc;

use log::error;
use reqwest::Method;
use validator::Validate;

use taskdeck::{
    auth::AccessTokenResponse,
    user::{Credentials, PasswordUpdate, RegisterUserParameters, UserProfile, UserProfilePatch},
    SuccessResponse,
};

use crate::{errors::ClientError, services::api::ApiClient, session::Session};

/// Session lifecycle and user profile operations.
pub struct UserService {
    api: ApiClient,
    session: Arc<Session>,
}

impl UserService {
    pub(crate) fn new(api: ApiClient, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    /// `LoggedOut -> Authenticating -> LoggedIn`, or back to `LoggedOut` on
    /// failure. On success the credential is persisted and the user profile
    /// is fetched best-effort.
    pub async fn login(&self, credentials: Credentials) -> Result<Option<UserProfile>, ClientError> {
        self.session.begin_authentication()?;

        let result: Result<AccessTokenResponse, ClientError> = self
            .api
            .call_api_form(Method::POST, "login", Some(&credentials), None)
            .await;

        match result {
            Ok(token_response) => {
                self.session.complete_login(token_response.access_token);
                Ok(self.fetch_profile().await)
            }
            Err(error) => {
                self.session.fail_login();
                error!("Login failed: {error}");
                Err(error)
            }
        }
    }

    /// Registration is a side operation: it never changes the session state.
    /// On success the caller is expected to hand control to the login flow.
    pub async fn register(
        &self,
        parameters: RegisterUserParameters,
    ) -> Result<UserProfile, ClientError> {
        parameters.validate().map_err(ClientError::invalid_input)?;
        self.api
            .call_api(Method::POST, "register", Some(&parameters), None)
            .await
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub async fn get_profile(&self) -> Result<UserProfile, ClientError> {
        let user: UserProfile = self
            .api
            .call_api(Method::GET, "profile", None::<i32>, Some(self.session.as_ref()))
            .await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        patch: UserProfilePatch,
    ) -> Result<UserProfile, ClientError> {
        let user: UserProfile = self
            .api
            .call_api(Method::PUT, "profile", Some(&patch), Some(self.session.as_ref()))
            .await?;
        self.session.set_user(user.clone());
        Ok(user)
    }

    pub async fn update_password(
        &self,
        update: PasswordUpdate,
    ) -> Result<SuccessResponse, ClientError> {
        self.api
            .call_api(
                Method::PUT,
                "update-password",
                Some(&update),
                Some(self.session.as_ref()),
            )
            .await
    }

    async fn fetch_profile(&self) -> Option<UserProfile> {
        match self.get_profile().await {
            Ok(user) => Some(user),
            Err(error) => {
                error!("Failed to get current user profile: {error}");
                None
            }
        }
    }
}
