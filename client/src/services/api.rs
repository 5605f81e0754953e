use std::time::Duration;

use anyhow::{anyhow, Context};
use log::warn;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client, Method, Response, StatusCode,
};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use crate::{errors::ClientError, session::Session};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

static DEFAULT_UNAUTHORIZED_MESSAGE: &str = "Invalid authentication credentials";
static DEFAULT_REMOTE_MESSAGE: &str = "The remote service rejected the request";

/// FastAPI-style error body
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(APP_USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().context("Cannot build HTTP client")?,
            base_url,
        })
    }

    pub async fn call_api<R: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        session: Option<&Session>,
    ) -> Result<R, ClientError> {
        let response = self.execute(method, path, body, session, false).await?;
        decode_response(response).await
    }

    /// Same as `call_api` with a form-encoded body (the login endpoint).
    pub async fn call_api_form<R: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        session: Option<&Session>,
    ) -> Result<R, ClientError> {
        let response = self.execute(method, path, body, session, true).await?;
        decode_response(response).await
    }

    pub async fn call_api_no_content<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        session: Option<&Session>,
    ) -> Result<(), ClientError> {
        self.execute(method, path, body, session, false).await?;
        Ok(())
    }

    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        session: Option<&Session>,
        as_form: bool,
    ) -> Result<Response, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| ClientError::Unexpected(anyhow!("Invalid API path {path}: {err}")))?;
        let mut request = self.client.request(method.clone(), url);

        if let Some(session) = session {
            // Refused before any network I/O when no credential is held
            let Some(token) = session.access_token() else {
                return Err(ClientError::Unauthorized(
                    "No credential held, please log in first".to_string(),
                ));
            };
            let mut auth_header: HeaderValue = format!("Bearer {}", token.expose_secret().0)
                .parse()
                .map_err(|err| {
                    ClientError::Unexpected(anyhow!("Cannot build authorization header: {err}"))
                })?;
            auth_header.set_sensitive(true);
            request = request.header("Authorization", auth_header);
        }

        if let Some(body) = body {
            request = if as_form {
                request.form(&body)
            } else {
                request.json(&body)
            };
        }

        let response = request.send().await.map_err(ClientError::Transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(session) = session {
                session.invalidate();
            }
            let message = error_message(response, DEFAULT_UNAUTHORIZED_MESSAGE).await;
            return Err(ClientError::Unauthorized(message));
        }
        if !status.is_success() {
            let message = error_message(response, DEFAULT_REMOTE_MESSAGE).await;
            warn!("API call failed ({method} {path}): {status} {message}");
            return Err(ClientError::Remote { status, message });
        }

        Ok(response)
    }
}

async fn decode_response<R: DeserializeOwned>(response: Response) -> Result<R, ClientError> {
    let text = response.text().await.map_err(ClientError::Transport)?;
    serde_json::from_str(&text).map_err(|err| ClientError::from_json_serde_error(err, text))
}

async fn error_message(response: Response, default: &str) -> String {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail)
        .unwrap_or_else(|| default.to_string())
}
