//! Eurocore gateway client.
//!
//! Eurocore authenticates with a bearer token obtained from `POST /login`.
//! The token is cached for the lifetime of the client and refreshed once
//! whenever the gateway answers `401 Unauthorized`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use super::{ClientError, expect_success, parse_response, with_trailing_slash};
use crate::objects::eurocore::{LoginRequest, LoginResponse, NewTelegram, Template};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed HTTP client for the Eurocore telegram gateway.
#[derive(Debug, Clone)]
pub struct EurocoreClient {
    http: Client,
    base_url: Url,
    username: String,
    password: String,
    token: Arc<RwLock<Option<String>>>,
}

impl EurocoreClient {
    /// Create a new `EurocoreClient`.
    ///
    /// * `base_url` – root URL of the Eurocore instance.
    /// * `username` / `password` – the account used to log in.
    pub fn new(base_url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: with_trailing_slash(base_url),
            username: username.into(),
            password: password.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /login` – obtain a fresh bearer token and cache it.
    pub async fn login(&self) -> Result<String, ClientError> {
        let url = self.base_url.join("login")?;

        let resp = self
            .http
            .post(url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let LoginResponse { token } = parse_response(resp).await?;
        *self.token.write().await = Some(token.clone());
        debug!("Logged in to eurocore");

        Ok(token)
    }

    /// `GET /templates/{name}` – look up a registered telegram template.
    pub async fn get_template(&self, name: &str) -> Result<Template, ClientError> {
        let mut url = self.base_url.join("templates/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .push(name);

        let resp = self
            .send_authorized(|token| self.http.get(url.clone()).bearer_auth(token))
            .await?;

        parse_response(resp).await
    }

    /// `POST /telegrams` – queue a single telegram for delivery.
    pub async fn send_telegram(&self, telegram: &NewTelegram) -> Result<(), ClientError> {
        let url = self.base_url.join("telegrams")?;
        let body = [telegram];

        let resp = self
            .send_authorized(|token| self.http.post(url.clone()).bearer_auth(token).json(&body))
            .await?;

        expect_success(resp).await
    }

    async fn cached_token(&self) -> Result<String, ClientError> {
        let cached = self.token.read().await.clone();
        match cached {
            Some(token) => Ok(token),
            None => self.login().await,
        }
    }

    async fn send_authorized<F>(&self, build: F) -> Result<Response, ClientError>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.cached_token().await?;
        let resp = build(&token).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("Eurocore rejected the cached token, logging in again");
        let token = self.login().await?;
        Ok(build(&token).send().await?)
    }
}
