//! Authenticated command dispatch
//!
//! Each command gets a fresh token for its scope, is sent to
//! `{service_url}/api/v1/{path}`, and returns the parsed JSON body
//! untouched. Dispatch only deals with transport: a non-2xx status or
//! a body that is not JSON is an error here, but `success: false` is
//! left for the caller to check (see [`crate::envelope`]).

use crate::auth::TokenScope;
use crate::client::SmarterMailClient;
use crate::error::{Error, Result};
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

impl SmarterMailClient {
    /// GET `path` as sysadmin.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be obtained, the request
    /// fails, or the response is not JSON.
    pub async fn exec_get(&self, path: &str) -> Result<Value> {
        self.exec::<()>(&TokenScope::Sysadmin, Method::GET, path, None)
            .await
    }

    /// POST `body` to `path` as sysadmin.
    ///
    /// # Errors
    ///
    /// See [`Self::exec_get`].
    pub async fn exec_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.exec(&TokenScope::Sysadmin, Method::POST, path, Some(body))
            .await
    }

    /// GET `path` as the administrator of `domain`.
    ///
    /// # Errors
    ///
    /// See [`Self::exec_get`].
    pub async fn exec_domain_get(&self, path: &str, domain: &str) -> Result<Value> {
        self.exec::<()>(
            &TokenScope::Domain(domain.to_string()),
            Method::GET,
            path,
            None,
        )
        .await
    }

    /// POST `body` to `path` as the administrator of `domain`.
    ///
    /// # Errors
    ///
    /// See [`Self::exec_get`].
    pub async fn exec_domain_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        domain: &str,
        body: &B,
    ) -> Result<Value> {
        self.exec(
            &TokenScope::Domain(domain.to_string()),
            Method::POST,
            path,
            Some(body),
        )
        .await
    }

    /// GET `path` as the mailbox `email`.
    ///
    /// # Errors
    ///
    /// See [`Self::exec_get`].
    pub async fn exec_user_get(&self, path: &str, email: &str) -> Result<Value> {
        self.exec::<()>(&TokenScope::User(email.to_string()), Method::GET, path, None)
            .await
    }

    /// POST `body` to `path` as the mailbox `email`.
    ///
    /// # Errors
    ///
    /// See [`Self::exec_get`].
    pub async fn exec_user_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        email: &str,
        body: &B,
    ) -> Result<Value> {
        self.exec(
            &TokenScope::User(email.to_string()),
            Method::POST,
            path,
            Some(body),
        )
        .await
    }

    async fn exec<B: Serialize + ?Sized>(
        &self,
        scope: &TokenScope,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value> {
        let token = self.token_for(scope).await?;
        let url = self.api_url(path);

        debug!("{} {} as {}", method, url, scope);
        let value = self
            .send(method, &url, Some(&token.access_token), body)
            .await?;
        debug!("{} returned {}", url, value);

        Ok(value)
    }

    /// Send one request and parse the JSON body.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<Value> {
        let mut request = self
            .http()
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
