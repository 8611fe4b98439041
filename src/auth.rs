//! Access token acquisition
//!
//! SmarterMail hands out short-lived bearer tokens. A sysadmin token
//! comes from the admin credentials; domain and user tokens are
//! obtained by impersonation with a fresh sysadmin token. Tokens are
//! never cached: every command asks for a new one.
//!
//! All three flows fail the same way: a server that cannot be reached
//! gives [`Error::Http`]; a bad status, an unreadable body or
//! `success: false` gives [`Error::Auth`].

use crate::client::SmarterMailClient;
use crate::error::{Error, Result};
use crate::json;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use tracing::debug;

/// Privilege level a token grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Full server administration.
    Sysadmin,
    /// Administration of a single domain.
    Domain(String),
    /// A single mailbox, by email address.
    User(String),
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sysadmin => f.write_str("sysadmin"),
            Self::Domain(domain) => write!(f, "domain {domain}"),
            Self::User(email) => write!(f, "user {email}"),
        }
    }
}

/// A bearer token for one scope.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub scope: TokenScope,
    pub access_token: String,
    /// Returned by the server but never used; tokens are not refreshed.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub username: String,
    pub email_address: String,
}

impl AccessToken {
    /// Whether the token has expired at `now`. Tokens without an
    /// expiration never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateResponse {
    #[serde(default, deserialize_with = "json::flag")]
    success: bool,
    #[serde(default, deserialize_with = "json::opt_text")]
    message: Option<String>,
    #[serde(default, deserialize_with = "json::text")]
    access_token: String,
    #[serde(default, deserialize_with = "json::opt_text")]
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "json::timestamp")]
    access_token_expiration: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "json::text")]
    username: String,
    #[serde(default, deserialize_with = "json::text")]
    email_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpersonateResponse {
    #[serde(default, deserialize_with = "json::flag")]
    success: bool,
    #[serde(default, deserialize_with = "json::opt_text")]
    message: Option<String>,
    #[serde(default, deserialize_with = "json::text")]
    impersonate_access_token: String,
    #[serde(default, deserialize_with = "json::opt_text")]
    impersonate_refresh_token: Option<String>,
    #[serde(default, deserialize_with = "json::timestamp")]
    impersonate_access_token_expiration: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "json::text")]
    username: String,
    #[serde(default, deserialize_with = "json::text")]
    email: String,
}

fn rejected(scope: &TokenScope, message: Option<String>) -> Error {
    Error::Auth {
        scope: scope.to_string(),
        message: message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "no access token returned".to_string()),
    }
}

/// A bad status or body while fetching a token is a login failure.
/// Connection errors are left alone.
fn refused(scope: &TokenScope, error: Error) -> Error {
    match error {
        Error::Status { .. } | Error::Json(_) => rejected(scope, Some(error.to_string())),
        other => other,
    }
}

impl AuthenticateResponse {
    fn into_token(self) -> Result<AccessToken> {
        let scope = TokenScope::Sysadmin;
        if !self.success || self.access_token.is_empty() {
            return Err(rejected(&scope, self.message));
        }
        Ok(AccessToken {
            scope,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.access_token_expiration,
            username: self.username,
            email_address: self.email_address,
        })
    }
}

impl ImpersonateResponse {
    fn into_token(self, scope: TokenScope) -> Result<AccessToken> {
        if !self.success || self.impersonate_access_token.is_empty() {
            return Err(rejected(&scope, self.message));
        }
        Ok(AccessToken {
            scope,
            access_token: self.impersonate_access_token,
            refresh_token: self.impersonate_refresh_token,
            expires_at: self.impersonate_access_token_expiration,
            username: self.username,
            email_address: self.email,
        })
    }
}

impl SmarterMailClient {
    /// Log in with the admin credentials and return a sysadmin token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the login or
    /// answers with a non-success status or an unreadable body, and
    /// [`Error::Http`] if it cannot be reached.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let scope = TokenScope::Sysadmin;
        let login = json!({
            "username": self.config().admin_username,
            "password": self.config().admin_password,
        });

        let token = self
            .request_token::<AuthenticateResponse>(&scope, "auth/authenticate-user", None, &login)
            .await?
            .into_token()?;

        debug!("Obtained sysadmin token for {}", token.username);
        Ok(token)
    }

    /// Impersonate the administrator of `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if either the sysadmin login or the
    /// impersonation request fails.
    pub async fn domain_access_token(&self, domain: &str) -> Result<AccessToken> {
        let admin = self.access_token().await?;
        let scope = TokenScope::Domain(domain.to_string());

        let token = self
            .request_token::<ImpersonateResponse>(
                &scope,
                &format!("settings/sysadmin/manage-domain/{domain}"),
                Some(&admin.access_token),
                &json!({}),
            )
            .await?
            .into_token(scope)?;

        debug!("Obtained domain token for {}", domain);
        Ok(token)
    }

    /// Impersonate the mailbox `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if either the sysadmin login or the
    /// impersonation request fails.
    pub async fn user_access_token(&self, email: &str) -> Result<AccessToken> {
        let admin = self.access_token().await?;
        let scope = TokenScope::User(email.to_string());

        let token = self
            .request_token::<ImpersonateResponse>(
                &scope,
                "settings/domain/impersonate-user",
                Some(&admin.access_token),
                &json!({ "email": email }),
            )
            .await?
            .into_token(scope)?;

        debug!("Obtained user token for {}", email);
        Ok(token)
    }

    async fn request_token<R: DeserializeOwned>(
        &self,
        scope: &TokenScope,
        path: &str,
        bearer: Option<&str>,
        body: &Value,
    ) -> Result<R> {
        let url = self.api_url(path);
        let value = self
            .send(Method::POST, &url, bearer, Some(body))
            .await
            .map_err(|e| refused(scope, e))?;
        serde_json::from_value(value).map_err(|e| refused(scope, Error::Json(e)))
    }

    /// Fresh token for `scope`.
    pub(crate) async fn token_for(&self, scope: &TokenScope) -> Result<AccessToken> {
        match scope {
            TokenScope::Sysadmin => self.access_token().await,
            TokenScope::Domain(domain) => self.domain_access_token(domain).await,
            TokenScope::User(email) => self.user_access_token(email).await,
        }
    }
}
