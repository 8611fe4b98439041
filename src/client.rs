//! SmarterMail provider client

use crate::config::ProviderConfig;
use crate::connection::http_client;
use crate::error::{Compensation, Error, Result};
use std::future::Future;
use tracing::{error, info, warn};

/// Provisioning client for a SmarterMail server
///
/// Holds the configuration and one shared HTTP client. Operations are
/// grouped by entity: domains, accounts, aliases, groups and mailing
/// lists. Each operation runs its calls one after another and takes a
/// new access token for every call.
#[derive(Debug, Clone)]
pub struct SmarterMailClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl SmarterMailClient {
    /// Create a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = http_client(&config)?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.config.service_url)
    }
}

/// Undo a failed create, best effort.
///
/// Checks whether `entity` exists and, if so, deletes it. Nothing here
/// fails the caller; the outcome is logged and returned.
pub(crate) async fn compensate<D, F>(
    entity: &str,
    exists: impl Future<Output = Result<bool>>,
    delete: D,
) -> Compensation
where
    D: FnOnce() -> F,
    F: Future<Output = Result<()>>,
{
    match exists.await {
        Ok(false) => Compensation::NotNeeded,
        Ok(true) => match delete().await {
            Ok(()) => {
                info!("Rolled back partially created {}", entity);
                Compensation::RolledBack
            }
            Err(e) => {
                error!("Failed to roll back {}: {}", entity, e);
                Compensation::Failed(e.to_string())
            }
        },
        Err(e) => {
            warn!("Could not check {} after failed create: {}", entity, e);
            Compensation::Failed(e.to_string())
        }
    }
}

/// The error returned by a create that has been compensated.
pub(crate) fn create_failed(
    context: &'static str,
    source: Error,
    compensation: Compensation,
) -> Error {
    error!("{}: {} ({})", context, source, compensation);
    Error::Create {
        context,
        source: Box::new(source),
        compensation,
    }
}
