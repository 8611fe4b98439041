//! Provider configuration

use crate::error::{Error, Result};
use std::env;

/// Settings for talking to a SmarterMail server
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the web interface, e.g. `https://mail.example.com`.
    pub service_url: String,
    pub admin_username: String,
    pub admin_password: String,
    /// Template for the on-disk domain folder. `%VAR%` references are
    /// expanded from the environment.
    pub domains_path: String,
    /// Include domain administrators when listing mailboxes.
    pub import_domain_admins: bool,
    pub inherit_domain_default_limits: bool,
    pub enable_domain_administrators: bool,
    /// Skip certificate verification. Only for servers with
    /// self-signed certificates.
    pub insecure_tls: bool,
}

impl ProviderConfig {
    /// Configuration with only the required settings; everything else
    /// is off or empty.
    #[must_use]
    pub fn new(
        service_url: impl Into<String>,
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            domains_path: String::new(),
            import_domain_admins: false,
            inherit_domain_default_limits: false,
            enable_domain_administrators: false,
            insecure_tls: false,
        }
    }

    /// Load provider configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `SMARTERMAIL_URL`
    /// - `SMARTERMAIL_USERNAME`
    /// - `SMARTERMAIL_PASSWORD`
    ///
    /// Optional (default empty / `false`):
    /// - `SMARTERMAIL_DOMAINS_PATH`
    /// - `SMARTERMAIL_IMPORT_DOMAIN_ADMINS`
    /// - `SMARTERMAIL_INHERIT_DOMAIN_LIMITS`
    /// - `SMARTERMAIL_ENABLE_DOMAIN_ADMINS`
    /// - `SMARTERMAIL_INSECURE_TLS`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::new(
            env::var("SMARTERMAIL_URL")
                .map_err(|_| Error::Config("SMARTERMAIL_URL not set".into()))?,
            env::var("SMARTERMAIL_USERNAME")
                .map_err(|_| Error::Config("SMARTERMAIL_USERNAME not set".into()))?,
            env::var("SMARTERMAIL_PASSWORD")
                .map_err(|_| Error::Config("SMARTERMAIL_PASSWORD not set".into()))?,
        );

        if config.service_url.is_empty() {
            return Err(Error::Config("SMARTERMAIL_URL is empty".into()));
        }

        config.domains_path = env::var("SMARTERMAIL_DOMAINS_PATH").unwrap_or_default();
        config.import_domain_admins = env_flag("SMARTERMAIL_IMPORT_DOMAIN_ADMINS");
        config.inherit_domain_default_limits = env_flag("SMARTERMAIL_INHERIT_DOMAIN_LIMITS");
        config.enable_domain_administrators = env_flag("SMARTERMAIL_ENABLE_DOMAIN_ADMINS");
        config.insecure_tls = env_flag("SMARTERMAIL_INSECURE_TLS");

        Ok(config)
    }

    /// The domains path with `%VAR%` references expanded.
    #[must_use]
    pub fn evaluated_domains_path(&self) -> String {
        expand_env_vars(&self.domains_path)
    }

    /// Folder the server should use for `domain`'s mail store.
    ///
    /// The server runs on Windows, so the separator is always `\`.
    #[must_use]
    pub fn mail_store_path(&self, domain: &str) -> String {
        format!("{}\\{domain}", self.evaluated_domains_path())
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).is_ok_and(|v| parse_flag(&v))
}

/// Only a case-insensitive `true` counts; anything else is `false`.
pub(crate) fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Expand `%NAME%` references. Unknown names are left untouched.
fn expand_env_vars(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match env::var(name) {
                    Ok(value) if !name.is_empty() => out.push_str(&value),
                    _ => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
