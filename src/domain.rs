//! Mail domains and domain aliases

use crate::address::{bytes_to_mb, local_part, mb_to_bytes};
use crate::client::{SmarterMailClient, compensate, create_failed};
use crate::envelope;
use crate::error::{Error, Result};
use crate::json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// Name of the built-in administrator created with every domain.
pub const SYSTEM_DOMAIN_ADMIN: &str = "system.domain.admin";
/// Local part of the group that backs a domain's catch-all.
pub const SYSTEM_CATCH_ALL: &str = "system.catch.all";

/// A hosted mail domain.
///
/// Sizes are in megabytes. `max_message_size` is passed through in the
/// server's own unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailDomain {
    pub name: String,
    /// Folder on the mail server. Read-only: `create_domain` derives it
    /// from the configured domains path.
    pub path: String,
    pub enabled: bool,
    /// Current usage. Read-only.
    pub size_mb: i64,
    pub catch_all_account: String,

    pub show_domain_alias_menu: bool,
    pub show_list_menu: bool,
    pub show_spam_menu: bool,
    pub global_address_list: bool,
    pub shared_calendars: bool,

    pub throttle: ThrottleSettings,

    pub max_domain_size_mb: i64,
    pub max_domain_aliases: i64,
    pub max_domain_users: i64,
    pub max_aliases: i64,
    pub max_lists: i64,
    pub max_message_size: i64,
    pub max_recipients: i64,
    pub max_mailbox_size_mb: i64,

    pub require_smtp_authentication: bool,
    pub list_command_address: String,
    pub bypass_forward_blacklist: bool,

    /// Server license, filled in by `domain`. Read-only.
    pub license: Option<LicenseEdition>,
}

/// Outbound throttling limits of a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottleSettings {
    #[serde(deserialize_with = "json::int")]
    pub messages_per_hour: i64,
    #[serde(rename = "messagesAction", deserialize_with = "json::action")]
    pub messages_enabled: bool,
    #[serde(deserialize_with = "json::int")]
    pub bandwidth_per_hour: i64,
    #[serde(rename = "bandwidthAction", deserialize_with = "json::action")]
    pub bandwidth_enabled: bool,
    #[serde(deserialize_with = "json::int")]
    pub bounces_per_hour: i64,
    #[serde(rename = "bouncesAction", deserialize_with = "json::action")]
    pub bounces_enabled: bool,
}

/// SmarterMail license edition, as reported by `licensing/info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseEdition {
    Enterprise,
    Professional,
    Free,
    Lite,
}

impl LicenseEdition {
    /// Map the numeric edition code. Unknown codes give `None`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::Enterprise),
            "1" => Some(Self::Professional),
            "2" => Some(Self::Free),
            "3" => Some(Self::Lite),
            _ => None,
        }
    }

    /// Short label used by the control panel.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enterprise => "ENT",
            Self::Professional => "PRO",
            Self::Free => "FREE",
            Self::Lite => "Lite",
        }
    }
}

// -- wire types --

#[derive(Deserialize)]
struct DomainListResponse {
    #[serde(default)]
    data: Option<Vec<NamedEntry>>,
}

#[derive(Deserialize)]
struct NamedEntry {
    #[serde(deserialize_with = "json::text")]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainSettingsResponse {
    domain_settings: DomainSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainSettings {
    #[serde(default, deserialize_with = "json::text")]
    domain_path: String,
    #[serde(default, deserialize_with = "json::flag")]
    show_domain_alias_menu: bool,
    #[serde(default, deserialize_with = "json::flag")]
    show_list_menu: bool,
    #[serde(default, deserialize_with = "json::flag")]
    show_spam_menu: bool,
    #[serde(default, deserialize_with = "json::flag")]
    shared_global_address_list: bool,
    #[serde(default, deserialize_with = "json::flag")]
    calendar_public_availability: bool,
    #[serde(default)]
    throttle_settings: ThrottleSettings,
    #[serde(default, deserialize_with = "json::int")]
    max_size: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_domain_aliases: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_users: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_aliases: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_lists: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_message_size: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_recipients: i64,
    #[serde(default, deserialize_with = "json::int")]
    max_mailbox_size: i64,
    #[serde(default, deserialize_with = "json::flag")]
    require_smtp_authentication: bool,
    #[serde(default, deserialize_with = "json::text")]
    list_command_address: String,
    #[serde(default, deserialize_with = "json::text")]
    catch_all: String,
    #[serde(default, deserialize_with = "json::flag")]
    is_enabled: bool,
    #[serde(default, deserialize_with = "json::flag")]
    bypass_forward_black_list: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainDataResponse {
    domain_data: DomainData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainData {
    #[serde(default, deserialize_with = "json::int")]
    size_mb: i64,
}

#[derive(Deserialize)]
struct LicenseResponse {
    #[serde(default, deserialize_with = "json::text")]
    edition: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DomainAliasesResponse {
    #[serde(default)]
    domain_alias_data: Option<Vec<NamedEntry>>,
}

impl DomainSettings {
    fn into_domain(self, name: &str) -> MailDomain {
        MailDomain {
            name: name.to_string(),
            path: self.domain_path,
            enabled: self.is_enabled,
            size_mb: 0,
            catch_all_account: self.catch_all,
            show_domain_alias_menu: self.show_domain_alias_menu,
            show_list_menu: self.show_list_menu,
            show_spam_menu: self.show_spam_menu,
            global_address_list: self.shared_global_address_list,
            shared_calendars: self.calendar_public_availability,
            throttle: self.throttle_settings,
            max_domain_size_mb: bytes_to_mb(self.max_size),
            max_domain_aliases: self.max_domain_aliases,
            max_domain_users: self.max_users,
            max_aliases: self.max_aliases,
            max_lists: self.max_lists,
            max_message_size: self.max_message_size,
            max_recipients: self.max_recipients,
            max_mailbox_size_mb: bytes_to_mb(self.max_mailbox_size),
            require_smtp_authentication: self.require_smtp_authentication,
            list_command_address: self.list_command_address,
            bypass_forward_blacklist: self.bypass_forward_black_list,
            license: None,
        }
    }
}

impl SmarterMailClient {
    /// Whether `name` is a domain on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the transport level.
    pub async fn domain_exists(&self, name: &str) -> Result<bool> {
        self.exec_get(&format!("settings/sysadmin/domain-settings/{name}"))
            .await
            .map(|value| envelope::is_success(&value))
            .map_err(Error::context("Could not check whether mail domain exists"))
    }

    /// Names of all domains on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn domains(&self) -> Result<Vec<String>> {
        async {
            let value = self.exec_get("settings/sysadmin/domains").await?;
            let response: DomainListResponse = envelope::open(value)?;
            let names = response
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.name)
                .collect();
            Ok::<Vec<String>, Error>(names)
        }
        .await
        .map_err(Error::context("Could not get the list of mail domains"))
    }

    /// Fetch a domain's settings, usage, catch-all and license.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the calls fails or is not successful.
    pub async fn domain(&self, name: &str) -> Result<MailDomain> {
        self.fetch_domain(name)
            .await
            .map_err(Error::context("Could not get mail domain"))
    }

    async fn fetch_domain(&self, name: &str) -> Result<MailDomain> {
        let value = self
            .exec_get(&format!("settings/sysadmin/domain-settings/{name}"))
            .await?;
        let settings: DomainSettingsResponse = envelope::open(value)?;
        let mut domain = settings.domain_settings.into_domain(name);

        let value = self
            .exec_get(&format!("settings/sysadmin/domain/{name}"))
            .await?;
        let data: DomainDataResponse = envelope::open(value)?;
        domain.size_mb = data.domain_data.size_mb;

        if !domain.catch_all_account.is_empty() {
            let group_name = format!("{SYSTEM_CATCH_ALL}@{name}");
            if self.group_exists(&group_name).await? {
                let group = self.group(&group_name).await?;
                if let Some(first) = group.members.first() {
                    domain.catch_all_account = local_part(first).unwrap_or(first).to_string();
                }
            }
        }

        let value = self.exec_get("licensing/info").await?;
        let license: LicenseResponse = envelope::open(value)?;
        domain.license = LicenseEdition::from_code(&license.edition);

        debug!("Loaded domain {}", name);
        Ok(domain)
    }

    /// Create a domain with its system administrator.
    ///
    /// On failure the domain is deleted again if it was left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] with the rollback outcome.
    pub async fn create_domain(&self, domain: &MailDomain) -> Result<()> {
        match self.put_domain(domain).await {
            Ok(()) => {
                info!("Created mail domain {}", domain.name);
                Ok(())
            }
            Err(source) => {
                let compensation = compensate(
                    &domain.name,
                    self.domain_exists(&domain.name),
                    || self.delete_domain(&domain.name),
                )
                .await;
                Err(create_failed(
                    "Could not create mail domain",
                    source,
                    compensation,
                ))
            }
        }
    }

    async fn put_domain(&self, domain: &MailDomain) -> Result<()> {
        let body = json!({
            "domainData": {
                "name": domain.name,
                "path": self.config().mail_store_path(&domain.name),
                "hostname": domain.name,
                "isEnabled": domain.enabled,
                "userLimit": domain.max_domain_users,
                "domainAliasCount": domain.max_domain_aliases,
                "listLimit": domain.max_lists,
                "size": domain.max_domain_size_mb,
                "maxSize": domain.max_domain_size_mb,
                "sizeMb": domain.max_domain_size_mb,
            },
            "adminUsername": SYSTEM_DOMAIN_ADMIN,
            "adminPassword": format!("({})", uuid::Uuid::new_v4()),
        });

        let value = self
            .exec_post("settings/sysadmin/domain-put", &body)
            .await?;
        envelope::check(&value)
    }

    /// Delete a domain and its data.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn delete_domain(&self, name: &str) -> Result<()> {
        async {
            let value = self
                .exec_post(
                    &format!("settings/sysadmin/domain-delete/{name}/true"),
                    &json!({}),
                )
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not delete mail domain"))?;

        info!("Deleted mail domain {}", name);
        Ok(())
    }

    /// Write a domain's settings and limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn update_domain(&self, domain: &MailDomain) -> Result<()> {
        let throttle = &domain.throttle;
        let body = json!({
            "domainSettings": {
                "catchAll": domain.catch_all_account,
                "isEnabled": domain.enabled,
                "showDomainAliasMenu": domain.show_domain_alias_menu,
                "showListMenu": domain.show_list_menu,
                "showSpamMenu": domain.show_spam_menu,
                "sharedGlobalAddressList": domain.global_address_list,
                "calendarPublicAvailability": domain.shared_calendars,
                "maxMessages": throttle.messages_per_hour,
                "throttleSettings": throttle,
                "maxSize": mb_to_bytes(domain.max_domain_size_mb),
                "maxMailboxSize": mb_to_bytes(domain.max_mailbox_size_mb),
                "maxDomainAliases": domain.max_domain_aliases,
                "maxUsers": domain.max_domain_users,
                "maxAliases": domain.max_aliases,
                "maxMessageSize": domain.max_message_size,
                "maxRecipients": domain.max_recipients,
                "maxLists": domain.max_lists,
                "requireSmtpAuthentication": domain.require_smtp_authentication,
                "listCommandAddress": domain.list_command_address,
                "bypassForwardBlackList": domain.bypass_forward_blacklist,
            }
        });

        async {
            let value = self
                .exec_post(
                    &format!("settings/sysadmin/domain-settings/{}", domain.name),
                    &body,
                )
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not update mail domain"))?;

        info!("Updated mail domain {}", domain.name);
        Ok(())
    }

    /// Whether `alias` is an alias of `domain`. Case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias list cannot be read.
    pub async fn domain_alias_exists(&self, domain: &str, alias: &str) -> Result<bool> {
        self.domain_aliases(domain)
            .await
            .map(|aliases| aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)))
            .map_err(Error::context(
                "Could not check whether mail domain alias exists",
            ))
    }

    /// Alias names of `domain`, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn domain_aliases(&self, domain: &str) -> Result<Vec<String>> {
        async {
            let value = self
                .exec_domain_get("settings/domain/domain-aliases", domain)
                .await?;
            let response: DomainAliasesResponse = envelope::open(value)?;
            let aliases = response
                .domain_alias_data
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.name)
                .collect();
            Ok::<Vec<String>, Error>(aliases)
        }
        .await
        .map_err(Error::context("Could not get the list of mail domain aliases"))
    }

    /// Add `alias` as an alias domain of `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn add_domain_alias(&self, domain: &str, alias: &str) -> Result<()> {
        async {
            let value = self
                .exec_domain_post(
                    &format!("settings/domain/domain-alias-put/{alias}/false"),
                    domain,
                    &json!({}),
                )
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not add mail domain alias"))?;

        info!("Added domain alias {} to {}", alias, domain);
        Ok(())
    }

    /// Remove the alias domain `alias` from `domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn delete_domain_alias(&self, domain: &str, alias: &str) -> Result<()> {
        async {
            let value = self
                .exec_domain_post(
                    &format!("settings/domain/domain-alias-delete/{alias}"),
                    domain,
                    &json!({}),
                )
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not delete mail domain alias"))?;

        info!("Deleted domain alias {} from {}", alias, domain);
        Ok(())
    }
}
