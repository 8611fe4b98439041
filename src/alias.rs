//! Mail aliases
//!
//! SmarterMail has a single alias resource with a list of targets. An
//! alias with exactly one target is exposed as [`MailAlias`]; one with
//! several is a [`crate::MailGroup`]. The shared calls live here.

use crate::address::{domain_part, local_part};
use crate::client::{SmarterMailClient, compensate, create_failed};
use crate::envelope;
use crate::error::{Error, Result};
use crate::json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// An address that forwards to one other address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailAlias {
    /// Full email address.
    pub name: String,
    pub forward_to: String,
}

// -- wire types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AliasGridResponse {
    #[serde(default)]
    grid_info: Option<Vec<GridEntry>>,
}

#[derive(Deserialize)]
pub(crate) struct GridEntry {
    #[serde(deserialize_with = "json::text")]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "json::strings")]
    pub(crate) targets: Vec<String>,
}

#[derive(Deserialize)]
struct AliasResponse {
    alias: AliasRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AliasRecord {
    #[serde(default, deserialize_with = "json::strings")]
    pub(crate) alias_target_list: Vec<String>,
    #[serde(default, deserialize_with = "json::flag")]
    pub(crate) enable_for_xmpp: bool,
}

impl SmarterMailClient {
    /// Grid of aliases matching `filter` in the domain of `domain`.
    /// An empty filter lists all of them.
    pub(crate) async fn alias_grid(&self, domain: &str, filter: &str) -> Result<Vec<GridEntry>> {
        let value = self
            .exec_domain_get(&format!("settings/domain/aliases/{filter}"), domain)
            .await?;
        let response: AliasGridResponse = envelope::open(value)?;
        Ok(response.grid_info.unwrap_or_default())
    }

    /// Whether an alias resource named after the local part of `name`
    /// exists, whatever its target count.
    pub(crate) async fn alias_resource_exists(&self, name: &str) -> Result<bool> {
        let local = local_part(name)?;
        let grid = self.alias_grid(domain_part(name)?, local).await?;
        Ok(grid.iter().any(|entry| entry.name == local))
    }

    pub(crate) async fn alias_record(&self, name: &str) -> Result<AliasRecord> {
        let value = self
            .exec_domain_get(
                &format!("settings/domain/alias/{}", local_part(name)?),
                domain_part(name)?,
            )
            .await?;
        Ok(envelope::open::<AliasResponse>(value)?.alias)
    }

    pub(crate) async fn put_alias_resource(&self, name: &str, targets: &[String]) -> Result<()> {
        let body = json!({
            "alias": {
                "name": local_part(name)?,
                "aliasTargetList": targets,
            }
        });
        let value = self
            .exec_domain_post("settings/domain/alias-put", domain_part(name)?, &body)
            .await?;
        envelope::check(&value)
    }

    /// Replace the targets, keeping the XMPP setting the alias has now.
    pub(crate) async fn post_alias_resource(&self, name: &str, targets: &[String]) -> Result<()> {
        let current = self.alias_record(name).await?;
        let body = json!({
            "alias": {
                "name": local_part(name)?,
                "aliasTargetList": targets,
                "enableForXmpp": current.enable_for_xmpp,
            }
        });
        let value = self
            .exec_domain_post("settings/domain/alias", domain_part(name)?, &body)
            .await?;
        envelope::check(&value)
    }

    pub(crate) async fn delete_alias_resource(&self, name: &str) -> Result<()> {
        let value = self
            .exec_domain_post(
                &format!("settings/domain/alias-delete/{}", local_part(name)?),
                domain_part(name)?,
                &json!({}),
            )
            .await?;
        envelope::check(&value)
    }

    /// Whether the alias `name` exists. The local part is compared
    /// case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias list cannot be read.
    pub async fn alias_exists(&self, name: &str) -> Result<bool> {
        self.alias_resource_exists(name)
            .await
            .map_err(Error::context("Could not check whether mail alias exists"))
    }

    /// Single-target aliases of `domain`, as full addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn aliases(&self, domain: &str) -> Result<Vec<MailAlias>> {
        async {
            let grid = self.alias_grid(domain, "").await?;
            Ok::<_, Error>(
                grid.into_iter()
                    .filter(|entry| entry.targets.len() == 1)
                    .map(|mut entry| MailAlias {
                        name: format!("{}@{domain}", entry.name),
                        forward_to: entry.targets.swap_remove(0),
                    })
                    .collect(),
            )
        }
        .await
        .map_err(Error::context("Could not get the list of mail aliases"))
    }

    /// Read the alias `name`. `forward_to` is the first target, or
    /// empty when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn alias(&self, name: &str) -> Result<MailAlias> {
        let record = self
            .alias_record(name)
            .await
            .map_err(Error::context("Could not get mail alias"))?;

        Ok(MailAlias {
            name: name.to_string(),
            forward_to: record
                .alias_target_list
                .into_iter()
                .next()
                .unwrap_or_default(),
        })
    }

    /// Create the alias. On failure it is deleted again if it was
    /// left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] with the rollback outcome.
    pub async fn create_alias(&self, alias: &MailAlias) -> Result<()> {
        let targets = [alias.forward_to.clone()];
        match self.put_alias_resource(&alias.name, &targets).await {
            Ok(()) => {
                info!("Created mail alias {}", alias.name);
                Ok(())
            }
            Err(source) => {
                let compensation = compensate(
                    &alias.name,
                    self.alias_resource_exists(&alias.name),
                    || self.delete_alias_resource(&alias.name),
                )
                .await;
                Err(create_failed("Could not create mail alias", source, compensation))
            }
        }
    }

    /// Point the alias at a new target.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn update_alias(&self, alias: &MailAlias) -> Result<()> {
        let targets = [alias.forward_to.clone()];
        self.post_alias_resource(&alias.name, &targets)
            .await
            .map_err(Error::context("Could not update mail alias"))?;

        info!("Updated mail alias {}", alias.name);
        Ok(())
    }

    /// Delete the alias `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn delete_alias(&self, name: &str) -> Result<()> {
        self.delete_alias_resource(name)
            .await
            .map_err(Error::context("Could not delete mail alias"))?;

        info!("Deleted mail alias {}", name);
        Ok(())
    }
}
