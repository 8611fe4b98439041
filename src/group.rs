//! Mail groups: aliases with several targets

use crate::client::{SmarterMailClient, compensate, create_failed};
use crate::error::{Error, Result};
use serde::Serialize;
use tracing::info;

/// An address that fans out to several members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailGroup {
    /// Full email address.
    pub name: String,
    pub members: Vec<String>,
    /// Groups cannot be disabled; always true when read.
    pub enabled: bool,
}

impl Default for MailGroup {
    fn default() -> Self {
        Self {
            name: String::new(),
            members: Vec::new(),
            enabled: true,
        }
    }
}

impl SmarterMailClient {
    /// Whether the group `name` exists. The local part is compared
    /// case-sensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias list cannot be read.
    pub async fn group_exists(&self, name: &str) -> Result<bool> {
        self.alias_resource_exists(name)
            .await
            .map_err(Error::context("Could not check whether mail group exists"))
    }

    /// Groups of `domain` with their members.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn groups(&self, domain: &str) -> Result<Vec<MailGroup>> {
        async {
            let grid = self.alias_grid(domain, "").await?;
            Ok::<_, Error>(
                grid.into_iter()
                    .filter(|entry| entry.targets.len() > 1)
                    .map(|entry| MailGroup {
                        name: format!("{}@{domain}", entry.name),
                        members: entry.targets,
                        enabled: true,
                    })
                    .collect(),
            )
        }
        .await
        .map_err(Error::context("Could not get the list of mail groups"))
    }

    /// Read the group `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn group(&self, name: &str) -> Result<MailGroup> {
        let record = self
            .alias_record(name)
            .await
            .map_err(Error::context("Could not get mail group"))?;

        Ok(MailGroup {
            name: name.to_string(),
            members: record.alias_target_list,
            enabled: true,
        })
    }

    /// Create the group. On failure it is deleted again if it was
    /// left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] with the rollback outcome.
    pub async fn create_group(&self, group: &MailGroup) -> Result<()> {
        match self.put_alias_resource(&group.name, &group.members).await {
            Ok(()) => {
                info!("Created mail group {}", group.name);
                Ok(())
            }
            Err(source) => {
                let compensation = compensate(
                    &group.name,
                    self.alias_resource_exists(&group.name),
                    || self.delete_alias_resource(&group.name),
                )
                .await;
                Err(create_failed("Could not create mail group", source, compensation))
            }
        }
    }

    /// Replace the group's members.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn update_group(&self, group: &MailGroup) -> Result<()> {
        self.post_alias_resource(&group.name, &group.members)
            .await
            .map_err(Error::context("Could not update mail group"))?;

        info!("Updated mail group {}", group.name);
        Ok(())
    }

    /// Delete the group `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn delete_group(&self, name: &str) -> Result<()> {
        self.delete_alias_resource(name)
            .await
            .map_err(Error::context("Could not delete mail group"))?;

        info!("Deleted mail group {}", name);
        Ok(())
    }
}
