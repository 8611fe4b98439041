//! Mailing lists
//!
//! Lists are addressed by their numeric id on the server, so every
//! operation by name first looks the list up in the domain's list
//! index. Subscribers are managed through separate search, add and
//! remove calls.

use crate::address::{domain_part, local_part};
use crate::client::{SmarterMailClient, compensate, create_failed};
use crate::envelope;
use crate::error::{Error, Result};
use crate::json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// Who may post to a list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PostingMode {
    AnyoneCanPost,
    MembersCanPost,
    #[default]
    ModeratorCanPost,
}

impl PostingMode {
    /// The `postingPermissions` value the server uses.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::AnyoneCanPost => 0,
            Self::MembersCanPost => 1,
            Self::ModeratorCanPost => 2,
        }
    }

    /// Unknown codes fall back to moderator-only posting.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::AnyoneCanPost,
            1 => Self::MembersCanPost,
            _ => Self::ModeratorCanPost,
        }
    }
}

/// A mailing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailList {
    /// Full list address.
    pub name: String,
    /// Server id. Read-only.
    pub id: i64,
    /// Read-only.
    pub created: Option<DateTime<Utc>>,
    pub description: String,
    pub enabled: bool,
    pub moderator_address: String,
    pub password: String,
    pub require_password: bool,
    pub posting_mode: PostingMode,
    pub subject_prefix: String,
    pub enable_subject_prefix: bool,
    pub list_to_address: String,
    pub list_from_address: String,
    pub list_reply_to_address: String,
    pub digest_mode: bool,
    pub send_subscribe: bool,
    pub send_unsubscribe: bool,
    pub members: Vec<String>,
}

impl Default for MailList {
    fn default() -> Self {
        Self {
            name: String::new(),
            id: 0,
            created: None,
            description: String::new(),
            enabled: true,
            moderator_address: String::new(),
            password: String::new(),
            require_password: false,
            posting_mode: PostingMode::default(),
            subject_prefix: String::new(),
            enable_subject_prefix: false,
            list_to_address: String::new(),
            list_from_address: String::new(),
            list_reply_to_address: String::new(),
            digest_mode: false,
            send_subscribe: false,
            send_unsubscribe: false,
            members: Vec::new(),
        }
    }
}

// -- wire types --

#[derive(Deserialize)]
struct ListIndexResponse {
    #[serde(default)]
    items: Option<Vec<ListItem>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    #[serde(deserialize_with = "json::int")]
    id: i64,
    #[serde(default, deserialize_with = "json::timestamp")]
    created_on: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "json::text")]
    description: String,
    #[serde(default, deserialize_with = "json::flag")]
    disabled: bool,
    #[serde(default, deserialize_with = "json::text")]
    moderator_address: String,
    #[serde(default, deserialize_with = "json::text")]
    password: String,
    #[serde(default, deserialize_with = "json::flag")]
    require_password: bool,
    #[serde(default, deserialize_with = "json::int")]
    posting_permissions: i64,
    #[serde(default, deserialize_with = "json::text")]
    subject: String,
    #[serde(default, deserialize_with = "json::flag")]
    prepend_subject: bool,
    #[serde(deserialize_with = "json::text")]
    list_address: String,
    #[serde(default, deserialize_with = "json::text")]
    list_to_address: String,
    #[serde(default, deserialize_with = "json::text")]
    list_from_address: String,
    #[serde(default, deserialize_with = "json::text")]
    list_reply_to_address: String,
    #[serde(default, deserialize_with = "json::int")]
    list_subscriber_count: i64,
    #[serde(default, deserialize_with = "json::flag")]
    enable_digest: bool,
    #[serde(default, deserialize_with = "json::flag")]
    send_subscribe_email: bool,
    #[serde(default, deserialize_with = "json::flag")]
    send_unsubscribe_email: bool,
}

impl ListItem {
    fn matches(&self, local: &str) -> bool {
        self.list_address.eq_ignore_ascii_case(local)
    }

    fn into_list(self, domain: &str, members: Vec<String>) -> MailList {
        MailList {
            name: format!("{}@{domain}", self.list_address),
            id: self.id,
            created: self.created_on,
            description: self.description,
            enabled: !self.disabled,
            moderator_address: self.moderator_address,
            password: self.password,
            require_password: self.require_password,
            posting_mode: PostingMode::from_code(self.posting_permissions),
            subject_prefix: self.subject,
            enable_subject_prefix: self.prepend_subject,
            list_to_address: self.list_to_address,
            list_from_address: self.list_from_address,
            list_reply_to_address: self.list_reply_to_address,
            digest_mode: self.enable_digest,
            send_subscribe: self.send_subscribe_email,
            send_unsubscribe: self.send_unsubscribe_email,
            members,
        }
    }
}

#[derive(Deserialize)]
struct ListAddResponse {
    item: ListAddItem,
}

#[derive(Deserialize)]
struct ListAddItem {
    #[serde(deserialize_with = "json::int")]
    id: i64,
}

#[derive(Deserialize)]
struct SubscriberSearchResponse {
    #[serde(default)]
    items: Option<Vec<Subscriber>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Subscriber {
    #[serde(deserialize_with = "json::text")]
    email_address: String,
}

fn not_found(name: &str) -> Error {
    Error::NotFound(format!("mailing list {name}"))
}

fn list_path(id: i64, action: &str) -> String {
    format!("settings/domain/mailing-lists/{id}/{action}")
}

impl SmarterMailClient {
    async fn list_index(&self, domain: &str) -> Result<Vec<ListItem>> {
        let value = self
            .exec_domain_get("settings/domain/mailing-lists/list", domain)
            .await?;
        let response: ListIndexResponse = envelope::open(value)?;
        Ok(response.items.unwrap_or_default())
    }

    /// The index entry of the list `name`, if there is one.
    async fn find_list(&self, name: &str) -> Result<Option<ListItem>> {
        let local = local_part(name)?;
        let index = self.list_index(domain_part(name)?).await?;
        Ok(index.into_iter().find(|item| item.matches(local)))
    }

    async fn subscribers(&self, domain: &str, id: i64, count: i64) -> Result<Vec<String>> {
        if count <= 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "skip": 0,
            "take": count,
            "search": "",
            "subscriberType": "Subscriber",
            "sortField": "emailaddress",
        });
        let value = self
            .exec_domain_post(&list_path(id, "subscriber-search"), domain, &body)
            .await?;
        let response: SubscriberSearchResponse = envelope::open(value)?;
        Ok(response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.email_address)
            .collect())
    }

    async fn add_subscribers(&self, domain: &str, id: i64, members: &[String]) -> Result<()> {
        let value = self
            .exec_domain_post(&list_path(id, "subscriber-add"), domain, members)
            .await?;
        envelope::check(&value)
    }

    async fn load_list(&self, domain: &str, item: ListItem) -> Result<MailList> {
        let members = self
            .subscribers(domain, item.id, item.list_subscriber_count)
            .await?;
        Ok(item.into_list(domain, members))
    }

    /// Whether the list `name` exists. Case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the list index cannot be read.
    pub async fn list_exists(&self, name: &str) -> Result<bool> {
        self.find_list(name)
            .await
            .map(|item| item.is_some())
            .map_err(Error::context("Could not check whether mailing list exists"))
    }

    /// Create a list and subscribe its members.
    ///
    /// On failure the list is deleted again if it was left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] with the rollback outcome.
    pub async fn create_list(&self, list: &MailList) -> Result<()> {
        match self.put_list(list).await {
            Ok(()) => {
                info!("Created mailing list {}", list.name);
                Ok(())
            }
            Err(source) => {
                let compensation = compensate(
                    &list.name,
                    self.list_exists(&list.name),
                    || self.delete_list(&list.name),
                )
                .await;
                Err(create_failed(
                    "Could not create mailing list",
                    source,
                    compensation,
                ))
            }
        }
    }

    async fn put_list(&self, list: &MailList) -> Result<()> {
        let domain = domain_part(&list.name)?;
        let body = json!({
            "listAddress": local_part(&list.name)?,
            "moderatorAddress": list.moderator_address,
            "description": list.description,
            "password": list.password,
            "requirePassword": list.require_password,
            "postingPermissions": list.posting_mode.code(),
            "subject": list.subject_prefix,
            "prependSubject": list.enable_subject_prefix,
            "listToAddress": list.list_to_address,
            "listFromAddress": list.list_from_address,
            "listReplyToAddress": list.list_reply_to_address,
            "enableDigest": list.digest_mode,
            "sendSubscribeEmail": list.send_subscribe,
            "sendUnsubscribeEmail": list.send_unsubscribe,
        });

        let value = self
            .exec_domain_post("settings/domain/mailing-lists/add", domain, &body)
            .await?;
        let created: ListAddResponse = envelope::open(value)?;
        debug!("Mailing list {} has id {}", list.name, created.item.id);

        if !list.members.is_empty() {
            self.add_subscribers(domain, created.item.id, &list.members)
                .await?;
        }
        Ok(())
    }

    /// Read the list `name` with its subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] (wrapped) if there is no such list,
    /// or an error if a request fails or is not successful.
    pub async fn list(&self, name: &str) -> Result<MailList> {
        async {
            let Some(item) = self.find_list(name).await? else {
                return Err(not_found(name));
            };
            self.load_list(domain_part(name)?, item).await
        }
        .await
        .map_err(Error::context("Could not get mailing list"))
    }

    /// All lists of `domain` with their subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails or is not successful.
    pub async fn lists(&self, domain: &str) -> Result<Vec<MailList>> {
        async {
            let mut lists = Vec::new();
            for item in self.list_index(domain).await? {
                lists.push(self.load_list(domain, item).await?);
            }
            Ok::<_, Error>(lists)
        }
        .await
        .map_err(Error::context("Could not get the list of mailing lists"))
    }

    /// Delete the list `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] (wrapped) if there is no such list,
    /// or an error if a request fails or is not successful.
    pub async fn delete_list(&self, name: &str) -> Result<()> {
        async {
            let Some(item) = self.find_list(name).await? else {
                return Err(not_found(name));
            };
            let value = self
                .exec_domain_post(&list_path(item.id, "delete"), domain_part(name)?, &json!({}))
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not delete mailing list"))?;

        info!("Deleted mailing list {}", name);
        Ok(())
    }

    /// Write a list's settings and replace its subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] (wrapped) if there is no such list,
    /// or an error if a request fails or is not successful.
    pub async fn update_list(&self, list: &MailList) -> Result<()> {
        self.write_list(list)
            .await
            .map_err(Error::context("Could not update mailing list"))?;

        info!("Updated mailing list {}", list.name);
        Ok(())
    }

    async fn write_list(&self, list: &MailList) -> Result<()> {
        let domain = domain_part(&list.name)?;
        let Some(item) = self.find_list(&list.name).await? else {
            return Err(not_found(&list.name));
        };

        let body = json!({
            "description": list.description,
            "listAddress": local_part(&list.name)?,
            "moderatorAddress": list.moderator_address,
            "postingPermissions": list.posting_mode.code(),
            "enableDigest": list.digest_mode,
            "subject": list.subject_prefix,
            "prependSubject": list.enable_subject_prefix,
            "requirePassword": list.require_password,
            "password": list.password,
            "disabled": !list.enabled,
            "sendSubscribeEmail": list.send_subscribe,
            "sendUnsubscribeEmail": list.send_unsubscribe,
            "listToAddress": list.list_to_address,
            "listFromAddress": list.list_from_address,
            "listReplyToAddress": list.list_reply_to_address,
        });
        let value = self
            .exec_domain_post(&list_path(item.id, "settings"), domain, &body)
            .await?;
        envelope::check(&value)?;

        let current = self
            .subscribers(domain, item.id, item.list_subscriber_count)
            .await?;
        if !current.is_empty() {
            let value = self
                .exec_domain_post(&list_path(item.id, "subscriber-remove"), domain, &current)
                .await?;
            envelope::check(&value)?;
        }

        if !list.members.is_empty() {
            self.add_subscribers(domain, item.id, &list.members).await?;
        }
        Ok(())
    }
}
