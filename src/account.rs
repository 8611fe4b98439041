//! Mailboxes
//!
//! A mailbox spans several SmarterMail resources: the user record
//! (sysadmin and domain scope), its mail settings, forward list,
//! auto-responder and signatures (user scope). Reads and writes touch
//! each of them in turn.

use crate::address::{bytes_to_mb, domain_part, local_part, mb_to_bytes};
use crate::client::{SmarterMailClient, compensate, create_failed};
use crate::envelope;
use crate::error::{Error, Result};
use crate::json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// A mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailAccount {
    /// Full email address.
    pub name: String,
    /// Write-only. Used on create, and on update when
    /// `change_password` is set.
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub change_password: bool,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    /// Read-only.
    pub is_domain_admin: bool,
    /// Read-only.
    pub password_locked: bool,
    pub max_mailbox_size_mb: i64,
    /// Current usage in bytes, filled in by `accounts`. Read-only.
    pub size_bytes: i64,
    pub reply_to: String,
    pub forwarding_enabled: bool,
    pub forwarding_addresses: Vec<String>,
    pub delete_on_forward: bool,
    pub responder_enabled: bool,
    pub responder_subject: String,
    pub responder_message: String,
    /// Text of the default signature.
    pub signature: Option<String>,
    pub signature_guid: Option<String>,
    pub signature_name: Option<String>,
    pub signature_id: Option<i64>,
}

impl MailAccount {
    /// "First Last", as shown in the address book.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    fn default_signature_name(&self) -> Result<String> {
        Ok(format!("{}Sig001", local_part(&self.name)?))
    }
}

// -- wire types --

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SecurityFlags {
    #[serde(deserialize_with = "json::flag")]
    is_disabled: bool,
    #[serde(deserialize_with = "json::flag")]
    is_domain_admin: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserListResponse {
    #[serde(default)]
    user_data: Option<Vec<UserSummary>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSummary {
    #[serde(deserialize_with = "json::text")]
    email_address: String,
    #[serde(default, deserialize_with = "json::int")]
    current_mailbox_size: i64,
    #[serde(default)]
    security_flags: SecurityFlags,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    user_data: UserData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserData {
    #[serde(default)]
    security_flags: SecurityFlags,
    #[serde(default, deserialize_with = "json::int")]
    max_mailbox_size: i64,
    #[serde(default, deserialize_with = "json::flag")]
    password_locked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserMailResponse {
    user_mail_settings: UserMailSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserMailSettings {
    #[serde(default)]
    user_contact_info: ContactInfo,
    #[serde(default, deserialize_with = "json::text")]
    reply_to_address: String,
    #[serde(default, deserialize_with = "json::flag")]
    enable_mail_forwarding: bool,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ContactInfo {
    #[serde(deserialize_with = "json::text")]
    first_name: String,
    #[serde(deserialize_with = "json::text")]
    last_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignaturesResponse {
    #[serde(default)]
    user_signatures: Option<Vec<Signature>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Signature {
    #[serde(default, deserialize_with = "json::flag")]
    is_default: bool,
    #[serde(default, deserialize_with = "json::text")]
    text: String,
    #[serde(default, deserialize_with = "json::text")]
    guid: String,
    #[serde(default, deserialize_with = "json::text")]
    name: String,
    #[serde(default, deserialize_with = "json::int")]
    id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForwardListResponse {
    mailbox_forward_list: ForwardList,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForwardList {
    #[serde(default, deserialize_with = "json::strings")]
    forward_list: Vec<String>,
    #[serde(default, deserialize_with = "json::flag")]
    delete_on_forward: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoResponderResponse {
    auto_responder_settings: AutoResponder,
}

#[derive(Deserialize)]
struct AutoResponder {
    #[serde(default, deserialize_with = "json::flag")]
    enabled: bool,
    #[serde(default, deserialize_with = "json::text")]
    subject: String,
    #[serde(default, deserialize_with = "json::text")]
    body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignaturePutResponse {
    #[serde(deserialize_with = "json::text")]
    signature_guid: String,
}

fn auto_responder_body(account: &MailAccount) -> serde_json::Value {
    json!({
        "autoResponderSettings": {
            "enabled": account.responder_enabled,
            "subject": account.responder_subject,
            "body": account.responder_message,
            "externalReply": account.responder_message,
        }
    })
}

impl SmarterMailClient {
    /// Whether the mailbox `email` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails at the transport level.
    pub async fn account_exists(&self, email: &str) -> Result<bool> {
        self.exec_post("settings/sysadmin/get-user", &json!({ "email": email }))
            .await
            .map(|value| envelope::is_success(&value))
            .map_err(Error::context("Could not check whether mailbox exists"))
    }

    /// Mailboxes of `domain` with their current size.
    ///
    /// Domain administrators are skipped unless
    /// `import_domain_admins` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn accounts(&self, domain: &str) -> Result<Vec<MailAccount>> {
        async {
            let value = self
                .exec_get(&format!("settings/sysadmin/list-users/{domain}"))
                .await?;
            let response: UserListResponse = envelope::open(value)?;
            let import_admins = self.config().import_domain_admins;

            Ok::<_, Error>(
                response
                    .user_data
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|user| import_admins || !user.security_flags.is_domain_admin)
                    .map(|user| MailAccount {
                        name: user.email_address,
                        size_bytes: user.current_mailbox_size,
                        is_domain_admin: user.security_flags.is_domain_admin,
                        ..MailAccount::default()
                    })
                    .collect(),
            )
        }
        .await
        .map_err(Error::context("Could not get the list of domain mailboxes"))
    }

    /// Create a mailbox with its auto-responder and signature.
    ///
    /// On failure the mailbox is deleted again if it was left behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] with the rollback outcome.
    pub async fn create_account(&self, account: &MailAccount) -> Result<()> {
        match self.put_account(account).await {
            Ok(()) => {
                info!("Created mailbox {}", account.name);
                Ok(())
            }
            Err(source) => {
                let compensation = compensate(
                    &account.name,
                    self.account_exists(&account.name),
                    || self.delete_account(&account.name),
                )
                .await;
                Err(create_failed("Could not create mailbox", source, compensation))
            }
        }
    }

    async fn put_account(&self, account: &MailAccount) -> Result<()> {
        let domain = domain_part(&account.name)?;

        let body = json!({
            "userData": {
                "domain": domain,
                "userName": account.name,
                "fullName": account.display_name(),
                "password": account.password,
                "maxMailboxSize": mb_to_bytes(account.max_mailbox_size_mb),
            },
            "userMailSettings": {
                "userContactInfo": {
                    "firstName": account.first_name,
                    "lastName": account.last_name,
                    "displayAs": account.display_name(),
                },
                "replyToAddress": account.reply_to,
                "signature": account.signature,
                "isEnabled": account.enabled,
                "enableMailForwarding": account.forwarding_enabled,
            },
            "forwardList": {
                "forwardList": account.forwarding_addresses,
                "deleteOnForward": account.delete_on_forward,
            },
        });
        let value = self
            .exec_domain_post("settings/domain/user-put", domain, &body)
            .await?;
        envelope::check(&value)?;

        let value = self
            .exec_user_post(
                "settings/auto-responder",
                &account.name,
                &auto_responder_body(account),
            )
            .await?;
        envelope::check(&value)?;

        if let Some(text) = &account.signature {
            self.create_signature(account, &account.default_signature_name()?, text)
                .await?;
        }

        Ok(())
    }

    /// Add a default signature and map it to the mailbox.
    async fn create_signature(&self, account: &MailAccount, name: &str, text: &str) -> Result<()> {
        let body = json!({
            "signatureConfig": {
                "name": name,
                "text": text,
                "isDefault": true,
            }
        });
        let value = self
            .exec_user_post("settings/user-signature-put", &account.name, &body)
            .await?;
        let created: SignaturePutResponse = envelope::open(value)?;

        let body = json!({
            "signatureMaps": [{
                "allowUsersToOverride": true,
                "key": account.name,
                "mapOption": "2",
                "signatureGuid": created.signature_guid,
                "type": "4",
            }]
        });
        let value = self
            .exec_user_post("settings/signature-mappings", &account.name, &body)
            .await?;
        envelope::check(&value)?;

        debug!("Created signature {} for {}", name, account.name);
        Ok(())
    }

    /// Read a mailbox with its settings, forwarding, auto-responder
    /// and default signature.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the calls fails or is not successful.
    pub async fn account(&self, email: &str) -> Result<MailAccount> {
        self.fetch_account(email)
            .await
            .map_err(Error::context("Could not get mailbox"))
    }

    async fn fetch_account(&self, email: &str) -> Result<MailAccount> {
        let value = self
            .exec_post("settings/sysadmin/get-user", &json!({ "email": email }))
            .await?;
        let user = envelope::open::<UserResponse>(value)?.user_data;

        let value = self.exec_user_get("settings/user-mail", email).await?;
        let mail = envelope::open::<UserMailResponse>(value)?.user_mail_settings;

        let mut account = MailAccount {
            name: email.to_string(),
            first_name: mail.user_contact_info.first_name,
            last_name: mail.user_contact_info.last_name,
            enabled: !user.security_flags.is_disabled,
            is_domain_admin: user.security_flags.is_domain_admin,
            password_locked: user.password_locked,
            max_mailbox_size_mb: bytes_to_mb(user.max_mailbox_size),
            reply_to: mail.reply_to_address,
            forwarding_enabled: mail.enable_mail_forwarding,
            ..MailAccount::default()
        };

        let value = self
            .exec_user_get("settings/emails-signatures", email)
            .await?;
        let signatures: SignaturesResponse = envelope::open(value)?;
        if let Some(default) = signatures
            .user_signatures
            .unwrap_or_default()
            .into_iter()
            .rev()
            .find(|s| s.is_default)
        {
            account.signature = Some(default.text);
            account.signature_guid = Some(default.guid);
            account.signature_name = Some(default.name);
            account.signature_id = Some(default.id);
        }

        let value = self
            .exec_user_get("settings/mailbox-forward-list", email)
            .await?;
        let forward = envelope::open::<ForwardListResponse>(value)?.mailbox_forward_list;
        account.forwarding_addresses = forward.forward_list;
        account.delete_on_forward = forward.delete_on_forward;

        let value = self.exec_user_get("settings/auto-responder", email).await?;
        let responder = envelope::open::<AutoResponderResponse>(value)?.auto_responder_settings;
        account.responder_enabled = responder.enabled;
        account.responder_subject = responder.subject;
        account.responder_message = responder.body;

        Ok(account)
    }

    /// Delete the mailbox `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is not successful.
    pub async fn delete_account(&self, email: &str) -> Result<()> {
        async {
            let value = self
                .exec_domain_post(
                    &format!("settings/domain/user-delete/{}", local_part(email)?),
                    domain_part(email)?,
                    &json!({}),
                )
                .await?;
            envelope::check(&value)
        }
        .await
        .map_err(Error::context("Could not delete mailbox"))?;

        info!("Deleted mailbox {}", email);
        Ok(())
    }

    /// Write a mailbox's password, settings, quota, forwarding,
    /// auto-responder and signature.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the calls fails or is not successful.
    /// Calls already made are not undone.
    pub async fn update_account(&self, account: &MailAccount) -> Result<()> {
        self.write_account(account)
            .await
            .map_err(Error::context("Could not update mailbox"))?;

        info!("Updated mailbox {}", account.name);
        Ok(())
    }

    async fn write_account(&self, account: &MailAccount) -> Result<()> {
        let current = self.fetch_account(&account.name).await?;
        let domain = domain_part(&account.name)?;

        if account.change_password {
            let body = json!({
                "email": account.name,
                "userData": { "password": account.password },
            });
            let value = self
                .exec_domain_post("settings/domain/post-user", domain, &body)
                .await?;
            envelope::check(&value)?;
        }

        let body = json!({
            "email": account.name,
            "userMailSettings": {
                "userContactInfo": {
                    "firstName": account.first_name,
                    "lastName": account.last_name,
                    "displayAs": account.display_name(),
                },
                "isEnabled": account.enabled,
                "enableMailForwarding": account.forwarding_enabled,
                "replyToAddress": account.reply_to,
            },
        });
        let value = self
            .exec_domain_post("settings/domain/post-user-mail", domain, &body)
            .await?;
        envelope::check(&value)?;

        let body = json!({
            "email": account.name,
            "userData": {
                "fullName": account.display_name(),
                "maxMailboxSize": mb_to_bytes(account.max_mailbox_size_mb),
            },
        });
        let value = self
            .exec_domain_post("settings/domain/post-user", domain, &body)
            .await?;
        envelope::check(&value)?;

        let body = json!({
            "mailboxForwardList": {
                "forwardList": account.forwarding_addresses,
                "deleteOnForward": account.delete_on_forward,
            }
        });
        let value = self
            .exec_user_post("settings/mailbox-forward-list", &account.name, &body)
            .await?;
        envelope::check(&value)?;

        let value = self
            .exec_user_post(
                "settings/auto-responder",
                &account.name,
                &auto_responder_body(account),
            )
            .await?;
        envelope::check(&value)?;

        if let Some(text) = &account.signature {
            match (&current.signature_guid, &current.signature_name) {
                (Some(guid), Some(name)) => {
                    let body = json!({
                        "signatureConfig": {
                            "id": current.signature_id,
                            "guid": guid,
                            "name": name,
                            "text": text,
                            "isDefault": true,
                        }
                    });
                    let value = self
                        .exec_user_post("settings/user-signature", &account.name, &body)
                        .await?;
                    envelope::check(&value)?;
                }
                _ => {
                    let name = match &current.signature_name {
                        Some(name) => name.clone(),
                        None => account.default_signature_name()?,
                    };
                    self.create_signature(account, &name, text).await?;
                }
            }
        }

        Ok(())
    }
}
