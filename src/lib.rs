//! SmarterMail provisioning client library
//!
//! Drives a [SmarterMail](https://www.smartertools.com/smartermail)
//! server through its REST API: domains and domain aliases, mailboxes,
//! aliases, groups and mailing lists. Every call authenticates on its
//! own, as the system administrator, as a domain administrator via
//! impersonation, or as a single mailbox.
//!
//! Start with [`ProviderConfig::from_env`] and
//! [`SmarterMailClient::new`]; the entity operations are async methods
//! on the client.

mod account;
mod address;
mod alias;
mod auth;
mod client;
mod command;
mod config;
mod connection;
mod domain;
mod envelope;
mod error;
mod group;
mod json;
mod list;

pub use account::MailAccount;
pub use address::{MEGABYTE, bytes_to_mb, domain_part, local_part, mb_to_bytes};
pub use alias::MailAlias;
pub use auth::{AccessToken, TokenScope};
pub use client::SmarterMailClient;
pub use config::ProviderConfig;
pub use domain::{
    LicenseEdition, MailDomain, SYSTEM_CATCH_ALL, SYSTEM_DOMAIN_ADMIN, ThrottleSettings,
};
pub use error::{Compensation, Error, Result};
pub use group::MailGroup;
pub use list::{MailList, PostingMode};
