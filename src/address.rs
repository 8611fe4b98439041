//! Email address and size helpers

use crate::error::{Error, Result};

/// Bytes in one megabyte, as SmarterMail counts them.
pub const MEGABYTE: i64 = 1_048_576;

/// The part before `@`.
pub fn local_part(address: &str) -> Result<&str> {
    address
        .split_once('@')
        .map(|(local, _)| local)
        .ok_or_else(|| Error::Address(address.to_string()))
}

/// The part after the first `@`.
pub fn domain_part(address: &str) -> Result<&str> {
    address
        .split_once('@')
        .map(|(_, domain)| domain)
        .ok_or_else(|| Error::Address(address.to_string()))
}

/// Whole megabytes in `bytes`, truncated toward zero.
#[must_use]
pub const fn bytes_to_mb(bytes: i64) -> i64 {
    bytes / MEGABYTE
}

#[must_use]
pub const fn mb_to_bytes(mb: i64) -> i64 {
    mb.saturating_mul(MEGABYTE)
}
