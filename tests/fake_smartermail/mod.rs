//! Fake SmarterMail server for integration testing
//!
//! This module provides an in-process HTTP server that speaks enough of
//! the SmarterMail REST API to test `SmarterMailClient` end-to-end:
//!
//! TCP -> (TLS) -> hyper -> axum router -> request log and faults
//! -> token scope check -> handler
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, optional TLS, router and the middleware
//!   that logs requests and injects faults
//! - `handlers/` -- request/response types, token scope checks, and one
//!   file per endpoint family (auth, domains, ...)
//! - `state` -- test data model (domains, users, aliases, lists, builder)

#![allow(dead_code)]

mod handlers;

pub use handlers::Request;
pub use server::FakeSmarterMail;
pub use state::StateBuilder;
