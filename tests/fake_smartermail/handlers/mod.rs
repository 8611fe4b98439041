//! Request routing for the fake SmarterMail server.
//!
//! Paths are matched on their segments. Each endpoint family checks the
//! bearer token the way the real server does: sysadmin for
//! `settings/sysadmin/*`, the impersonated domain administrator for
//! `settings/domain/*`, and an impersonated mailbox for the remaining
//! `settings/*` endpoints. A token of the wrong scope gets a 401.

mod aliases;
mod lists;
mod users;

use super::state::State;
use axum::Json;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use serde_json::{Value, json};

/// A recorded API request. The path is relative to `/api/v1/`.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Bearer token, if one was sent.
    pub token: Option<String>,
    /// JSON body; `Null` when there was none.
    pub body: Value,
}

impl Request {
    /// Record the request head and its buffered body.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Self {
        let path = parts.uri.path();
        Self {
            method: parts.method.as_str().to_string(),
            path: path.strip_prefix("/api/v1/").unwrap_or(path).to_string(),
            token: parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string),
            body: serde_json::from_slice(body).unwrap_or(Value::Null),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Who a bearer token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Sysadmin,
    Domain(String),
    User(String),
}

/// Tokens look like `sysadmin-N`, `domain:<name>:N` or
/// `user:<email>:N`. Unknown tokens are anonymous.
pub fn caller(state: &State, token: Option<&str>) -> Caller {
    let Some(token) = token.filter(|t| state.tokens.contains(*t)) else {
        return Caller::Anonymous;
    };
    if token.starts_with("sysadmin-") {
        return Caller::Sysadmin;
    }
    let mut parts = token.split(':');
    match (parts.next(), parts.next()) {
        (Some("domain"), Some(domain)) => Caller::Domain(domain.to_string()),
        (Some("user"), Some(email)) => Caller::User(email.to_string()),
        _ => Caller::Anonymous,
    }
}

/// Handle one request against `state`.
///
/// Logging and fault injection happen in the server middleware before
/// this runs.
pub fn dispatch(state: &mut State, request: &Request) -> Response {
    let caller = caller(state, request.token.as_deref());
    let segments: Vec<&str> = request.path.split('/').collect();
    let method = request.method.as_str();
    let body = &request.body;

    match segments.as_slice() {
        ["auth", "authenticate-user"] if method == "POST" => auth::authenticate(state, body),
        ["licensing", "info"] if method == "GET" => {
            if caller != Caller::Sysadmin {
                return unauthorized();
            }
            domains::license(state)
        }
        ["settings", "sysadmin", rest @ ..] => {
            if caller != Caller::Sysadmin {
                return unauthorized();
            }
            sysadmin(state, method, rest, body)
        }
        ["settings", "domain", "impersonate-user"] if method == "POST" => {
            if caller != Caller::Sysadmin {
                return unauthorized();
            }
            auth::impersonate_user(state, body)
        }
        ["settings", "domain", rest @ ..] => {
            let Caller::Domain(domain) = caller else {
                return unauthorized();
            };
            domain_admin(state, &domain, method, rest, body)
        }
        ["settings", rest @ ..] => {
            let Caller::User(email) = caller else {
                return unauthorized();
            };
            mailbox(state, &email, method, rest, body)
        }
        _ => not_found(),
    }
}

fn sysadmin(state: &mut State, method: &str, rest: &[&str], body: &Value) -> Response {
    match (method, rest) {
        ("POST", ["manage-domain", domain]) => auth::impersonate_domain(state, domain),
        ("GET", ["domains"]) => domains::list(state),
        ("GET", ["domain-settings", domain]) => domains::settings(state, domain),
        ("POST", ["domain-settings", domain]) => domains::update_settings(state, domain, body),
        ("GET", ["domain", domain]) => domains::data(state, domain),
        ("POST", ["domain-put"]) => domains::create(state, body),
        ("POST", ["domain-delete", domain, _]) => domains::delete(state, domain),
        ("POST", ["get-user"]) => users::get(state, body),
        ("GET", ["list-users", domain]) => users::list(state, domain),
        _ => not_found(),
    }
}

fn domain_admin(
    state: &mut State,
    domain: &str,
    method: &str,
    rest: &[&str],
    body: &Value,
) -> Response {
    match (method, rest) {
        ("GET", ["domain-aliases"]) => domains::aliases(state, domain),
        ("POST", ["domain-alias-put", alias, _]) => domains::add_alias(state, domain, alias),
        ("POST", ["domain-alias-delete", alias]) => domains::delete_alias(state, domain, alias),
        ("POST", ["user-put"]) => users::create(state, domain, body),
        ("POST", ["user-delete", local]) => users::delete(state, domain, local),
        ("POST", ["post-user"]) => users::update(state, domain, body),
        ("POST", ["post-user-mail"]) => users::update_mail(state, domain, body),
        ("GET", ["aliases", filter]) => aliases::grid(state, domain, filter),
        ("GET", ["alias", name]) => aliases::get(state, domain, name),
        ("POST", ["alias-put"]) => aliases::create(state, domain, body),
        ("POST", ["alias"]) => aliases::update(state, domain, body),
        ("POST", ["alias-delete", name]) => aliases::delete(state, domain, name),
        ("GET", ["mailing-lists", "list"]) => lists::index(state, domain),
        ("POST", ["mailing-lists", "add"]) => lists::create(state, domain, body),
        ("POST", ["mailing-lists", id, action]) => lists::action(state, domain, id, action, body),
        _ => not_found(),
    }
}

fn mailbox(state: &mut State, email: &str, method: &str, rest: &[&str], body: &Value) -> Response {
    match (method, rest) {
        ("GET", ["user-mail"]) => users::mail_settings(state, email),
        ("GET", ["emails-signatures"]) => users::signatures(state, email),
        ("GET", ["mailbox-forward-list"]) => users::forward_list(state, email),
        ("POST", ["mailbox-forward-list"]) => users::set_forward_list(state, email, body),
        ("GET", ["auto-responder"]) => users::auto_responder(state, email),
        ("POST", ["auto-responder"]) => users::set_auto_responder(state, email, body),
        ("POST", ["user-signature-put"]) => users::create_signature(state, email, body),
        ("POST", ["user-signature"]) => users::update_signature(state, email, body),
        ("POST", ["signature-mappings"]) => users::map_signature(state, email, body),
        _ => not_found(),
    }
}

/// Successful envelope around `payload`'s fields.
fn ok(payload: Value) -> Response {
    let mut body = match payload {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    body.insert("success".into(), Value::Bool(true));
    Response::new(200, Value::Object(body))
}

pub fn fail(message: &str) -> Response {
    Response::new(200, json!({ "success": false, "message": message }))
}

fn unauthorized() -> Response {
    Response::new(401, json!({ "message": "Unauthorized" }))
}

fn not_found() -> Response {
    Response::new(404, json!({ "message": "Not found" }))
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn int(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or_default()
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_smartermail::state::StateBuilder;

    fn request(method: &str, path: &str, token: Option<&str>, body: Value) -> Request {
        Request {
            method: method.into(),
            path: path.into(),
            token: token.map(str::to_string),
            body,
        }
    }

    fn login(state: &mut State) -> String {
        let response = dispatch(
            state,
            &request(
                "POST",
                "auth/authenticate-user",
                None,
                json!({"username": "admin", "password": "secret"}),
            ),
        );
        response.body["accessToken"].as_str().unwrap().to_string()
    }

    #[test]
    fn sysadmin_paths_reject_anonymous() {
        let mut state = StateBuilder::new().domain("example.com").build();
        let response = dispatch(
            &mut state,
            &request("GET", "settings/sysadmin/domains", None, Value::Null),
        );
        assert_eq!(response.status, 401);
    }

    #[test]
    fn sysadmin_token_lists_domains() {
        let mut state = StateBuilder::new().domain("example.com").build();
        let token = login(&mut state);
        let response = dispatch(
            &mut state,
            &request("GET", "settings/sysadmin/domains", Some(&token), Value::Null),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body["data"][0]["name"], "example.com");
    }

    #[test]
    fn domain_paths_reject_sysadmin_token() {
        let mut state = StateBuilder::new().domain("example.com").build();
        let token = login(&mut state);
        let response = dispatch(
            &mut state,
            &request("GET", "settings/domain/domain-aliases", Some(&token), Value::Null),
        );
        assert_eq!(response.status, 401);
    }

    #[test]
    fn caller_parses_scoped_tokens() {
        let mut state = StateBuilder::new().build();
        let domain = state.issue("domain:example.com:");
        let user = state.issue("user:ada@example.com:");
        assert_eq!(
            caller(&state, Some(&domain)),
            Caller::Domain("example.com".into())
        );
        assert_eq!(
            caller(&state, Some(&user)),
            Caller::User("ada@example.com".into())
        );
        assert_eq!(caller(&state, Some("forged")), Caller::Anonymous);
    }
}
