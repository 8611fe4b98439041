//! Mailbox endpoints across all three scopes.
//!
//! The sysadmin reads users, the domain administrator creates, updates
//! and deletes them, and the impersonated mailbox reads and writes its
//! own mail settings, forwarding, auto-responder and signatures.

use super::super::state::{Signature, State, User};
use super::{Response, fail, flag, int, ok, strings, text};
use serde_json::{Value, json};

pub fn get(state: &State, body: &Value) -> Response {
    let email = text(body, "email");
    let Some(user) = state.user(&email) else {
        return fail("User not found");
    };
    ok(json!({
        "userData": {
            "userName": user.email,
            "fullName": user.full_name,
            "maxMailboxSize": user.max_mailbox_size,
            "passwordLocked": user.password_locked,
            "securityFlags": {
                "isDisabled": user.is_disabled,
                "isDomainAdmin": user.is_domain_admin,
            },
        }
    }))
}

pub fn list(state: &State, domain: &str) -> Response {
    let Some(domain) = state.domains.get(domain) else {
        return fail("Domain not found");
    };
    let users: Vec<Value> = domain
        .users
        .values()
        .map(|user| {
            json!({
                "emailAddress": user.email,
                "currentMailboxSize": user.current_size,
                "securityFlags": { "isDomainAdmin": user.is_domain_admin },
            })
        })
        .collect();
    ok(json!({ "userData": users }))
}

pub fn create(state: &mut State, domain: &str, body: &Value) -> Response {
    let data = &body["userData"];
    let email = text(data, "userName");
    let Some((local, user_domain)) = email.split_once('@') else {
        return fail("Invalid user name");
    };
    if user_domain != domain {
        return fail("User does not belong to this domain");
    }
    let Some(target) = state.domains.get_mut(domain) else {
        return fail("Domain not found");
    };
    if target.users.contains_key(local) {
        return fail("User already exists");
    }

    let mail = &body["userMailSettings"];
    let contact = &mail["userContactInfo"];
    let forward = &body["forwardList"];
    let user = User {
        email: email.clone(),
        password: text(data, "password"),
        full_name: text(data, "fullName"),
        max_mailbox_size: int(data, "maxMailboxSize"),
        is_disabled: !flag(mail, "isEnabled"),
        first_name: text(contact, "firstName"),
        last_name: text(contact, "lastName"),
        reply_to: text(mail, "replyToAddress"),
        forwarding_enabled: flag(mail, "enableMailForwarding"),
        forward_list: strings(&forward["forwardList"]),
        delete_on_forward: flag(forward, "deleteOnForward"),
        ..User::default()
    };
    target.users.insert(local.to_string(), user);
    ok(json!({}))
}

pub fn delete(state: &mut State, domain: &str, local: &str) -> Response {
    let Some(target) = state.domains.get_mut(domain) else {
        return fail("Domain not found");
    };
    match target.users.remove(local) {
        Some(_) => ok(json!({})),
        None => fail("User not found"),
    }
}

fn domain_user<'a>(state: &'a mut State, domain: &str, body: &Value) -> Option<&'a mut User> {
    let email = text(body, "email");
    if email.split_once('@').map(|(_, d)| d) != Some(domain) {
        return None;
    }
    state.user_mut(&email)
}

/// Only the fields present in `userData` are changed.
pub fn update(state: &mut State, domain: &str, body: &Value) -> Response {
    let Some(user) = domain_user(state, domain, body) else {
        return fail("User not found");
    };
    let data = &body["userData"];
    if let Some(password) = data.get("password").and_then(Value::as_str) {
        user.password = password.to_string();
    }
    if let Some(full_name) = data.get("fullName").and_then(Value::as_str) {
        user.full_name = full_name.to_string();
    }
    if let Some(size) = data.get("maxMailboxSize").and_then(Value::as_i64) {
        user.max_mailbox_size = size;
    }
    ok(json!({}))
}

pub fn update_mail(state: &mut State, domain: &str, body: &Value) -> Response {
    let Some(user) = domain_user(state, domain, body) else {
        return fail("User not found");
    };
    let mail = &body["userMailSettings"];
    let contact = &mail["userContactInfo"];
    user.first_name = text(contact, "firstName");
    user.last_name = text(contact, "lastName");
    user.reply_to = text(mail, "replyToAddress");
    user.forwarding_enabled = flag(mail, "enableMailForwarding");
    user.is_disabled = !flag(mail, "isEnabled");
    ok(json!({}))
}

pub fn mail_settings(state: &State, email: &str) -> Response {
    let Some(user) = state.user(email) else {
        return fail("User not found");
    };
    ok(json!({
        "userMailSettings": {
            "userContactInfo": {
                "firstName": user.first_name,
                "lastName": user.last_name,
            },
            "replyToAddress": user.reply_to,
            "enableMailForwarding": user.forwarding_enabled,
            "isEnabled": !user.is_disabled,
        }
    }))
}

pub fn signatures(state: &State, email: &str) -> Response {
    let Some(user) = state.user(email) else {
        return fail("User not found");
    };
    let signatures: Vec<Value> = user
        .signatures
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "guid": s.guid,
                "name": s.name,
                "text": s.text,
                "isDefault": s.is_default,
            })
        })
        .collect();
    ok(json!({ "userSignatures": signatures }))
}

pub fn forward_list(state: &State, email: &str) -> Response {
    let Some(user) = state.user(email) else {
        return fail("User not found");
    };
    ok(json!({
        "mailboxForwardList": {
            "forwardList": user.forward_list,
            "deleteOnForward": user.delete_on_forward,
        }
    }))
}

pub fn set_forward_list(state: &mut State, email: &str, body: &Value) -> Response {
    let Some(user) = state.user_mut(email) else {
        return fail("User not found");
    };
    let forward = &body["mailboxForwardList"];
    user.forward_list = strings(&forward["forwardList"]);
    user.delete_on_forward = flag(forward, "deleteOnForward");
    ok(json!({}))
}

pub fn auto_responder(state: &State, email: &str) -> Response {
    let Some(user) = state.user(email) else {
        return fail("User not found");
    };
    ok(json!({
        "autoResponderSettings": {
            "enabled": user.responder_enabled,
            "subject": user.responder_subject,
            "body": user.responder_body,
        }
    }))
}

pub fn set_auto_responder(state: &mut State, email: &str, body: &Value) -> Response {
    let Some(user) = state.user_mut(email) else {
        return fail("User not found");
    };
    let settings = &body["autoResponderSettings"];
    user.responder_enabled = flag(settings, "enabled");
    user.responder_subject = text(settings, "subject");
    user.responder_body = text(settings, "body");
    ok(json!({}))
}

pub fn create_signature(state: &mut State, email: &str, body: &Value) -> Response {
    let next = state.next_id();
    let Some(user) = state.user_mut(email) else {
        return fail("User not found");
    };
    let config = &body["signatureConfig"];
    let is_default = flag(config, "isDefault");
    if is_default {
        for signature in &mut user.signatures {
            signature.is_default = false;
        }
    }

    let guid = format!("sig-{next}");
    user.signatures.push(Signature {
        id: i64::try_from(next).unwrap_or_default(),
        guid: guid.clone(),
        name: text(config, "name"),
        text: text(config, "text"),
        is_default,
    });
    ok(json!({ "signatureGuid": guid }))
}

pub fn update_signature(state: &mut State, email: &str, body: &Value) -> Response {
    let Some(user) = state.user_mut(email) else {
        return fail("User not found");
    };
    let config = &body["signatureConfig"];
    let guid = text(config, "guid");
    let Some(signature) = user.signatures.iter_mut().find(|s| s.guid == guid) else {
        return fail("Signature not found");
    };
    signature.name = text(config, "name");
    signature.text = text(config, "text");
    signature.is_default = flag(config, "isDefault");
    ok(json!({}))
}

pub fn map_signature(state: &mut State, email: &str, body: &Value) -> Response {
    let Some(user) = state.user_mut(email) else {
        return fail("User not found");
    };
    if let Some(maps) = body["signatureMaps"].as_array() {
        user.signature_maps.extend(maps.iter().cloned());
    }
    ok(json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_smartermail::state::StateBuilder;

    #[test]
    fn create_rejects_foreign_domain() {
        let mut state = StateBuilder::new()
            .domain("example.com")
            .domain("other.com")
            .build();
        let response = create(
            &mut state,
            "example.com",
            &json!({ "userData": { "userName": "ada@other.com" } }),
        );
        assert_eq!(response.body["success"], false);
    }

    #[test]
    fn new_default_signature_replaces_old_default() {
        let mut state = StateBuilder::new()
            .domain("example.com")
            .user("ada@example.com", "pw")
            .signature("ada@example.com", "g1", "adaSig001", "old")
            .build();
        create_signature(
            &mut state,
            "ada@example.com",
            &json!({ "signatureConfig": { "name": "n", "text": "new", "isDefault": true } }),
        );

        let user = state.user("ada@example.com").unwrap();
        let defaults: Vec<_> = user.signatures.iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].text, "new");
    }
}
