//! Mailing list endpoints (domain scope).
//!
//! Lists are stored with the fields the client posted, so a value
//! written by `add` or `{id}/settings` comes back unchanged from
//! `mailing-lists/list`.

use super::super::state::{List, State};
use super::{Response, fail, int, not_found, ok, strings, text};
use serde_json::{Value, json};

pub fn index(state: &State, domain: &str) -> Response {
    let Some(domain) = state.domains.get(domain) else {
        return fail("Domain not found");
    };
    let items: Vec<Value> = domain.lists.iter().map(List::item).collect();
    ok(json!({ "items": items }))
}

pub fn create(state: &mut State, domain: &str, body: &Value) -> Response {
    let address = text(body, "listAddress");
    let Value::Object(fields) = body.clone() else {
        return fail("Invalid list");
    };
    let id = i64::try_from(state.next_id()).unwrap_or_default();
    let Some(target) = state.domains.get_mut(domain) else {
        return fail("Domain not found");
    };
    if address.is_empty() {
        return fail("List address is required");
    }
    if target
        .lists
        .iter()
        .any(|l| l.address().eq_ignore_ascii_case(&address))
    {
        return fail("List already exists");
    }

    let list = List {
        id,
        created_on: "2024-05-01T09:30:00".into(),
        fields,
        subscribers: Vec::new(),
    };
    let item = list.item();
    target.lists.push(list);
    ok(json!({ "item": item }))
}

pub fn action(state: &mut State, domain: &str, id: &str, action: &str, body: &Value) -> Response {
    let Ok(id) = id.parse::<i64>() else {
        return not_found();
    };
    let Some(target) = state.domains.get_mut(domain) else {
        return fail("Domain not found");
    };
    let Some(index) = target.lists.iter().position(|l| l.id == id) else {
        return fail("List not found");
    };

    if action == "delete" {
        target.lists.remove(index);
        return ok(json!({}));
    }

    let list = &mut target.lists[index];
    match action {
        "subscriber-add" => {
            for address in strings(body) {
                if !list.subscribers.contains(&address) {
                    list.subscribers.push(address);
                }
            }
            ok(json!({}))
        }
        "subscriber-remove" => {
            let remove = strings(body);
            list.subscribers.retain(|s| !remove.contains(s));
            ok(json!({}))
        }
        "subscriber-search" => {
            let take = usize::try_from(int(body, "take")).unwrap_or_default();
            let items: Vec<Value> = list
                .subscribers
                .iter()
                .take(take)
                .map(|s| json!({ "emailAddress": s }))
                .collect();
            ok(json!({ "items": items }))
        }
        "settings" => {
            let Value::Object(update) = body else {
                return fail("Invalid settings");
            };
            for (key, value) in update {
                list.fields.insert(key.clone(), value.clone());
            }
            ok(json!({}))
        }
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_smartermail::state::StateBuilder;

    #[test]
    fn search_honours_take() {
        let mut state = StateBuilder::new()
            .domain("example.com")
            .list("news@example.com", &["a@x.com", "b@x.com", "c@x.com"])
            .build();
        let id = state.domains["example.com"].lists[0].id.to_string();

        let response = action(
            &mut state,
            "example.com",
            &id,
            "subscriber-search",
            &json!({ "take": 2 }),
        );
        assert_eq!(response.body["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn item_reports_subscriber_count() {
        let state = StateBuilder::new()
            .domain("example.com")
            .list("news@example.com", &["a@x.com"])
            .build();
        let response = index(&state, "example.com");
        assert_eq!(response.body["items"][0]["listSubscriberCount"], 1);
        assert_eq!(response.body["items"][0]["listAddress"], "news");
    }
}
