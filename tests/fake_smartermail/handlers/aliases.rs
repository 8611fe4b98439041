//! Alias endpoints (domain scope).
//!
//! The grid search matches names by case-insensitive substring, the
//! way the web interface's search box does, so callers have to filter
//! for exact names themselves.

use super::super::state::{Alias, State};
use super::{Response, fail, flag, ok, strings, text};
use serde_json::{Value, json};

pub fn grid(state: &State, domain: &str, filter: &str) -> Response {
    let Some(domain) = state.domains.get(domain) else {
        return fail("Domain not found");
    };
    let filter = filter.to_lowercase();
    let entries: Vec<Value> = domain
        .aliases
        .iter()
        .filter(|(name, _)| name.to_lowercase().contains(&filter))
        .map(|(name, alias)| json!({ "name": name, "targets": alias.targets }))
        .collect();
    ok(json!({ "gridInfo": entries }))
}

pub fn get(state: &State, domain: &str, name: &str) -> Response {
    let Some(alias) = state
        .domains
        .get(domain)
        .and_then(|d| d.aliases.get(name))
    else {
        return fail("Alias not found");
    };
    ok(json!({
        "alias": {
            "name": name,
            "aliasTargetList": alias.targets,
            "enableForXmpp": alias.enable_for_xmpp,
        }
    }))
}

pub fn create(state: &mut State, domain: &str, body: &Value) -> Response {
    let Some(target) = state.domains.get_mut(domain) else {
        return fail("Domain not found");
    };
    let alias = &body["alias"];
    let name = text(alias, "name");
    let targets = strings(&alias["aliasTargetList"]);
    if name.is_empty() || targets.iter().all(String::is_empty) {
        return fail("Alias name and at least one target are required");
    }
    if target.aliases.contains_key(&name) {
        return fail("Alias already exists");
    }
    target.aliases.insert(
        name,
        Alias {
            targets,
            enable_for_xmpp: false,
        },
    );
    ok(json!({}))
}

pub fn update(state: &mut State, domain: &str, body: &Value) -> Response {
    let alias = &body["alias"];
    let name = text(alias, "name");
    let Some(existing) = state
        .domains
        .get_mut(domain)
        .and_then(|d| d.aliases.get_mut(&name))
    else {
        return fail("Alias not found");
    };
    existing.targets = strings(&alias["aliasTargetList"]);
    existing.enable_for_xmpp = flag(alias, "enableForXmpp");
    ok(json!({}))
}

pub fn delete(state: &mut State, domain: &str, name: &str) -> Response {
    match state
        .domains
        .get_mut(domain)
        .and_then(|d| d.aliases.remove(name))
    {
        Some(_) => ok(json!({})),
        None => fail("Alias not found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_smartermail::state::StateBuilder;

    #[test]
    fn grid_filters_by_substring() {
        let state = StateBuilder::new()
            .domain("example.com")
            .alias("sales@example.com", &["a@example.com"])
            .alias("presales@example.com", &["b@example.com"])
            .alias("info@example.com", &["c@example.com"])
            .build();
        let response = grid(&state, "example.com", "sales");
        assert_eq!(response.body["gridInfo"].as_array().unwrap().len(), 2);

        let response = grid(&state, "example.com", "");
        assert_eq!(response.body["gridInfo"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn create_requires_a_target() {
        let mut state = StateBuilder::new().domain("example.com").build();
        let response = create(
            &mut state,
            "example.com",
            &json!({ "alias": { "name": "x", "aliasTargetList": [""] } }),
        );
        assert_eq!(response.body["success"], false);
    }
}
