//! JSON merge helpers for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base.
///
/// Objects merge key by key. Arrays whose entries are all objects carrying an
/// `id` merge entry by entry on that id, appending new ids; any other array
/// or scalar is replaced by the overlay.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(overlay_items))
            if is_keyed_list(base_items) && is_keyed_list(overlay_items) =>
        {
            for item in overlay_items {
                let id = item.get("id");
                match base_items.iter_mut().find(|existing| existing.get("id") == id) {
                    Some(existing) => merge_json_values(existing, item),
                    None => base_items.push(item.clone()),
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

fn is_keyed_list(items: &[Value]) -> bool {
    items
        .iter()
        .all(|item| item.get("id").and_then(Value::as_str).is_some())
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn agents_merge_by_id() {
        let mut base = json!({
            "agents": [
                { "id": "weather", "model": "gpt-4o", "instructions": "weather" },
                { "id": "email", "model": "gpt-4o" },
            ],
            "polling": { "interval_ms": 1000 },
        });
        let overlay = json!({
            "agents": [
                { "id": "weather", "model": "gpt-4o-mini" },
                { "id": "tickets" },
            ],
            "polling": { "max_attempts": 5 },
        });

        merge_json_values(&mut base, &overlay);

        assert_eq!(
            base,
            json!({
                "agents": [
                    { "id": "weather", "model": "gpt-4o-mini", "instructions": "weather" },
                    { "id": "email", "model": "gpt-4o" },
                    { "id": "tickets" },
                ],
                "polling": { "interval_ms": 1000, "max_attempts": 5 },
            })
        );
    }

    #[test]
    fn plain_arrays_are_replaced() {
        let mut base = json!({ "conversation": { "exit_commands": ["exit", "quit"] } });
        merge_json_values(
            &mut base,
            &json!({ "conversation": { "exit_commands": ["stop"] } }),
        );
        assert_eq!(base, json!({ "conversation": { "exit_commands": ["stop"] } }));
    }
}
