use serde_json::{Map, Value};

/// Recursively merges `update` into `base`, skipping `null` values so a
/// customization can never erase a default.
pub(crate) fn merge_non_null_json_value(update: Value, base: &mut Value) {
    match (update, base) {
        (Value::Null, _) => {}
        (Value::Object(update), Value::Object(base)) => {
            for (key, value) in update {
                match base.get_mut(&key) {
                    Some(existing) => merge_non_null_json_value(value, existing),
                    None => {
                        if !value.is_null() {
                            base.insert(key, value);
                        }
                    }
                }
            }
        }
        (update, base) => *base = update,
    }
}

/// Returns the parts of `update` that differ from `current`, as a sparse object.
pub(crate) fn json_difference(current: Value, update: &Value) -> Value {
    match (current, update) {
        (Value::Object(current), Value::Object(update)) => {
            let mut diff = Map::new();
            let mut current = current;
            for (key, new_value) in update {
                match current.remove(key) {
                    Some(old_value) if old_value == *new_value => {}
                    Some(old_value @ Value::Object(_)) if new_value.is_object() => {
                        let nested = json_difference(old_value, new_value);
                        if nested.as_object().is_some_and(|m| !m.is_empty()) {
                            diff.insert(key.clone(), nested);
                        }
                    }
                    _ => {
                        diff.insert(key.clone(), new_value.clone());
                    }
                }
            }
            Value::Object(diff)
        }
        (current, update) if current == *update => Value::Object(Map::new()),
        (_, update) => update.clone(),
    }
}
