//! JSON document edits addressed by dotted key paths.
//!
//! A key path such as `scripts.build` or `contributes.commands.0` walks
//! objects by key and arrays by index. Documents keep their key order.

use serde::Serialize;
use serde_json::{Map, Value};

/// One edit to a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JsonEdit {
    /// Set the value at `key_path`, creating intermediate objects.
    Set { key_path: String, value: Value },
    /// Add `items` to the array at `key_path` (skipping ones already
    /// present), or deep-merge an object into the object there.
    Merge { key_path: String, items: Value },
    /// Remove the key at `key_path`; missing keys are ignored.
    Remove { key_path: String },
}

/// Apply `edit` to `doc`.
pub fn apply(doc: &mut Value, edit: &JsonEdit) -> Result<(), String> {
    match edit {
        JsonEdit::Set { key_path, value } => {
            *slot(doc, &segments(key_path)?)? = value.clone();
            Ok(())
        }
        JsonEdit::Merge { key_path, items } => {
            let target = slot(doc, &segments(key_path)?)?;
            if target.is_null() {
                *target = if items.is_object() {
                    Value::Object(Map::new())
                } else {
                    Value::Array(Vec::new())
                };
            }
            if target.is_array() {
                append_unique(target, items);
                Ok(())
            } else if target.is_object() && items.is_object() {
                deep_merge(target, items);
                Ok(())
            } else {
                Err(format!(
                    "'{key_path}' is neither an array nor an object that can take these items"
                ))
            }
        }
        JsonEdit::Remove { key_path } => {
            let parts = segments(key_path)?;
            let (last, parents) = parts
                .split_last()
                .ok_or_else(|| "key path is empty".to_string())?;
            let mut current = doc;
            for part in parents {
                current = match current {
                    Value::Object(map) => match map.get_mut(*part) {
                        Some(next) => next,
                        None => return Ok(()),
                    },
                    Value::Array(items) => {
                        match part.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                            Some(next) => next,
                            None => return Ok(()),
                        }
                    }
                    _ => return Ok(()),
                };
            }
            match current {
                Value::Object(map) => {
                    map.shift_remove(*last);
                }
                Value::Array(items) => {
                    if let Some(i) = last.parse::<usize>().ok().filter(|i| *i < items.len()) {
                        items.remove(i);
                    }
                }
                _ => {}
            }
            Ok(())
        }
    }
}

/// Recursively merge `overlay` into `base`; overlay wins on scalar clashes.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let nested = match base.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                        true
                    }
                    _ => false,
                };
                if !nested {
                    base.insert(key.clone(), value.clone());
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Render a document the way it is written back to disk.
pub fn to_pretty(doc: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(doc)
        .map(|text| text + "\n")
        .map_err(|e| e.to_string())
}

fn segments(key_path: &str) -> Result<Vec<&str>, String> {
    let parts: Vec<&str> = key_path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(format!("invalid key path '{key_path}'"));
    }
    Ok(parts)
}

fn slot<'d>(doc: &'d mut Value, parts: &[&str]) -> Result<&'d mut Value, String> {
    let mut current = doc;
    for part in parts {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(part.to_string()).or_insert(Value::Null),
            Value::Array(items) => {
                let index: usize = part
                    .parse()
                    .map_err(|_| format!("'{part}' is not an array index"))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| format!("array index {index} is out of range"))?
            }
            other => return Err(format!("cannot descend into {other} at '{part}'")),
        };
    }
    Ok(current)
}

fn append_unique(target: &mut Value, items: &Value) {
    let Value::Array(existing) = target else {
        return;
    };
    let incoming: Vec<Value> = match items {
        Value::Array(items) => items.clone(),
        single => vec![single.clone()],
    };
    for item in incoming {
        if !existing.contains(&item) {
            existing.push(item);
        }
    }
}
