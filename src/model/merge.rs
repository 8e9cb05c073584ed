//! Merge and matching rules for model state.

use serde_json::{Map, Value};

/// Recursive right-biased merge.
///
/// Objects are merged key by key; keys absent from `patch` keep their
/// current value. Anything else (arrays, scalars, `null`) is replaced.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, incoming) in patch {
            match target.get_mut(key) {
                Some(existing) if existing.is_object() && incoming.is_object() => {
                    deep_merge(existing, incoming)
                }
                _ => {
                    target.insert(key.clone(), incoming.clone());
                }
            }
        }
        return;
    }
    *target = patch.clone();
}

/// Overwrites the top-level keys listed in `patch`.
pub fn shallow_merge(target: &mut Value, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, incoming) in patch {
            target.insert(key.clone(), incoming.clone());
        }
        return;
    }
    *target = patch.clone();
}

pub fn merge(target: &mut Value, patch: &Value, deep: bool) {
    if deep {
        deep_merge(target, patch)
    } else {
        shallow_merge(target, patch)
    }
}

/// Splits a payload into a batch: arrays are batches, anything else is one item.
pub fn batch(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    }
}

/// Whether `item` is selected by `matcher`.
///
/// A scalar matcher is compared with the item's key. An object matcher that
/// carries the key field matches on the key alone; otherwise every field it
/// supplies must be equal. An empty object matches nothing.
pub fn matches(item: &Value, matcher: &Value, key: Option<&str>) -> bool {
    match matcher {
        Value::Object(fields) => {
            if let Some(expected) = key.and_then(|k| fields.get(k).map(|v| (k, v))) {
                return item.get(expected.0) == Some(expected.1);
            }
            !fields.is_empty() && fields.iter().all(|(k, v)| item.get(k) == Some(v))
        }
        scalar => match key {
            Some(key) => item.get(key) == Some(scalar),
            None => item == scalar,
        },
    }
}

fn same_key(a: &Value, b: &Value, key: Option<&str>) -> bool {
    match key.and_then(|k| b.get(k).map(|id| (k, id))) {
        Some((k, id)) => a.get(k) == Some(id),
        None => a == b,
    }
}

/// Inserts `items` into `list`.
///
/// The batch keeps its order; with `prepend` the whole batch goes before the
/// existing items. With `unique`, items whose key is already present in the
/// list or earlier in the batch are dropped (whole-value comparison when
/// there is no key).
pub fn add_items(
    list: &mut Vec<Value>,
    items: Vec<Value>,
    key: Option<&str>,
    prepend: bool,
    unique: bool,
) {
    let mut accepted: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if unique {
            let duplicate = list
                .iter()
                .chain(accepted.iter())
                .any(|existing| same_key(existing, &item, key));
            if duplicate {
                continue;
            }
        }
        accepted.push(item);
    }

    if prepend {
        list.splice(0..0, accepted);
    } else {
        list.extend(accepted);
    }
}

/// Merges each partial into the items sharing its key. Partials without a
/// key or without a matching item are dropped.
pub fn patch_items(list: &mut [Value], partials: &[&Value], key: &str, deep: bool) {
    for partial in partials {
        let Some(id) = partial.get(key) else {
            continue;
        };
        for item in list.iter_mut().filter(|item| item.get(key) == Some(id)) {
            merge(item, partial, deep);
        }
    }
}

/// Removes every item selected by any matcher.
pub fn remove_items(list: &mut Vec<Value>, matchers: &[&Value], key: Option<&str>) {
    list.retain(|item| !matchers.iter().any(|matcher| matches(item, matcher, key)));
}

/// Runs `f` on the array held in `state`, replacing a non-array with `[]`.
pub fn with_list(state: &mut Value, f: impl FnOnce(&mut Vec<Value>)) {
    let mut items = match std::mem::take(state) {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    f(&mut items);
    *state = Value::Array(items);
}

/// Runs `f` on the bucket `group` of a grouped state. Missing buckets are
/// created only when `create` is set; otherwise `f` is not called.
pub fn with_bucket(state: &mut Value, group: &str, create: bool, f: impl FnOnce(&mut Vec<Value>)) {
    let mut groups = match std::mem::take(state) {
        Value::Object(groups) => groups,
        _ => Map::new(),
    };
    match groups.get_mut(group) {
        Some(bucket) => with_list(bucket, f),
        None if create => {
            let mut items = Vec::new();
            f(&mut items);
            groups.insert(group.to_string(), Value::Array(items));
        }
        None => {}
    }
    *state = Value::Object(groups);
}
