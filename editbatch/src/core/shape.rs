//! Structural predicates over untyped nested lists.
//!
//! Caller-supplied lists arrive as [`serde_json::Value`] so that malformed
//! shapes (a bare string where a list belongs, a third nesting level) are
//! representable. These checks return verdicts and never error; callers decide
//! whether a `false` is fatal.

use serde_json::Value;

/// True if `value` is an array that is empty or contains only (recursively)
/// vacuous arrays. Non-array input is never vacuous.
///
/// Traversal uses an explicit stack, so nesting depth is bounded only by
/// memory. `Value` is an owned tree and cannot contain cycles.
pub fn is_vacuous_nested_list(value: &Value) -> bool {
    if !value.is_array() {
        return false;
    }
    let mut pending = vec![value];
    while let Some(current) = pending.pop() {
        match current {
            Value::Array(items) => pending.extend(items.iter()),
            _ => return false,
        }
    }
    true
}

/// True if `value` is a list of lists whose elements are not lists.
pub fn is_nested_list_of_depth_two(value: &Value) -> bool {
    match value {
        Value::Array(sublists) => sublists.iter().all(is_flat_list),
        _ => false,
    }
}

/// True if `value` is a list with no list elements.
pub fn is_flat_list(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| !item.is_array()),
        _ => false,
    }
}

/// Check that the file groups are depth-two, the directory list is flat, and
/// every sublist can be assigned to a directory.
///
/// Element types and flag-length parity are not checked here (see
/// [`crate::core::lengths`]).
pub fn check_structural_consistency(
    group: &Value,
    second_group: Option<&Value>,
    flat_reference: &Value,
) -> bool {
    let Some(capacity) = flat_reference.as_array().map(Vec::len) else {
        return false;
    };
    if !is_flat_list(flat_reference) {
        return false;
    }
    let fits = |candidate: &Value| {
        is_nested_list_of_depth_two(candidate) && sublist_count(candidate) <= capacity
    };
    fits(group) && second_group.is_none_or(fits)
}

fn sublist_count(value: &Value) -> usize {
    value
        .as_array()
        .map(|items| items.iter().filter(|item| item.is_array()).count())
        .unwrap_or(0)
}

/// Typed counterpart of [`is_vacuous_nested_list`] for validated groups.
pub fn groups_are_vacuous<T>(groups: &[Vec<T>]) -> bool {
    groups.iter().all(Vec::is_empty)
}
