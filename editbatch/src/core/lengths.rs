//! Length and element-type parity between file groups and their flag lists.

use serde_json::Value;

/// Outcome of [`validate_lengths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthCheck {
    /// Leaves are strings, flags are booleans, and every flag list has one
    /// entry per leaf.
    Ok,
    /// A flag list length differs from the leaf count.
    LengthMismatch {
        expected: usize,
        flags: usize,
        second_flags: Option<usize>,
    },
    /// A leaf is not a string, a flag is not a boolean, or an input is not a
    /// list where one is required.
    TypeMismatch { detail: String },
}

impl LengthCheck {
    /// True when any problem was found.
    pub fn is_violation(&self) -> bool {
        !matches!(self, LengthCheck::Ok)
    }

    pub fn describe(&self) -> String {
        match self {
            LengthCheck::Ok => "ok".to_string(),
            LengthCheck::LengthMismatch {
                expected,
                flags,
                second_flags: Some(second),
            } => format!("expected {expected} flags per list, got {flags} and {second}"),
            LengthCheck::LengthMismatch {
                expected,
                flags,
                second_flags: None,
            } => format!("expected {expected} flags, got {flags}"),
            LengthCheck::TypeMismatch { detail } => detail.clone(),
        }
    }
}

/// Validate that `flags` (and `second_flags`, if given) carry exactly one
/// boolean per string leaf of the depth-two `nested`.
///
/// Checks run in a fixed order: leaf types, `flags` types, `second_flags`
/// types, then lengths.
pub fn validate_lengths(
    nested: &Value,
    flags: &Value,
    second_flags: Option<&Value>,
) -> LengthCheck {
    let leaves = match flatten_leaves(nested) {
        Ok(leaves) => leaves,
        Err(detail) => return LengthCheck::TypeMismatch { detail },
    };
    if let Some(position) = leaves.iter().position(|leaf| !leaf.is_string()) {
        return LengthCheck::TypeMismatch {
            detail: format!("file entry {position} is not a string: {}", leaves[position]),
        };
    }

    let flag_len = match boolean_list_len(flags, "flags") {
        Ok(len) => len,
        Err(detail) => return LengthCheck::TypeMismatch { detail },
    };

    let expected = leaves.len();
    match second_flags {
        Some(second) => {
            let second_len = match boolean_list_len(second, "second flags") {
                Ok(len) => len,
                Err(detail) => return LengthCheck::TypeMismatch { detail },
            };
            if flag_len != expected || second_len != expected {
                return LengthCheck::LengthMismatch {
                    expected,
                    flags: flag_len,
                    second_flags: Some(second_len),
                };
            }
        }
        None if flag_len != expected => {
            return LengthCheck::LengthMismatch {
                expected,
                flags: flag_len,
                second_flags: None,
            };
        }
        None => {}
    }
    LengthCheck::Ok
}

/// True if `value` is a list whose every element is a JSON boolean.
pub fn is_boolean_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_boolean))
}

fn flatten_leaves(nested: &Value) -> Result<Vec<&Value>, String> {
    let sublists = nested
        .as_array()
        .ok_or_else(|| format!("file groups must be a list, got {nested}"))?;
    let mut leaves = Vec::new();
    for (index, sublist) in sublists.iter().enumerate() {
        let items = sublist
            .as_array()
            .ok_or_else(|| format!("file group {index} must be a list, got {sublist}"))?;
        leaves.extend(items.iter());
    }
    Ok(leaves)
}

fn boolean_list_len(value: &Value, label: &str) -> Result<usize, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("{label} must be a list, got {value}"))?;
    if let Some(position) = items.iter().position(|item| !item.is_boolean()) {
        return Err(format!(
            "{label} entry {position} is not a boolean: {}",
            items[position]
        ));
    }
    Ok(items.len())
}
