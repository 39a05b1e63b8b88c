//! Built-in validation rules.
//!
//! These cover the common cases; anything else is a plain closure passed to
//! [`crate::Schema::validator`].

use std::collections::HashSet;

use serde_json::Value;

use super::Failure;

/// Fails with `required` when the value is null or a blank string.
pub fn required(value: &Value) -> Option<Failure> {
    let empty = match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    empty.then(|| Failure::new("required"))
}

/// Fails with `emailFormat` unless the value is a structurally plausible
/// email address: one `@` with a dotted domain after it.
///
/// Null and empty values pass; combine with [`required`] for non-empty.
pub fn email_format(value: &Value) -> Option<Failure> {
    let s = match value {
        Value::Null => return None,
        Value::String(s) => s,
        _ => return Some(Failure::new("emailFormat")),
    };
    if s.is_empty() {
        return None;
    }

    let plausible = match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    (!plausible).then(|| Failure::new("emailFormat"))
}

/// Builds a rule failing with `code` when the value is one of `values`.
///
/// The returned closure captures only the forbidden set.
pub fn forbidden<I, S>(
    values: I,
    code: impl Into<String>,
) -> impl Fn(&Value) -> Option<Failure> + Send + Sync
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: HashSet<String> = values.into_iter().map(Into::into).collect();
    let code = code.into();
    move |value: &Value| {
        let hit = value.as_str().is_some_and(|s| set.contains(s));
        hit.then(|| Failure::new(code.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_required() {
        assert!(required(&Value::Null).is_some());
        assert!(required(&json!("")).is_some());
        assert!(required(&json!("   ")).is_some());
        assert!(required(&json!("x")).is_none());
        assert!(required(&json!(0)).is_none());
        assert!(required(&json!(false)).is_none());
    }

    #[test]
    fn test_email_format() {
        assert!(email_format(&json!("a@b.com")).is_none());
        assert!(email_format(&json!("")).is_none());
        assert!(email_format(&Value::Null).is_none());
        assert!(email_format(&json!("nodomain")).is_some());
        assert!(email_format(&json!("@b.com")).is_some());
        assert!(email_format(&json!("a@nodot")).is_some());
        assert!(email_format(&json!("a@.com")).is_some());
        assert!(email_format(&json!(42)).is_some());
    }

    #[test]
    fn test_forbidden() {
        let rule = forbidden(["Chris", "Anna"], "nameIsForbidden");
        assert_eq!(rule(&json!("Chris")).unwrap().code, "nameIsForbidden");
        assert!(rule(&json!("bob")).is_none());
        assert!(rule(&json!(3)).is_none());
    }
}
