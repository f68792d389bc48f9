//! Compound deserialization message decomposition
//!
//! A failed bundle deserialization is reported as one message that frames
//! every problem in parentheses, e.g.
//! `"While deserializing a Bundle, found 2 problems: (first) (second)"`.
//! [`decompose`] turns that back into one entry per problem.

/// Separator between two adjacent framed problems.
pub const ISSUE_SEPARATOR: &str = ") (";

/// Split a compound message into its discrete problems, preserving order.
///
/// The boundary trim is applied the same way whatever the number of
/// segments: everything up to and including the first `(` is removed from
/// the first segment, and everything from the last `)` onward is removed
/// from the last one. A segment without the relevant parenthesis is left
/// as is, so the result is never empty.
pub fn decompose(compound_message: &str) -> Vec<String> {
    let mut parts: Vec<&str> = compound_message.split(ISSUE_SEPARATOR).collect();

    if let Some(first) = parts.first_mut()
        && let Some(open) = first.find('(')
    {
        *first = &first[open + 1..];
    }

    if let Some(last) = parts.last_mut()
        && let Some(close) = last.rfind(')')
    {
        *last = &last[..close];
    }

    parts.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_issues() {
        assert_eq!(decompose("(A) (B) (C)"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_single_issue_is_trimmed() {
        assert_eq!(decompose("(only one issue)"), vec!["only one issue"]);
    }

    #[test]
    fn test_leading_prefix_is_dropped() {
        let message = "While deserializing a Bundle, found 2 problems: (At Bundle.type: expected a string) (Unknown element 'foo' at Bundle.foo)";
        assert_eq!(
            decompose(message),
            vec![
                "At Bundle.type: expected a string",
                "Unknown element 'foo' at Bundle.foo"
            ]
        );
    }

    #[test]
    fn test_inner_parentheses_survive() {
        assert_eq!(
            decompose("(value (x) is bad) (second (y))"),
            vec!["value (x) is bad", "second (y)"]
        );
    }

    #[test]
    fn test_unframed_message() {
        assert_eq!(decompose("plain failure"), vec!["plain failure"]);
        assert_eq!(decompose(""), vec![""]);
    }
}
