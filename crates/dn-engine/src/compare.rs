//! Value comparator
//!
//! Evaluates one (observed state, operator, reference) triple to a bool.
//! Entity states arrive as strings, including the `unknown` / `unavailable`
//! sentinels, so the comparator has an explicit dual path: numeric when both
//! sides parse as floats, string equality otherwise. Relational operators
//! over non-numeric operands are always false rather than relying on an
//! undefined ordering.

use dn_core::{is_sentinel, REF_UNKNOWN_OR_UNAVAILABLE};

use crate::model::{Operator, ReferenceValue};

/// Compare an observed state value against a reference
///
/// Never panics and never errors; malformed input degrades to `false` for
/// relational operators and exact string comparison for `==` / `!=`.
pub fn compare(observed: &str, operator: Operator, reference: &ReferenceValue) -> bool {
    // The wizard offers a combined "unknown or unavailable" choice that
    // matches either sentinel.
    if reference.as_text() == Some(REF_UNKNOWN_OR_UNAVAILABLE) {
        return match operator {
            Operator::Eq => is_sentinel(observed),
            Operator::Ne => !is_sentinel(observed),
            _ => false,
        };
    }

    if let (Ok(obs), Some(refv)) = (observed.trim().parse::<f64>(), reference.as_f64()) {
        return match operator {
            Operator::Gt => obs > refv,
            Operator::Lt => obs < refv,
            Operator::Ge => obs >= refv,
            Operator::Le => obs <= refv,
            Operator::Eq => obs == refv,
            Operator::Ne => obs != refv,
        };
    }

    let refv = reference.to_string();
    match operator {
        Operator::Eq => observed == refv,
        Operator::Ne => observed != refv,
        // No defined ordering for non-numeric values
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> ReferenceValue {
        ReferenceValue::Number(n)
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(compare("55", Operator::Gt, &num(50.0)));
        assert!(!compare("45", Operator::Gt, &num(50.0)));
        assert!(compare("45", Operator::Lt, &num(50.0)));
        assert!(compare("50", Operator::Ge, &num(50.0)));
        assert!(compare("50", Operator::Le, &num(50.0)));
        assert!(compare("50", Operator::Eq, &num(50.0)));
        assert!(compare("51", Operator::Ne, &num(50.0)));
    }

    #[test]
    fn test_numeric_reference_as_text() {
        // Both sides numeric-looking strings still take the numeric path
        assert!(compare("55", Operator::Gt, &"50".into()));
        assert!(compare(" 55 ", Operator::Gt, &"50".into()));
    }

    #[test]
    fn test_string_equality() {
        assert!(compare("on", Operator::Eq, &"on".into()));
        assert!(compare("off", Operator::Ne, &"on".into()));
        assert!(compare("unavailable", Operator::Eq, &"unavailable".into()));
        assert!(compare("unknown", Operator::Ne, &"50".into()));
    }

    #[test]
    fn test_relational_on_non_numeric_is_false() {
        assert!(!compare("unavailable", Operator::Gt, &num(50.0)));
        assert!(!compare("on", Operator::Lt, &"off".into()));
        assert!(!compare("55", Operator::Ge, &"banana".into()));
    }

    #[test]
    fn test_unknown_or_unavailable_reference() {
        let refv: ReferenceValue = REF_UNKNOWN_OR_UNAVAILABLE.into();
        assert!(compare("unknown", Operator::Eq, &refv));
        assert!(compare("unavailable", Operator::Eq, &refv));
        assert!(!compare("on", Operator::Eq, &refv));
        assert!(compare("on", Operator::Ne, &refv));
        assert!(!compare("unknown", Operator::Gt, &refv));
    }
}
