//! Canonicalization of heterogeneous scalar representations.
//!
//! Extraction output arrives with the same fact spelled many ways: `true`,
//! `"Yes"`, `"1"`, `1`. Two distinct normalization modes exist and must not
//! be conflated:
//!
//! - [`normalize_flag`] - workbook-flag mode, collapsing to `1`/`0`
//! - [`normalize_token`] - multi-valued text mode, collapsing to the
//!   capitalized canonical tokens `Yes`/`No`/`Unclear`/`NR`
//!
//! [`values_match`] is the tolerance-based comparison used by verification
//! reconciliation and the cross-driver comparator.

use crate::value::Scalar;

/// Default absolute tolerance for numeric comparison.
pub const NUMERIC_TOL_ABS: f64 = 0.01;
/// Default relative tolerance for numeric comparison.
pub const NUMERIC_TOL_REL: f64 = 0.01;

/// Normalize a value for a workbook flag cell.
///
/// Booleans become `1`/`0`; recognized affirmative/negative string spellings
/// (`yes`/`y`/`1`/`true`, `no`/`n`/`0`/`false`, case-insensitive) become
/// `1`/`0`; other strings are trimmed with empty mapping to null; numbers
/// pass through unchanged.
#[must_use]
pub fn normalize_flag(value: &Scalar) -> Scalar {
    match value {
        Scalar::Bool(b) => Scalar::Int(i64::from(*b)),
        Scalar::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Scalar::Null;
            }
            match trimmed.to_lowercase().as_str() {
                "yes" | "y" | "1" | "true" => Scalar::Int(1),
                "no" | "n" | "0" | "false" => Scalar::Int(0),
                _ => Scalar::Str(trimmed.to_string()),
            }
        }
        other => other.clone(),
    }
}

/// Normalize a value for a multi-valued text field.
///
/// Recognized spellings collapse to the capitalized canonical tokens `Yes`,
/// `No`, `Unclear`, `NR`; booleans map to `Yes`/`No`; other strings are
/// trimmed with empty mapping to null.
#[must_use]
pub fn normalize_token(value: &Scalar) -> Scalar {
    match value {
        Scalar::Bool(b) => Scalar::Str(if *b { "Yes" } else { "No" }.to_string()),
        Scalar::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Scalar::Null;
            }
            let canonical = match trimmed.to_lowercase().as_str() {
                "yes" => "Yes",
                "no" => "No",
                "unclear" => "Unclear",
                "nr" | "not reported" | "n/a" | "na" => "NR",
                _ => return Scalar::Str(trimmed.to_string()),
            };
            Scalar::Str(canonical.to_string())
        }
        other => other.clone(),
    }
}

/// Coerce a scalar to a float, if it looks numeric.
///
/// Integers and floats coerce natively; strings are trimmed and parsed.
/// Booleans and null are not numbers. Never errors.
#[must_use]
pub fn coerce_float(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Int(i) => Some(*i as f64),
        Scalar::Float(f) => Some(*f),
        Scalar::Str(s) => s.trim().parse::<f64>().ok(),
        Scalar::Bool(_) | Scalar::Null => None,
    }
}

/// Tolerance-based equality between two extracted values.
///
/// Both-null matches. Two strings match on trimmed equality. Otherwise both
/// sides are coerced to floats and match when the absolute difference is
/// within `abs_tol`, or when `b` is nonzero and the difference relative to
/// `b` is within `rel_tol`. Falls back to raw equality.
///
/// The relative tolerance is computed against the right operand only. This
/// asymmetry is inherited behavior and is preserved deliberately; callers
/// that need symmetric semantics must not get them silently here.
#[must_use]
pub fn values_match(a: &Scalar, b: &Scalar, abs_tol: f64, rel_tol: f64) -> bool {
    if a.is_null() && b.is_null() {
        return true;
    }
    if let (Scalar::Str(sa), Scalar::Str(sb)) = (a, b) {
        return sa.trim() == sb.trim();
    }
    if let (Some(fa), Some(fb)) = (coerce_float(a), coerce_float(b)) {
        if (fa - fb).abs() <= abs_tol {
            return true;
        }
        if fb.abs() > 0.0 && ((fa - fb) / fb).abs() <= rel_tol {
            return true;
        }
    }
    a == b
}

/// Tolerance-based equality with the default tolerances.
#[inline]
#[must_use]
pub fn values_match_default(a: &Scalar, b: &Scalar) -> bool {
    values_match(a, b, NUMERIC_TOL_ABS, NUMERIC_TOL_REL)
}

/// Canonicalize a PMID-like value to its string form.
///
/// Booleans are rejected. Integers stringify directly; integral floats
/// stringify as integers. Strings: empty becomes `None`, all-digit strings
/// canonicalize (leading zeros collapse), digit strings ending in `.0` drop
/// the suffix, anything else passes through trimmed.
#[must_use]
pub fn normalize_pmid(value: &Scalar) -> Option<String> {
    match value {
        Scalar::Null | Scalar::Bool(_) => None,
        Scalar::Int(i) => Some(i.to_string()),
        Scalar::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string().trim().to_string())
            }
        }
        Scalar::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Some(canonical_digits(trimmed));
            }
            if let Some(prefix) = trimmed.strip_suffix(".0") {
                if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
                    return Some(canonical_digits(prefix));
                }
            }
            Some(trimmed.to_string())
        }
    }
}

/// Collapse leading zeros of an all-digit string ("007" -> "7", "0" -> "0").
fn canonical_digits(digits: &str) -> String {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}
