//! Input checks shared by the managers.

use crate::error::{RippleError, RippleResult};

pub(crate) fn require(field: &str, value: &str) -> RippleResult<()> {
    if value.trim().is_empty() {
        return Err(RippleError::Validation(format!(
            "Missing required field: {field}"
        )));
    }
    Ok(())
}

pub(crate) fn max_chars(field: &str, value: &str, max: usize) -> RippleResult<()> {
    if value.chars().count() > max {
        return Err(RippleError::Validation(format!(
            "{field} too long (max {max} characters)"
        )));
    }
    Ok(())
}

/// Loose shape check; delivery is what proves an address.
pub(crate) fn email(value: &str) -> RippleResult<()> {
    if !value.contains('@') || !value.contains('.') {
        return Err(RippleError::Validation("Invalid email format".into()));
    }
    Ok(())
}
