//! Field rules the booking backend expects clients to enforce before sending.

use fleetguard_transit::TransitError;

use crate::error::{CoreError, Result};

/// Bounds for names, usernames and id document numbers, in characters.
pub const NAME_LENGTH: std::ops::RangeInclusive<usize> = 2..=60;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_CANCEL_REASON: usize = 255;
/// E.164 allows at most 15 digits after the `+`.
const MAX_PHONE_DIGITS: usize = 15;

pub(crate) fn invalid(message: String) -> CoreError {
    CoreError::Transit(TransitError::InvalidData(message))
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn email(value: &str) -> Result<()> {
    let well_formed = !value.chars().any(char::is_whitespace)
        && value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        });
    if well_formed {
        Ok(())
    } else {
        Err(invalid(format!("{value} is not an email address")))
    }
}

/// International format, e.g. `+573001234567`.
pub fn phone(value: &str) -> Result<()> {
    let digits = value.strip_prefix('+').unwrap_or_default();
    if value.starts_with('+')
        && (1..=MAX_PHONE_DIGITS).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        Ok(())
    } else {
        Err(invalid(format!(
            "{value} is not a phone number in international format (+573001234567)"
        )))
    }
}

pub fn password(value: &str) -> Result<()> {
    let strong = value.chars().count() >= MIN_PASSWORD_LENGTH
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && !value.chars().any(char::is_whitespace);
    if strong {
        Ok(())
    } else {
        Err(invalid(format!(
            "password needs at least {MIN_PASSWORD_LENGTH} characters with upper and lower case letters and a digit, and no spaces"
        )))
    }
}

pub fn name_length(field: &str, value: &str) -> Result<()> {
    let len = value.trim().chars().count();
    if NAME_LENGTH.contains(&len) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{field} must have between {} and {} characters",
            NAME_LENGTH.start(),
            NAME_LENGTH.end()
        )))
    }
}

pub fn cancel_reason(value: &str) -> Result<()> {
    if value.chars().count() <= MAX_CANCEL_REASON {
        Ok(())
    } else {
        Err(invalid(format!(
            "cancellation reason is limited to {MAX_CANCEL_REASON} characters"
        )))
    }
}
