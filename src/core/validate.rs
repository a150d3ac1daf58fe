//! Small input checks shared by the core modules.

use crate::errors::{Error, Result};
use reqwest::Url;

/// Rejects negative, NaN and infinite amounts.
pub fn ensure_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Trims `value` and rejects it when nothing is left.
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Accepts only well-formed `http` and `https` URLs with a host part.
pub fn require_http_url(value: &str) -> Result<String> {
    let raw = value.trim();
    let url = Url::parse(raw)
        .map_err(|e| Error::validation(format!("'{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::validation(format!("'{raw}' is not an http(s) URL")));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::validation(format!("'{raw}' has no host")));
    }
    Ok(raw.to_string())
}
