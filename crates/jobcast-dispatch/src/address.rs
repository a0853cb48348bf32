// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination address normalization.

use jobcast_core::JobcastError;

/// Normalizes a phone-style address to international digits.
///
/// Non-digits are stripped. A leading trunk `0` becomes the country code;
/// an address already starting with the country code is kept; anything else
/// gets the country code prepended.
pub fn normalize_address(raw: &str, country_code: &str) -> Result<String, JobcastError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(JobcastError::InvalidAddress(raw.to_string()));
    }

    if let Some(local) = digits.strip_prefix('0') {
        return Ok(format!("{country_code}{local}"));
    }
    if digits.starts_with(country_code) {
        return Ok(digits);
    }
    Ok(format!("{country_code}{digits}"))
}
