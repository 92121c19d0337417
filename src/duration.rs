//! Duration text parsing and remaining-time formatting

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Picker ranges for the positional duration widget
pub const MAX_PICKER_DAYS: u64 = 30;
pub const MAX_PICKER_HOURS: u64 = 23;
pub const MAX_PICKER_MINUTES: u64 = 59;

/// Canonical `(days, hours, minutes)` duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanonicalDuration {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

impl CanonicalDuration {
    pub const fn new(days: u64, hours: u64, minutes: u64) -> Self {
        Self { days, hours, minutes }
    }

    /// Total length in seconds, saturating on absurd magnitudes
    pub fn total_seconds(&self) -> u64 {
        self.days
            .saturating_mul(86_400)
            .saturating_add(self.hours.saturating_mul(3_600))
            .saturating_add(self.minutes.saturating_mul(60))
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}

impl fmt::Display for CanonicalDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}h{}m", self.days, self.hours, self.minutes)
    }
}

/// Parse free-form duration text.
///
/// A bare integer is read as minutes. Otherwise every `<number><unit>` token
/// with unit `d`, `h` or `m` (any case) assigns its field; a later token for
/// the same unit overwrites the earlier one. Anything else is ignored, so the
/// result for garbage input is simply zero.
pub fn parse(input: &str) -> CanonicalDuration {
    let trimmed = input.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return CanonicalDuration::new(0, 0, saturating_number(trimmed));
    }

    let mut duration = CanonicalDuration::default();
    let bytes = trimmed.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let value = saturating_number(&trimmed[start..i]);

        let mut unit_at = i;
        while unit_at < bytes.len() && bytes[unit_at].is_ascii_whitespace() {
            unit_at += 1;
        }
        match bytes.get(unit_at).map(u8::to_ascii_lowercase) {
            Some(b'd') => duration.days = value,
            Some(b'h') => duration.hours = value,
            Some(b'm') => duration.minutes = value,
            _ => continue,
        }
        i = unit_at + 1;
    }
    duration
}

/// Read whitespace-separated integers as `h m` or `d h m`. With more than
/// three numbers only the first three are used.
///
/// This is the text form the picker widget writes into the duration field.
pub fn parse_positional(input: &str) -> Option<CanonicalDuration> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.len() < 2 {
        return None;
    }
    if !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let nums: Vec<u64> = parts.iter().map(|p| saturating_number(p)).collect();
    Some(match nums.as_slice() {
        [h, m] => CanonicalDuration::new(0, *h, *m),
        [d, h, m, ..] => CanonicalDuration::new(*d, *h, *m),
        _ => return None,
    })
}

/// Parse the text a user typed into the duration field
pub fn parse_user_input(input: &str) -> CanonicalDuration {
    parse_positional(input).unwrap_or_else(|| parse(input))
}

/// Parse a signed minute adjustment such as `15`, `+15` or `-10`
pub fn parse_adjustment_minutes(input: &str) -> Result<i64, ValidationError> {
    let trimmed = input.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'+') => (false, &trimmed[1..]),
        Some(b'-') => (true, &trimmed[1..]),
        _ => (false, trimmed),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidAdjustment(input.to_string()));
    }
    let magnitude: i64 = digits
        .parse()
        .map_err(|_| ValidationError::InvalidAdjustment(input.to_string()))?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn saturating_number(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Picker widget selection, clamped to the widget's ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickerSelection {
    duration: CanonicalDuration,
}

impl PickerSelection {
    pub fn new(days: u64, hours: u64, minutes: u64) -> Self {
        Self {
            duration: CanonicalDuration::new(
                days.min(MAX_PICKER_DAYS),
                hours.min(MAX_PICKER_HOURS),
                minutes.min(MAX_PICKER_MINUTES),
            ),
        }
    }

    pub fn duration(&self) -> CanonicalDuration {
        self.duration
    }

    /// Text written back into the duration field
    pub fn input_text(&self) -> String {
        let d = self.duration;
        format!("{} {} {}", d.days, d.hours, d.minutes)
    }
}

/// Human readable remaining time
pub fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        return "Finished".to_string();
    }
    let d = seconds / 86_400;
    let h = (seconds % 86_400) / 3_600;
    let m = (seconds % 3_600) / 60;
    let s = seconds % 60;
    format!("{}d {}h {}m {}s", d, h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_minutes() {
        assert_eq!(parse("90"), CanonicalDuration::new(0, 0, 90));
        assert_eq!(parse("  5 "), CanonicalDuration::new(0, 0, 5));
    }

    #[test]
    fn unit_tokens_in_any_order() {
        assert_eq!(parse("2d 3h"), CanonicalDuration::new(2, 3, 0));
        assert_eq!(parse("30m1D"), CanonicalDuration::new(1, 0, 30));
        assert_eq!(parse("1d2h30m"), CanonicalDuration::new(1, 2, 30));
        assert_eq!(parse("4 h 5 m"), CanonicalDuration::new(0, 4, 5));
    }

    #[test]
    fn last_token_per_unit_wins() {
        assert_eq!(parse("3h 2h"), CanonicalDuration::new(0, 2, 0));
    }

    #[test]
    fn garbage_and_empty_degrade_to_zero() {
        assert_eq!(parse(""), CanonicalDuration::default());
        assert_eq!(parse("soon"), CanonicalDuration::default());
        assert_eq!(parse("12x 3h"), CanonicalDuration::new(0, 3, 0));
        assert_eq!(parse("-5"), CanonicalDuration::default());
    }

    #[test]
    fn no_upper_bound_in_parser() {
        assert_eq!(parse("400d 99h"), CanonicalDuration::new(400, 99, 0));
    }

    #[test]
    fn canonical_string_form() {
        assert_eq!(CanonicalDuration::new(1, 2, 3).to_string(), "1d2h3m");
        assert_eq!(CanonicalDuration::new(0, 0, 5).total_seconds(), 300);
    }

    #[test]
    fn positional_picker_text() {
        assert_eq!(parse_positional("1 30"), Some(CanonicalDuration::new(0, 1, 30)));
        assert_eq!(parse_positional("2 0 15"), Some(CanonicalDuration::new(2, 0, 15)));
        assert_eq!(parse_positional("90"), None);
        assert_eq!(parse_positional("1h 30m"), None);
        assert_eq!(parse_user_input("1h 30m"), CanonicalDuration::new(0, 1, 30));
        assert_eq!(parse_user_input("0 2 0"), CanonicalDuration::new(0, 2, 0));
    }

    #[test]
    fn extra_positional_numbers_are_ignored() {
        assert_eq!(parse_positional("1 2 3 4"), Some(CanonicalDuration::new(1, 2, 3)));
        assert_eq!(parse_user_input("1 2 3 4 5"), CanonicalDuration::new(1, 2, 3));
    }

    #[test]
    fn picker_clamps_to_ranges() {
        let picker = PickerSelection::new(45, 30, 75);
        assert_eq!(picker.duration(), CanonicalDuration::new(30, 23, 59));
        assert_eq!(picker.input_text(), "30 23 59");
    }

    #[test]
    fn adjustment_sign_convention() {
        assert_eq!(parse_adjustment_minutes("15"), Ok(15));
        assert_eq!(parse_adjustment_minutes("+15"), Ok(15));
        assert_eq!(parse_adjustment_minutes(" -10 "), Ok(-10));
        assert!(parse_adjustment_minutes("").is_err());
        assert!(parse_adjustment_minutes("ten").is_err());
        assert!(parse_adjustment_minutes("+").is_err());
    }

    #[test]
    fn remaining_formatting() {
        assert_eq!(format_remaining(0), "Finished");
        assert_eq!(format_remaining(-3), "Finished");
        assert_eq!(format_remaining(90_061), "1d 1h 1m 1s");
    }
}
