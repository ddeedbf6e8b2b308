//! Textual media timestamps as sent by the backend (`HH:MM:SS.mmm`, `MM:SS`,
//! `[MM:SS-MM:SS]`) and the clock formats shown to the user.

use crate::error::{PerunError, Result};

/// Parse a timestamp into seconds.
///
/// Accepts `SS(.mmm)`, `MM:SS(.mmm)`, `HH:MM:SS(.mmm)` and bracketed ranges
/// `[MM:SS-MM:SS]` (hyphen or en dash), in which case the range start is
/// returned.
pub fn parse_seconds(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if let Some((start, _)) = parse_range(trimmed)? {
        return Ok(start);
    }
    parse_clock(trimmed)
}

/// Parse a bracketed range into `(start, end)` seconds.
///
/// Returns `Ok(None)` when the input is not bracketed.
pub fn parse_range(input: &str) -> Result<Option<(f64, f64)>> {
    let trimmed = input.trim();
    let Some(inner) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Ok(None);
    };

    let (start, end) = inner
        .split_once('–')
        .or_else(|| inner.split_once('-'))
        .ok_or_else(|| PerunError::Timestamp(input.to_string()))?;

    Ok(Some((parse_clock(start.trim())?, parse_clock(end.trim())?)))
}

fn parse_clock(input: &str) -> Result<f64> {
    let invalid = || PerunError::Timestamp(input.to_string());
    if input.is_empty() {
        return Err(invalid());
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let (last, leading) = parts.split_last().ok_or_else(invalid)?;
    let seconds: f64 = last.parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }

    let mut total = seconds;
    let mut scale = 60.0;
    for part in leading.iter().rev() {
        let value: u32 = part.parse().map_err(|_| invalid())?;
        total += value as f64 * scale;
        scale *= 60.0;
    }

    Ok(total)
}

/// Player clock: `m:ss`
pub fn format_clock(seconds: f64) -> String {
    let seconds = non_negative(seconds);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}

/// Zero-padded clock used in segment labels: `mm:ss`
pub fn format_padded(seconds: f64) -> String {
    let seconds = non_negative(seconds);
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{:02}:{:02}", mins, secs)
}

/// Segment label: `[mm:ss–mm:ss]`
pub fn format_range(start: f64, end: f64) -> String {
    format!("[{}–{}]", format_padded(start), format_padded(end))
}

/// Full precision: `HH:MM:SS.mmm`
pub fn format_precise(seconds: f64) -> String {
    let millis_total = (non_negative(seconds) * 1000.0).round() as u64;
    let hours = millis_total / 3_600_000;
    let minutes = (millis_total % 3_600_000) / 60_000;
    let secs = (millis_total % 60_000) / 1000;
    let millis = millis_total % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}
