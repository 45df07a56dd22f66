//! Notification text helpers.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::event::Event;

/// Timestamp layout used in captions (day first).
const CAPTION_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Build the media caption for an event.
///
/// `timezone_adjust` is a whole-hour offset applied to the event start time.
pub fn event_caption(event: &Event, timezone_adjust: i32) -> String {
    format!(
        "🎯 {}\n📷 {}\n🕒 {}",
        event.label,
        event.source,
        format_timestamp(event.start_time, timezone_adjust)
    )
}

/// Format epoch seconds (fractional part dropped) shifted by whole hours.
pub fn format_timestamp(epoch_secs: f64, timezone_adjust: i32) -> String {
    let utc = DateTime::<Utc>::from_timestamp(epoch_secs.trunc() as i64, 0).unwrap_or_default();
    match FixedOffset::east_opt(timezone_adjust.saturating_mul(3600)) {
        Some(offset) => utc.with_timezone(&offset).format(CAPTION_TIME_FORMAT).to_string(),
        None => utc.format(CAPTION_TIME_FORMAT).to_string(),
    }
}

/// Human-readable duration, coarsest two or three units.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{} days, {} hours, {} minutes", days, hours, minutes)
    } else if hours > 0 {
        format!("{} hours, {} minutes, {} seconds", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{} minutes, {} seconds", minutes, seconds)
    } else {
        format!("{} seconds", seconds)
    }
}
