//! Shared text helpers for turning API data into message text.
//!
//! - `strip_html`: forecast prose arrives as an HTML fragment; Slack wants plain text
//! - `format_display_time`: long, human-readable timestamps for message fields

use chrono::{DateTime, TimeZone};
use scraper::Html;
use std::fmt::Display;

/// Display format for published/expires times, e.g. "Tuesday, January 02, 2024 - 03:04PM".
const DISPLAY_TIME_FORMAT: &str = "%A, %B %d, %Y - %I:%M%p";

/// Strip all markup from an HTML fragment, keeping only its text content.
///
/// Parsing is lenient: unbalanced or unknown tags never fail, they are
/// recovered by the HTML5 parser. Entities are decoded and the result trimmed.
pub(crate) fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Format a timestamp for display in a chat message.
pub(crate) fn format_display_time<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    dt.format(DISPLAY_TIME_FORMAT).to_string()
}
