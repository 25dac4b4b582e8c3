//! Utility functions and helpers.

pub mod http;

use regex::Regex;

/// Extract the workshop item id from a URL (`?id=123` or `&id=123`).
pub fn extract_item_id(url: &str) -> Option<String> {
    let pattern = Regex::new(r"[?&]id=(\d+)").ok()?;
    pattern
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|id| id.as_str().to_string())
}

/// Human readable "time since" for a unix timestamp, relative to `now`.
pub fn format_time_since(timestamp: i64, now: i64) -> String {
    let diff_minutes = (now - timestamp).max(0) / 60;
    let diff_hours = diff_minutes / 60;
    let diff_days = diff_hours / 24;
    let diff_years = diff_days / 365;

    if diff_minutes < 60 {
        format!("{diff_minutes} min ago")
    } else if diff_hours < 24 {
        format!("{diff_hours} {} ago", plural(diff_hours, "hour"))
    } else if diff_days < 365 {
        format!("{diff_days} {} ago", plural(diff_days, "day"))
    } else {
        let remaining_days = diff_days % 365;
        if remaining_days == 0 {
            format!("{diff_years} {} ago", plural(diff_years, "year"))
        } else {
            format!(
                "{diff_years} {} and {remaining_days} {} ago",
                plural(diff_years, "year"),
                plural(remaining_days, "day")
            )
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}
