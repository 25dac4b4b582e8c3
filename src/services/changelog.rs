// src/services/changelog.rs

//! Extraction of titles and update timestamps from workshop pages.
//!
//! Changelog entries look like `Update: Jun 2 @ 3:23pm` (current year) or
//! `Update: Nov 7, 2023 @ 5:03am`. Some pages also carry a raw
//! `data-timestamp="..."` attribute.

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};

const TITLE_SELECTOR: &str = "div.workshopItemTitle";

/// Patterns tried in order; the first one with any match decides.
const UPDATE_PATTERNS: [(&str, TimestampKind); 3] = [
    (
        r"(?i)Update:\s*([A-Za-z]{3}\s+\d{1,2}\s*@\s*\d{1,2}:\d{2}[ap]m)",
        TimestampKind::DateText,
    ),
    (
        r"(?i)Update:\s*([A-Za-z]{3}\s+\d{1,2},?\s*\d{4}\s*@\s*\d{1,2}:\d{2}[ap]m)",
        TimestampKind::DateText,
    ),
    (r#"(?i)data-timestamp="(\d+)""#, TimestampKind::Unix),
];

#[derive(Debug, Clone, Copy)]
enum TimestampKind {
    DateText,
    Unix,
}

/// Extract the item title from the item's main page.
pub fn extract_title(html: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(TITLE_SELECTOR)
        .map_err(|e| AppError::selector(TITLE_SELECTOR, format!("{e:?}")))?;

    Ok(document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty()))
}

/// Find the most recent update timestamp on a changelog page.
///
/// Returns `None` when no pattern yields a usable timestamp; callers
/// substitute the current time.
pub fn extract_update_timestamp<Tz: TimeZone>(html: &str, now: &DateTime<Tz>) -> Option<i64> {
    for (source, kind) in UPDATE_PATTERNS {
        let Ok(pattern) = Regex::new(source) else {
            continue;
        };
        let Some(first) = pattern.captures(html).and_then(|caps| caps.get(1)) else {
            continue;
        };

        match kind {
            TimestampKind::Unix => {
                if let Ok(ts) = first.as_str().parse::<i64>() {
                    return Some(ts);
                }
            }
            TimestampKind::DateText => match parse_workshop_date(first.as_str(), now) {
                Some(date) => return Some(date.timestamp()),
                None => log::debug!("Could not parse workshop date: {:?}", first.as_str()),
            },
        }
    }
    None
}

/// Parse `Mon D @ H:MMam` or `Mon D, YYYY @ H:MMam` in the timezone of `now`.
///
/// Without a year the current year is assumed; a result later than `now`
/// is moved back one year since changelogs never list future dates.
pub fn parse_workshop_date<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let pattern =
        Regex::new(r"(?i)([A-Za-z]{3})\s+(\d{1,2}),?\s*(\d{4})?\s*@\s*(\d{1,2}):(\d{2})([ap]m)")
            .ok()?;
    let caps = pattern.captures(text.trim())?;

    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let explicit_year: Option<i32> = caps.get(3).and_then(|y| y.as_str().parse().ok());
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    let pm = caps[6].eq_ignore_ascii_case("pm");

    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    let tz = now.timezone();
    let at_year = |year: i32| {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour24, minute, 0)?;
        resolve_local(naive, |local| tz.from_local_datetime(local))
    };

    match explicit_year {
        Some(year) => at_year(year),
        None => {
            let date = at_year(now.year())?;
            if date > *now {
                at_year(now.year() - 1)
            } else {
                Some(date)
            }
        }
    }
}

/// Pick a concrete instant for a wall-clock time.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times that
/// do not exist (clocks going forward) are moved one hour ahead.
fn resolve_local<T>(
    naive: NaiveDateTime,
    resolve: impl Fn(&NaiveDateTime) -> LocalResult<T>,
) -> Option<T> {
    match resolve(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
            resolve(&shifted).earliest()
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
