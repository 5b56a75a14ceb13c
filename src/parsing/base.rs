use std::borrow::Cow;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `2026年3月5日(木)`, `2026/3/5`, `2026-03-05 (木)`.
static FULL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{4})[年/\-]([0-9]{1,2})[月/\-]([0-9]{1,2})日?(?:\s*[(（][月火水木金土日祝][)）])?")
        .expect("valid full date regex")
});

/// `3/5`, `3月5日(木)`. Matches preceded by a digit or date separator are
/// fragments of a full date and get rejected by `is_full_date_fragment`.
static SHORT_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})[/月]([0-9]{1,2})日?(?:\s*[(（][月火水木金土日祝][)）])?")
        .expect("valid short date regex")
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]{1,2})[:：]([0-9]{2})").expect("valid time regex"));

/// A date found in a line, as ISO text plus the byte span it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub date: String,
    pub start: usize,
    pub end: usize,
}

/// Result of `extract_nearest_date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateHit {
    pub date: String,
    pub time: Option<String>,
}

/// Rewrites full-width digits (`２０２７`) as ASCII. Every date, time and
/// price pattern only matches ASCII digits.
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_full_width_digit) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| {
                if is_full_width_digit(c) {
                    char::from(b'0' + (c as u32 - '０' as u32) as u8)
                } else {
                    c
                }
            })
            .collect(),
    )
}

fn is_full_width_digit(c: char) -> bool {
    ('０'..='９').contains(&c)
}

/// Splits raw text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn find_full_dates(text: &str) -> Vec<DateMatch> {
    FULL_DATE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let date = parse_ymd(&caps[1], &caps[2], &caps[3])?;
            Some(DateMatch {
                date: to_iso(date),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

pub fn find_full_date(text: &str) -> Option<DateMatch> {
    find_full_dates(text).into_iter().next()
}

pub fn find_short_date(text: &str, hint_year: i32) -> Option<DateMatch> {
    SHORT_DATE_RE.captures_iter(text).find_map(|caps| {
        let whole = caps.get(0)?;
        if is_full_date_fragment(text, whole.start()) {
            return None;
        }
        let date = parse_md(hint_year, &caps[1], &caps[2])?;
        Some(DateMatch {
            date: to_iso(date),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

pub fn find_first_time(text: &str) -> Option<String> {
    TIME_RE
        .captures_iter(text)
        .find_map(|caps| parse_hm(&caps[1], &caps[2]))
}

/// First time-of-day at or after byte offset `from`.
pub fn find_time_after(text: &str, from: usize) -> Option<String> {
    text.get(from..).and_then(find_first_time)
}

/// Full date first, then a year-less date completed with `hint_year`.
/// The time is the first one after the date, else the first one anywhere.
pub fn extract_nearest_date(text: &str, hint_year: i32) -> Option<DateHit> {
    let found = find_full_date(text).or_else(|| find_short_date(text, hint_year))?;
    let time = find_time_after(text, found.end).or_else(|| find_first_time(text));
    Some(DateHit {
        date: found.date,
        time,
    })
}

pub(crate) fn parse_ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let y: i32 = y.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    let d: u32 = d.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

pub(crate) fn parse_md(year: i32, m: &str, d: &str) -> Option<NaiveDate> {
    let m: u32 = m.parse().ok()?;
    let d: u32 = d.parse().ok()?;
    NaiveDate::from_ymd_opt(year, m, d)
}

pub(crate) fn parse_hm(h: &str, m: &str) -> Option<String> {
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0).map(|t| t.format("%H:%M").to_string())
}

pub(crate) fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn is_full_date_fragment(text: &str, start: usize) -> bool {
    matches!(
        text[..start].chars().next_back(),
        Some(c) if c.is_ascii_digit() || matches!(c, '/' | '-' | '年')
    )
}
