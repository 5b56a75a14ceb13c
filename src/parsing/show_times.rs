use once_cell::sync::Lazy;
use regex::Regex;

use super::base::{self, DateMatch};
use super::{cities, fields};
use crate::models::ShowTime;

/// Lines mentioning doors, curtain, performance or venue describe shows.
const SHOW_CONTEXT_KEYWORDS: &[&str] = &["開場", "開演", "公演", "会場"];

/// Announcements with this many full dates or fewer list nothing but shows.
const SPARSE_DATE_LIMIT: usize = 3;

static SHOW_START_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"開演\s*[：:]?\s*([0-9]{1,2})[:：]([0-9]{2})").expect("valid start time regex"));

struct DatedLine<'a> {
    found: DateMatch,
    line: &'a str,
}

/// Collects show dates from every full date in the text.
pub fn collect_show_times(lines: &[&str]) -> Vec<ShowTime> {
    let dated: Vec<DatedLine<'_>> = lines
        .iter()
        .flat_map(|&line| {
            base::find_full_dates(line)
                .into_iter()
                .map(move |found| DatedLine { found, line })
        })
        .collect();

    let admit_all = dated.len() <= SPARSE_DATE_LIMIT;

    let mut show_times: Vec<ShowTime> = Vec::new();
    for entry in dated {
        if !admit_all && !is_show_context(entry.line) {
            continue;
        }
        let show = ShowTime {
            date: entry.found.date.clone(),
            time: show_time_of_day(entry.line, &entry.found),
            venue: fields::venue_in_line(entry.line),
            city: cities::match_city(entry.line).map(str::to_string),
        };
        let duplicate = show_times
            .iter()
            .any(|existing| existing.date == show.date && existing.time == show.time);
        if !duplicate {
            show_times.push(show);
        }
    }
    show_times
}

pub fn is_show_context(line: &str) -> bool {
    SHOW_CONTEXT_KEYWORDS.iter().any(|kw| line.contains(kw))
}

fn show_time_of_day(line: &str, found: &DateMatch) -> Option<String> {
    SHOW_START_TIME_RE
        .captures(line)
        .and_then(|caps| base::parse_hm(&caps[1], &caps[2]))
        .or_else(|| base::find_time_after(line, found.end))
}
