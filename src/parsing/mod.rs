pub mod base;
pub mod cities;
pub mod fields;
pub mod milestones;
pub mod ranges;
pub mod show_times;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::{ConcertDraft, TicketMilestone};
use milestones::ClaimedTypes;

pub const WARN_NO_TITLE: &str = "タイトルを抽出できませんでした";
pub const WARN_NO_VENUE: &str = "会場を抽出できませんでした";
pub const WARN_NO_SHOW_TIMES: &str = "公演日を抽出できませんでした";
pub const WARN_NO_MILESTONES: &str = "チケット日程を抽出できませんでした";

/// Clock-derived inputs of a parse. Nothing under `parsing` reads the clock
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    /// Year given to dates written without one.
    pub hint_year: i32,
    pub today: NaiveDate,
}

impl ParseContext {
    pub fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        Self {
            hint_year: today.year(),
            today,
        }
    }

    pub fn now(tz: Tz) -> Self {
        Self::at(Utc::now(), tz)
    }

    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            hint_year: today.year(),
            today,
        }
    }
}

/// Turns announcement text into a draft. Never fails: anything that could
/// not be extracted is left empty and reported in `warnings`.
pub fn parse_announcement(text: &str, ctx: &ParseContext) -> ConcertDraft {
    let normalized = base::normalize_digits(text);
    let lines = base::split_lines(&normalized);

    let title = fields::extract_title(&lines);
    let venue = fields::extract_venue(&lines);
    let city = fields::extract_city(&normalized);
    let ticket_price = fields::extract_price(&normalized);
    let show_times = show_times::collect_show_times(&lines);

    let classified = milestones::classify_lines(&lines, ctx.hint_year, ClaimedTypes::new());
    let expanded = ranges::expand_ranges(&normalized, &lines, ctx.hint_year, classified.claimed);

    let mut milestones: Vec<TicketMilestone> = classified.milestones;
    milestones.extend(expanded.milestones);
    sort_milestones(&mut milestones);

    let mut warnings = classified.warnings;
    warnings.extend(expanded.warnings);

    let mut draft = ConcertDraft {
        title,
        artist: String::new(),
        venue,
        city,
        ticket_price,
        show_times,
        milestones,
        raw_text: text.to_string(),
        warnings,
    };
    append_empty_field_warnings(&mut draft);

    debug!(
        lines = lines.len(),
        show_times = draft.show_times.len(),
        milestones = draft.milestones.len(),
        warnings = draft.warnings.len(),
        "announcement parsed"
    );
    draft
}

/// ISO dates are zero padded, so string order is date order.
pub fn sort_milestones(milestones: &mut [TicketMilestone]) {
    milestones.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
}

fn append_empty_field_warnings(draft: &mut ConcertDraft) {
    if draft.title.is_empty() {
        draft.warnings.push(WARN_NO_TITLE.to_string());
    }
    if draft.venue.is_empty() {
        draft.warnings.push(WARN_NO_VENUE.to_string());
    }
    if draft.show_times.is_empty() {
        draft.warnings.push(WARN_NO_SHOW_TIMES.to_string());
    }
    if draft.milestones.is_empty() {
        draft.warnings.push(WARN_NO_MILESTONES.to_string());
    }
}
