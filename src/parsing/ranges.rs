use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::base;
use super::milestones::{ClaimedTypes, PassOutput, FC_SCOPE, OFFICIAL_SCOPE};
use crate::models::{MilestoneType, TicketMilestone};

/// `3/1(日) 12:00〜3/5(木) 23:59`, `2/1～2/8`, `3月1日-3月5日`. Spacing is
/// restricted to blanks so a range never crosses a line break.
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?:(?P<y1>[0-9]{4})[年/])? (?P<m1>[0-9]{1,2})[/月](?P<d1>[0-9]{1,2})日?
        (?:[\ \t\x{3000}]*[(（][月火水木金土日祝][)）])?
        (?:[\ \t\x{3000}]*(?P<h1>[0-9]{1,2})[:：](?P<n1>[0-9]{2}))?
        [\ \t\x{3000}]*[〜～~\-][\ \t\x{3000}]*
        (?:(?P<y2>[0-9]{4})[年/])? (?P<m2>[0-9]{1,2})[/月](?P<d2>[0-9]{1,2})日?
        (?:[\ \t\x{3000}]*[(（][月火水木金土日祝][)）])?
        (?:[\ \t\x{3000}]*(?P<h2>[0-9]{1,2})[:：](?P<n2>[0-9]{2}))?",
    )
    .expect("valid date range regex")
});

static FC_SCOPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(FC_SCOPE).expect("valid fc regex"));
static OFFICIAL_SCOPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(OFFICIAL_SCOPE).expect("valid official regex"));

/// Which lottery a range line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotteryScope {
    FanClub,
    Official,
}

impl LotteryScope {
    pub fn of_line(line: &str) -> Option<Self> {
        if FC_SCOPE_RE.is_match(line) {
            Some(LotteryScope::FanClub)
        } else if OFFICIAL_SCOPE_RE.is_match(line) {
            Some(LotteryScope::Official)
        } else {
            None
        }
    }

    fn window(self) -> (MilestoneType, MilestoneType) {
        match self {
            LotteryScope::FanClub => (MilestoneType::FcLotteryOpen, MilestoneType::FcLotteryClose),
            LotteryScope::Official => (
                MilestoneType::OfficialLotteryOpen,
                MilestoneType::OfficialLotteryClose,
            ),
        }
    }
}

/// Endpoints of one date range; `None` for an impossible calendar date.
struct RangeEnds {
    open: Option<(String, Option<String>)>,
    close: Option<(String, Option<String>)>,
}

/// Whole-text fallback pass run after `classify_lines`. Turns lottery
/// windows written as ranges into open/close milestones, filling only the
/// types still unclaimed.
pub fn expand_ranges(text: &str, lines: &[&str], hint_year: i32, claimed: ClaimedTypes) -> PassOutput {
    let mut out = PassOutput {
        claimed,
        ..PassOutput::default()
    };

    for caps in RANGE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if caps.name("y1").is_none() && is_date_fragment(text, whole.start()) {
            continue;
        }
        let Some(line) = lines.iter().find(|line| line.contains(whole.as_str())) else {
            continue;
        };
        let Some(scope) = LotteryScope::of_line(line) else {
            continue;
        };

        let ends = range_ends(&caps, hint_year);
        let (open_kind, close_kind) = scope.window();
        for (kind, end) in [(open_kind, ends.open), (close_kind, ends.close)] {
            let Some((date, time)) = end else {
                continue;
            };
            if !out.claimed.claim(kind) {
                continue;
            }
            debug!(kind = ?kind, date = %date, range = %whole.as_str(), "range milestone claimed");
            out.milestones.push(TicketMilestone::planned(kind, date, time));
        }
    }

    out
}

/// A year written on the opening side also covers a year-less closing side.
fn range_ends(caps: &Captures<'_>, hint_year: i32) -> RangeEnds {
    let year_of = |y: &str| caps.name(y).and_then(|v| v.as_str().parse::<i32>().ok());
    let open_year = year_of("y1").unwrap_or(hint_year);
    let close_year = year_of("y2").unwrap_or(open_year);

    let end = |year: i32, m: &str, d: &str, h: &str, n: &str| -> Option<(String, Option<String>)> {
        let date = base::parse_md(year, &caps[m], &caps[d])?;
        let time = match (caps.name(h), caps.name(n)) {
            (Some(h), Some(n)) => base::parse_hm(h.as_str(), n.as_str()),
            _ => None,
        };
        Some((base::to_iso(date), time))
    };
    RangeEnds {
        open: end(open_year, "m1", "d1", "h1", "n1"),
        close: end(close_year, "m2", "d2", "h2", "n2"),
    }
}

fn is_date_fragment(text: &str, start: usize) -> bool {
    matches!(
        text[..start].chars().next_back(),
        Some(c) if c.is_ascii_digit() || matches!(c, '/' | '-' | '年')
    )
}
