use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::base::{self, DateHit};
use crate::models::{MilestoneType, TicketMilestone};

pub(super) const FC_SCOPE: &str = r"(?i)FC|ファンクラブ|fan\s?club";
pub(super) const OFFICIAL_SCOPE: &str =
    r"(?i)オフィシャル|公式|プレイガイド|一般先行|プレリザーブ|プレオーダー|e\+|ローチケ|チケットぴあ";
const RESULT_CUE: &str = r"当落|抽選結果|結果発表|結果通知|当選発表";
const CLOSE_CUE: &str = r"締切|締め切り|〆切|受付終了";
const OPEN_CUE: &str = r"受付|抽選|先行|申込|申し込み";

/// Milestone types already produced during one parse. Threaded by value
/// from the classifier pass into the range pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedTypes(BTreeSet<MilestoneType>);

impl ClaimedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: MilestoneType) -> bool {
        self.0.contains(&kind)
    }

    /// Returns false if `kind` was already claimed.
    pub fn claim(&mut self, kind: MilestoneType) -> bool {
        self.0.insert(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of one extraction pass plus the updated accumulator.
#[derive(Debug, Default)]
pub struct PassOutput {
    pub milestones: Vec<TicketMilestone>,
    pub warnings: Vec<String>,
    pub claimed: ClaimedTypes,
}

/// One row of the classifier table: a line matches when the optional scope
/// (fan club / official) and the cue both occur in it.
pub struct MilestoneRule {
    pub priority: u8,
    pub kind: MilestoneType,
    scope: Option<Regex>,
    cue: Regex,
}

impl MilestoneRule {
    fn new(priority: u8, kind: MilestoneType, scope: Option<&str>, cue: &str) -> Self {
        Self {
            priority,
            kind,
            scope: scope.map(|s| Regex::new(s).expect("valid milestone scope regex")),
            cue: Regex::new(cue).expect("valid milestone cue regex"),
        }
    }

    /// Byte offset just past the cue when the rule matches `line`.
    pub fn matches(&self, line: &str) -> Option<usize> {
        if let Some(scope) = &self.scope {
            if !scope.is_match(line) {
                return None;
            }
        }
        self.cue.find(line).map(|m| m.end())
    }
}

/// Lower priority is tried first. Payment and issuance come before the
/// lottery rules so `入金締切` is not read as a lottery close, results and
/// closes come before opens, fan club before official.
pub static MILESTONE_RULES: Lazy<Vec<MilestoneRule>> = Lazy::new(|| {
    use MilestoneType::*;
    let mut rules = vec![
        MilestoneRule::new(0, PaymentDeadline, None, r"入金|支払|決済"),
        MilestoneRule::new(1, TicketIssueOpen, None, r"発券"),
        MilestoneRule::new(2, FcLotteryResult, Some(FC_SCOPE), RESULT_CUE),
        MilestoneRule::new(3, FcLotteryClose, Some(FC_SCOPE), CLOSE_CUE),
        MilestoneRule::new(4, FcLotteryOpen, Some(FC_SCOPE), OPEN_CUE),
        MilestoneRule::new(5, OfficialLotteryResult, Some(OFFICIAL_SCOPE), RESULT_CUE),
        MilestoneRule::new(6, OfficialLotteryClose, Some(OFFICIAL_SCOPE), CLOSE_CUE),
        MilestoneRule::new(7, OfficialLotteryOpen, Some(OFFICIAL_SCOPE), OPEN_CUE),
        MilestoneRule::new(8, GeneralSaleOpen, None, r"一般発売|一般販売|一般受付"),
        MilestoneRule::new(9, ShowDoorOpen, None, r"開場"),
        MilestoneRule::new(10, ShowStart, None, r"開演"),
    ];
    rules.sort_by_key(|rule| rule.priority);
    rules
});

/// Line-scoped classifier pass. For each line the first rule whose type is
/// unclaimed and whose date can be resolved (same line, then the next line)
/// wins the line. Unresolvable dates leave a warning and never abort.
pub fn classify_lines(lines: &[&str], hint_year: i32, claimed: ClaimedTypes) -> PassOutput {
    let mut out = PassOutput {
        claimed,
        ..PassOutput::default()
    };

    for (idx, line) in lines.iter().enumerate() {
        let next = lines.get(idx + 1).copied();
        for rule in MILESTONE_RULES.iter() {
            if out.claimed.contains(rule.kind) {
                continue;
            }
            let Some(cue_end) = rule.matches(line) else {
                continue;
            };
            match resolve_date(line, cue_end, next, hint_year) {
                Some(hit) => {
                    debug!(kind = ?rule.kind, date = %hit.date, line = %line, "milestone claimed");
                    out.claimed.claim(rule.kind);
                    out.milestones
                        .push(TicketMilestone::planned(rule.kind, hit.date, hit.time));
                    break;
                }
                None => out.warnings.push(missing_date_warning(rule.kind, line)),
            }
        }
    }

    out
}

fn resolve_date(line: &str, cue_end: usize, next: Option<&str>, hint_year: i32) -> Option<DateHit> {
    if let Some(mut hit) = base::extract_nearest_date(line, hint_year) {
        if let Some(anchored) = base::find_time_after(line, cue_end) {
            hit.time = Some(anchored);
        }
        return Some(hit);
    }
    next.and_then(|next| base::extract_nearest_date(next, hint_year))
}

pub fn missing_date_warning(kind: MilestoneType, line: &str) -> String {
    format!("「{}」の日付を特定できませんでした: {}", kind.label(), line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: MilestoneType) -> &'static MilestoneRule {
        MILESTONE_RULES
            .iter()
            .find(|r| r.kind == kind)
            .expect("rule for kind")
    }

    fn kinds(out: &PassOutput) -> Vec<MilestoneType> {
        out.milestones.iter().map(|m| m.kind).collect()
    }

    #[test]
    fn every_type_has_exactly_one_rule() {
        for kind in MilestoneType::ALL {
            assert_eq!(MILESTONE_RULES.iter().filter(|r| r.kind == kind).count(), 1);
        }
    }

    #[test]
    fn rule_priority_order_is_pinned() {
        use MilestoneType::*;
        let order: Vec<MilestoneType> = MILESTONE_RULES.iter().map(|r| r.kind).collect();
        assert_eq!(
            order,
            vec![
                PaymentDeadline,
                TicketIssueOpen,
                FcLotteryResult,
                FcLotteryClose,
                FcLotteryOpen,
                OfficialLotteryResult,
                OfficialLotteryClose,
                OfficialLotteryOpen,
                GeneralSaleOpen,
                ShowDoorOpen,
                ShowStart,
            ]
        );
    }

    #[test]
    fn individual_rules_match() {
        use MilestoneType::*;
        assert!(rule(FcLotteryOpen).matches("FC先行(抽選)受付").is_some());
        assert!(rule(FcLotteryOpen).matches("オフィシャル先行受付").is_none());
        assert!(rule(FcLotteryResult).matches("ファンクラブ 当落発表").is_some());
        assert!(rule(OfficialLotteryClose).matches("プレイガイド先行 受付終了").is_some());
        assert!(rule(GeneralSaleOpen).matches("一般発売日：4/18").is_some());
        assert!(rule(PaymentDeadline).matches("入金締切 3/12").is_some());
        assert!(rule(TicketIssueOpen).matches("発券開始 5/1").is_some());
        assert!(rule(ShowStart).matches("開場17:00").is_none());
    }

    #[test]
    fn door_open_with_time() {
        let out = classify_lines(&["2026年3月5日(木) 開場17:00"], 2026, ClaimedTypes::new());
        assert_eq!(kinds(&out), vec![MilestoneType::ShowDoorOpen]);
        assert_eq!(out.milestones[0].date, "2026-03-05");
        assert_eq!(out.milestones[0].time.as_deref(), Some("17:00"));
        assert!(out.claimed.contains(MilestoneType::ShowDoorOpen));
    }

    #[test]
    fn first_rule_wins_the_line() {
        let out = classify_lines(
            &["2026/5/10(日) 開場17:00 開演18:00"],
            2026,
            ClaimedTypes::new(),
        );
        assert_eq!(kinds(&out), vec![MilestoneType::ShowDoorOpen]);
    }

    #[test]
    fn later_line_fills_remaining_type() {
        let out = classify_lines(
            &["2026/5/10(日) 開場17:00", "2026/5/10(日) 開演18:00"],
            2026,
            ClaimedTypes::new(),
        );
        assert_eq!(
            kinds(&out),
            vec![MilestoneType::ShowDoorOpen, MilestoneType::ShowStart]
        );
        assert_eq!(out.milestones[1].time.as_deref(), Some("18:00"));
    }

    #[test]
    fn date_found_on_next_line() {
        let out = classify_lines(
            &["■一般発売", "4月18日(土) 10:00〜"],
            2026,
            ClaimedTypes::new(),
        );
        assert_eq!(kinds(&out), vec![MilestoneType::GeneralSaleOpen]);
        assert_eq!(out.milestones[0].date, "2026-04-18");
        assert_eq!(out.milestones[0].time.as_deref(), Some("10:00"));
    }

    #[test]
    fn lookahead_is_one_line_only() {
        let out = classify_lines(
            &["■一般発売", "詳細は後日", "4月18日(土)"],
            2026,
            ClaimedTypes::new(),
        );
        assert!(out.milestones.is_empty());
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn claimed_types_are_skipped() {
        let mut claimed = ClaimedTypes::new();
        claimed.claim(MilestoneType::GeneralSaleOpen);
        let out = classify_lines(&["一般発売 4/18"], 2026, claimed);
        assert!(out.milestones.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn one_milestone_per_type() {
        let out = classify_lines(
            &["一般発売 4/18", "一般発売(追加) 4/25"],
            2026,
            ClaimedTypes::new(),
        );
        assert_eq!(out.milestones.len(), 1);
        assert_eq!(out.milestones[0].date, "2026-04-18");
    }

    #[test]
    fn fan_club_line_beats_official_scope() {
        let out = classify_lines(
            &["オフィシャルファンクラブ先行 受付 2026/2/1"],
            2026,
            ClaimedTypes::new(),
        );
        assert_eq!(kinds(&out), vec![MilestoneType::FcLotteryOpen]);
    }

    #[test]
    fn payment_deadline_is_not_a_lottery_close() {
        let out = classify_lines(&["FC先行 入金締切 3/12 23:59"], 2026, ClaimedTypes::new());
        assert_eq!(kinds(&out), vec![MilestoneType::PaymentDeadline]);
        assert_eq!(out.milestones[0].time.as_deref(), Some("23:59"));
    }
}
