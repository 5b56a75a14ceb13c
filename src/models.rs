use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schema version stamped on every persisted concert.
pub const CONCERT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneType {
    FcLotteryOpen,
    FcLotteryClose,
    FcLotteryResult,
    OfficialLotteryOpen,
    OfficialLotteryClose,
    OfficialLotteryResult,
    GeneralSaleOpen,
    PaymentDeadline,
    TicketIssueOpen,
    ShowDoorOpen,
    ShowStart,
}

impl MilestoneType {
    pub const ALL: [MilestoneType; 11] = [
        MilestoneType::FcLotteryOpen,
        MilestoneType::FcLotteryClose,
        MilestoneType::FcLotteryResult,
        MilestoneType::OfficialLotteryOpen,
        MilestoneType::OfficialLotteryClose,
        MilestoneType::OfficialLotteryResult,
        MilestoneType::GeneralSaleOpen,
        MilestoneType::PaymentDeadline,
        MilestoneType::TicketIssueOpen,
        MilestoneType::ShowDoorOpen,
        MilestoneType::ShowStart,
    ];

    /// Display label shown on the ticket timeline.
    pub fn label(self) -> &'static str {
        match self {
            MilestoneType::FcLotteryOpen => "FC先行 受付開始",
            MilestoneType::FcLotteryClose => "FC先行 受付締切",
            MilestoneType::FcLotteryResult => "FC先行 当落発表",
            MilestoneType::OfficialLotteryOpen => "オフィシャル先行 受付開始",
            MilestoneType::OfficialLotteryClose => "オフィシャル先行 受付締切",
            MilestoneType::OfficialLotteryResult => "オフィシャル先行 当落発表",
            MilestoneType::GeneralSaleOpen => "一般発売",
            MilestoneType::PaymentDeadline => "入金締切",
            MilestoneType::TicketIssueOpen => "発券開始",
            MilestoneType::ShowDoorOpen => "開場",
            MilestoneType::ShowStart => "開演",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    #[default]
    Planned,
    Done,
    Missed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketMilestone {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MilestoneType,
    pub label: String,
    pub date: String, // YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>, // HH:MM
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl TicketMilestone {
    /// Fresh milestone as produced by the parser: random id, `planned`.
    pub fn planned(kind: MilestoneType, date: String, time: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: kind.label().to_string(),
            date,
            time,
            status: MilestoneStatus::Planned,
            memo: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShowTime {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Unpersisted result of one parse call.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcertDraft {
    pub title: String,
    pub artist: String,
    pub venue: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<u64>,
    pub show_times: Vec<ShowTime>,
    pub milestones: Vec<TicketMilestone>,
    pub raw_text: String,
    pub warnings: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Tweet,
    News,
    Manual,
}

/// Where an announcement came from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    pub fn manual() -> Self {
        Self {
            kind: SourceType::Manual,
            url: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConcertStatus {
    #[default]
    Planned,
    Confirmed,
    Attended,
    Cancelled,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Concert {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub venue: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<u64>,
    pub show_times: Vec<ShowTime>,
    pub milestones: Vec<TicketMilestone>,
    pub status: ConcertStatus,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub raw_text: String,
    pub created_at: String,
    pub updated_at: String,
    pub version: u32,
}

impl Concert {
    /// Promotes a reviewed draft into a record ready for the store.
    pub fn from_draft(draft: ConcertDraft, source: Source, now: DateTime<Utc>) -> Self {
        let stamp = now.to_rfc3339();
        Concert {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            artist: draft.artist,
            venue: draft.venue,
            city: draft.city,
            ticket_price: draft.ticket_price,
            show_times: draft.show_times,
            milestones: draft.milestones,
            status: ConcertStatus::Planned,
            sources: vec![source],
            raw_text: draft.raw_text,
            created_at: stamp.clone(),
            updated_at: stamp,
            version: CONCERT_SCHEMA_VERSION,
        }
    }

    pub fn milestone_mut(&mut self, milestone_id: &str) -> Option<&mut TicketMilestone> {
        self.milestones.iter_mut().find(|m| m.id == milestone_id)
    }
}

/// Partial update applied by `ConcertStore::patch`. `None` leaves a field alone.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcertPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub ticket_price: Option<u64>,
    pub show_times: Option<Vec<ShowTime>>,
    pub milestones: Option<Vec<TicketMilestone>>,
    pub status: Option<ConcertStatus>,
    pub sources: Option<Vec<Source>>,
}

impl ConcertPatch {
    pub fn apply(self, concert: &mut Concert) {
        if let Some(title) = self.title {
            concert.title = title;
        }
        if let Some(artist) = self.artist {
            concert.artist = artist;
        }
        if let Some(venue) = self.venue {
            concert.venue = venue;
        }
        if let Some(city) = self.city {
            concert.city = city;
        }
        if self.ticket_price.is_some() {
            concert.ticket_price = self.ticket_price;
        }
        if let Some(show_times) = self.show_times {
            concert.show_times = show_times;
        }
        if let Some(milestones) = self.milestones {
            concert.milestones = milestones;
        }
        if let Some(status) = self.status {
            concert.status = status;
        }
        if let Some(sources) = self.sources {
            concert.sources = sources;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_serializes_with_wire_names() {
        let milestone = TicketMilestone {
            id: "m1".to_string(),
            kind: MilestoneType::ShowDoorOpen,
            label: "開場".to_string(),
            date: "2026-03-05".to_string(),
            time: Some("17:00".to_string()),
            status: MilestoneStatus::Planned,
            memo: None,
        };
        let value = serde_json::to_value(&milestone).expect("serialize milestone");
        assert_eq!(value["type"], "SHOW_DOOR_OPEN");
        assert_eq!(value["status"], "planned");
        assert_eq!(value["time"], "17:00");
        assert!(value.get("memo").is_none());
    }

    #[test]
    fn draft_uses_camel_case_fields() {
        let draft = ConcertDraft {
            ticket_price: Some(8800),
            raw_text: "x".to_string(),
            ..ConcertDraft::default()
        };
        let value = serde_json::to_value(&draft).expect("serialize draft");
        assert_eq!(value["ticketPrice"], 8800);
        assert_eq!(value["rawText"], "x");
        assert!(value["showTimes"].as_array().expect("array").is_empty());
    }

    #[test]
    fn from_draft_starts_planned_with_one_source() {
        let draft = ConcertDraft {
            title: "SPRING TOUR 2026".to_string(),
            ..ConcertDraft::default()
        };
        let source = Source {
            kind: SourceType::Tweet,
            url: Some("https://x.com/a/status/1".to_string()),
        };
        let concert = Concert::from_draft(draft, source.clone(), Utc::now());
        assert_eq!(concert.status, ConcertStatus::Planned);
        assert_eq!(concert.sources, vec![source]);
        assert_eq!(concert.created_at, concert.updated_at);
        assert_eq!(concert.version, CONCERT_SCHEMA_VERSION);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let draft = ConcertDraft {
            title: "old".to_string(),
            venue: "日本武道館".to_string(),
            ..ConcertDraft::default()
        };
        let mut concert = Concert::from_draft(draft, Source::manual(), Utc::now());
        ConcertPatch {
            title: Some("new".to_string()),
            status: Some(ConcertStatus::Confirmed),
            ..ConcertPatch::default()
        }
        .apply(&mut concert);
        assert_eq!(concert.title, "new");
        assert_eq!(concert.venue, "日本武道館");
        assert_eq!(concert.status, ConcertStatus::Confirmed);
    }
}
