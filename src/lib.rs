pub mod config;
pub mod db;
pub mod fetch;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod parsing;
pub mod utils;
pub mod validate;

use anyhow::{anyhow, Context};
use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use config::AppConfig;
use db::ConcertStore;
use fetch::{FetchError, Fetcher};
use models::{
    Concert, ConcertDraft, ConcertPatch, ConcertStatus, MilestoneStatus, MilestoneType, Source,
};
use parsing::{parse_announcement, ParseContext};

/// A stored concert together with how its milestones should be shown today.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcertView {
    #[serde(flatten)]
    pub concert: Concert,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub milestone_id: String,
    #[serde(rename = "type")]
    pub kind: MilestoneType,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub display_status: MilestoneStatus,
}

impl ConcertView {
    pub fn new(concert: Concert, today: NaiveDate) -> Self {
        let timeline = concert
            .milestones
            .iter()
            .map(|m| TimelineEntry {
                milestone_id: m.id.clone(),
                kind: m.kind,
                date: m.date.clone(),
                time: m.time.clone(),
                display_status: m.display_status(today),
            })
            .collect();
        Self { concert, timeline }
    }
}

pub fn parse_context(config: &AppConfig) -> anyhow::Result<ParseContext> {
    let tz = config.tz().context("resolving configured timezone")?;
    Ok(ParseContext::now(tz))
}

pub fn parse_text(text: &str, config: &AppConfig) -> anyhow::Result<ConcertDraft> {
    Ok(parse_announcement(text, &parse_context(config)?))
}

/// Fetches and parses an announcement page. The error is kept typed so the
/// caller can show `FetchError::user_message` instead of parser warnings.
pub fn fetch_and_parse(
    url: &str,
    config: &AppConfig,
    ctx: &ParseContext,
) -> Result<ConcertDraft, FetchError> {
    let text = Fetcher::new(config)?.fetch_text(url)?;
    Ok(parse_announcement(&text, ctx))
}

/// Accepts either a reviewed draft as JSON (the output of `parse`) or raw
/// announcement text.
pub fn load_draft(input: &str, ctx: &ParseContext) -> ConcertDraft {
    if input.trim_start().starts_with('{') {
        match serde_json::from_str::<ConcertDraft>(input) {
            Ok(draft) => return draft,
            Err(err) => warn!("input is not a draft, parsing it as text: {err}"),
        }
    }
    parse_announcement(input, ctx)
}

pub fn commit_draft(
    store: &impl ConcertStore,
    draft: ConcertDraft,
    source: Source,
) -> anyhow::Result<Concert> {
    let concert = Concert::from_draft(draft, source, Utc::now());
    let created = store.create(concert).context("committing draft")?;
    info!(id = %created.id, milestones = created.milestones.len(), "draft committed");
    Ok(created)
}

pub fn list_concerts(
    store: &impl ConcertStore,
    today: NaiveDate,
) -> anyhow::Result<Vec<ConcertView>> {
    let concerts = store.list().context("listing concerts")?;
    Ok(concerts
        .into_iter()
        .map(|concert| ConcertView::new(concert, today))
        .collect())
}

pub fn toggle_milestone(
    store: &impl ConcertStore,
    concert_id: &str,
    milestone_id: &str,
) -> anyhow::Result<Concert> {
    store
        .toggle_milestone(concert_id, milestone_id)
        .with_context(|| format!("toggling milestone {milestone_id} of {concert_id}"))
}

pub fn patch_concert(
    store: &impl ConcertStore,
    concert_id: &str,
    patch: ConcertPatch,
) -> anyhow::Result<Concert> {
    store
        .patch(concert_id, patch)
        .with_context(|| format!("patching {concert_id}"))
}

pub fn set_status(
    store: &impl ConcertStore,
    concert_id: &str,
    status: ConcertStatus,
) -> anyhow::Result<Concert> {
    let patch = ConcertPatch {
        status: Some(status),
        ..ConcertPatch::default()
    };
    patch_concert(store, concert_id, patch)
}

pub fn delete_concert(store: &impl ConcertStore, concert_id: &str) -> anyhow::Result<()> {
    store
        .delete(concert_id)
        .with_context(|| format!("deleting {concert_id}"))
}

/// Reads a lowercase wire label such as `"confirmed"` or `"tweet"` into its enum.
pub fn from_label<T: DeserializeOwned>(label: &str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(label.to_lowercase()))
        .map_err(|_| anyhow!("unknown value: {label}"))
}
