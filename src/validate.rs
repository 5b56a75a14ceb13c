use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::models::Concert;

/// First structural problem found in a concert about to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub fn validate_concert(concert: &Concert) -> Result<(), ValidationError> {
    if concert.id.trim().is_empty() {
        return Err(ValidationError::new("id", "must not be empty"));
    }
    if concert.title.trim().is_empty() {
        return Err(ValidationError::new("title", "must not be empty"));
    }
    if concert.ticket_price == Some(0) {
        return Err(ValidationError::new("ticketPrice", "must be positive"));
    }

    for (idx, show) in concert.show_times.iter().enumerate() {
        check_date(&format!("showTimes[{idx}].date"), &show.date)?;
        if let Some(time) = &show.time {
            check_time(&format!("showTimes[{idx}].time"), time)?;
        }
    }

    let mut seen = HashSet::new();
    for (idx, milestone) in concert.milestones.iter().enumerate() {
        if milestone.id.trim().is_empty() {
            return Err(ValidationError::new(
                format!("milestones[{idx}].id"),
                "must not be empty",
            ));
        }
        if !seen.insert(milestone.id.as_str()) {
            return Err(ValidationError::new(
                format!("milestones[{idx}].id"),
                format!("duplicate id {}", milestone.id),
            ));
        }
        check_date(&format!("milestones[{idx}].date"), &milestone.date)?;
        if let Some(time) = &milestone.time {
            check_time(&format!("milestones[{idx}].time"), time)?;
        }
    }

    for (idx, source) in concert.sources.iter().enumerate() {
        if let Some(url) = &source.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::new(
                    format!("sources[{idx}].url"),
                    "must be an http(s) url",
                ));
            }
        }
    }

    Ok(())
}

fn check_date(path: &str, value: &str) -> Result<(), ValidationError> {
    let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    // parse_from_str accepts unpadded fields; stored dates must sort as strings.
    match parsed {
        Some(date) if date.format("%Y-%m-%d").to_string() == value => Ok(()),
        _ => Err(ValidationError::new(path, "expected YYYY-MM-DD")),
    }
}

fn check_time(path: &str, value: &str) -> Result<(), ValidationError> {
    match NaiveTime::parse_from_str(value, "%H:%M") {
        Ok(time) if time.format("%H:%M").to_string() == value => Ok(()),
        _ => Err(ValidationError::new(path, "expected HH:MM")),
    }
}
