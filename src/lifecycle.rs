use chrono::NaiveDate;

use crate::models::{MilestoneStatus, TicketMilestone};

impl MilestoneStatus {
    /// The manual timeline tap. Cyclic so a mistaken tap can be undone;
    /// nothing here ever produces `Missed`.
    pub fn toggled(self) -> Self {
        match self {
            MilestoneStatus::Planned => MilestoneStatus::Done,
            MilestoneStatus::Done => MilestoneStatus::Planned,
            MilestoneStatus::Missed => MilestoneStatus::Done,
            MilestoneStatus::Cancelled => MilestoneStatus::Planned,
        }
    }
}

impl TicketMilestone {
    pub fn toggle(&mut self) -> MilestoneStatus {
        self.status = self.status.toggled();
        self.status
    }

    /// Still `planned` although its date has passed. Display only.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == MilestoneStatus::Planned && self.date.as_str() < iso(today).as_str()
    }

    /// Status to show on the timeline; the stored status is left as is.
    pub fn display_status(&self, today: NaiveDate) -> MilestoneStatus {
        if self.is_overdue(today) {
            MilestoneStatus::Missed
        } else {
            self.status
        }
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
