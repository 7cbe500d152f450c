use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Active,
    Pending,
    #[serde(rename = "On Hold")]
    OnHold,
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 4] = [CaseStatus::Active, CaseStatus::Pending, CaseStatus::OnHold, CaseStatus::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Active => "Active",
            CaseStatus::Pending => "Pending",
            CaseStatus::OnHold => "On Hold",
            CaseStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CaseStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .or_else(|| wanted.eq_ignore_ascii_case("on_hold").then_some(CaseStatus::OnHold))
            .ok_or_else(|| format!("Unknown case status: {}", wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub client_id: Uuid,
    pub lawyer_id: Option<Uuid>,
    pub case_status: CaseStatus,
    pub next_hearing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}
