use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown lifecycle status '{0}' (expected active, on_hold, completed or cancelled)")]
    Lifecycle(String),

    #[error("unknown budget status '{0}' (expected under, on or over)")]
    Budget(String),

    #[error("unknown timeline status '{0}' (expected early, on-time or late)")]
    Timeline(String),

    #[error("unknown role '{0}' (expected user or admin)")]
    Role(String),

    #[error("unknown subscription tier '{0}' (expected free, pro or enterprise)")]
    Tier(String),

    #[error("unknown health label '{0}'")]
    Health(String),

    #[error("satisfaction must be between 1 and 5, got {0}")]
    Satisfaction(i32),
}

fn clean(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 4] = [
        LifecycleStatus::Active,
        LifecycleStatus::OnHold,
        LifecycleStatus::Completed,
        LifecycleStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Active => "active",
            LifecycleStatus::OnHold => "on_hold",
            LifecycleStatus::Completed => "completed",
            LifecycleStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LifecycleStatus::Active => "Active",
            LifecycleStatus::OnHold => "On Hold",
            LifecycleStatus::Completed => "Completed",
            LifecycleStatus::Cancelled => "Cancelled",
        }
    }

    /// Active and on-hold projects share the in-flight bucket.
    pub fn is_in_flight(self) -> bool {
        matches!(self, LifecycleStatus::Active | LifecycleStatus::OnHold)
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match clean(s).replace(['-', ' '], "_").as_str() {
            "active" => Ok(LifecycleStatus::Active),
            "on_hold" | "onhold" => Ok(LifecycleStatus::OnHold),
            "completed" => Ok(LifecycleStatus::Completed),
            "cancelled" | "canceled" => Ok(LifecycleStatus::Cancelled),
            _ => Err(ParseError::Lifecycle(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Under,
    On,
    Over,
}

impl BudgetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetStatus::Under => "under",
            BudgetStatus::On => "on",
            BudgetStatus::Over => "over",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match clean(s).as_str() {
            "under" | "under-budget" | "under_budget" => Ok(BudgetStatus::Under),
            "on" | "on-budget" | "on_budget" => Ok(BudgetStatus::On),
            "over" | "over-budget" | "over_budget" => Ok(BudgetStatus::Over),
            _ => Err(ParseError::Budget(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineStatus {
    Early,
    OnTime,
    Late,
}

impl TimelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineStatus::Early => "early",
            TimelineStatus::OnTime => "on-time",
            TimelineStatus::Late => "late",
        }
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimelineStatus {
    type Err = ParseError;

    /// `on` is accepted as a legacy spelling of `on-time`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match clean(s).as_str() {
            "early" => Ok(TimelineStatus::Early),
            "on-time" | "on_time" | "ontime" | "on time" | "on" => Ok(TimelineStatus::OnTime),
            "late" => Ok(TimelineStatus::Late),
            _ => Err(ParseError::Timeline(s.to_string())),
        }
    }
}

pub fn validate_satisfaction(value: i32) -> Result<i32, ParseError> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(ParseError::Satisfaction(value))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_name: String,
    pub client_name: String,
    pub role: String,
    pub lifecycle_status: LifecycleStatus,
    pub satisfaction: Option<i32>,
    pub budget_status: Option<BudgetStatus>,
    pub timeline_status: Option<TimelineStatus>,
    pub scope_change: Option<bool>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub project_name: String,
    pub client_name: String,
    pub role: String,
    pub lifecycle_status: LifecycleStatus,
    pub satisfaction: i32,
    pub budget_status: BudgetStatus,
    pub timeline_status: TimelineStatus,
    pub scope_change: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub reason: Option<String>,
    pub completion_summary: Option<String>,
    pub blockers: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match clean(s).as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseError::Role(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }
}

impl FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match clean(s).as_str() {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            _ => Err(ParseError::Tier(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub total: usize,
    pub finished: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_accepts_legacy_on() {
        assert_eq!("on".parse::<TimelineStatus>(), Ok(TimelineStatus::OnTime));
        assert_eq!("On-Time".parse::<TimelineStatus>(), Ok(TimelineStatus::OnTime));
        assert_eq!("on_time".parse::<TimelineStatus>(), Ok(TimelineStatus::OnTime));
        assert_eq!(TimelineStatus::OnTime.as_str(), "on-time");
    }

    #[test]
    fn unknown_values_are_rejected_with_the_raw_input() {
        assert_eq!(
            "sideways".parse::<TimelineStatus>(),
            Err(ParseError::Timeline("sideways".to_string()))
        );
        assert_eq!(
            "huge".parse::<BudgetStatus>(),
            Err(ParseError::Budget("huge".to_string()))
        );
        assert!("archived".parse::<LifecycleStatus>().is_err());
    }

    #[test]
    fn lifecycle_round_trips_through_storage_strings() {
        for status in LifecycleStatus::ALL {
            assert_eq!(status.as_str().parse::<LifecycleStatus>(), Ok(status));
        }
        assert_eq!("on-hold".parse::<LifecycleStatus>(), Ok(LifecycleStatus::OnHold));
    }

    #[test]
    fn in_flight_bucket_is_active_and_on_hold() {
        assert!(LifecycleStatus::Active.is_in_flight());
        assert!(LifecycleStatus::OnHold.is_in_flight());
        assert!(!LifecycleStatus::Completed.is_in_flight());
        assert!(!LifecycleStatus::Cancelled.is_in_flight());
    }

    #[test]
    fn satisfaction_bounds() {
        assert_eq!(validate_satisfaction(1), Ok(1));
        assert_eq!(validate_satisfaction(5), Ok(5));
        assert_eq!(validate_satisfaction(0), Err(ParseError::Satisfaction(0)));
        assert_eq!(validate_satisfaction(6), Err(ParseError::Satisfaction(6)));
    }

    #[test]
    fn timeline_serializes_kebab_case() {
        let json = serde_json::to_string(&TimelineStatus::OnTime).unwrap();
        assert_eq!(json, "\"on-time\"");
        let json = serde_json::to_string(&LifecycleStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
    }
}
