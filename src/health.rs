//! Project health classification.
//!
//! Health is derived on read from a project's lifecycle status and its
//! performance signals. Nothing here touches storage, so the same inputs
//! always produce the same label.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{BudgetStatus, LifecycleStatus, ParseError, ProjectRecord, TimelineStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthLabel {
    Healthy,
    AtRisk,
    Critical,
    Successful,
    Underperformed,
    Mixed,
}

impl HealthLabel {
    pub const ACTIVE: [HealthLabel; 3] = [
        HealthLabel::Healthy,
        HealthLabel::AtRisk,
        HealthLabel::Critical,
    ];

    pub const COMPLETED: [HealthLabel; 3] = [
        HealthLabel::Successful,
        HealthLabel::Underperformed,
        HealthLabel::Mixed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthLabel::Healthy => "healthy",
            HealthLabel::AtRisk => "at-risk",
            HealthLabel::Critical => "critical",
            HealthLabel::Successful => "successful",
            HealthLabel::Underperformed => "underperformed",
            HealthLabel::Mixed => "mixed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthLabel::Healthy => "Healthy",
            HealthLabel::AtRisk => "At Risk",
            HealthLabel::Critical => "Critical",
            HealthLabel::Successful => "Successful",
            HealthLabel::Underperformed => "Underperformed",
            HealthLabel::Mixed => "Mixed",
        }
    }

    /// Presentation token consumed by renderers.
    pub fn style(self) -> &'static str {
        match self {
            HealthLabel::Healthy | HealthLabel::Successful => "success",
            HealthLabel::AtRisk => "warning",
            HealthLabel::Critical | HealthLabel::Underperformed => "danger",
            HealthLabel::Mixed => "info",
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthLabel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthLabel::Healthy),
            "at-risk" => Ok(HealthLabel::AtRisk),
            "critical" => Ok(HealthLabel::Critical),
            "successful" => Ok(HealthLabel::Successful),
            "underperformed" => Ok(HealthLabel::Underperformed),
            "mixed" => Ok(HealthLabel::Mixed),
            other => Err(ParseError::Health(other.to_string())),
        }
    }
}

pub const NEUTRAL_STYLE: &str = "neutral";

/// The signals health is computed from. Any store can supply them.
pub trait HealthSignals {
    fn lifecycle_status(&self) -> LifecycleStatus;
    fn satisfaction(&self) -> Option<i32>;
    fn budget_status(&self) -> Option<BudgetStatus>;
    fn timeline_status(&self) -> Option<TimelineStatus>;
}

impl HealthSignals for ProjectRecord {
    fn lifecycle_status(&self) -> LifecycleStatus {
        self.lifecycle_status
    }

    fn satisfaction(&self) -> Option<i32> {
        self.satisfaction
    }

    fn budget_status(&self) -> Option<BudgetStatus> {
        self.budget_status
    }

    fn timeline_status(&self) -> Option<TimelineStatus> {
        self.timeline_status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthInputs {
    pub lifecycle_status: LifecycleStatus,
    pub satisfaction: Option<i32>,
    pub budget_status: Option<BudgetStatus>,
    pub timeline_status: Option<TimelineStatus>,
}

impl HealthSignals for HealthInputs {
    fn lifecycle_status(&self) -> LifecycleStatus {
        self.lifecycle_status
    }

    fn satisfaction(&self) -> Option<i32> {
        self.satisfaction
    }

    fn budget_status(&self) -> Option<BudgetStatus> {
        self.budget_status
    }

    fn timeline_status(&self) -> Option<TimelineStatus> {
        self.timeline_status
    }
}

/// Missing satisfaction never counts as below a threshold.
fn satisfaction_below(satisfaction: Option<i32>, threshold: i32) -> bool {
    matches!(satisfaction, Some(value) if value < threshold)
}

fn satisfaction_at_least(satisfaction: Option<i32>, threshold: i32) -> bool {
    matches!(satisfaction, Some(value) if value >= threshold)
}

pub fn classify_health<T: HealthSignals + ?Sized>(project: &T) -> HealthLabel {
    if project.lifecycle_status().is_in_flight() {
        classify_active(project)
    } else {
        classify_completed(project)
    }
}

fn classify_active<T: HealthSignals + ?Sized>(project: &T) -> HealthLabel {
    let behind = project.timeline_status() == Some(TimelineStatus::Late);
    let over = project.budget_status() == Some(BudgetStatus::Over);
    let very_low_sat = satisfaction_below(project.satisfaction(), 2);
    let low_sat = satisfaction_below(project.satisfaction(), 3);

    let strikes = [behind, over, very_low_sat]
        .into_iter()
        .filter(|flag| *flag)
        .count();

    if strikes >= 2 {
        HealthLabel::Critical
    } else if behind || over || low_sat {
        HealthLabel::AtRisk
    } else {
        HealthLabel::Healthy
    }
}

fn classify_completed<T: HealthSignals + ?Sized>(project: &T) -> HealthLabel {
    let timeline = project.timeline_status();
    let budget = project.budget_status();

    let on_time_or_early = matches!(
        timeline,
        Some(TimelineStatus::OnTime) | Some(TimelineStatus::Early)
    );
    let on_or_under = matches!(budget, Some(BudgetStatus::On) | Some(BudgetStatus::Under));
    let high_sat = satisfaction_at_least(project.satisfaction(), 4);
    let low_sat = satisfaction_below(project.satisfaction(), 3);

    if on_time_or_early && on_or_under && high_sat {
        HealthLabel::Successful
    } else if budget == Some(BudgetStatus::Over)
        || timeline == Some(TimelineStatus::Late)
        || low_sat
    {
        HealthLabel::Underperformed
    } else {
        HealthLabel::Mixed
    }
}

/// Display label for a stored lifecycle string; unknown input is echoed.
pub fn lifecycle_label(raw: &str) -> &str {
    match raw.parse::<LifecycleStatus>() {
        Ok(status) if status.as_str() == raw => status.label(),
        _ => raw,
    }
}

/// Display label for a stored health string; unknown input is echoed.
pub fn health_label(raw: &str) -> &str {
    match raw.parse::<HealthLabel>() {
        Ok(label) => label.label(),
        Err(_) => raw,
    }
}

pub fn health_style(raw: &str) -> &'static str {
    match raw.parse::<HealthLabel>() {
        Ok(label) => label.style(),
        Err(_) => NEUTRAL_STYLE,
    }
}
