use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::health::{classify_health, HealthLabel, HealthSignals};
use crate::models::{BudgetStatus, MonthlyCount, ProjectRecord, TimelineStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveDistribution {
    pub healthy: usize,
    pub at_risk: usize,
    pub critical: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletedDistribution {
    pub successful: usize,
    pub underperformed: usize,
    pub mixed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub average_satisfaction: Option<f64>,
    pub on_or_under_budget_pct: Option<f64>,
    pub on_time_or_early_pct: Option<f64>,
    pub scope_change_pct: Option<f64>,
}

/// Splits records into the in-flight (active, on hold) and finished
/// (completed, cancelled) buckets, preserving input order.
pub fn partition_by_lifecycle<T: HealthSignals>(records: &[T]) -> (Vec<&T>, Vec<&T>) {
    records
        .iter()
        .partition(|record| record.lifecycle_status().is_in_flight())
}

pub fn group_by_health<T: HealthSignals>(records: &[T]) -> BTreeMap<HealthLabel, Vec<&T>> {
    let mut groups: BTreeMap<HealthLabel, Vec<&T>> = BTreeMap::new();
    for record in records {
        groups.entry(classify_health(record)).or_default().push(record);
    }
    groups
}

pub fn active_health_distribution<T: HealthSignals>(records: &[T]) -> ActiveDistribution {
    let mut dist = ActiveDistribution::default();
    for record in records.iter().filter(|r| r.lifecycle_status().is_in_flight()) {
        // classify_health dispatches on is_in_flight, so only active labels occur
        let label = classify_health(record);
        debug_assert!(
            HealthLabel::ACTIVE.contains(&label),
            "in-flight project classified as {label}"
        );
        match label {
            HealthLabel::Healthy => dist.healthy += 1,
            HealthLabel::AtRisk => dist.at_risk += 1,
            HealthLabel::Critical => dist.critical += 1,
            _ => continue,
        }
        dist.total += 1;
    }
    dist
}

pub fn completed_health_distribution<T: HealthSignals>(records: &[T]) -> CompletedDistribution {
    let mut dist = CompletedDistribution::default();
    for record in records.iter().filter(|r| !r.lifecycle_status().is_in_flight()) {
        let label = classify_health(record);
        debug_assert!(
            HealthLabel::COMPLETED.contains(&label),
            "finished project classified as {label}"
        );
        match label {
            HealthLabel::Successful => dist.successful += 1,
            HealthLabel::Underperformed => dist.underperformed += 1,
            HealthLabel::Mixed => dist.mixed += 1,
            _ => continue,
        }
        dist.total += 1;
    }
    dist
}

pub fn percent(hits: usize, of: usize) -> Option<f64> {
    if of == 0 {
        None
    } else {
        Some(hits as f64 * 100.0 / of as f64)
    }
}

/// Record counts per creation month (`YYYY-MM`), oldest first. `finished`
/// uses the same bucket as the completed distribution.
pub fn monthly_counts(records: &[ProjectRecord]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = months
            .entry(record.created_at.format("%Y-%m").to_string())
            .or_insert((0, 0));
        entry.0 += 1;
        if !record.lifecycle_status.is_in_flight() {
            entry.1 += 1;
        }
    }

    months
        .into_iter()
        .map(|(month, (total, finished))| MonthlyCount {
            month,
            total,
            finished,
        })
        .collect()
}

pub fn summarize(records: &[ProjectRecord]) -> Summary {
    let (active, completed) = partition_by_lifecycle(records);

    let ratings: Vec<i32> = records.iter().filter_map(|r| r.satisfaction).collect();
    let average_satisfaction = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().sum::<i32>() as f64 / ratings.len() as f64)
    };

    let budgets: Vec<BudgetStatus> = records.iter().filter_map(|r| r.budget_status).collect();
    let on_budget = budgets
        .iter()
        .filter(|b| matches!(b, BudgetStatus::On | BudgetStatus::Under))
        .count();

    let timelines: Vec<TimelineStatus> =
        records.iter().filter_map(|r| r.timeline_status).collect();
    let on_time = timelines
        .iter()
        .filter(|t| matches!(t, TimelineStatus::OnTime | TimelineStatus::Early))
        .count();

    let scope: Vec<bool> = records.iter().filter_map(|r| r.scope_change).collect();
    let changed = scope.iter().filter(|changed| **changed).count();

    Summary {
        total: records.len(),
        active: active.len(),
        completed: completed.len(),
        average_satisfaction,
        on_or_under_budget_pct: percent(on_budget, budgets.len()),
        on_time_or_early_pct: percent(on_time, timelines.len()),
        scope_change_pct: percent(changed, scope.len()),
    }
}

/// Rule-based callouts shown to tiers with insights enabled.
pub fn insights(records: &[ProjectRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec!["Not enough projects recorded to generate insights.".to_string()];
    }

    let mut notes = Vec::new();
    let active = active_health_distribution(records);
    let completed = completed_health_distribution(records);
    let summary = summarize(records);

    if let Some(pct) = percent(active.critical, active.total) {
        if active.critical > 0 {
            notes.push(format!(
                "{} of {} active projects are critical ({pct:.0}%). Review them first.",
                active.critical, active.total
            ));
        } else if active.at_risk > 0 {
            notes.push(format!(
                "No critical projects; {} of {} active projects are at risk.",
                active.at_risk, active.total
            ));
        }
    }

    if let Some(pct) = percent(completed.successful, completed.total) {
        notes.push(format!(
            "{pct:.0}% of finished projects were successful ({} of {}).",
            completed.successful, completed.total
        ));
    }

    if let Some(pct) = summary.scope_change_pct {
        if pct >= 50.0 {
            notes.push(format!(
                "Scope changed on {pct:.0}% of projects; baseline requirements earlier."
            ));
        }
    }

    let late_by_client = late_clients(records);
    if let Some((client, count)) = late_by_client.first() {
        if *count > 1 {
            notes.push(format!("{client} has {count} late projects."));
        }
    }

    if notes.is_empty() {
        notes.push("All tracked projects look on course.".to_string());
    }
    notes
}

fn late_clients(records: &[ProjectRecord]) -> Vec<(String, usize)> {
    let mut map: HashMap<String, usize> = HashMap::new();
    for record in records {
        if record.timeline_status == Some(TimelineStatus::Late) {
            *map.entry(record.client_name.clone()).or_insert(0) += 1;
        }
    }

    let mut values: Vec<(String, usize)> = map.into_iter().collect();
    values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    values
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::LifecycleStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn sample_record(
        lifecycle_status: LifecycleStatus,
        satisfaction: Option<i32>,
        budget_status: Option<BudgetStatus>,
        timeline_status: Option<TimelineStatus>,
    ) -> ProjectRecord {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        ProjectRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            project_name: "Billing revamp".to_string(),
            client_name: "Northwind".to_string(),
            role: "Tech lead".to_string(),
            lifecycle_status,
            satisfaction,
            budget_status,
            timeline_status,
            scope_change: Some(false),
            notes: "kickoff went well".to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    fn mixed_bag() -> Vec<ProjectRecord> {
        use BudgetStatus::*;
        use LifecycleStatus::*;
        use TimelineStatus::*;

        vec![
            sample_record(Active, Some(5), Some(On), Some(OnTime)),
            sample_record(Active, Some(4), Some(Over), Some(Late)),
            sample_record(OnHold, Some(2), Some(Under), Some(Early)),
            sample_record(Completed, Some(5), Some(Under), Some(OnTime)),
            sample_record(Completed, Some(3), Some(On), Some(Early)),
            sample_record(Cancelled, None, Some(Over), None),
            sample_record(Active, None, None, None),
        ]
    }

    #[test]
    fn partition_covers_every_record_once() {
        let records = mixed_bag();
        let (active, completed) = partition_by_lifecycle(&records);
        assert_eq!(active.len(), 4);
        assert_eq!(completed.len(), 3);

        let mut ids: Vec<Uuid> = active.iter().chain(completed.iter()).map(|r| r.id).collect();
        ids.sort();
        let mut expected: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn distributions_sum_to_bucket_size() {
        let records = mixed_bag();
        let active = active_health_distribution(&records);
        assert_eq!(
            active,
            ActiveDistribution {
                healthy: 2,
                at_risk: 1,
                critical: 1,
                total: 4
            }
        );
        assert_eq!(active.healthy + active.at_risk + active.critical, active.total);

        let completed = completed_health_distribution(&records);
        assert_eq!(
            completed,
            CompletedDistribution {
                successful: 1,
                underperformed: 1,
                mixed: 1,
                total: 3
            }
        );
    }

    #[test]
    fn distribution_totals_hold_across_every_input() {
        use BudgetStatus::*;
        use TimelineStatus::*;

        let mut records = Vec::new();
        for lifecycle in LifecycleStatus::ALL {
            for sat in [None, Some(1), Some(2), Some(3), Some(4), Some(5)] {
                for budget in [None, Some(Under), Some(On), Some(Over)] {
                    for timeline in [None, Some(Early), Some(OnTime), Some(Late)] {
                        records.push(sample_record(lifecycle, sat, budget, timeline));
                    }
                }
            }
        }

        let (in_flight, finished) = partition_by_lifecycle(&records);
        let active = active_health_distribution(&records);
        assert_eq!(active.total, in_flight.len());
        assert_eq!(active.healthy + active.at_risk + active.critical, active.total);

        let completed = completed_health_distribution(&records);
        assert_eq!(completed.total, finished.len());
        assert_eq!(
            completed.successful + completed.underperformed + completed.mixed,
            completed.total
        );
    }

    #[test]
    fn empty_input_gives_zero_distributions() {
        let records: Vec<ProjectRecord> = Vec::new();
        assert_eq!(active_health_distribution(&records), ActiveDistribution::default());
        assert_eq!(
            completed_health_distribution(&records),
            CompletedDistribution::default()
        );
        assert_eq!(summarize(&records).average_satisfaction, None);
    }

    #[test]
    fn group_by_health_matches_classifier() {
        let records = mixed_bag();
        let groups = group_by_health(&records);
        let grouped: usize = groups.values().map(Vec::len).sum();
        assert_eq!(grouped, records.len());
        for (label, members) in &groups {
            for member in members {
                assert_eq!(classify_health(*member), *label);
            }
        }
        assert_eq!(groups[&HealthLabel::Healthy].len(), 2);
    }

    #[test]
    fn monthly_counts_are_sorted_by_month() {
        let mut records = mixed_bag();
        records[0].created_at = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        records[3].created_at = Utc.with_ymd_and_hms(2025, 12, 30, 0, 0, 0).unwrap();

        let months = monthly_counts(&records);
        let keys: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(keys, vec!["2025-12", "2026-01", "2026-03"]);
        assert_eq!(months[0].finished, 1);
        assert_eq!(months[2].total, 5);
        // one completed and one cancelled record
        assert_eq!(months[2].finished, 2);
    }

    #[test]
    fn summary_percentages_ignore_missing_signals() {
        let mut records = mixed_bag();
        records[1].scope_change = Some(true);
        records[6].scope_change = None;

        let summary = summarize(&records);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.active, 4);
        assert_eq!(summary.completed, 3);
        // 5 + 4 + 2 + 5 + 3 over five ratings
        assert_eq!(summary.average_satisfaction, Some(3.8));
        // four of six budgets are on or under
        let budget = summary.on_or_under_budget_pct.unwrap();
        assert!((budget - 66.666).abs() < 0.01);
        assert_eq!(summary.on_time_or_early_pct, Some(80.0));
        let scope = summary.scope_change_pct.unwrap();
        assert!((scope - 16.666).abs() < 0.01);
    }

    #[test]
    fn insights_call_out_critical_work() {
        let records = mixed_bag();
        let notes = insights(&records);
        assert!(notes[0].starts_with("1 of 4 active projects are critical"));
        assert!(notes.iter().any(|n| n.contains("of finished projects were successful")));
    }

    #[test]
    fn insights_handle_empty_input() {
        assert_eq!(
            insights(&[]),
            vec!["Not enough projects recorded to generate insights.".to_string()]
        );
    }
}
