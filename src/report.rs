use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::analytics;
use crate::health::{classify_health, HealthLabel};
use crate::models::ProjectRecord;

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.0}%"))
}

fn project_line(record: &ProjectRecord) -> String {
    format!(
        "- {} ({}, {}) satisfaction {}, budget {}, timeline {}",
        record.project_name,
        record.client_name,
        record.lifecycle_status.label(),
        record
            .satisfaction
            .map_or_else(|| "unrated".to_string(), |s| s.to_string()),
        record.budget_status.map_or("unknown", |b| b.as_str()),
        record.timeline_status.map_or("unknown", |t| t.as_str()),
    )
}

pub fn build_report(owner: &str, generated_at: DateTime<Utc>, records: &[ProjectRecord]) -> String {
    let summary = analytics::summarize(records);
    let active = analytics::active_health_distribution(records);
    let completed = analytics::completed_health_distribution(records);
    let groups = analytics::group_by_health(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Project Lessons Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        owner,
        generated_at.format("%Y-%m-%d")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- {} projects ({} in flight, {} finished)",
        summary.total, summary.active, summary.completed
    );
    let _ = writeln!(
        output,
        "- Average satisfaction: {}",
        summary
            .average_satisfaction
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
    );
    let _ = writeln!(output, "- On or under budget: {}", pct(summary.on_or_under_budget_pct));
    let _ = writeln!(output, "- On time or early: {}", pct(summary.on_time_or_early_pct));
    let _ = writeln!(output, "- Scope changed: {}", pct(summary.scope_change_pct));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Active Project Health");
    if active.total == 0 {
        let _ = writeln!(output, "No active projects.");
    } else {
        let _ = writeln!(output, "- {}: {}", HealthLabel::Healthy.label(), active.healthy);
        let _ = writeln!(output, "- {}: {}", HealthLabel::AtRisk.label(), active.at_risk);
        let _ = writeln!(output, "- {}: {}", HealthLabel::Critical.label(), active.critical);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Completed Project Outcomes");
    if completed.total == 0 {
        let _ = writeln!(output, "No completed projects.");
    } else {
        let _ = writeln!(
            output,
            "- {}: {}",
            HealthLabel::Successful.label(),
            completed.successful
        );
        let _ = writeln!(
            output,
            "- {}: {}",
            HealthLabel::Underperformed.label(),
            completed.underperformed
        );
        let _ = writeln!(output, "- {}: {}", HealthLabel::Mixed.label(), completed.mixed);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");
    let attention: Vec<&ProjectRecord> = [HealthLabel::Critical, HealthLabel::AtRisk]
        .iter()
        .filter_map(|label| groups.get(label))
        .flatten()
        .copied()
        .collect();
    if attention.is_empty() {
        let _ = writeln!(output, "No active projects need attention.");
    } else {
        for record in attention {
            let _ = writeln!(
                output,
                "{} [{}]",
                project_line(record),
                classify_health(record).label()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Underperformed");
    match groups.get(&HealthLabel::Underperformed) {
        Some(records) if !records.is_empty() => {
            for record in records {
                let _ = writeln!(output, "{}", project_line(record));
            }
        }
        _ => {
            let _ = writeln!(output, "No underperformed projects.");
        }
    }

    let mut recent: Vec<&ProjectRecord> = records.iter().filter(|r| !r.notes.is_empty()).collect();
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Lessons");

    if recent.is_empty() {
        let _ = writeln!(output, "No notes recorded.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} on {}: {}",
                record.project_name,
                record.updated_at.format("%Y-%m-%d"),
                record.notes
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::sample_record;
    use crate::models::{BudgetStatus, LifecycleStatus, TimelineStatus};
    use chrono::TimeZone;

    #[test]
    fn report_lists_sections_and_attention_items() {
        let mut critical = sample_record(
            LifecycleStatus::Active,
            Some(1),
            Some(BudgetStatus::Over),
            Some(TimelineStatus::OnTime),
        );
        critical.project_name = "Data migration".to_string();
        let mut missed = sample_record(
            LifecycleStatus::Completed,
            Some(4),
            Some(BudgetStatus::On),
            Some(TimelineStatus::Late),
        );
        missed.project_name = "Mobile launch".to_string();
        missed.notes = String::new();

        let generated = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();
        let report = build_report("sam@example.com", generated, &[critical, missed]);

        assert!(report.starts_with("# Project Lessons Report\nGenerated for sam@example.com on 2026-04-01"));
        assert!(report.contains("- 2 projects (1 in flight, 1 finished)"));
        assert!(report.contains("- Critical: 1"));
        assert!(report.contains("- Underperformed: 1"));
        assert!(report.contains(
            "- Data migration (Northwind, Active) satisfaction 1, budget over, timeline on-time [Critical]"
        ));
        assert!(report.contains("- Mobile launch (Northwind, Completed) satisfaction 4, budget on, timeline late"));
        assert!(report.contains("- Data migration on 2026-03-14: kickoff went well"));
        assert!(!report.contains("Mobile launch on"));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let generated = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();
        let report = build_report("nobody", generated, &[]);
        assert!(report.contains("No active projects."));
        assert!(report.contains("No completed projects."));
        assert!(report.contains("No active projects need attention."));
        assert!(report.contains("No underperformed projects."));
        assert!(report.contains("No notes recorded."));
        assert!(report.contains("- Average satisfaction: n/a"));
    }
}
