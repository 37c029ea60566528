use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::health::classify_health;
use crate::models::ProjectRecord;

#[derive(Serialize)]
struct ExportRow<'a> {
    id: String,
    project_name: &'a str,
    client_name: &'a str,
    role: &'a str,
    status: &'static str,
    health: &'static str,
    satisfaction: Option<i32>,
    budget_status: Option<&'static str>,
    timeline_status: Option<&'static str>,
    scope_change: Option<bool>,
    created: String,
    notes: &'a str,
}

impl<'a> From<&'a ProjectRecord> for ExportRow<'a> {
    fn from(record: &'a ProjectRecord) -> Self {
        Self {
            id: record.id.to_string(),
            project_name: &record.project_name,
            client_name: &record.client_name,
            role: &record.role,
            status: record.lifecycle_status.label(),
            health: classify_health(record).label(),
            satisfaction: record.satisfaction,
            budget_status: record.budget_status.map(|b| b.as_str()),
            timeline_status: record.timeline_status.map(|t| t.as_str()),
            scope_change: record.scope_change,
            created: record.created_at.date_naive().to_string(),
            notes: &record.notes,
        }
    }
}

pub fn write_csv<W: Write>(writer: W, records: &[ProjectRecord]) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ExportRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}

pub fn export_to_path(path: &Path, records: &[ProjectRecord]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let written = write_csv(file, records)?;
    tracing::info!(path = %path.display(), rows = written, "csv export written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::tests::sample_record;
    use crate::models::{BudgetStatus, LifecycleStatus, TimelineStatus};

    #[test]
    fn rows_carry_shared_health_label() {
        let mut late = sample_record(
            LifecycleStatus::Completed,
            Some(5),
            Some(BudgetStatus::On),
            Some(TimelineStatus::Late),
        );
        late.notes = "handoff, slipped two weeks".to_string();
        let unknown = sample_record(LifecycleStatus::Active, None, None, None);

        let mut buffer = Vec::new();
        let written = write_csv(&mut buffer, &[late, unknown]).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,project_name,client_name,role,status,health,satisfaction,budget_status,\
             timeline_status,scope_change,created,notes"
        );
        assert!(lines[1].contains(",Completed,Underperformed,5,on,late,false,2026-03-14,"));
        assert!(lines[1].ends_with("\"handoff, slipped two weeks\""));
        assert!(lines[2].contains(",Active,Healthy,,,,false,"));
    }

    #[test]
    fn export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lessons.csv");
        let records = vec![sample_record(
            LifecycleStatus::Active,
            Some(4),
            Some(BudgetStatus::Over),
            Some(TimelineStatus::Late),
        )];

        assert_eq!(export_to_path(&path, &records).unwrap(), 1);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(",Active,Critical,4,over,late,"));
    }
}
