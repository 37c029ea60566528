use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    validate_satisfaction, BudgetStatus, LifecycleStatus, NewProject, Profile, ProjectRecord,
    Role, StatusChange, Tier, TimelineStatus,
};

pub const DEMO_EMAIL: &str = "demo@lessons.dev";

const PROJECT_COLUMNS: &str = "id, user_id, project_name, client_name, role, lifecycle_status, \
     satisfaction, budget_status, timeline_status, scope_change, notes, created_at, updated_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Parses a stored signal leniently: unknown values are logged and dropped
/// so classification treats them as unflagged.
fn normalize_signal<T: FromStr>(raw: Option<String>, field: &'static str, id: Uuid) -> Option<T> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(lesson = %id, field, value = %raw, "unrecognized signal value");
            None
        }
    }
}

pub fn normalize_budget(raw: Option<String>, id: Uuid) -> Option<BudgetStatus> {
    normalize_signal(raw, "budget_status", id)
}

pub fn normalize_timeline(raw: Option<String>, id: Uuid) -> Option<TimelineStatus> {
    normalize_signal(raw, "timeline_status", id)
}

fn project_from_row(row: &PgRow) -> anyhow::Result<ProjectRecord> {
    let id: Uuid = row.try_get("id")?;
    let lifecycle: String = row.try_get("lifecycle_status")?;

    Ok(ProjectRecord {
        id,
        user_id: row.try_get("user_id")?,
        project_name: row.try_get("project_name")?,
        client_name: row.try_get("client_name")?,
        role: row.try_get("role")?,
        lifecycle_status: lifecycle
            .parse::<LifecycleStatus>()
            .with_context(|| format!("lesson {id} has an invalid lifecycle status"))?,
        satisfaction: row.try_get("satisfaction")?,
        budget_status: normalize_budget(row.try_get("budget_status")?, id),
        timeline_status: normalize_timeline(row.try_get("timeline_status")?, id),
        scope_change: row.try_get("scope_change")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn load_profile(pool: &PgPool, email: &str) -> anyhow::Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT id, email, full_name, role, subscription_tier \
         FROM lessons_tracker.profiles WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let role: String = row.try_get("role")?;
    let tier: String = row.try_get("subscription_tier")?;
    Ok(Some(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role: Role::from_str(&role)?,
        tier: Tier::from_str(&tier)?,
    }))
}

pub async fn upsert_profile(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    tier: Tier,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO lessons_tracker.profiles (id, email, full_name, subscription_tier)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, subscription_tier = EXCLUDED.subscription_tier
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(tier.as_str())
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Import keys are unique per owner, so two users can load the same file.
const INSERT_LESSON_SQL: &str = r#"
    INSERT INTO lessons_tracker.lessons
    (id, user_id, project_name, client_name, role, lifecycle_status, satisfaction,
     budget_status, timeline_status, scope_change, notes, source_key, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
    ON CONFLICT (user_id, source_key) DO NOTHING
    "#;

async fn insert_lesson<'e, E>(
    executor: E,
    user_id: Uuid,
    project: &NewProject,
    source_key: Option<&str>,
    created_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Option<Uuid>>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = Uuid::new_v4();
    let created_at = created_at.unwrap_or_else(Utc::now);
    let result = sqlx::query(INSERT_LESSON_SQL)
        .bind(id)
        .bind(user_id)
        .bind(&project.project_name)
        .bind(&project.client_name)
        .bind(&project.role)
        .bind(project.lifecycle_status.as_str())
        .bind(project.satisfaction)
        .bind(project.budget_status.as_str())
        .bind(project.timeline_status.as_str())
        .bind(project.scope_change)
        .bind(&project.notes)
        .bind(source_key)
        .bind(created_at)
        .execute(executor)
        .await?;

    Ok((result.rows_affected() > 0).then_some(id))
}

pub async fn insert_project(
    pool: &PgPool,
    user_id: Uuid,
    project: &NewProject,
) -> anyhow::Result<Uuid> {
    let id = insert_lesson(pool, user_id, project, None, None)
        .await?
        .context("lesson insert affected no rows")?;
    tracing::info!(lesson = %id, project = %project.project_name, "lesson recorded");
    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let user_id = upsert_profile(pool, DEMO_EMAIL, "Demo Consultant", Tier::Enterprise).await?;

    let lessons = vec![
        (
            "seed-001",
            "Billing platform rewrite",
            "Northwind",
            LifecycleStatus::Completed,
            5,
            BudgetStatus::Under,
            TimelineStatus::OnTime,
            false,
            "Weekly demos kept stakeholders aligned",
        ),
        (
            "seed-002",
            "Warehouse scanner rollout",
            "Contoso",
            LifecycleStatus::Active,
            4,
            BudgetStatus::Over,
            TimelineStatus::Late,
            true,
            "Hardware delivery slipped twice",
        ),
        (
            "seed-003",
            "Loyalty app refresh",
            "Fabrikam",
            LifecycleStatus::Active,
            4,
            BudgetStatus::On,
            TimelineStatus::OnTime,
            false,
            "Design system reuse saved a sprint",
        ),
        (
            "seed-004",
            "Data warehouse migration",
            "Contoso",
            LifecycleStatus::Completed,
            3,
            BudgetStatus::On,
            TimelineStatus::Early,
            true,
            "Source data quality was worse than scoped",
        ),
        (
            "seed-005",
            "CRM consolidation",
            "Tailspin",
            LifecycleStatus::OnHold,
            2,
            BudgetStatus::On,
            TimelineStatus::Late,
            false,
            "Paused pending vendor contract",
        ),
    ];

    for (source_key, name, client, status, satisfaction, budget, timeline, scope_change, notes) in
        lessons
    {
        let project = NewProject {
            project_name: name.to_string(),
            client_name: client.to_string(),
            role: "Delivery lead".to_string(),
            lifecycle_status: status,
            satisfaction,
            budget_status: budget,
            timeline_status: timeline,
            scope_change,
            notes: notes.to_string(),
        };
        insert_lesson(pool, user_id, &project, Some(source_key), None).await?;
    }

    Ok(user_id)
}

pub async fn fetch_projects(
    pool: &PgPool,
    user_id: Uuid,
    lifecycle: Option<LifecycleStatus>,
) -> anyhow::Result<Vec<ProjectRecord>> {
    let mut query = format!(
        "SELECT {PROJECT_COLUMNS} FROM lessons_tracker.lessons WHERE user_id = $1"
    );
    if lifecycle.is_some() {
        query.push_str(" AND lifecycle_status = $2");
    }
    query.push_str(" ORDER BY created_at DESC");

    let mut rows = sqlx::query(&query).bind(user_id);
    if let Some(status) = lifecycle {
        rows = rows.bind(status.as_str());
    }

    let records = rows.fetch_all(pool).await?;
    let projects = records
        .iter()
        .map(project_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::debug!(user = %user_id, count = projects.len(), "fetched lessons");
    Ok(projects)
}

/// Changes a lesson's lifecycle status and appends an audit row in the same
/// transaction. Returns the previous status.
pub async fn update_status(
    pool: &PgPool,
    user_id: Uuid,
    lesson_id: Uuid,
    to: LifecycleStatus,
    change: &StatusChange,
) -> anyhow::Result<LifecycleStatus> {
    let mut tx = pool.begin().await?;

    let current: Option<String> = sqlx::query(
        "SELECT lifecycle_status FROM lessons_tracker.lessons \
         WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(lesson_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(|row| row.get("lifecycle_status"));

    let from: LifecycleStatus = current
        .with_context(|| format!("lesson {lesson_id} not found"))?
        .parse()?;

    sqlx::query(
        "UPDATE lessons_tracker.lessons SET lifecycle_status = $1, updated_at = now() WHERE id = $2",
    )
    .bind(to.as_str())
    .bind(lesson_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO lessons_tracker.lesson_status_changes
        (id, lesson_id, from_status, to_status, reason, completion_summary, blockers)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(lesson_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(change.reason.as_deref())
    .bind(change.completion_summary.as_deref())
    .bind(change.blockers.as_deref())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(lesson = %lesson_id, %from, %to, "lifecycle status changed");
    Ok(from)
}

#[derive(Debug, serde::Deserialize)]
pub struct CsvRow {
    pub project_name: String,
    pub client_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub lifecycle_status: Option<String>,
    pub satisfaction: i32,
    pub budget_status: String,
    pub timeline_status: String,
    #[serde(default)]
    pub scope_change: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: Option<DateTime<Utc>>,
    pub source_key: Option<String>,
}

impl CsvRow {
    pub fn into_project(self) -> anyhow::Result<NewProject> {
        let lifecycle_status = match self.lifecycle_status.as_deref().map(str::trim) {
            None | Some("") => LifecycleStatus::Active,
            Some(raw) => raw.parse()?,
        };

        Ok(NewProject {
            project_name: self.project_name,
            client_name: self.client_name,
            role: self.role,
            lifecycle_status,
            satisfaction: validate_satisfaction(self.satisfaction)?,
            budget_status: self.budget_status.parse()?,
            timeline_status: self.timeline_status.parse()?,
            scope_change: self.scope_change,
            notes: self.notes,
        })
    }
}

#[derive(Debug)]
pub struct ImportRow {
    pub source_key: String,
    pub created_at: Option<DateTime<Utc>>,
    pub project: NewProject,
}

/// Validates every row before anything is written; the first bad line
/// fails the whole file.
pub fn read_import<R: std::io::Read>(reader: R) -> anyhow::Result<Vec<ImportRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        let source_key = row
            .source_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let created_at = row.created_at;
        let project = row
            .into_project()
            .with_context(|| format!("line {line}: invalid value"))?;

        rows.push(ImportRow {
            source_key,
            created_at,
            project,
        });
    }

    Ok(rows)
}

pub async fn import_csv(
    pool: &PgPool,
    user_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = read_import(file)?;

    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for row in &rows {
        if insert_lesson(
            &mut *tx,
            user_id,
            &row.project,
            Some(&row.source_key),
            row.created_at,
        )
        .await?
        .is_some()
        {
            inserted += 1;
        } else {
            tracing::info!(source_key = %row.source_key, "lesson already imported");
        }
    }

    tx.commit().await?;
    tracing::info!(path = %csv_path.display(), inserted, "csv import finished");
    Ok(inserted)
}
