use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use lessons_tracker::access::{AccessError, Session};
use lessons_tracker::health::{classify_health, HealthLabel};
use lessons_tracker::{analytics, db, export, models, report};
use lessons_tracker::models::{
    validate_satisfaction, BudgetStatus, LifecycleStatus, NewProject, ProjectRecord,
    StatusChange, TimelineStatus,
};

#[derive(Parser)]
#[command(name = "lessons")]
#[command(about = "Project lessons-learned tracker with health classification", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Email of the signed-in profile
    #[arg(long, global = true, env = "LESSONS_USER", default_value = db::DEMO_EMAIL)]
    user: String,

    #[arg(long, global = true, env = "LESSONS_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at info level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo profile and sample lessons
    Seed,
    /// Import lessons from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a single project lesson
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        client: String,
        #[arg(long, default_value = "")]
        role: String,
        #[arg(long, default_value = "active")]
        status: LifecycleStatus,
        #[arg(long)]
        satisfaction: i32,
        #[arg(long)]
        budget: BudgetStatus,
        #[arg(long)]
        timeline: TimelineStatus,
        #[arg(long)]
        scope_change: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Change a lesson's lifecycle status
    SetStatus {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        status: LifecycleStatus,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        blockers: Option<String>,
    },
    /// List lessons with their computed health
    List {
        #[arg(long)]
        lifecycle: Option<LifecycleStatus>,
    },
    /// Summary, health distributions and monthly activity
    Dashboard,
    /// Rule-based insights (enterprise plan)
    Insights,
    /// Export lessons to CSV (pro plan)
    Export {
        #[arg(long, default_value = "lessons.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report (pro plan)
    Report {
        #[arg(long, default_value = "lessons-report.md")]
        out: PathBuf,
    },
    /// Show the features enabled for the signed-in profile
    Features,
}

#[derive(Serialize)]
struct ListedProject<'a> {
    #[serde(flatten)]
    record: &'a ProjectRecord,
    health: HealthLabel,
    health_style: &'static str,
}

#[derive(Serialize)]
struct Dashboard {
    summary: analytics::Summary,
    active: analytics::ActiveDistribution,
    completed: analytics::CompletedDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    monthly: Option<Vec<models::MonthlyCount>>,
}

async fn open_session(pool: &PgPool, email: &str) -> anyhow::Result<Session> {
    let profile = db::load_profile(pool, email)
        .await?
        .ok_or_else(|| AccessError::UnknownUser(email.to_string()))?;
    tracing::info!(user = %profile.email, tier = profile.tier.as_str(), "session opened");
    Ok(Session::new(profile))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_pct(label: &str, value: Option<f64>) {
    match value {
        Some(v) => println!("  {label}: {v:.0}%"),
        None => println!("  {label}: n/a"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let database_url = cli
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted for {}.", db::DEMO_EMAIL);
        }
        Commands::Import { csv } => {
            let session = open_session(&pool, &cli.user).await?;
            let inserted = db::import_csv(&pool, session.profile.id, &csv).await?;
            println!("Inserted {inserted} lessons from {}.", csv.display());
        }
        Commands::Add {
            project,
            client,
            role,
            status,
            satisfaction,
            budget,
            timeline,
            scope_change,
            notes,
        } => {
            let session = open_session(&pool, &cli.user).await?;
            let project = NewProject {
                project_name: project,
                client_name: client,
                role,
                lifecycle_status: status,
                satisfaction: validate_satisfaction(satisfaction)?,
                budget_status: budget,
                timeline_status: timeline,
                scope_change,
                notes,
            };
            let id = db::insert_project(&pool, session.profile.id, &project).await?;
            println!("Recorded {} ({id}).", project.project_name);
        }
        Commands::SetStatus {
            id,
            status,
            reason,
            summary,
            blockers,
        } => {
            let session = open_session(&pool, &cli.user).await?;
            let change = StatusChange {
                reason,
                completion_summary: summary,
                blockers,
            };
            let previous = db::update_status(&pool, session.profile.id, id, status, &change).await?;
            println!(
                "Lesson {id}: {} -> {}.",
                previous.label(),
                status.label()
            );
        }
        Commands::List { lifecycle } => {
            let session = open_session(&pool, &cli.user).await?;
            let records = db::fetch_projects(&pool, session.profile.id, lifecycle).await?;

            if cli.json {
                let listed: Vec<ListedProject> = records
                    .iter()
                    .map(|record| {
                        let health = classify_health(record);
                        ListedProject {
                            record,
                            health,
                            health_style: health.style(),
                        }
                    })
                    .collect();
                return print_json(&listed);
            }

            if records.is_empty() {
                println!("No lessons recorded.");
                return Ok(());
            }

            for record in &records {
                println!(
                    "- {} ({}) {} / {} [{}]",
                    record.project_name,
                    record.client_name,
                    record.lifecycle_status.label(),
                    classify_health(record).label(),
                    record.id
                );
            }
        }
        Commands::Dashboard => {
            let session = open_session(&pool, &cli.user).await?;
            let records = db::fetch_projects(&pool, session.profile.id, None).await?;
            let dashboard = Dashboard {
                summary: analytics::summarize(&records),
                active: analytics::active_health_distribution(&records),
                completed: analytics::completed_health_distribution(&records),
                monthly: session
                    .features
                    .advanced_analytics
                    .then(|| analytics::monthly_counts(&records)),
            };

            if cli.json {
                return print_json(&dashboard);
            }

            let summary = &dashboard.summary;
            println!(
                "{} lessons ({} in flight, {} finished)",
                summary.total, summary.active, summary.completed
            );
            match summary.average_satisfaction {
                Some(avg) => println!("  Average satisfaction: {avg:.1}"),
                None => println!("  Average satisfaction: n/a"),
            }
            print_pct("On or under budget", summary.on_or_under_budget_pct);
            print_pct("On time or early", summary.on_time_or_early_pct);
            print_pct("Scope changed", summary.scope_change_pct);

            println!("Active health:");
            println!("  {}: {}", HealthLabel::Healthy.label(), dashboard.active.healthy);
            println!("  {}: {}", HealthLabel::AtRisk.label(), dashboard.active.at_risk);
            println!("  {}: {}", HealthLabel::Critical.label(), dashboard.active.critical);
            println!("Completed outcomes:");
            println!(
                "  {}: {}",
                HealthLabel::Successful.label(),
                dashboard.completed.successful
            );
            println!(
                "  {}: {}",
                HealthLabel::Underperformed.label(),
                dashboard.completed.underperformed
            );
            println!("  {}: {}", HealthLabel::Mixed.label(), dashboard.completed.mixed);

            match &dashboard.monthly {
                Some(months) => {
                    println!("Monthly activity:");
                    for month in months {
                        println!(
                            "  {}: {} recorded, {} finished",
                            month.month, month.total, month.finished
                        );
                    }
                }
                None => println!("Monthly activity is available on the pro plan."),
            }
        }
        Commands::Insights => {
            let session = open_session(&pool, &cli.user).await?;
            session.require_ai()?;
            let records = db::fetch_projects(&pool, session.profile.id, None).await?;
            let notes = analytics::insights(&records);

            if cli.json {
                return print_json(&notes);
            }
            for note in notes {
                println!("- {note}");
            }
        }
        Commands::Export { out } => {
            let session = open_session(&pool, &cli.user).await?;
            session.require_export()?;
            let records = db::fetch_projects(&pool, session.profile.id, None).await?;
            let written = export::export_to_path(&out, &records)?;
            println!("Exported {written} lessons to {}.", out.display());
        }
        Commands::Report { out } => {
            let session = open_session(&pool, &cli.user).await?;
            session.require_export()?;
            let records = db::fetch_projects(&pool, session.profile.id, None).await?;
            let report = report::build_report(
                &session.profile.full_name,
                chrono::Utc::now(),
                &records,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Features => {
            let session = open_session(&pool, &cli.user).await?;
            if cli.json {
                return print_json(&session.features);
            }
            let flags = session.features;
            println!(
                "{} ({} plan)",
                session.profile.email,
                session.profile.tier.as_str()
            );
            println!("  export: {}", flags.can_export);
            println!("  ai insights: {}", flags.can_use_ai);
            println!("  advanced analytics: {}", flags.advanced_analytics);
            println!("  custom dashboards: {}", flags.custom_dashboards);
        }
    }

    Ok(())
}
