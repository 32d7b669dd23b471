use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use campusmentor_common::DatabaseConfig;
use campusmentor_database::{create_pool, ApplicationStore, MessageStore, MigrationRunner, PgStore};

#[derive(Parser)]
#[command(name = "db-cli")]
#[command(about = "CampusMentor Database CLI Tool")]
struct Cli {
    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check migration status
    Status,
    /// Seed site settings and sample colleges into an empty database
    Seed,
    /// Report drift between applications, mentors and roles
    Reconcile {
        /// Exit with an error when drift is found
        #[arg(long)]
        strict: bool,
    },
    /// Recompute conversation summaries from the message log
    RebuildConversations,
    /// Reset database (drop and recreate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = get_database_config(cli.database_url.as_deref())?;

    match cli.command {
        Commands::Migrate => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            runner.run_all_migrations().await?;

            println!("✅ Migrations completed successfully");
        }
        Commands::Status => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            let status = runner.check_migration_status().await?;
            println!("📊 {}", status);

            if status.is_up_to_date {
                println!("✅ Database is up to date");
            } else {
                println!("⚠️  Database needs migration");
            }
        }
        Commands::Seed => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            let summary = runner.seed_initial_data().await?;

            println!(
                "✅ Seed complete: site settings {}, {} colleges added",
                if summary.settings_created { "created" } else { "already present" },
                summary.colleges_created
            );
        }
        Commands::Reconcile { strict } => {
            let store = PgStore::new(create_pool(&config).await?);
            let report = store.reconciliation_report().await?;

            if report.is_clean() {
                println!("✅ Applications, mentors and roles agree");
                return Ok(());
            }

            print_ids("Approved applications without a mentor row", &report.approved_without_mentor);
            print_ids("Mentors whose role is not senior", &report.mentors_without_senior_role);
            print_ids("Seniors without a mentor row", &report.seniors_without_mentor);

            if strict {
                bail!("role reconciliation found drift");
            }
        }
        Commands::RebuildConversations => {
            let store = PgStore::new(create_pool(&config).await?);
            let count = store.rebuild_conversation_summaries().await?;

            println!("✅ Rebuilt {} conversation summaries", count);
        }
        Commands::Reset { force } => {
            if !force {
                println!("⚠️  This will delete ALL data in the database!");
                println!("Type 'yes' to continue:");

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;

                if input.trim() != "yes" {
                    println!("❌ Operation cancelled");
                    return Ok(());
                }
            }

            drop_database(&config).await?;

            // The pool recreates the missing database
            let runner = MigrationRunner::new(create_pool(&config).await?);
            runner.run_all_migrations().await?;

            println!("✅ Database reset completed");
        }
    }

    Ok(())
}

fn print_ids<T: std::fmt::Display>(title: &str, ids: &[T]) {
    if ids.is_empty() {
        return;
    }
    println!("⚠️  {} ({}):", title, ids.len());
    for id in ids {
        println!("   {}", id);
    }
}

async fn drop_database(config: &DatabaseConfig) -> anyhow::Result<()> {
    if !config
        .database
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("refusing to reset database with unusual name {:?}", config.database);
    }

    let admin_config = DatabaseConfig {
        database: "postgres".to_string(),
        ..config.clone()
    };
    let admin_pool = create_pool(&admin_config).await?;

    // Terminate existing connections
    sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(&config.database)
    .execute(&admin_pool)
    .await?;

    sqlx::query(&format!("DROP DATABASE IF EXISTS {}", config.database))
        .execute(&admin_pool)
        .await?;

    tracing::info!(database = %config.database, "Database dropped");
    Ok(())
}

fn get_database_config(database_url: Option<&str>) -> anyhow::Result<DatabaseConfig> {
    let Some(raw) = database_url else {
        return Ok(DatabaseConfig::from_env());
    };

    let url = url::Url::parse(raw).context("invalid database URL")?;
    if !matches!(url.scheme(), "postgres" | "postgresql") {
        bail!("unsupported database URL scheme {:?}", url.scheme());
    }

    let database = url.path().trim_start_matches('/').to_string();
    if database.is_empty() {
        bail!("database URL has no database name");
    }

    Ok(DatabaseConfig {
        host: url.host_str().unwrap_or("localhost").to_string(),
        port: url.port().unwrap_or(5432),
        username: url.username().to_string(),
        password: url.password().unwrap_or("").to_string(),
        database,
        max_connections: 5,
    })
}
