use campusmentor_common::AppError;
use sqlx::PgPool;

use crate::connection::run_migrations;

const SAMPLE_COLLEGES: [(&str, &str, &str, &str); 4] = [
    ("IIT Bombay", "Mumbai", "Engineering", "Premier engineering institute on the Powai campus."),
    ("AIIMS Delhi", "New Delhi", "Medical", "Leading medical college and hospital."),
    ("NIT Trichy", "Tiruchirappalli", "Engineering", "Top-ranked National Institute of Technology."),
    ("St. Stephen's College", "New Delhi", "Arts & Science", "Liberal arts and sciences college of Delhi University."),
];

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_all_migrations(&self) -> Result<(), AppError> {
        tracing::info!("Starting database migrations...");
        run_migrations(&self.pool).await?;
        tracing::info!("All migrations completed successfully");
        Ok(())
    }

    pub async fn check_migration_status(&self) -> Result<MigrationStatus, AppError> {
        let migrator = sqlx::migrate!("./migrations");
        let total = migrator.iter().count();

        let table_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = '_sqlx_migrations')",
        )
        .fetch_one(&self.pool)
        .await?;

        let applied = if table_exists {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
                .fetch_one(&self.pool)
                .await? as usize
        } else {
            0
        };

        let pending = total.saturating_sub(applied);
        Ok(MigrationStatus {
            total,
            applied,
            pending,
            is_up_to_date: pending == 0,
        })
    }

    /// Seeds the site settings row and, on an empty directory, a few sample
    /// colleges. Safe to run repeatedly.
    pub async fn seed_initial_data(&self) -> Result<SeedSummary, AppError> {
        let settings_created = sqlx::query("INSERT INTO site_settings (id) VALUES (1) ON CONFLICT DO NOTHING")
            .execute(&self.pool)
            .await?
            .rows_affected()
            > 0;

        let college_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM colleges")
            .fetch_one(&self.pool)
            .await?;

        let mut colleges_created = 0;
        if college_count == 0 {
            for (name, location, category, description) in SAMPLE_COLLEGES {
                sqlx::query("INSERT INTO colleges (name, location, category, description) VALUES ($1, $2, $3, $4)")
                    .bind(name)
                    .bind(location)
                    .bind(category)
                    .bind(description)
                    .execute(&self.pool)
                    .await?;
                colleges_created += 1;
            }
            tracing::info!("Seeded {} sample colleges", colleges_created);
        }

        Ok(SeedSummary {
            settings_created,
            colleges_created,
        })
    }
}

#[derive(Debug)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Migrations: {}/{} applied, {} pending",
            self.applied, self.total, self.pending
        )
    }
}

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub settings_created: bool,
    pub colleges_created: usize,
}
