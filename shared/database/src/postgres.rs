use async_trait::async_trait;
use campusmentor_common::{AppError, ApplicationStatus, UserRole};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::*;
use crate::store::*;

const MENTOR_LISTING_SELECT: &str = r#"
    SELECT m.id, p.full_name, m.college_id, c.name AS college_name, m.branch, m.year,
           m.rating, m.sessions_count, m.price_per_session, m.expertise, m.is_verified, m.created_at
    FROM mentors m
    LEFT JOIN profiles p ON p.user_id = m.id
    LEFT JOIN colleges c ON c.id = m.college_id
"#;

const BOOKING_VIEW_SELECT: &str = r#"
    SELECT b.id, b.mentor_id, mp.full_name AS mentor_name, b.student_id, sp.full_name AS student_name,
           b.session_time, b.duration_minutes, b.status, b.amount_paid, b.created_at
    FROM bookings b
    LEFT JOIN profiles mp ON mp.user_id = b.mentor_id
    LEFT JOIN profiles sp ON sp.user_id = b.student_id
"#;

// Serialises concurrent first-admin bootstraps.
const ADMIN_BOOTSTRAP_LOCK: i64 = 0x6361_6d70_7573;

/// PostgreSQL-backed store. Each multi-step command is one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Moves the role projection and appends to the role log. Returns false when
/// the user already holds `to`.
async fn set_role(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    to: UserRole,
    reason: RoleChangeReason,
    actor_id: Option<Uuid>,
) -> Result<bool, AppError> {
    let from: Option<UserRole> =
        sqlx::query_scalar::<_, UserRole>("SELECT role FROM user_roles WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    if from == Some(to) {
        return Ok(false);
    }

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(to)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO role_events (user_id, from_role, to_role, reason, actor_id) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .bind(reason.as_str())
    .bind(actor_id)
    .execute(&mut **tx)
    .await?;

    Ok(true)
}

async fn user_exists(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

/// User row, profile and the initial `junior` role.
async fn insert_user(tx: &mut Transaction<'_, Postgres>, user: &NewUser) -> Result<User, AppError> {
    let created = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&user.email)
    .bind(&user.password_hash)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::from_db(e, "Email already registered"))?;

    sqlx::query("INSERT INTO profiles (user_id, full_name, phone) VALUES ($1, $2, $3)")
        .bind(created.id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .execute(&mut **tx)
        .await?;

    set_role(tx, created.id, UserRole::Junior, RoleChangeReason::SignUp, None).await?;
    Ok(created)
}

/// Check-or-insert against the one-actionable-application index.
async fn insert_application(
    tx: &mut Transaction<'_, Postgres>,
    submission: &ApplicationSubmission,
) -> Result<MentorApplication, AppError> {
    const ACTIONABLE: &str = r#"
        SELECT * FROM mentor_applications
        WHERE user_id = $1 AND status IN ('pending', 'approved')
        ORDER BY created_at DESC
        LIMIT 1
    "#;

    if let Some(existing) = sqlx::query_as::<_, MentorApplication>(ACTIONABLE)
        .bind(submission.user_id)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(existing);
    }

    // A concurrent submission may win the partial unique index.
    let inserted = sqlx::query_as::<_, MentorApplication>(
        r#"
        INSERT INTO mentor_applications (user_id, full_name, email, phone, bio, college_name, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending')
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(submission.user_id)
    .bind(&submission.full_name)
    .bind(&submission.email)
    .bind(&submission.phone)
    .bind(&submission.bio)
    .bind(&submission.college_name)
    .fetch_optional(&mut **tx)
    .await?;

    match inserted {
        Some(application) => Ok(application),
        None => Ok(sqlx::query_as::<_, MentorApplication>(ACTIONABLE)
            .bind(submission.user_id)
            .fetch_one(&mut **tx)
            .await?),
    }
}

async fn college_exists(tx: &mut Transaction<'_, Postgres>, college_id: i64) -> Result<bool, AppError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM colleges WHERE id = $1)")
        .bind(college_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;
        let created = insert_user(&mut tx, &user).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                bio = COALESCE($4, bio),
                avatar_url = COALESCE($5, avatar_url),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(update.full_name)
        .bind(update.phone)
        .bind(update.bio)
        .bind(update.avatar_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AppError> {
        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn role_history(&self, user_id: Uuid) -> Result<Vec<RoleEvent>, AppError> {
        let events = sqlx::query_as::<_, RoleEvent>("SELECT * FROM role_events WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn promote_first_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ADMIN_BOOTSTRAP_LOCK)
            .execute(&mut *tx)
            .await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let admin_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_roles WHERE role = 'admin')",
        )
        .fetch_one(&mut *tx)
        .await?;
        if admin_exists {
            return Err(AppError::Conflict("An admin already exists".to_string()));
        }

        set_role(&mut tx, user_id, UserRole::Admin, RoleChangeReason::AdminBootstrap, Some(user_id)).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for PgStore {
    async fn list_colleges(&self) -> Result<Vec<College>, AppError> {
        let colleges = sqlx::query_as::<_, College>("SELECT * FROM colleges ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(colleges)
    }

    async fn get_college(&self, id: i64) -> Result<Option<College>, AppError> {
        let college = sqlx::query_as::<_, College>("SELECT * FROM colleges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(college)
    }

    async fn create_college(&self, input: CollegeInput) -> Result<College, AppError> {
        input.validate()?;
        let college = sqlx::query_as::<_, College>(
            r#"
            INSERT INTO colleges (name, location, category, description, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.name)
        .bind(input.location)
        .bind(input.category)
        .bind(input.description)
        .bind(input.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, "College already exists"))?;
        Ok(college)
    }

    async fn update_college(&self, id: i64, input: CollegeInput) -> Result<College, AppError> {
        input.validate()?;
        sqlx::query_as::<_, College>(
            r#"
            UPDATE colleges
            SET name = $2, location = $3, category = $4, description = $5, image_url = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name)
        .bind(input.location)
        .bind(input.category)
        .bind(input.description)
        .bind(input.image_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("College not found".to_string()))
    }

    async fn delete_college(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM colleges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("College not found".to_string()));
        }
        Ok(())
    }

    async fn list_mentors(&self, verified_only: bool) -> Result<Vec<MentorListing>, AppError> {
        let query = format!(
            "{} WHERE ($1 = FALSE OR m.is_verified) ORDER BY m.created_at DESC, m.id",
            MENTOR_LISTING_SELECT
        );
        let mentors = sqlx::query_as::<_, MentorListing>(&query)
            .bind(verified_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(mentors)
    }

    async fn get_mentor(&self, id: Uuid) -> Result<Option<MentorListing>, AppError> {
        let query = format!("{} WHERE m.id = $1", MENTOR_LISTING_SELECT);
        let mentor = sqlx::query_as::<_, MentorListing>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(mentor)
    }

    async fn update_mentor(&self, id: Uuid, update: MentorUpdate) -> Result<Mentor, AppError> {
        update.validate()?;
        let mut tx = self.pool.begin().await?;

        if let Some(college_id) = update.college_id {
            if !college_exists(&mut tx, college_id).await? {
                return Err(AppError::NotFound("College not found".to_string()));
            }
        }

        let mentor = sqlx::query_as::<_, Mentor>(
            r#"
            UPDATE mentors
            SET college_id = COALESCE($2, college_id),
                branch = COALESCE($3, branch),
                year = COALESCE($4, year),
                rating = COALESCE($5, rating),
                sessions_count = COALESCE($6, sessions_count),
                price_per_session = COALESCE($7, price_per_session),
                expertise = COALESCE($8, expertise),
                is_verified = COALESCE($9, is_verified),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.college_id)
        .bind(update.branch)
        .bind(update.year)
        .bind(update.rating)
        .bind(update.sessions_count)
        .bind(update.price_per_session)
        .bind(update.expertise)
        .bind(update.is_verified)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Mentor update conflicts with existing data"))?
        .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;

        tx.commit().await?;
        Ok(mentor)
    }

    async fn site_settings(&self) -> Result<SiteSettings, AppError> {
        let settings = sqlx::query_as::<_, SiteSettings>(
            "SELECT active_mentors, top_colleges, average_rating, updated_at FROM site_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings.unwrap_or_default())
    }

    async fn update_site_settings(&self, update: SiteSettingsUpdate) -> Result<SiteSettings, AppError> {
        let defaults = SiteSettings::default();
        let settings = sqlx::query_as::<_, SiteSettings>(
            r#"
            INSERT INTO site_settings (id, active_mentors, top_colleges, average_rating, updated_at)
            VALUES (1, COALESCE($1, $4), COALESCE($2, $5), COALESCE($3, $6), NOW())
            ON CONFLICT (id) DO UPDATE SET
                active_mentors = COALESCE($1, site_settings.active_mentors),
                top_colleges = COALESCE($2, site_settings.top_colleges),
                average_rating = COALESCE($3, site_settings.average_rating),
                updated_at = NOW()
            RETURNING active_mentors, top_colleges, average_rating, updated_at
            "#,
        )
        .bind(update.active_mentors)
        .bind(update.top_colleges)
        .bind(update.average_rating)
        .bind(defaults.active_mentors)
        .bind(defaults.top_colleges)
        .bind(defaults.average_rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(settings)
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError> {
        let (colleges, mentors, pending_applications, bookings) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM colleges),
                (SELECT COUNT(*) FROM mentors),
                (SELECT COUNT(*) FROM mentor_applications WHERE status = 'pending'),
                (SELECT COUNT(*) FROM bookings)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardCounts {
            colleges,
            mentors,
            pending_applications,
            bookings,
        })
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn submit_application(&self, submission: ApplicationSubmission) -> Result<MentorApplication, AppError> {
        submission.validate()?;
        let mut tx = self.pool.begin().await?;
        if !user_exists(&mut tx, submission.user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let application = insert_application(&mut tx, &submission).await?;
        tx.commit().await?;
        Ok(application)
    }

    async fn register_mentor(&self, user: NewUser, sign_up: MentorSignUp) -> Result<(User, MentorApplication), AppError> {
        sign_up.validate()?;
        let mut tx = self.pool.begin().await?;

        let created = insert_user(&mut tx, &user).await?;
        let application = insert_application(&mut tx, &sign_up.submission(&created)).await?;

        tx.commit().await?;
        Ok((created, application))
    }

    async fn get_application(&self, id: i64) -> Result<Option<MentorApplication>, AppError> {
        let application = sqlx::query_as::<_, MentorApplication>("SELECT * FROM mentor_applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(application)
    }

    async fn list_applications(&self) -> Result<Vec<MentorApplication>, AppError> {
        let applications = sqlx::query_as::<_, MentorApplication>(
            "SELECT * FROM mentor_applications ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    async fn applications_for_user(&self, user_id: Uuid) -> Result<Vec<MentorApplication>, AppError> {
        let applications = sqlx::query_as::<_, MentorApplication>(
            "SELECT * FROM mentor_applications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    async fn approve_application(&self, approval: Approval) -> Result<ApprovalOutcome, AppError> {
        approval.validate()?;
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, MentorApplication>(
            "SELECT * FROM mentor_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(approval.application_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        let status = current.status.approve()?;
        if !college_exists(&mut tx, approval.college_id).await? {
            return Err(AppError::NotFound("College not found".to_string()));
        }

        let application = sqlx::query_as::<_, MentorApplication>(
            "UPDATE mentor_applications SET status = $2, reviewed_by = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(approval.application_id)
        .bind(status)
        .bind(approval.actor_id)
        .fetch_one(&mut *tx)
        .await?;

        let mentor = sqlx::query_as::<_, Mentor>(
            r#"
            INSERT INTO mentors (id, college_id, branch, year, rating, sessions_count, price_per_session, expertise, is_verified)
            VALUES ($1, $2, $3, $3, $4, 0, $5, '{}', TRUE)
            ON CONFLICT (id) DO UPDATE SET
                college_id = EXCLUDED.college_id,
                price_per_session = EXCLUDED.price_per_session,
                is_verified = TRUE,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(application.user_id)
        .bind(approval.college_id)
        .bind(UNSPECIFIED)
        .bind(DEFAULT_MENTOR_RATING)
        .bind(approval.fee_per_session)
        .fetch_one(&mut *tx)
        .await?;

        let role_changed = set_role(
            &mut tx,
            application.user_id,
            UserRole::Senior,
            RoleChangeReason::ApplicationApproved,
            approval.actor_id,
        )
        .await?;

        tx.commit().await?;
        Ok(ApprovalOutcome {
            application,
            mentor,
            role_changed,
        })
    }

    async fn reject_application(&self, id: i64, actor_id: Option<Uuid>) -> Result<MentorApplication, AppError> {
        let mut tx = self.pool.begin().await?;

        let current: ApplicationStatus = sqlx::query_scalar::<_, ApplicationStatus>(
            "SELECT status FROM mentor_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;

        let application = sqlx::query_as::<_, MentorApplication>(
            "UPDATE mentor_applications SET status = $2, reviewed_by = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(current.reject()?)
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application)
    }

    async fn remove_mentor(&self, mentor_id: Uuid, actor_id: Option<Uuid>) -> Result<RemovedMentor, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM mentors WHERE id = $1 FOR UPDATE")
            .bind(mentor_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Mentor not found".to_string()));
        }

        let previous_role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(mentor_id)
            .fetch_optional(&mut *tx)
            .await?;

        set_role(&mut tx, mentor_id, UserRole::Junior, RoleChangeReason::MentorRemoved, actor_id).await?;

        let applications_removed = sqlx::query("DELETE FROM mentor_applications WHERE user_id = $1")
            .bind(mentor_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM mentors WHERE id = $1")
            .bind(mentor_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RemovedMentor {
            mentor_id,
            applications_removed,
            previous_role,
        })
    }

    async fn reconciliation_report(&self) -> Result<ReconciliationReport, AppError> {
        let approved_without_mentor = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT a.user_id FROM mentor_applications a
            LEFT JOIN mentors m ON m.id = a.user_id
            WHERE a.status = 'approved' AND m.id IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mentors_without_senior_role = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT m.id FROM mentors m
            LEFT JOIN user_roles r ON r.user_id = m.id
            WHERE r.role IS DISTINCT FROM 'senior'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let seniors_without_mentor = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT r.user_id FROM user_roles r
            LEFT JOIN mentors m ON m.id = r.user_id
            WHERE r.role = 'senior' AND m.id IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ReconciliationReport {
            approved_without_mentor,
            mentors_without_senior_role,
            seniors_without_mentor,
        }
        .sorted())
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError> {
        booking.validate()?;
        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, booking.student_id).await? {
            return Err(AppError::NotFound("Student not found".to_string()));
        }

        // Price is read inside the transaction so the snapshot matches the
        // row the booking was accepted against.
        let mentor = sqlx::query_as::<_, (Decimal, bool)>(
            "SELECT price_per_session, is_verified FROM mentors WHERE id = $1 FOR SHARE",
        )
        .bind(booking.mentor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let price = match mentor {
            Some((price, true)) => price,
            Some((_, false)) => return Err(AppError::Validation("Mentor is not verified".to_string())),
            None => return Err(AppError::NotFound("Mentor not found".to_string())),
        };

        if booking.exclusive_slot {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(booking.mentor_id.to_string())
                .execute(&mut *tx)
                .await?;

            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM bookings WHERE mentor_id = $1 AND session_time = $2)",
            )
            .bind(booking.mentor_id)
            .bind(booking.session_time)
            .fetch_one(&mut *tx)
            .await?;
            if taken {
                return Err(AppError::Conflict("This slot is already booked".to_string()));
            }
        }

        let created = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (mentor_id, student_id, session_time, duration_minutes, status, amount_paid)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(booking.mentor_id)
        .bind(booking.student_id)
        .bind(booking.session_time)
        .bind(booking.duration_minutes)
        .bind(BOOKING_STATUS_CONFIRMED)
        .bind(price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Booking already exists"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn bookings_for_mentor(&self, mentor_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        let query = format!("{} WHERE b.mentor_id = $1 ORDER BY b.session_time, b.id", BOOKING_VIEW_SELECT);
        let bookings = sqlx::query_as::<_, BookingView>(&query)
            .bind(mentor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    async fn bookings_for_student(&self, student_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        let query = format!("{} WHERE b.student_id = $1 ORDER BY b.session_time, b.id", BOOKING_VIEW_SELECT);
        let bookings = sqlx::query_as::<_, BookingView>(&query)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }

    async fn all_bookings(&self) -> Result<Vec<BookingView>, AppError> {
        let query = format!("{} ORDER BY b.created_at DESC, b.id DESC", BOOKING_VIEW_SELECT);
        let bookings = sqlx::query_as::<_, BookingView>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(bookings)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, AppError> {
        message.validate()?;
        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, message.receiver_id).await? {
            return Err(AppError::NotFound("Recipient not found".to_string()));
        }

        let stored = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, clock_timestamp())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Message already exists"))?;

        let key = crate::conversation::ConversationKey::of(&stored);
        sqlx::query(
            r#"
            INSERT INTO conversation_summaries (participant_a, participant_b, last_message_at, message_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (participant_a, participant_b) DO UPDATE SET
                last_message_at = GREATEST(conversation_summaries.last_message_at, EXCLUDED.last_message_at),
                message_count = conversation_summaries.message_count + 1
            "#,
        )
        .bind(key.low)
        .bind(key.high)
        .bind(stored.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn conversation(&self, user_id: Uuid, other_user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .bind(other_user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>, AppError> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            "SELECT * FROM conversation_summaries ORDER BY last_message_at DESC, participant_a, participant_b",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn conversations_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
        let summaries = sqlx::query_as::<_, ConversationSummary>(
            r#"
            SELECT * FROM conversation_summaries
            WHERE participant_a = $1 OR participant_b = $1
            ORDER BY last_message_at DESC, participant_a, participant_b
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn rebuild_conversation_summaries(&self) -> Result<usize, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM conversation_summaries")
            .execute(&mut *tx)
            .await?;

        let written = sqlx::query(
            r#"
            INSERT INTO conversation_summaries (participant_a, participant_b, last_message_at, message_count)
            SELECT LEAST(sender_id, receiver_id), GREATEST(sender_id, receiver_id), MAX(created_at), COUNT(*)
            FROM messages
            GROUP BY 1, 2
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(written as usize)
    }
}
