use std::{borrow::Cow, time::Duration};

use chrono::Utc;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, PgPool, Postgres, QueryBuilder,
};
use uuid::Uuid;

use crate::models::{
    AdminStats, Business, BusinessRecord, BusinessStatus, CurrentUser, IndustryCount,
    ModerationReviewRecord, NewReview, ReviewApproval, ReviewRecord, Suggestion, User, UserRecord,
};
use crate::query::{Filter, Page};

const SESSION_TTL_DAYS: i64 = 30;

const BUSINESS_LISTING_COLUMNS: &str = r#"
    b.id,
    b.name,
    b.phone,
    b.address,
    b.location,
    b.industry,
    b.timezone,
    b.status,
    COALESCE((
        SELECT AVG(r.rating)::float8
        FROM reviews r
        WHERE r.business_id = b.id AND r.approval = 'approved'
    ), 0) AS average_rating,
    (
        SELECT COUNT(*)
        FROM reviews r
        WHERE r.business_id = b.id AND r.approval = 'approved'
    ) AS review_count
"#;

/// All data access goes through this handle. It owns the pool; construct one
/// at startup, share it via `web::Data`, and call [`Database::close`] on the
/// way out.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match Self::pool_options().connect(database_url).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;

                Self::pool_options().connect(database_url).await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
    }

    /// Drain the pool. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================================================================
    // BUSINESSES
    // ========================================================================

    /// Filtered, paginated business listing plus the unpaginated total.
    ///
    /// The same filter renders both the count query and the page query, so
    /// the pagination metadata always agrees with the predicate set.
    pub async fn search_businesses(
        &self,
        filter: &Filter,
        page: Page,
    ) -> Result<(Vec<BusinessRecord>, i64), sqlx::Error> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM businesses b");
        filter.push_where(&mut count_qb);
        let total_count: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BUSINESS_LISTING_COLUMNS} FROM businesses b"
        ));
        filter.push_where(&mut qb);
        qb.push(" ORDER BY b.name ASC, b.id ASC");
        page.push_limit_offset(&mut qb);

        let records = qb
            .build_query_as::<BusinessRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total_count))
    }

    pub async fn get_business(&self, business_id: i64) -> Result<Option<Business>, sqlx::Error> {
        let record = sqlx::query_as::<_, Business>(
            r#"
            SELECT
                id,
                name,
                phone,
                address,
                location,
                industry,
                timezone,
                status
            FROM businesses
            WHERE id = $1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn business_exists(&self, business_id: i64) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM businesses WHERE id = $1)")
                .bind(business_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn set_business_status(
        &self,
        business_id: i64,
        status: BusinessStatus,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query("UPDATE businesses SET status = $2 WHERE id = $1")
            .bind(business_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    /// Hard delete. Reviews referencing the business are left in place.
    pub async fn delete_business(&self, business_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(business_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    pub async fn approved_reviews_for_business(
        &self,
        business_id: i64,
    ) -> Result<Vec<ReviewRecord>, sqlx::Error> {
        let records = sqlx::query_as::<_, ReviewRecord>(
            r#"
            SELECT
                r.id,
                r.rating,
                r.review_text,
                r.reviewer_name,
                r.is_anonymous,
                r.created_at,
                u.first_name AS user_first_name,
                u.last_name AS user_last_name
            FROM reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.business_id = $1 AND r.approval = 'approved'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Duplicate pre-check for one-review-per-user-per-business. This is
    /// check-then-insert without a unique constraint, so two concurrent
    /// submissions from the same user can still both land.
    pub async fn user_has_reviewed(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE business_id = $1 AND user_id = $2)",
        )
        .bind(business_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn insert_review(&self, review: NewReview) -> Result<(), sqlx::Error> {
        let NewReview {
            business_id,
            user_id,
            rating,
            review_text,
            reviewer_name,
            reviewer_email,
            is_anonymous,
            approval,
        } = review;

        sqlx::query(
            r#"
            INSERT INTO reviews (
                business_id,
                user_id,
                rating,
                review_text,
                reviewer_name,
                reviewer_email,
                is_anonymous,
                approval,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            "#,
        )
        .bind(business_id)
        .bind(user_id)
        .bind(rating)
        .bind(review_text)
        .bind(reviewer_name)
        .bind(reviewer_email)
        .bind(is_anonymous)
        .bind(approval)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Moderation queue, newest first, with a windowed total count so a
    /// single round trip serves both the rows and the pagination metadata.
    pub async fn list_reviews(
        &self,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<ModerationReviewRecord>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                r.id,
                r.rating,
                r.review_text,
                r.reviewer_name,
                r.reviewer_email,
                r.approval,
                r.is_anonymous,
                r.created_at,
                b.name AS business_name,
                u.first_name AS user_first_name,
                u.last_name AS user_last_name,
                COUNT(*) OVER() AS total_count
            FROM reviews r
            INNER JOIN businesses b ON b.id = r.business_id
            LEFT JOIN users u ON u.id = r.user_id
            "#,
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY r.created_at DESC");
        page.push_limit_offset(&mut qb);

        let records = qb
            .build_query_as::<ModerationReviewRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn set_review_approval(
        &self,
        review_id: i64,
        approval: ReviewApproval,
    ) -> Result<(), sqlx::Error> {
        let result =
            sqlx::query("UPDATE reviews SET approval = $2, updated_at = NOW() WHERE id = $1")
                .bind(review_id)
                .bind(approval)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    pub async fn delete_review(&self, review_id: i64) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    // ========================================================================
    // USERS
    // ========================================================================

    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT
                id,
                email,
                password_hash,
                first_name,
                last_name,
                is_admin,
                created_at,
                updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_users(
        &self,
        filter: &Filter,
        page: Page,
    ) -> Result<Vec<UserRecord>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                u.id,
                u.email,
                u.first_name,
                u.last_name,
                u.is_admin,
                u.created_at,
                COUNT(*) OVER() AS total_count
            FROM users u
            "#,
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY u.created_at DESC");
        page.push_limit_offset(&mut qb);

        let records = qb
            .build_query_as::<UserRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn set_user_admin(&self, user_id: i64, is_admin: bool) -> Result<(), sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(is_admin)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_user_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    pub async fn create_session(&self, user_id: i64) -> Result<Uuid, sqlx::Error> {
        let token = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS);

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, NOW(), $3)",
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn find_session_user(
        &self,
        token: Uuid,
    ) -> Result<Option<CurrentUser>, sqlx::Error> {
        let record = sqlx::query_as::<_, CurrentUser>(
            r#"
            SELECT
                u.id,
                u.email,
                u.first_name,
                u.last_name,
                u.is_admin
            FROM sessions s
            INNER JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn delete_session(&self, token: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========================================================================
    // SUGGESTIONS
    // ========================================================================

    pub async fn suggest_businesses(
        &self,
        needle: &str,
        limit: i64,
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
            r#"
            SELECT name, address, location
            FROM businesses
            WHERE name ILIKE $1 AND status = 'active'
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(format!("%{needle}%"))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, address, location)| Suggestion {
                kind: "business",
                label: name.clone(),
                sublabel: location.or(address),
                value: name,
            })
            .collect())
    }

    pub async fn suggest_locations(
        &self,
        needle: &str,
        limit: i64,
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT DISTINCT location
            FROM businesses
            WHERE location ILIKE $1 AND location IS NOT NULL AND status = 'active'
            ORDER BY location
            LIMIT $2
            "#,
        )
        .bind(format!("%{needle}%"))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(location,)| Suggestion {
                kind: "location",
                label: location.clone(),
                sublabel: None,
                value: location,
            })
            .collect())
    }

    /// Industries ordered by how many businesses carry them, so the busiest
    /// categories surface first.
    pub async fn suggest_industries(
        &self,
        needle: &str,
        limit: i64,
    ) -> Result<Vec<Suggestion>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT industry, COUNT(*) AS business_count
            FROM businesses
            WHERE industry ILIKE $1 AND industry IS NOT NULL AND status = 'active'
            GROUP BY industry
            ORDER BY business_count DESC, industry
            LIMIT $2
            "#,
        )
        .bind(format!("%{needle}%"))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(industry, count)| Suggestion {
                kind: "industry",
                label: industry.clone(),
                sublabel: Some(format!("{count} businesses")),
                value: industry,
            })
            .collect())
    }

    // ========================================================================
    // STATS & HOME
    // ========================================================================

    pub async fn admin_stats(&self) -> Result<AdminStats, sqlx::Error> {
        let row: (i64, i64, i64, i64, f64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM businesses),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM reviews),
                (SELECT COUNT(*) FROM reviews WHERE approval = 'pending'),
                COALESCE((SELECT AVG(rating)::float8 FROM reviews WHERE approval = 'approved'), 0),
                (SELECT COUNT(*) FROM reviews WHERE created_at::date = NOW()::date)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (total_businesses, total_users, total_reviews, pending_reviews, average_rating, reviews_today) =
            row;

        Ok(AdminStats {
            total_businesses,
            total_users,
            total_reviews,
            pending_reviews,
            average_rating,
            reviews_today,
        })
    }

    pub async fn top_industries(&self, limit: i64) -> Result<Vec<IndustryCount>, sqlx::Error> {
        let records = sqlx::query_as::<_, IndustryCount>(
            r#"
            SELECT industry AS name, COUNT(*) AS count
            FROM businesses
            WHERE industry IS NOT NULL AND industry <> ''
            GROUP BY industry
            ORDER BY count DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Distinct location strings with their business counts; the caller runs
    /// these through the location classifier for state-level aggregates.
    pub async fn location_counts(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT location, COUNT(*)
            FROM businesses
            WHERE location IS NOT NULL AND location <> ''
            GROUP BY location
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn home_counts(&self) -> Result<(i64, i64, i64), sqlx::Error> {
        let counts: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM businesses),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM reviews WHERE approval = 'approved')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    // ========================================================================
    // ADMIN SETTINGS
    // ========================================================================

    pub async fn load_settings(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT setting_key, setting_value FROM admin_settings WHERE setting_value IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Per-key upsert. The settings save loop calls this once per key with no
    /// surrounding transaction, so a mid-loop failure leaves earlier keys
    /// written.
    pub async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO admin_settings (setting_key, setting_value)
            VALUES ($1, $2)
            ON CONFLICT (setting_key)
            DO UPDATE SET setting_value = EXCLUDED.setting_value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // If we're already targeting the default maintenance database, nothing to do.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match sqlx::query(&create_stmt).execute(&mut connection).await {
        Ok(_) => {
            log::info!("Created database {database_name}");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            // Lost a create race with another instance; the database exists now.
            Ok(())
        }
        Err(err) => Err(err),
    }
}
