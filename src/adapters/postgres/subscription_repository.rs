//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Trial task progress is changed only by single-statement `UPDATE ...
//! RETURNING` calls, so concurrent completions are applied row-atomically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{Subscription, TrialTask, TrialTasks, UsageCounters};
use crate::ports::SubscriptionRepository;

const COLUMNS: &str = "id, user_id, plan, status, trial_end_date, \
    watched_ad, followed_instagram, shares, trial_used, \
    active_events, daily_tasks, mood_entries, templates, last_daily_reset, \
    premium_badge, badge_granted_at, period_start, period_end, cancelled_at, \
    created_at, updated_at";

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan: String,
    status: String,
    trial_end_date: Option<DateTime<Utc>>,
    watched_ad: bool,
    followed_instagram: bool,
    shares: i32,
    trial_used: bool,
    active_events: i32,
    daily_tasks: i32,
    mood_entries: i32,
    templates: i32,
    last_daily_reset: DateTime<Utc>,
    premium_badge: bool,
    badge_granted_at: Option<DateTime<Utc>>,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, e: &dyn std::fmt::Display| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid {} value: {}", field, e),
            )
        };
        let ts = |dt: Option<DateTime<Utc>>| dt.map(Timestamp::from_datetime);

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt("user_id", &e))?,
            plan: row.plan.parse().map_err(|e| corrupt("plan", &e))?,
            status: row.status.parse().map_err(|e| corrupt("status", &e))?,
            trial_end_date: ts(row.trial_end_date),
            trial_tasks: TrialTasks {
                watched_ad: row.watched_ad,
                followed_instagram: row.followed_instagram,
                shares: to_count("shares", row.shares)?,
            },
            trial_used: row.trial_used,
            usage: UsageCounters {
                active_events: to_count("active_events", row.active_events)?,
                daily_tasks: to_count("daily_tasks", row.daily_tasks)?,
                mood_entries: to_count("mood_entries", row.mood_entries)?,
                templates: to_count("templates", row.templates)?,
                last_daily_reset: Timestamp::from_datetime(row.last_daily_reset),
            },
            premium_badge: row.premium_badge,
            badge_granted_at: ts(row.badge_granted_at),
            period_start: ts(row.period_start),
            period_end: ts(row.period_end),
            cancelled_at: ts(row.cancelled_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn to_count(field: &str, value: i32) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Negative {} value: {}", field, value),
        )
    })
}

/// Counters are stored as INTEGER; values beyond i32::MAX are clamped.
fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {} subscription: {}", action, e),
    )
}

fn not_found() -> DomainError {
    DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
}

fn opt_dt(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let sql = format!(
            "INSERT INTO subscriptions ({}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)",
            COLUMNS
        );

        sqlx::query(&sql)
            .bind(subscription.id.as_uuid())
            .bind(subscription.user_id.as_str())
            .bind(subscription.plan.as_str())
            .bind(subscription.status.as_str())
            .bind(opt_dt(subscription.trial_end_date))
            .bind(subscription.trial_tasks.watched_ad)
            .bind(subscription.trial_tasks.followed_instagram)
            .bind(to_column(subscription.trial_tasks.shares))
            .bind(subscription.trial_used)
            .bind(to_column(subscription.usage.active_events))
            .bind(to_column(subscription.usage.daily_tasks))
            .bind(to_column(subscription.usage.mood_entries))
            .bind(to_column(subscription.usage.templates))
            .bind(subscription.usage.last_daily_reset.as_datetime())
            .bind(subscription.premium_badge)
            .bind(opt_dt(subscription.badge_granted_at))
            .bind(opt_dt(subscription.period_start))
            .bind(opt_dt(subscription.period_end))
            .bind(opt_dt(subscription.cancelled_at))
            .bind(subscription.created_at.as_datetime())
            .bind(subscription.updated_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.constraint() == Some("subscriptions_user_id_key") {
                        return DomainError::new(
                            ErrorCode::SubscriptionExists,
                            "User already has a subscription",
                        );
                    }
                }
                db_error("save", e)
            })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                status = $3,
                trial_end_date = $4,
                trial_used = $5,
                active_events = $6,
                daily_tasks = $7,
                mood_entries = $8,
                templates = $9,
                last_daily_reset = $10,
                premium_badge = $11,
                badge_granted_at = $12,
                period_start = $13,
                period_end = $14,
                cancelled_at = $15,
                updated_at = $16
            WHERE user_id = $1
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(opt_dt(subscription.trial_end_date))
        .bind(subscription.trial_used)
        .bind(to_column(subscription.usage.active_events))
        .bind(to_column(subscription.usage.daily_tasks))
        .bind(to_column(subscription.usage.mood_entries))
        .bind(to_column(subscription.usage.templates))
        .bind(subscription.usage.last_daily_reset.as_datetime())
        .bind(subscription.premium_badge)
        .bind(opt_dt(subscription.badge_granted_at))
        .bind(opt_dt(subscription.period_start))
        .bind(opt_dt(subscription.period_end))
        .bind(opt_dt(subscription.cancelled_at))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE user_id = $1", COLUMNS);

        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn apply_trial_task(
        &self,
        user_id: &UserId,
        task: TrialTask,
        now: Timestamp,
    ) -> Result<Subscription, DomainError> {
        let assignment = match task {
            TrialTask::WatchAd => "watched_ad = TRUE",
            TrialTask::FollowInstagram => "followed_instagram = TRUE",
            TrialTask::Share { .. } => "shares = LEAST(shares::BIGINT + $3, 2147483647)::INTEGER",
        };
        let sql = format!(
            "UPDATE subscriptions SET {}, updated_at = $2 WHERE user_id = $1 RETURNING {}",
            assignment, COLUMNS
        );

        let query = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(user_id.as_str())
            .bind(now.as_datetime());
        let query = match task {
            TrialTask::Share { count } => query.bind(i64::from(count)),
            _ => query,
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("apply trial task to", e))?;

        row.map(Subscription::try_from)
            .transpose()?
            .ok_or_else(not_found)
    }

    async fn find_trials_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions \
             WHERE status = 'trial' AND trial_end_date <= $1 \
             ORDER BY trial_end_date ASC",
            COLUMNS
        );

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(cutoff.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find due trial", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_paid_periods_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions \
             WHERE plan <> 'free' AND status IN ('active', 'cancelled') \
               AND period_end IS NOT NULL AND period_end <= $1 \
             ORDER BY period_end ASC",
            COLUMNS
        );

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(cutoff.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("find lapsed", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}
