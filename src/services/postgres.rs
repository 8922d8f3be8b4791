use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

use crate::models::{
    CategorizedExchange, Exchange, ExchangeStatus, Skill, SkillLevel, SkillType, User, UserId,
    UserRating,
};
use crate::services::repository::{ActivityKind, RepositoryError, SkillQuery, SkillRepository};

const SKILL_COLUMNS: &str = r#"
    SELECT id, user_id, title, COALESCE(description, '') AS description, category,
           level, skill_type, COALESCE(tags, '') AS tags, is_active, created_at
    FROM skills
    WHERE is_active = TRUE AND deleted_at IS NULL
"#;

/// PostgreSQL-backed skill repository
///
/// Reads the SkillSwap tables (`users`, `user_ratings`, `skills`, `exchanges`,
/// `messages`) as they are; soft-deleted rows are skipped. The schema is owned
/// by the SkillSwap backend, so this client never runs migrations.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new repository from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new repository from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, RepositoryError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(2)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn skill_from_row(row: &PgRow) -> Result<Option<Skill>, RepositoryError> {
    let id: i64 = row.try_get("id")?;
    let level: String = row.try_get("level")?;
    let skill_type: String = row.try_get("skill_type")?;

    let (level, skill_type) = match (level.parse::<SkillLevel>(), skill_type.parse::<SkillType>()) {
        (Ok(level), Ok(skill_type)) => (level, skill_type),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Skipping skill {} with invalid column value: {}", id, e);
            return Ok(None);
        }
    };

    Ok(Some(Skill {
        id,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        level,
        skill_type,
        tags: row.try_get("tags")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    }))
}

#[async_trait]
impl SkillRepository for PostgresRepository {
    async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        let query = r#"
            SELECT u.id, u.full_name,
                   COALESCE(u.avatar, '') AS avatar,
                   COALESCE(u.location, '') AS location,
                   r.average_rating, r.total_reviews
            FROM users u
            LEFT JOIN user_ratings r ON r.user_id = u.id
            WHERE u.id = $1 AND u.deleted_at IS NULL
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let average_rating: Option<f64> = row.try_get("average_rating")?;
        let total_reviews: Option<i64> = row.try_get("total_reviews")?;
        let rating = average_rating.map(|average_rating| UserRating {
            average_rating,
            total_reviews: total_reviews.unwrap_or(0),
        });

        Ok(Some(User {
            id: row.try_get("id")?,
            full_name: row.try_get("full_name")?,
            avatar: row.try_get("avatar")?,
            location: row.try_get("location")?,
            rating,
        }))
    }

    async fn fetch_active_skills(&self, query: &SkillQuery) -> Result<Vec<Skill>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SKILL_COLUMNS);

        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(skill_type) = query.skill_type {
            builder.push(" AND skill_type = ").push_bind(skill_type.as_str());
        }
        if let Some(categories) = &query.categories {
            builder.push(" AND category = ANY(").push_bind(categories.clone()).push(")");
        }
        if let Some(levels) = &query.levels {
            let levels: Vec<String> = levels.iter().map(|l| l.as_str().to_string()).collect();
            builder.push(" AND level = ANY(").push_bind(levels).push(")");
        }
        if let Some(excluded) = query.exclude_user_id {
            builder.push(" AND user_id <> ").push_bind(excluded);
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut skills = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(skill) = skill_from_row(row)? {
                skills.push(skill);
            }
        }

        tracing::trace!("Fetched {} skills for {:?}", skills.len(), query);

        Ok(skills)
    }

    async fn count_recent(
        &self,
        kind: ActivityKind,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let query = match kind {
            ActivityKind::Skills => {
                "SELECT COUNT(*) FROM skills WHERE user_id = $1 AND created_at > $2 AND deleted_at IS NULL"
            }
            ActivityKind::Exchanges => {
                "SELECT COUNT(*) FROM exchanges WHERE requester_id = $1 AND created_at > $2 AND deleted_at IS NULL"
            }
            ActivityKind::Messages => {
                "SELECT COUNT(*) FROM messages WHERE sender_id = $1 AND created_at > $2 AND deleted_at IS NULL"
            }
        };

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get(0)?)
    }

    async fn count_exchanges(
        &self,
        user_id: UserId,
        status: Option<ExchangeStatus>,
    ) -> Result<i64, RepositoryError> {
        let query = r#"
            SELECT COUNT(*)
            FROM exchanges e
            JOIN skills s ON e.skill_id = s.id
            WHERE (e.requester_id = $1 OR s.user_id = $1)
              AND e.deleted_at IS NULL
              AND ($2::text IS NULL OR e.status = $2)
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(status.map(ExchangeStatus::as_str))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get(0)?)
    }

    async fn fetch_exchanges_by_requester(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategorizedExchange>, RepositoryError> {
        let query = r#"
            SELECT e.id, e.requester_id, e.skill_id, e.status, e.created_at, e.updated_at,
                   s.category
            FROM exchanges e
            JOIN skills s ON e.skill_id = s.id
            WHERE e.requester_id = $1 AND e.deleted_at IS NULL
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut exchanges = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            let status = match status.parse::<ExchangeStatus>() {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("Skipping exchange {} with invalid status: {}", id, e);
                    continue;
                }
            };

            exchanges.push(CategorizedExchange {
                exchange: Exchange {
                    id,
                    requester_id: row.try_get("requester_id")?,
                    skill_id: row.try_get("skill_id")?,
                    status,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                },
                category: row.try_get("category")?,
            });
        }

        Ok(exchanges)
    }

    async fn average_response_hours(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, RepositoryError> {
        let query = r#"
            SELECT AVG(EXTRACT(EPOCH FROM (m2.created_at - m1.created_at)) / 3600)::float8 AS avg_hours
            FROM messages m1
            JOIN messages m2 ON m1.chat_room_id = m2.chat_room_id
            WHERE m1.sender_id <> $1 AND m2.sender_id = $1
              AND m2.created_at > m1.created_at
              AND m2.created_at - m1.created_at < interval '24 hours'
              AND m1.created_at > $2
              AND m1.deleted_at IS NULL AND m2.deleted_at IS NULL
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("avg_hours")?)
    }

    async fn health_check(&self) -> Result<bool, RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
