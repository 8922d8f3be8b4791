use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{CategorizedExchange, ExchangeStatus, Skill, SkillLevel, SkillType, User, UserId};

/// Errors that can occur when reading from the skill repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

/// Kind of record counted by [`SkillRepository::count_recent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    /// Skills created by the user
    Skills,
    /// Exchanges the user requested
    Exchanges,
    /// Chat messages the user sent
    Messages,
}

/// Filter for [`SkillRepository::fetch_active_skills`]
///
/// Only active skills are ever returned; every other field narrows the result
/// when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillQuery {
    pub user_id: Option<UserId>,
    pub skill_type: Option<SkillType>,
    pub categories: Option<Vec<String>>,
    pub levels: Option<Vec<SkillLevel>>,
    pub exclude_user_id: Option<UserId>,
}

impl SkillQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active skills of one type owned by `user_id`
    pub fn owned_by(user_id: UserId, skill_type: SkillType) -> Self {
        Self::new().user(user_id).skill_type(skill_type)
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn skill_type(mut self, skill_type: SkillType) -> Self {
        self.skill_type = Some(skill_type);
        self
    }

    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn levels(mut self, levels: Vec<SkillLevel>) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn excluding_user(mut self, user_id: UserId) -> Self {
        self.exclude_user_id = Some(user_id);
        self
    }

    /// Whether a skill satisfies this query
    pub fn matches(&self, skill: &Skill) -> bool {
        skill.is_active
            && self.user_id.map_or(true, |id| skill.user_id == id)
            && self.skill_type.map_or(true, |t| skill.skill_type == t)
            && self
                .categories
                .as_ref()
                .map_or(true, |cats| cats.iter().any(|c| *c == skill.category))
            && self
                .levels
                .as_ref()
                .map_or(true, |levels| levels.contains(&skill.level))
            && self.exclude_user_id.map_or(true, |id| skill.user_id != id)
    }
}

/// Read-only view of the SkillSwap data the matcher depends on
///
/// Implementations must tolerate concurrent reads. Every call is a single
/// query; the matcher never retries.
#[async_trait]
pub trait SkillRepository: Send + Sync {
    /// Fetch a user together with their aggregated rating
    async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch active skills matching `query`
    async fn fetch_active_skills(&self, query: &SkillQuery) -> Result<Vec<Skill>, RepositoryError>;

    /// Count records of `kind` created by `user_id` after `since`
    async fn count_recent(
        &self,
        kind: ActivityKind,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// Count exchanges the user took part in, as requester or as skill owner
    async fn count_exchanges(
        &self,
        user_id: UserId,
        status: Option<ExchangeStatus>,
    ) -> Result<i64, RepositoryError>;

    /// Exchanges requested by the user, with the target skill's category
    async fn fetch_exchanges_by_requester(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategorizedExchange>, RepositoryError>;

    /// Average hours between someone else's message and the user's reply in
    /// the same room, over replies within 24 hours to messages sent after
    /// `since`. `None` when the user has no such replies.
    async fn average_response_hours(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, RepositoryError>;

    /// Health check for the backing store
    async fn health_check(&self) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_skill(user_id: UserId, category: &str, level: SkillLevel, skill_type: SkillType) -> Skill {
        Skill {
            id: 1,
            user_id,
            title: "Title".to_string(),
            description: String::new(),
            category: category.to_string(),
            level,
            skill_type,
            tags: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_query_filters() {
        let skill = create_skill(2, "Music", SkillLevel::Advanced, SkillType::Offering);

        assert!(SkillQuery::new().matches(&skill));
        assert!(SkillQuery::owned_by(2, SkillType::Offering).matches(&skill));
        assert!(!SkillQuery::owned_by(2, SkillType::Seeking).matches(&skill));
        assert!(!SkillQuery::new().excluding_user(2).matches(&skill));
        assert!(SkillQuery::new()
            .categories(vec!["Art".into(), "Music".into()])
            .levels(vec![SkillLevel::Advanced])
            .matches(&skill));
        assert!(!SkillQuery::new().levels(vec![SkillLevel::Beginner]).matches(&skill));
    }

    #[test]
    fn test_query_never_matches_inactive() {
        let mut skill = create_skill(2, "Music", SkillLevel::Advanced, SkillType::Offering);
        skill.is_active = false;

        assert!(!SkillQuery::new().matches(&skill));
    }
}
