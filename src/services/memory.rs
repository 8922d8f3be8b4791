use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{CategorizedExchange, Exchange, ExchangeStatus, Message, Skill, User, UserId};
use crate::services::repository::{ActivityKind, RepositoryError, SkillQuery, SkillRepository};

/// In-process snapshot of SkillSwap data
///
/// Useful for tests, benchmarks, and embedders that already hold the data in
/// memory. The snapshot is immutable once built; every query is answered by
/// filtering it.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    users: HashMap<UserId, User>,
    skills: Vec<Skill>,
    exchanges: Vec<Exchange>,
    messages: Vec<Message>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_exchange(mut self, exchange: Exchange) -> Self {
        self.exchanges.push(exchange);
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    fn skill_owner(&self, skill_id: i64) -> Option<UserId> {
        self.skills.iter().find(|s| s.id == skill_id).map(|s| s.user_id)
    }
}

#[async_trait]
impl SkillRepository for MemoryRepository {
    async fn fetch_user(&self, user_id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&user_id).cloned())
    }

    async fn fetch_active_skills(&self, query: &SkillQuery) -> Result<Vec<Skill>, RepositoryError> {
        Ok(self
            .skills
            .iter()
            .filter(|skill| query.matches(skill))
            .cloned()
            .collect())
    }

    async fn count_recent(
        &self,
        kind: ActivityKind,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count = match kind {
            ActivityKind::Skills => self
                .skills
                .iter()
                .filter(|s| s.user_id == user_id && s.created_at > since)
                .count(),
            ActivityKind::Exchanges => self
                .exchanges
                .iter()
                .filter(|e| e.requester_id == user_id && e.created_at > since)
                .count(),
            ActivityKind::Messages => self
                .messages
                .iter()
                .filter(|m| m.sender_id == user_id && m.created_at > since)
                .count(),
        };

        Ok(count as i64)
    }

    async fn count_exchanges(
        &self,
        user_id: UserId,
        status: Option<ExchangeStatus>,
    ) -> Result<i64, RepositoryError> {
        let count = self
            .exchanges
            .iter()
            .filter(|e| {
                // exchanges whose skill is gone drop out, like the inner join they model
                match self.skill_owner(e.skill_id) {
                    Some(owner) => e.requester_id == user_id || owner == user_id,
                    None => false,
                }
            })
            .filter(|e| status.map_or(true, |s| e.status == s))
            .count();

        Ok(count as i64)
    }

    async fn fetch_exchanges_by_requester(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategorizedExchange>, RepositoryError> {
        Ok(self
            .exchanges
            .iter()
            .filter(|e| e.requester_id == user_id)
            .filter_map(|e| {
                self.skills
                    .iter()
                    .find(|s| s.id == e.skill_id)
                    .map(|s| CategorizedExchange {
                        exchange: e.clone(),
                        category: s.category.clone(),
                    })
            })
            .collect())
    }

    async fn average_response_hours(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, RepositoryError> {
        let window = Duration::hours(24);
        let mut total_hours = 0.0;
        let mut replies = 0usize;

        for prompt in self
            .messages
            .iter()
            .filter(|m| m.sender_id != user_id && m.created_at > since)
        {
            for reply in self.messages.iter().filter(|m| {
                m.sender_id == user_id
                    && m.chat_room_id == prompt.chat_room_id
                    && m.created_at > prompt.created_at
            }) {
                let gap = reply.created_at - prompt.created_at;
                if gap < window {
                    total_hours += gap.num_seconds() as f64 / 3600.0;
                    replies += 1;
                }
            }
        }

        if replies == 0 {
            return Ok(None);
        }
        Ok(Some(total_hours / replies as f64))
    }
}
