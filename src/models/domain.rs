use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type SkillId = i64;

/// Aggregated review data for a user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    pub average_rating: f64,
    pub total_reviews: i64,
}

/// User as read from the SkillSwap repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub rating: Option<UserRating>,
}

impl User {
    /// Average rating, or 0.0 for users nobody has reviewed yet
    pub fn average_rating(&self) -> f64 {
        self.rating.map(|r| r.average_rating).unwrap_or(0.0)
    }
}

/// Error returned when a stored enum value cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Proficiency level of a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 4] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
        SkillLevel::Expert,
    ];

    /// Numeric rank used by the base score (beginner = 1 ... expert = 4)
    pub fn rank(self) -> u8 {
        match self {
            Self::Beginner => 1,
            Self::Intermediate => 2,
            Self::Advanced => 3,
            Self::Expert => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "expert" => Ok(Self::Expert),
            other => Err(ParseEnumError {
                kind: "skill level",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a skill is supply (offering) or demand (seeking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Offering,
    Seeking,
}

impl SkillType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offering => "offering",
            Self::Seeking => "seeking",
        }
    }
}

impl FromStr for SkillType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offering" => Ok(Self::Offering),
            "seeking" => Ok(Self::Seeking),
            other => Err(ParseEnumError {
                kind: "skill type",
                value: other.to_string(),
            }),
        }
    }
}

/// A skill a user offers or seeks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub user_id: UserId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub level: SkillLevel,
    pub skill_type: SkillType,
    /// Comma-separated tag list
    #[serde(default)]
    pub tags: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an exchange request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ExchangeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ParseEnumError {
                kind: "exchange status",
                value: other.to_string(),
            }),
        }
    }
}

/// A request by one user to learn another user's skill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i64,
    pub requester_id: UserId,
    pub skill_id: SkillId,
    pub status: ExchangeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Exchange joined with the category of the skill it targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizedExchange {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub category: String,
}

/// Chat message metadata (content is never read by the engine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_room_id: i64,
    pub sender_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Bucketed estimate of how quickly a candidate replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseTime {
    #[serde(rename = "New user")]
    NewUser,
    #[serde(rename = "< 1 hour")]
    UnderOneHour,
    #[serde(rename = "< 6 hours")]
    UnderSixHours,
    #[serde(rename = "< 1 day")]
    UnderOneDay,
    #[serde(rename = "1+ days")]
    OverOneDay,
}

impl ResponseTime {
    /// Bucket an average reply latency in hours; a missing or zero average
    /// means the user has no reply history yet
    pub fn from_average_hours(hours: Option<f64>) -> Self {
        match hours {
            None => Self::NewUser,
            Some(h) if h <= 0.0 || h.is_nan() => Self::NewUser,
            Some(h) if h < 1.0 => Self::UnderOneHour,
            Some(h) if h < 6.0 => Self::UnderSixHours,
            Some(h) if h < 24.0 => Self::UnderOneDay,
            Some(_) => Self::OverOneDay,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NewUser => "New user",
            Self::UnderOneHour => "< 1 hour",
            Self::UnderSixHours => "< 6 hours",
            Self::UnderOneDay => "< 1 day",
            Self::OverOneDay => "1+ days",
        }
    }
}

impl fmt::Display for ResponseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Legacy-compatible match record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub user_id: UserId,
    pub user_name: String,
    pub user_avatar: String,
    pub offered_skill_id: SkillId,
    pub offered_skill: String,
    pub seeking_skill_id: SkillId,
    pub seeking_skill: String,
    pub match_score: i32,
}

impl Match {
    /// Identity of a match for deduplication
    pub fn key(&self) -> MatchKey {
        MatchKey {
            user_id: self.user_id,
            offered_skill_id: self.offered_skill_id,
            seeking_skill_id: self.seeking_skill_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub user_id: UserId,
    pub offered_skill_id: SkillId,
    pub seeking_skill_id: SkillId,
}

/// Match with every sub-score that contributed to `match_score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMatch {
    #[serde(flatten)]
    pub base: Match,
    pub user_rating: f64,
    pub location_score: i32,
    pub activity_score: i32,
    pub completion_rate: f64,
    pub response_time: ResponseTime,
    pub mutual_interest: bool,
    pub recommendation_score: i32,
}

impl AdvancedMatch {
    pub fn score(&self) -> i32 {
        self.base.match_score
    }
}

/// Point values for every scoring factor
///
/// Defaults reproduce the production scoring table; deployments may override
/// any of them through the `scoring.weights` config section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub category_exact: i32,
    pub level_compatible: i32,
    pub level_exact: i32,
    pub title_similarity: i32,
    pub description_similarity: i32,
    pub tag_similarity: i32,
    pub rating_multiplier: f64,
    pub location_exact: i32,
    pub location_partial: i32,
    pub completion_multiplier: f64,
    pub mutual_interest: i32,
    pub reciprocal_bonus: i32,
    pub category_preference_step: i32,
    pub category_preference_cap: i32,
    pub level_progression: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            category_exact: 50,
            level_compatible: 30,
            level_exact: 10,
            title_similarity: 20,
            description_similarity: 10,
            tag_similarity: 15,
            rating_multiplier: 5.0,
            location_exact: 15,
            location_partial: 8,
            completion_multiplier: 20.0,
            mutual_interest: 30,
            reciprocal_bonus: 35,
            category_preference_step: 3,
            category_preference_cap: 15,
            level_progression: 5,
        }
    }
}
