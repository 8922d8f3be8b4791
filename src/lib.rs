//! SkillSwap Match - skill exchange matching engine
//!
//! Given a requesting user, the engine pairs the skills they seek with skills
//! other users offer, scores each pair, and returns a ranked, deduplicated and
//! diversified list of matches. Data is read through the [`SkillRepository`]
//! trait; [`PostgresRepository`] reads the SkillSwap database and
//! [`MemoryRepository`] serves in-process snapshots.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchError, Matcher, MatcherSettings};
pub use models::{AdvancedMatch, Match, ScoringWeights, Skill, SkillLevel, SkillType, User};
pub use services::{MemoryRepository, PostgresRepository, RepositoryError, SkillRepository};
