// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AdvancedMatch, CategorizedExchange, Exchange, ExchangeStatus, Match, MatchKey, Message,
    ParseEnumError, ResponseTime, ScoringWeights, Skill, SkillId, SkillLevel, SkillType, User,
    UserId, UserRating,
};
pub use requests::FindMatchesRequest;
pub use responses::{AdvancedMatchesResponse, ErrorResponse, HealthResponse, MatchesResponse};
