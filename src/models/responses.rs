use serde::{Deserialize, Serialize};
use crate::models::domain::{AdvancedMatch, Match};

/// Response for the legacy matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchesResponse {
    pub matches: Vec<Match>,
}

/// Response for the advanced matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedMatchesResponse {
    pub matches: Vec<AdvancedMatch>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
