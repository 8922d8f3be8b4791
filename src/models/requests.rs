use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::UserId;

/// Request to compute matches for a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: UserId,
    /// Truncates the final ranked list; all survivors are returned when absent
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub limit: Option<usize>,
}
