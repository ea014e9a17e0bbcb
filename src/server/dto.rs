use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GroupSharing, OmicSequence, SequenceStep, Token, UserSharing};

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_uid: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(token: Token, user_uid: Option<String>) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_uid,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateReferenceRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub user_uuid: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShareUserRequest {
    pub user_uuid: String,
    #[serde(default)]
    pub readwrite: bool,
}

#[derive(Debug, Deserialize)]
pub struct ShareGroupRequest {
    pub group_id: i64,
    #[serde(default)]
    pub readwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct SharingsResponse {
    pub is_public: bool,
    pub users: Vec<UserSharing>,
    pub groups: Vec<GroupSharing>,
}

#[derive(Debug, Serialize)]
pub struct SequenceResponse {
    pub name: OmicSequence,
    pub steps: &'static [SequenceStep],
}

impl From<OmicSequence> for SequenceResponse {
    fn from(sequence: OmicSequence) -> Self {
        Self {
            name: sequence,
            steps: sequence.steps(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub value: f64,
    pub description: Option<String>,
}
