//! User identity and session records.

use super::RecordId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = RecordId;

/// Opaque session handle handed to callers after sign-in.
pub type SessionToken = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: i64,
}
