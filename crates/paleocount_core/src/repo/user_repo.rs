//! User and session persistence.

use super::{RepoError, RepoResult, SqliteStore};
use crate::model::user::{Session, SessionToken, User, UserId};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub trait UserRepository {
    fn find_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User>;
}

/// Session handles: the identity collaborator resolving opaque tokens.
pub trait SessionRepository {
    fn create_session(&self, user_id: UserId) -> RepoResult<Session>;
    fn find_session(&self, token: SessionToken) -> RepoResult<Option<Session>>;
    /// Returns whether a session was removed.
    fn delete_session(&self, token: SessionToken) -> RepoResult<bool>;
}

impl UserRepository for SqliteStore<'_> {
    fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, name, email, created_at FROM users WHERE id = ?1;",
                [id],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?;
        user.transpose()
    }

    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        self.conn().execute(
            "INSERT INTO users (name, email) VALUES (?1, ?2);",
            params![user.name.as_str(), user.email.as_str()],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_user(id)?
            .ok_or(RepoError::NotFound { entity: "user", id })
    }

    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<User> {
        let changed = self.conn().execute(
            "UPDATE users
             SET name = COALESCE(?2, name),
                 email = COALESCE(?3, email)
             WHERE id = ?1;",
            params![id, patch.name.as_deref(), patch.email.as_deref()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "user", id });
        }
        self.find_user(id)?
            .ok_or(RepoError::NotFound { entity: "user", id })
    }
}

impl SessionRepository for SqliteStore<'_> {
    fn create_session(&self, user_id: UserId) -> RepoResult<Session> {
        let token = Uuid::new_v4();
        self.conn().execute(
            "INSERT INTO sessions (token, user_id) VALUES (?1, ?2);",
            params![token.to_string(), user_id],
        )?;
        self.find_session(token)?.ok_or_else(|| {
            RepoError::InvalidData(format!("session {token} missing after insert"))
        })
    }

    fn find_session(&self, token: SessionToken) -> RepoResult<Option<Session>> {
        let session = self
            .conn()
            .query_row(
                "SELECT token, user_id, created_at FROM sessions WHERE token = ?1;",
                [token.to_string()],
                |row| Ok(parse_session_row(row)),
            )
            .optional()?;
        session.transpose()
    }

    fn delete_session(&self, token: SessionToken) -> RepoResult<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1;", [token.to_string()])?;
        Ok(changed > 0)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_session_row(row: &Row<'_>) -> RepoResult<Session> {
    let token_text: String = row.get("token")?;
    let token = Uuid::parse_str(&token_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{token_text}` in sessions.token"))
    })?;
    Ok(Session {
        token,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}
