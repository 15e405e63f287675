//! User registration and session handles.
//!
//! # Responsibility
//! - Register users and let them edit their own profile.
//! - Issue, resolve and revoke opaque session tokens.
//!
//! # Invariants
//! - Email addresses are unique.
//! - A user may only update their own record.
//! - Unknown or malformed tokens resolve to `Unauthorized`, never to an
//!   error on the fatal channel.

use super::{conclude, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::user::{Session, SessionToken, User};
use crate::outcome::{Failure, OperationResult};
use crate::repo::user_repo::{NewUser, SessionRepository, UserPatch, UserRepository};
use crate::validate::schema::{parent_schema, user_schema};
use crate::validate::{ErrorCode, FieldErrors, RawParams, UniquenessChecker, Verb};

pub struct UserService<S> {
    store: S,
}

impl<S> UserService<S>
where
    S: UserRepository + SessionRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a user; open to guests.
    pub fn register(&self, raw: &RawParams) -> OperationResult<User> {
        conclude("user_register", self.try_register(raw))
    }

    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<User> {
        conclude("user_update", self.try_update(auth, raw))
    }

    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<User> {
        conclude("user_find", self.try_find(auth, raw))
    }

    /// Issues a session for `user_id`.
    pub fn open_session(&self, raw: &RawParams) -> OperationResult<Session> {
        conclude("session_open", self.try_open_session(raw))
    }

    /// Resolves a token to its user.
    pub fn resolve_session(&self, token: &str) -> OperationResult<User> {
        conclude("session_resolve", self.try_resolve_session(token))
    }

    /// Revokes a token; revoking an unknown token is `NotFound`.
    pub fn close_session(&self, token: &str) -> OperationResult<()> {
        conclude("session_close", self.try_close_session(token))
    }

    fn try_register(&self, raw: &RawParams) -> Step<User> {
        let params = validate(user_schema(Verb::Create), raw)?;
        let email = params.require_text("email")?;
        if self.store.email_exists(email, None)? {
            return Err(Failure::field("email", ErrorCode::Taken).into());
        }
        let user = self.store.create_user(&NewUser {
            name: params.require_text("name")?.to_string(),
            email: email.to_string(),
        })?;
        Ok(user)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<User> {
        let actor = require_identity(auth)?;
        let params = validate(user_schema(Verb::Update), raw)?;
        let id = params.require_integer("id")?;
        if id != actor {
            return Err(Failure::Forbidden.into());
        }
        let user = found(self.store.find_user(id)?)?;

        let email = params.text("email");
        let mut errors = FieldErrors::default();
        if let Some(email) = email {
            if self.store.email_exists(email, Some(user.id))? {
                errors.insert("email", ErrorCode::Taken);
            }
        }
        errors.into_result()?;

        let updated = self.store.update_user(
            user.id,
            &UserPatch {
                name: params.text("name").map(str::to_string),
                email: email.map(str::to_string),
            },
        )?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<User> {
        require_identity(auth)?;
        let params = validate(user_schema(Verb::Find), raw)?;
        found(self.store.find_user(params.require_integer("id")?)?)
    }

    fn try_open_session(&self, raw: &RawParams) -> Step<Session> {
        let params = validate(parent_schema("user_id"), raw)?;
        let user = found(self.store.find_user(params.require_integer("user_id")?)?)?;
        Ok(self.store.create_session(user.id)?)
    }

    fn try_resolve_session(&self, token: &str) -> Step<User> {
        let token = parse_token(token).ok_or(Failure::Unauthorized)?;
        let session = self
            .store
            .find_session(token)?
            .ok_or(Failure::Unauthorized)?;
        let user = self
            .store
            .find_user(session.user_id)?
            .ok_or(Failure::Unauthorized)?;
        Ok(user)
    }

    fn try_close_session(&self, token: &str) -> Step<()> {
        let token = parse_token(token).ok_or(Failure::NotFound)?;
        if self.store.delete_session(token)? {
            Ok(())
        } else {
            Err(Failure::NotFound.into())
        }
    }
}

fn parse_token(value: &str) -> Option<SessionToken> {
    SessionToken::parse_str(value.trim()).ok()
}
