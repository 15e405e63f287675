//! Capability checks scoped to a project.
//!
//! # Responsibility
//! - Hold the resolved acting identity (or none, for guests).
//! - Answer `can_view` / `can_manage` from participation records.
//!
//! # Invariants
//! - Authorizers never mutate participation records.
//! - Missing identity maps to `Unauthorized`; identity without the role
//!   maps to `Forbidden`.

use crate::model::project::Project;
use crate::model::user::{SessionToken, UserId};
use crate::outcome::Failure;
use crate::repo::project_repo::ParticipationLookup;
use crate::repo::user_repo::SessionRepository;
use crate::repo::RepoResult;

pub trait Authorizer {
    /// Acting user, `None` for guests.
    fn actor(&self) -> Option<UserId>;

    fn is_authenticated(&self) -> bool {
        self.actor().is_some()
    }

    /// Any participation, or a public project.
    fn can_view(&self, project: &Project) -> RepoResult<bool>;

    /// Participation with `manager = true`.
    fn can_manage(&self, project: &Project) -> RepoResult<bool>;

    /// Failure to report when a capability check fails.
    fn denial(&self) -> Failure {
        if self.is_authenticated() {
            Failure::Forbidden
        } else {
            Failure::Unauthorized
        }
    }
}

/// Production authorizer backed by the participation relation.
pub struct ParticipationAuthorizer<'a, L: ParticipationLookup + ?Sized> {
    actor: Option<UserId>,
    lookup: &'a L,
}

impl<'a, L: ParticipationLookup + ?Sized> ParticipationAuthorizer<'a, L> {
    pub fn new(actor: Option<UserId>, lookup: &'a L) -> Self {
        Self { actor, lookup }
    }

    pub fn guest(lookup: &'a L) -> Self {
        Self::new(None, lookup)
    }

    pub fn for_user(user_id: UserId, lookup: &'a L) -> Self {
        Self::new(Some(user_id), lookup)
    }
}

impl<'a, L> ParticipationAuthorizer<'a, L>
where
    L: ParticipationLookup + SessionRepository + ?Sized,
{
    /// Resolves the actor from an opaque session handle; unknown or
    /// malformed handles yield a guest.
    pub fn from_session(token: Option<&str>, store: &'a L) -> RepoResult<Self> {
        let Some(token) = token.and_then(|value| SessionToken::parse_str(value.trim()).ok())
        else {
            return Ok(Self::guest(store));
        };
        let actor = store.find_session(token)?.map(|session| session.user_id);
        Ok(Self::new(actor, store))
    }
}

impl<L: ParticipationLookup + ?Sized> Authorizer for ParticipationAuthorizer<'_, L> {
    fn actor(&self) -> Option<UserId> {
        self.actor
    }

    fn can_view(&self, project: &Project) -> RepoResult<bool> {
        if project.public {
            return Ok(true);
        }
        let Some(user_id) = self.actor else {
            return Ok(false);
        };
        Ok(self.lookup.participation(project.id, user_id)?.is_some())
    }

    fn can_manage(&self, project: &Project) -> RepoResult<bool> {
        let Some(user_id) = self.actor else {
            return Ok(false);
        };
        Ok(self
            .lookup
            .participation(project.id, user_id)?
            .is_some_and(|participation| participation.manager))
    }
}

/// Fixed-answer authorizer for tests and tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedAuthorizer {
    pub actor: Option<UserId>,
    pub view: bool,
    pub manage: bool,
}

impl FixedAuthorizer {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn manager(user_id: UserId) -> Self {
        Self {
            actor: Some(user_id),
            view: true,
            manage: true,
        }
    }

    pub fn observer(user_id: UserId) -> Self {
        Self {
            actor: Some(user_id),
            view: true,
            manage: false,
        }
    }

    pub fn outsider(user_id: UserId) -> Self {
        Self {
            actor: Some(user_id),
            view: false,
            manage: false,
        }
    }
}

impl Authorizer for FixedAuthorizer {
    fn actor(&self) -> Option<UserId> {
        self.actor
    }

    fn can_view(&self, _project: &Project) -> RepoResult<bool> {
        Ok(self.view)
    }

    fn can_manage(&self, _project: &Project) -> RepoResult<bool> {
        Ok(self.manage)
    }
}
