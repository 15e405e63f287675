//! Project and research-participation use cases.
//!
//! # Responsibility
//! - Create, rename, publish and delete projects.
//! - Manage who participates in a project and who manages it.
//!
//! # Invariants
//! - The creator of a project becomes its first manager.
//! - Project names are unique across the store.
//! - A user participates at most once per project.

use super::{conclude, ensure_manage, ensure_view, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::project::{Project, ResearchParticipation};
use crate::outcome::{Failure, OperationResult};
use crate::repo::project_repo::{
    NewParticipation, NewProject, ParticipationRepository, ProjectPatch, ProjectRepository,
};
use crate::repo::user_repo::UserRepository;
use crate::validate::schema::{parent_schema, participation_schema, project_schema};
use crate::validate::{ErrorCode, NameScope, RawParams, UniquenessChecker, Verb};

/// Use-case service for the project aggregate.
pub struct ProjectService<S> {
    store: S,
}

impl<S> ProjectService<S>
where
    S: ProjectRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a project managed by the acting user.
    ///
    /// # Contract
    /// - Guests get `Unauthorized` regardless of the payload.
    /// - `name` must be unique; `public` defaults to `false`.
    pub fn create(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Project> {
        conclude("project_create", self.try_create(auth, raw))
    }

    /// Renames and/or changes visibility; managers only.
    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Project> {
        conclude("project_update", self.try_update(auth, raw))
    }

    /// Returns one project the actor can view.
    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Project> {
        conclude("project_find", self.try_find(auth, raw))
    }

    /// Deletes a project with all its sections, samples and countings.
    ///
    /// Returns the removed record.
    pub fn delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Project> {
        conclude("project_delete", self.try_delete(auth, raw))
    }

    /// Public projects plus those the actor participates in.
    pub fn list(&self, auth: &dyn Authorizer) -> OperationResult<Vec<Project>> {
        conclude(
            "project_list",
            self.store
                .list_visible_projects(auth.actor())
                .map_err(Into::into),
        )
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Project> {
        let actor = require_identity(auth)?;
        let params = validate(project_schema(Verb::Create), raw)?;
        let name = params.require_text("name")?;

        if self
            .store
            .name_exists_within_scope(NameScope::Projects, name, None)?
        {
            return Err(Failure::field("name", ErrorCode::Taken).into());
        }

        let project = self.store.create_project(&NewProject {
            name: name.to_string(),
            public: params.flag("public").unwrap_or(false),
            manager_id: actor,
        })?;
        Ok(project)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Project> {
        require_identity(auth)?;
        let params = validate(project_schema(Verb::Update), raw)?;
        let project = found(self.store.find_project(params.require_integer("id")?)?)?;
        ensure_manage(auth, &project)?;

        let name = params.text("name");
        if let Some(name) = name {
            if self
                .store
                .name_exists_within_scope(NameScope::Projects, name, Some(project.id))?
            {
                return Err(Failure::field("name", ErrorCode::Taken).into());
            }
        }

        let updated = self.store.update_project(
            project.id,
            &ProjectPatch {
                name: name.map(str::to_string),
                public: params.flag("public"),
            },
        )?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Project> {
        let params = validate(project_schema(Verb::Find), raw)?;
        let project = found(self.store.find_project(params.require_integer("id")?)?)?;
        ensure_view(auth, &project)?;
        Ok(project)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Project> {
        require_identity(auth)?;
        let params = validate(project_schema(Verb::Delete), raw)?;
        let project = found(self.store.find_project(params.require_integer("id")?)?)?;
        ensure_manage(auth, &project)?;
        self.store.delete_project(project.id)?;
        Ok(project)
    }
}

/// Use-case service for research participations.
pub struct ParticipationService<S> {
    store: S,
}

impl<S> ParticipationService<S>
where
    S: ProjectRepository + ParticipationRepository + UserRepository,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a user to a project; `manager` defaults to `false`.
    pub fn create(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<ResearchParticipation> {
        conclude("participation_create", self.try_create(auth, raw))
    }

    /// Grants or revokes the manager role.
    pub fn update(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<ResearchParticipation> {
        conclude("participation_update", self.try_update(auth, raw))
    }

    pub fn find(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<ResearchParticipation> {
        conclude("participation_find", self.try_find(auth, raw))
    }

    pub fn delete(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<ResearchParticipation> {
        conclude("participation_delete", self.try_delete(auth, raw))
    }

    /// Participants of the project named by `project_id`.
    pub fn list(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Vec<ResearchParticipation>> {
        conclude("participation_list", self.try_list(auth, raw))
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<ResearchParticipation> {
        require_identity(auth)?;
        let params = validate(participation_schema(Verb::Create), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_manage(auth, &project)?;

        let user = found(self.store.find_user(params.require_integer("user_id")?)?)?;
        if self.store.participation(project.id, user.id)?.is_some() {
            return Err(Failure::field("user_id", ErrorCode::Taken).into());
        }

        let participation = self.store.create_participation(&NewParticipation {
            project_id: project.id,
            user_id: user.id,
            manager: params.flag("manager").unwrap_or(false),
        })?;
        Ok(participation)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<ResearchParticipation> {
        require_identity(auth)?;
        let params = validate(participation_schema(Verb::Update), raw)?;
        let (participation, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;

        let manager = params
            .flag("manager")
            .ok_or_else(|| Failure::field("manager", ErrorCode::Missing))?;
        let updated = self.store.set_manager(participation.id, manager)?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<ResearchParticipation> {
        let params = validate(participation_schema(Verb::Find), raw)?;
        let (participation, project) = self.resolve(params.require_integer("id")?)?;
        ensure_view(auth, &project)?;
        Ok(participation)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<ResearchParticipation> {
        require_identity(auth)?;
        let params = validate(participation_schema(Verb::Delete), raw)?;
        let (participation, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;
        self.store.delete_participation(participation.id)?;
        Ok(participation)
    }

    fn try_list(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Vec<ResearchParticipation>> {
        let params = validate(parent_schema("project_id"), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_view(auth, &project)?;
        Ok(self.store.list_participations(project.id)?)
    }

    fn resolve(&self, id: i64) -> Step<(ResearchParticipation, Project)> {
        let participation = found(self.store.find_participation(id)?)?;
        let project = found(self.store.find_project(participation.project_id)?)?;
        Ok((participation, project))
    }
}
