//! Counting use cases.
//!
//! A counting tallies one taxonomic group over the samples of a project.
//!
//! # Invariants
//! - Counting names are unique inside their project.
//! - The optional marker species belongs to the counting's group.

use super::{conclude, ensure_manage, ensure_view, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::counting::Counting;
use crate::model::project::Project;
use crate::model::taxonomy::{GroupId, SpeciesId};
use crate::outcome::OperationResult;
use crate::repo::counting_repo::{CountingPatch, CountingRepository, NewCounting};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::taxonomy_repo::TaxonomyRepository;
use crate::validate::schema::{counting_schema, parent_schema};
use crate::validate::{ErrorCode, FieldErrors, NameScope, RawParams, UniquenessChecker, Verb};

pub struct CountingService<S> {
    store: S,
}

impl<S> CountingService<S>
where
    S: ProjectRepository + CountingRepository + TaxonomyRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Counting> {
        conclude("counting_create", self.try_create(auth, raw))
    }

    /// Renames the counting or changes its marker; a blank `marker_id`
    /// clears it. The group is fixed at creation.
    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Counting> {
        conclude("counting_update", self.try_update(auth, raw))
    }

    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Counting> {
        conclude("counting_find", self.try_find(auth, raw))
    }

    /// Deletes a counting and all its occurrences.
    pub fn delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Counting> {
        conclude("counting_delete", self.try_delete(auth, raw))
    }

    pub fn list(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Vec<Counting>> {
        conclude("counting_list", self.try_list(auth, raw))
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Counting> {
        require_identity(auth)?;
        let params = validate(counting_schema(Verb::Create), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_manage(auth, &project)?;

        let group = found(self.store.find_group(params.require_integer("group_id")?)?)?;
        let name = params.require_text("name")?;
        let marker_id = params.integer("marker_id");

        let mut errors = FieldErrors::default();
        if self
            .store
            .name_exists_within_scope(NameScope::Countings(project.id), name, None)?
        {
            errors.insert("name", ErrorCode::Taken);
        }
        if let Some(marker_id) = marker_id {
            if !self.species_in_group(marker_id, group.id)? {
                errors.insert("marker_id", ErrorCode::NotInGroup);
            }
        }
        errors.into_result()?;

        let counting = self.store.create_counting(&NewCounting {
            project_id: project.id,
            group_id: group.id,
            marker_id,
            name: name.to_string(),
        })?;
        Ok(counting)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Counting> {
        require_identity(auth)?;
        let params = validate(counting_schema(Verb::Update), raw)?;
        let (counting, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;

        let name = params.text("name");
        let marker_id = params.patch_integer("marker_id");

        let mut errors = FieldErrors::default();
        if let Some(name) = name {
            if self.store.name_exists_within_scope(
                NameScope::Countings(project.id),
                name,
                Some(counting.id),
            )? {
                errors.insert("name", ErrorCode::Taken);
            }
        }
        if let Some(Some(marker_id)) = marker_id {
            if !self.species_in_group(marker_id, counting.group_id)? {
                errors.insert("marker_id", ErrorCode::NotInGroup);
            }
        }
        errors.into_result()?;

        let updated = self.store.update_counting(
            counting.id,
            &CountingPatch {
                name: name.map(str::to_string),
                marker_id,
            },
        )?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Counting> {
        let params = validate(counting_schema(Verb::Find), raw)?;
        let (counting, project) = self.resolve(params.require_integer("id")?)?;
        ensure_view(auth, &project)?;
        Ok(counting)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Counting> {
        require_identity(auth)?;
        let params = validate(counting_schema(Verb::Delete), raw)?;
        let (counting, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;
        self.store.delete_counting(counting.id)?;
        Ok(counting)
    }

    fn try_list(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Vec<Counting>> {
        let params = validate(parent_schema("project_id"), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_view(auth, &project)?;
        Ok(self.store.list_countings(project.id)?)
    }

    fn resolve(&self, id: i64) -> Step<(Counting, Project)> {
        let counting = found(self.store.find_counting(id)?)?;
        let project = found(self.store.find_project(counting.project_id)?)?;
        Ok((counting, project))
    }

    /// Unknown species are reported the same way as foreign ones.
    fn species_in_group(&self, species_id: SpeciesId, group_id: GroupId) -> Step<bool> {
        Ok(self
            .store
            .find_species(species_id)?
            .is_some_and(|species| species.group_id == group_id))
    }
}
