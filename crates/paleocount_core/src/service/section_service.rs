//! Section and sample use cases.
//!
//! # Invariants
//! - Section names are unique inside their project.
//! - Sample names and ranks are unique inside their section.
//! - Samples are listed by `rank DESC` (top of the section first).

use super::{conclude, ensure_manage, ensure_view, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::project::Project;
use crate::model::section::{Sample, Section};
use crate::outcome::{Failure, OperationResult};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::section_repo::{NewSample, NewSection, SamplePatch, SectionRepository};
use crate::validate::schema::{parent_schema, sample_schema, section_schema};
use crate::validate::{
    ErrorCode, FieldErrors, NameScope, RankScope, RawParams, UniquenessChecker, Verb,
};

pub struct SectionService<S> {
    store: S,
}

impl<S> SectionService<S>
where
    S: ProjectRepository + SectionRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Section> {
        conclude("section_create", self.try_create(auth, raw))
    }

    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Section> {
        conclude("section_update", self.try_update(auth, raw))
    }

    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Section> {
        conclude("section_find", self.try_find(auth, raw))
    }

    /// Deletes a section and its samples.
    pub fn delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Section> {
        conclude("section_delete", self.try_delete(auth, raw))
    }

    pub fn list(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Vec<Section>> {
        conclude("section_list", self.try_list(auth, raw))
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Section> {
        require_identity(auth)?;
        let params = validate(section_schema(Verb::Create), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_manage(auth, &project)?;

        let name = params.require_text("name")?;
        if self
            .store
            .name_exists_within_scope(NameScope::Sections(project.id), name, None)?
        {
            return Err(Failure::field("name", ErrorCode::Taken).into());
        }

        let section = self.store.create_section(&NewSection {
            project_id: project.id,
            name: name.to_string(),
        })?;
        Ok(section)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Section> {
        require_identity(auth)?;
        let params = validate(section_schema(Verb::Update), raw)?;
        let (section, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;

        let Some(name) = params.text("name") else {
            return Ok(section);
        };
        if self.store.name_exists_within_scope(
            NameScope::Sections(project.id),
            name,
            Some(section.id),
        )? {
            return Err(Failure::field("name", ErrorCode::Taken).into());
        }
        Ok(self.store.rename_section(section.id, name)?)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Section> {
        let params = validate(section_schema(Verb::Find), raw)?;
        let (section, project) = self.resolve(params.require_integer("id")?)?;
        ensure_view(auth, &project)?;
        Ok(section)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Section> {
        require_identity(auth)?;
        let params = validate(section_schema(Verb::Delete), raw)?;
        let (section, project) = self.resolve(params.require_integer("id")?)?;
        ensure_manage(auth, &project)?;
        self.store.delete_section(section.id)?;
        Ok(section)
    }

    fn try_list(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Vec<Section>> {
        let params = validate(parent_schema("project_id"), raw)?;
        let project = found(
            self.store
                .find_project(params.require_integer("project_id")?)?,
        )?;
        ensure_view(auth, &project)?;
        Ok(self.store.list_sections(project.id)?)
    }

    fn resolve(&self, id: i64) -> Step<(Section, Project)> {
        let section = found(self.store.find_section(id)?)?;
        let project = found(self.store.find_project(section.project_id)?)?;
        Ok((section, project))
    }
}

pub struct SampleService<S> {
    store: S,
}

impl<S> SampleService<S>
where
    S: ProjectRepository + SectionRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a sample; `name` and `rank` must be free in the section.
    pub fn create(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Sample> {
        conclude("sample_create", self.try_create(auth, raw))
    }

    /// Partial update; blank `weight`/`description` clear the column.
    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Sample> {
        conclude("sample_update", self.try_update(auth, raw))
    }

    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Sample> {
        conclude("sample_find", self.try_find(auth, raw))
    }

    pub fn delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Sample> {
        conclude("sample_delete", self.try_delete(auth, raw))
    }

    /// Samples of `section_id`, highest rank first.
    pub fn list(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Vec<Sample>> {
        conclude("sample_list", self.try_list(auth, raw))
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Sample> {
        require_identity(auth)?;
        let params = validate(sample_schema(Verb::Create), raw)?;
        let (section, project) = self.resolve_section(params.require_integer("section_id")?)?;
        ensure_manage(auth, &project)?;

        let name = params.require_text("name")?;
        let rank = params.require_integer("rank")?;
        self.check_free(section.id, Some(name), Some(rank), None)?;

        let sample = self.store.create_sample(&NewSample {
            section_id: section.id,
            name: name.to_string(),
            rank,
            weight: params.decimal("weight"),
            description: params.text("description").map(str::to_string),
        })?;
        Ok(sample)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Sample> {
        require_identity(auth)?;
        let params = validate(sample_schema(Verb::Update), raw)?;
        let sample = found(self.store.find_sample(params.require_integer("id")?)?)?;
        let (section, project) = self.resolve_section(sample.section_id)?;
        ensure_manage(auth, &project)?;

        let name = params.text("name");
        let rank = params.integer("rank");
        self.check_free(section.id, name, rank, Some(sample.id))?;

        let updated = self.store.update_sample(
            sample.id,
            &SamplePatch {
                name: name.map(str::to_string),
                rank,
                weight: params.patch_decimal("weight"),
                description: params.patch_text("description"),
            },
        )?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Sample> {
        let params = validate(sample_schema(Verb::Find), raw)?;
        let sample = found(self.store.find_sample(params.require_integer("id")?)?)?;
        let (_, project) = self.resolve_section(sample.section_id)?;
        ensure_view(auth, &project)?;
        Ok(sample)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Sample> {
        require_identity(auth)?;
        let params = validate(sample_schema(Verb::Delete), raw)?;
        let sample = found(self.store.find_sample(params.require_integer("id")?)?)?;
        let (_, project) = self.resolve_section(sample.section_id)?;
        ensure_manage(auth, &project)?;
        self.store.delete_sample(sample.id)?;
        Ok(sample)
    }

    fn try_list(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Vec<Sample>> {
        let params = validate(parent_schema("section_id"), raw)?;
        let (section, project) = self.resolve_section(params.require_integer("section_id")?)?;
        ensure_view(auth, &project)?;
        Ok(self.store.list_samples(section.id)?)
    }

    fn resolve_section(&self, id: i64) -> Step<(Section, Project)> {
        let section = found(self.store.find_section(id)?)?;
        let project = found(self.store.find_project(section.project_id)?)?;
        Ok((section, project))
    }

    /// Name and rank are checked independently; both may be reported.
    fn check_free(
        &self,
        section_id: i64,
        name: Option<&str>,
        rank: Option<i64>,
        except: Option<i64>,
    ) -> Step<()> {
        let mut errors = FieldErrors::default();
        if let Some(name) = name {
            if self
                .store
                .name_exists_within_scope(NameScope::Samples(section_id), name, except)?
            {
                errors.insert("name", ErrorCode::Taken);
            }
        }
        if let Some(rank) = rank {
            if self
                .store
                .rank_exists(RankScope::Samples(section_id), rank, except)?
            {
                errors.insert("rank", ErrorCode::Taken);
            }
        }
        Ok(errors.into_result()?)
    }
}
