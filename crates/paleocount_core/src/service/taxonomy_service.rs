//! Taxonomy and catalogue use cases.
//!
//! # Responsibility
//! - Maintain taxonomic groups and their species.
//! - Maintain the descriptive catalogue: fields of a group, choices of a
//!   field and the features tagging a species with one choice.
//!
//! # Invariants
//! - Taxonomy is shared by all projects: reads are open, writes require an
//!   authenticated actor.
//! - A species carries at most one choice per field, and only choices of
//!   fields from its own group.

use super::{conclude, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::taxonomy::{Choice, Feature, Field, Group, Species};
use crate::outcome::{Failure, OperationResult};
use crate::repo::taxonomy_repo::{
    CatalogueRepository, NewSpecies, SpeciesPatch, TaxonomyRepository,
};
use crate::validate::schema::{
    choice_schema, feature_schema, field_schema, group_schema, parent_schema, species_schema,
};
use crate::validate::{ErrorCode, NameScope, RawParams, UniquenessChecker, Verb};

pub struct TaxonomyService<S> {
    store: S,
}

impl<S> TaxonomyService<S>
where
    S: TaxonomyRepository + CatalogueRepository + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Group> {
        conclude("group_create", self.try_create_group(auth, raw))
    }

    pub fn update_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Group> {
        conclude("group_update", self.try_update_group(auth, raw))
    }

    pub fn find_group(&self, raw: &RawParams) -> OperationResult<Group> {
        conclude("group_find", self.try_find_group(raw))
    }

    /// Groups still referenced by a counting are reported as `id: in_use`.
    pub fn delete_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Group> {
        conclude("group_delete", self.try_delete_group(auth, raw))
    }

    pub fn list_groups(&self) -> OperationResult<Vec<Group>> {
        conclude("group_list", self.store.list_groups().map_err(Into::into))
    }

    pub fn create_species(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Species> {
        conclude("species_create", self.try_create_species(auth, raw))
    }

    pub fn update_species(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Species> {
        conclude("species_update", self.try_update_species(auth, raw))
    }

    pub fn find_species(&self, raw: &RawParams) -> OperationResult<Species> {
        conclude("species_find", self.try_find_species(raw))
    }

    pub fn delete_species(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Species> {
        conclude("species_delete", self.try_delete_species(auth, raw))
    }

    /// Species of the group named by `group_id`.
    pub fn list_species(&self, raw: &RawParams) -> OperationResult<Vec<Species>> {
        conclude("species_list", self.try_list_species(raw))
    }

    pub fn create_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Field> {
        conclude("field_create", self.try_create_field(auth, raw))
    }

    pub fn update_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Field> {
        conclude("field_update", self.try_update_field(auth, raw))
    }

    pub fn find_field(&self, raw: &RawParams) -> OperationResult<Field> {
        conclude("field_find", self.try_find_field(raw))
    }

    pub fn delete_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Field> {
        conclude("field_delete", self.try_delete_field(auth, raw))
    }

    pub fn create_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Choice> {
        conclude("choice_create", self.try_create_choice(auth, raw))
    }

    pub fn update_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Choice> {
        conclude("choice_update", self.try_update_choice(auth, raw))
    }

    pub fn find_choice(&self, raw: &RawParams) -> OperationResult<Choice> {
        conclude("choice_find", self.try_find_choice(raw))
    }

    pub fn delete_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Choice> {
        conclude("choice_delete", self.try_delete_choice(auth, raw))
    }

    /// Tags a species with a choice.
    ///
    /// # Contract
    /// - The choice's field must belong to the species' group
    ///   (`choice_id: not_in_group`).
    /// - A second choice for the same field is `choice_id: taken`.
    pub fn create_feature(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Feature> {
        conclude("feature_create", self.try_create_feature(auth, raw))
    }

    pub fn find_feature(&self, raw: &RawParams) -> OperationResult<Feature> {
        conclude("feature_find", self.try_find_feature(raw))
    }

    pub fn delete_feature(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<Feature> {
        conclude("feature_delete", self.try_delete_feature(auth, raw))
    }

    /// Catalogue filter: species tagged with `choice_id`.
    pub fn species_with_choice(&self, raw: &RawParams) -> OperationResult<Vec<Species>> {
        conclude("species_with_choice", self.try_species_with_choice(raw))
    }

    fn try_create_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Group> {
        require_identity(auth)?;
        let params = validate(group_schema(Verb::Create), raw)?;
        let name = params.require_text("name")?;
        self.ensure_name_free(NameScope::Groups, name, None)?;
        Ok(self.store.create_group(name)?)
    }

    fn try_update_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Group> {
        require_identity(auth)?;
        let params = validate(group_schema(Verb::Update), raw)?;
        let group = found(self.store.find_group(params.require_integer("id")?)?)?;
        let Some(name) = params.text("name") else {
            return Ok(group);
        };
        self.ensure_name_free(NameScope::Groups, name, Some(group.id))?;
        Ok(self.store.rename_group(group.id, name)?)
    }

    fn try_find_group(&self, raw: &RawParams) -> Step<Group> {
        let params = validate(group_schema(Verb::Find), raw)?;
        found(self.store.find_group(params.require_integer("id")?)?)
    }

    fn try_delete_group(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Group> {
        require_identity(auth)?;
        let params = validate(group_schema(Verb::Delete), raw)?;
        let group = found(self.store.find_group(params.require_integer("id")?)?)?;
        self.store.delete_group(group.id)?;
        Ok(group)
    }

    fn try_create_species(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Species> {
        require_identity(auth)?;
        let params = validate(species_schema(Verb::Create), raw)?;
        let group = found(self.store.find_group(params.require_integer("group_id")?)?)?;
        let name = params.require_text("name")?;
        self.ensure_name_free(NameScope::Species(group.id), name, None)?;
        let species = self.store.create_species(&NewSpecies {
            group_id: group.id,
            name: name.to_string(),
            description: params.text("description").map(str::to_string),
        })?;
        Ok(species)
    }

    fn try_update_species(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Species> {
        require_identity(auth)?;
        let params = validate(species_schema(Verb::Update), raw)?;
        let species = found(self.store.find_species(params.require_integer("id")?)?)?;
        let name = params.text("name");
        if let Some(name) = name {
            self.ensure_name_free(NameScope::Species(species.group_id), name, Some(species.id))?;
        }
        let updated = self.store.update_species(
            species.id,
            &SpeciesPatch {
                name: name.map(str::to_string),
                description: params.patch_text("description"),
            },
        )?;
        Ok(updated)
    }

    fn try_find_species(&self, raw: &RawParams) -> Step<Species> {
        let params = validate(species_schema(Verb::Find), raw)?;
        found(self.store.find_species(params.require_integer("id")?)?)
    }

    fn try_delete_species(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Species> {
        require_identity(auth)?;
        let params = validate(species_schema(Verb::Delete), raw)?;
        let species = found(self.store.find_species(params.require_integer("id")?)?)?;
        self.store.delete_species(species.id)?;
        Ok(species)
    }

    fn try_list_species(&self, raw: &RawParams) -> Step<Vec<Species>> {
        let params = validate(parent_schema("group_id"), raw)?;
        let group = found(self.store.find_group(params.require_integer("group_id")?)?)?;
        Ok(self.store.list_species(group.id)?)
    }

    fn try_create_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Field> {
        require_identity(auth)?;
        let params = validate(field_schema(Verb::Create), raw)?;
        let group = found(self.store.find_group(params.require_integer("group_id")?)?)?;
        let name = params.require_text("name")?;
        self.ensure_name_free(NameScope::Fields(group.id), name, None)?;
        Ok(self.store.create_field(group.id, name)?)
    }

    fn try_update_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Field> {
        require_identity(auth)?;
        let params = validate(field_schema(Verb::Update), raw)?;
        let field = found(self.store.find_field(params.require_integer("id")?)?)?;
        let Some(name) = params.text("name") else {
            return Ok(field);
        };
        self.ensure_name_free(NameScope::Fields(field.group_id), name, Some(field.id))?;
        Ok(self.store.rename_field(field.id, name)?)
    }

    fn try_find_field(&self, raw: &RawParams) -> Step<Field> {
        let params = validate(field_schema(Verb::Find), raw)?;
        found(self.store.find_field(params.require_integer("id")?)?)
    }

    fn try_delete_field(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Field> {
        require_identity(auth)?;
        let params = validate(field_schema(Verb::Delete), raw)?;
        let field = found(self.store.find_field(params.require_integer("id")?)?)?;
        self.store.delete_field(field.id)?;
        Ok(field)
    }

    fn try_create_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Choice> {
        require_identity(auth)?;
        let params = validate(choice_schema(Verb::Create), raw)?;
        let field = found(self.store.find_field(params.require_integer("field_id")?)?)?;
        let name = params.require_text("name")?;
        self.ensure_name_free(NameScope::Choices(field.id), name, None)?;
        Ok(self.store.create_choice(field.id, name)?)
    }

    fn try_update_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Choice> {
        require_identity(auth)?;
        let params = validate(choice_schema(Verb::Update), raw)?;
        let choice = found(self.store.find_choice(params.require_integer("id")?)?)?;
        let Some(name) = params.text("name") else {
            return Ok(choice);
        };
        self.ensure_name_free(NameScope::Choices(choice.field_id), name, Some(choice.id))?;
        Ok(self.store.rename_choice(choice.id, name)?)
    }

    fn try_find_choice(&self, raw: &RawParams) -> Step<Choice> {
        let params = validate(choice_schema(Verb::Find), raw)?;
        found(self.store.find_choice(params.require_integer("id")?)?)
    }

    fn try_delete_choice(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Choice> {
        require_identity(auth)?;
        let params = validate(choice_schema(Verb::Delete), raw)?;
        let choice = found(self.store.find_choice(params.require_integer("id")?)?)?;
        self.store.delete_choice(choice.id)?;
        Ok(choice)
    }

    fn try_create_feature(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Feature> {
        require_identity(auth)?;
        let params = validate(feature_schema(Verb::Create), raw)?;
        let species = found(self.store.find_species(params.require_integer("species_id")?)?)?;
        let choice = found(self.store.find_choice(params.require_integer("choice_id")?)?)?;
        let field = found(self.store.find_field(choice.field_id)?)?;

        if field.group_id != species.group_id {
            return Err(Failure::field("choice_id", ErrorCode::NotInGroup).into());
        }
        if self.store.feature_for_field(species.id, field.id)?.is_some() {
            return Err(Failure::field("choice_id", ErrorCode::Taken).into());
        }
        Ok(self.store.create_feature(species.id, &choice)?)
    }

    fn try_find_feature(&self, raw: &RawParams) -> Step<Feature> {
        let params = validate(feature_schema(Verb::Find), raw)?;
        found(self.store.find_feature(params.require_integer("id")?)?)
    }

    fn try_delete_feature(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Feature> {
        require_identity(auth)?;
        let params = validate(feature_schema(Verb::Delete), raw)?;
        let feature = found(self.store.find_feature(params.require_integer("id")?)?)?;
        self.store.delete_feature(feature.id)?;
        Ok(feature)
    }

    fn try_species_with_choice(&self, raw: &RawParams) -> Step<Vec<Species>> {
        let params = validate(parent_schema("choice_id"), raw)?;
        let choice = found(self.store.find_choice(params.require_integer("choice_id")?)?)?;
        Ok(self.store.species_with_choice(choice.id)?)
    }

    fn ensure_name_free(&self, scope: NameScope, name: &str, except: Option<i64>) -> Step<()> {
        if self.store.name_exists_within_scope(scope, name, except)? {
            return Err(Failure::field("name", ErrorCode::Taken).into());
        }
        Ok(())
    }
}
