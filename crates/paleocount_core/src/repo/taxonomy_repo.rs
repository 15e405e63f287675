//! Taxonomy (groups, species) and catalogue attribute persistence.
//!
//! # Invariants
//! - A feature's `field_id` always equals its choice's field, which keeps the
//!   one-choice-per-field constraint enforceable in SQL.
//! - Groups referenced by countings cannot be deleted (`ON DELETE RESTRICT`).

use super::{RepoError, RepoResult, SqliteStore};
use crate::model::taxonomy::{
    Choice, ChoiceId, Feature, Field, FieldId, Group, GroupId, Species, SpeciesId,
};
use crate::model::RecordId;
use rusqlite::{params, OptionalExtension, Row};

const SPECIES_SELECT_SQL: &str = "SELECT id, group_id, name, description FROM species";
const FEATURE_SELECT_SQL: &str = "SELECT id, species_id, field_id, choice_id FROM features";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpecies {
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

pub trait TaxonomyRepository {
    fn find_group(&self, id: GroupId) -> RepoResult<Option<Group>>;
    fn list_groups(&self) -> RepoResult<Vec<Group>>;
    fn create_group(&self, name: &str) -> RepoResult<Group>;
    fn rename_group(&self, id: GroupId, name: &str) -> RepoResult<Group>;
    fn delete_group(&self, id: GroupId) -> RepoResult<()>;

    fn find_species(&self, id: SpeciesId) -> RepoResult<Option<Species>>;
    fn list_species(&self, group_id: GroupId) -> RepoResult<Vec<Species>>;
    fn create_species(&self, species: &NewSpecies) -> RepoResult<Species>;
    fn update_species(&self, id: SpeciesId, patch: &SpeciesPatch) -> RepoResult<Species>;
    fn delete_species(&self, id: SpeciesId) -> RepoResult<()>;
}

pub trait CatalogueRepository {
    fn find_field(&self, id: FieldId) -> RepoResult<Option<Field>>;
    fn create_field(&self, group_id: GroupId, name: &str) -> RepoResult<Field>;
    fn rename_field(&self, id: FieldId, name: &str) -> RepoResult<Field>;
    fn delete_field(&self, id: FieldId) -> RepoResult<()>;

    fn find_choice(&self, id: ChoiceId) -> RepoResult<Option<Choice>>;
    fn create_choice(&self, field_id: FieldId, name: &str) -> RepoResult<Choice>;
    fn rename_choice(&self, id: ChoiceId, name: &str) -> RepoResult<Choice>;
    fn delete_choice(&self, id: ChoiceId) -> RepoResult<()>;

    fn find_feature(&self, id: RecordId) -> RepoResult<Option<Feature>>;
    /// The feature tagging `species_id` for `field_id`, if any.
    fn feature_for_field(
        &self,
        species_id: SpeciesId,
        field_id: FieldId,
    ) -> RepoResult<Option<Feature>>;
    fn create_feature(&self, species_id: SpeciesId, choice: &Choice) -> RepoResult<Feature>;
    fn delete_feature(&self, id: RecordId) -> RepoResult<()>;
    /// Species tagged with `choice_id`, by name.
    fn species_with_choice(&self, choice_id: ChoiceId) -> RepoResult<Vec<Species>>;
}

impl TaxonomyRepository for SqliteStore<'_> {
    fn find_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        let group = self
            .conn()
            .query_row(
                "SELECT id, name FROM taxon_groups WHERE id = ?1;",
                [id],
                |row| Ok(parse_group_row(row)),
            )
            .optional()?;
        group.transpose()
    }

    fn list_groups(&self) -> RepoResult<Vec<Group>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name FROM taxon_groups ORDER BY name ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_group_row(row)?);
        }
        Ok(items)
    }

    fn create_group(&self, name: &str) -> RepoResult<Group> {
        self.conn()
            .execute("INSERT INTO taxon_groups (name) VALUES (?1);", [name])?;
        let id = self.conn().last_insert_rowid();
        self.find_group(id)?
            .ok_or(RepoError::NotFound { entity: "group", id })
    }

    fn rename_group(&self, id: GroupId, name: &str) -> RepoResult<Group> {
        rename_row(self, "taxon_groups", "group", id, name)?;
        self.find_group(id)?
            .ok_or(RepoError::NotFound { entity: "group", id })
    }

    fn delete_group(&self, id: GroupId) -> RepoResult<()> {
        delete_row(self, "taxon_groups", "group", id)
    }

    fn find_species(&self, id: SpeciesId) -> RepoResult<Option<Species>> {
        let species = self
            .conn()
            .query_row(
                &format!("{SPECIES_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_species_row(row)),
            )
            .optional()?;
        species.transpose()
    }

    fn list_species(&self, group_id: GroupId) -> RepoResult<Vec<Species>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SPECIES_SELECT_SQL} WHERE group_id = ?1 ORDER BY name ASC, id ASC;"
        ))?;
        let rows = stmt.query([group_id])?;
        let species = collect_species(rows)?;
        Ok(species)
    }

    fn create_species(&self, species: &NewSpecies) -> RepoResult<Species> {
        self.conn().execute(
            "INSERT INTO species (group_id, name, description) VALUES (?1, ?2, ?3);",
            params![
                species.group_id,
                species.name.as_str(),
                species.description.as_deref()
            ],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_species(id)?
            .ok_or(RepoError::NotFound { entity: "species", id })
    }

    fn update_species(&self, id: SpeciesId, patch: &SpeciesPatch) -> RepoResult<Species> {
        let Some(current) = self.find_species(id)? else {
            return Err(RepoError::NotFound { entity: "species", id });
        };
        let description = patch.description.clone().unwrap_or(current.description);
        self.conn().execute(
            "UPDATE species SET name = ?2, description = ?3 WHERE id = ?1;",
            params![
                id,
                patch.name.as_deref().unwrap_or(current.name.as_str()),
                description.as_deref()
            ],
        )?;
        self.find_species(id)?
            .ok_or(RepoError::NotFound { entity: "species", id })
    }

    fn delete_species(&self, id: SpeciesId) -> RepoResult<()> {
        delete_row(self, "species", "species", id)
    }
}

impl CatalogueRepository for SqliteStore<'_> {
    fn find_field(&self, id: FieldId) -> RepoResult<Option<Field>> {
        let field = self
            .conn()
            .query_row(
                "SELECT id, group_id, name FROM fields WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Field {
                        id: row.get("id")?,
                        group_id: row.get("group_id")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(field)
    }

    fn create_field(&self, group_id: GroupId, name: &str) -> RepoResult<Field> {
        self.conn().execute(
            "INSERT INTO fields (group_id, name) VALUES (?1, ?2);",
            params![group_id, name],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_field(id)?
            .ok_or(RepoError::NotFound { entity: "field", id })
    }

    fn rename_field(&self, id: FieldId, name: &str) -> RepoResult<Field> {
        rename_row(self, "fields", "field", id, name)?;
        self.find_field(id)?
            .ok_or(RepoError::NotFound { entity: "field", id })
    }

    fn delete_field(&self, id: FieldId) -> RepoResult<()> {
        delete_row(self, "fields", "field", id)
    }

    fn find_choice(&self, id: ChoiceId) -> RepoResult<Option<Choice>> {
        let choice = self
            .conn()
            .query_row(
                "SELECT id, field_id, name FROM choices WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Choice {
                        id: row.get("id")?,
                        field_id: row.get("field_id")?,
                        name: row.get("name")?,
                    })
                },
            )
            .optional()?;
        Ok(choice)
    }

    fn create_choice(&self, field_id: FieldId, name: &str) -> RepoResult<Choice> {
        self.conn().execute(
            "INSERT INTO choices (field_id, name) VALUES (?1, ?2);",
            params![field_id, name],
        )?;
        let id = self.conn().last_insert_rowid();
        self.find_choice(id)?
            .ok_or(RepoError::NotFound { entity: "choice", id })
    }

    fn rename_choice(&self, id: ChoiceId, name: &str) -> RepoResult<Choice> {
        rename_row(self, "choices", "choice", id, name)?;
        self.find_choice(id)?
            .ok_or(RepoError::NotFound { entity: "choice", id })
    }

    fn delete_choice(&self, id: ChoiceId) -> RepoResult<()> {
        delete_row(self, "choices", "choice", id)
    }

    fn find_feature(&self, id: RecordId) -> RepoResult<Option<Feature>> {
        let feature = self
            .conn()
            .query_row(
                &format!("{FEATURE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_feature_row,
            )
            .optional()?;
        Ok(feature)
    }

    fn feature_for_field(
        &self,
        species_id: SpeciesId,
        field_id: FieldId,
    ) -> RepoResult<Option<Feature>> {
        let feature = self
            .conn()
            .query_row(
                &format!("{FEATURE_SELECT_SQL} WHERE species_id = ?1 AND field_id = ?2;"),
                params![species_id, field_id],
                parse_feature_row,
            )
            .optional()?;
        Ok(feature)
    }

    fn create_feature(&self, species_id: SpeciesId, choice: &Choice) -> RepoResult<Feature> {
        let result = self.conn().execute(
            "INSERT INTO features (species_id, field_id, choice_id) VALUES (?1, ?2, ?3);",
            params![species_id, choice.field_id, choice.id],
        );
        // The unique key is (species, field); callers speak in choices.
        if let Err(err) = result {
            return Err(match RepoError::from(err) {
                RepoError::Conflict { code, .. } => RepoError::Conflict {
                    field: "choice_id".to_string(),
                    code,
                },
                other => other,
            });
        }
        let id = self.conn().last_insert_rowid();
        self.find_feature(id)?
            .ok_or(RepoError::NotFound { entity: "feature", id })
    }

    fn delete_feature(&self, id: RecordId) -> RepoResult<()> {
        delete_row(self, "features", "feature", id)
    }

    fn species_with_choice(&self, choice_id: ChoiceId) -> RepoResult<Vec<Species>> {
        let mut stmt = self.conn().prepare(
            "SELECT s.id AS id, s.group_id AS group_id, s.name AS name,
                    s.description AS description
             FROM species s
             INNER JOIN features f ON f.species_id = s.id
             WHERE f.choice_id = ?1
             ORDER BY s.name ASC, s.id ASC;",
        )?;
        let rows = stmt.query([choice_id])?;
        let species = collect_species(rows)?;
        Ok(species)
    }
}

fn rename_row(
    store: &SqliteStore<'_>,
    table: &'static str,
    entity: &'static str,
    id: RecordId,
    name: &str,
) -> RepoResult<()> {
    let changed = store.conn().execute(
        &format!("UPDATE {table} SET name = ?2 WHERE id = ?1;"),
        params![id, name],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn delete_row(
    store: &SqliteStore<'_>,
    table: &'static str,
    entity: &'static str,
    id: RecordId,
) -> RepoResult<()> {
    let changed = store
        .conn()
        .execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn collect_species(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<Species>> {
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_species_row(row)?);
    }
    Ok(items)
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    Ok(Group {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

fn parse_species_row(row: &Row<'_>) -> RepoResult<Species> {
    Ok(Species {
        id: row.get("id")?,
        group_id: row.get("group_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn parse_feature_row(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get("id")?,
        species_id: row.get("species_id")?,
        field_id: row.get("field_id")?,
        choice_id: row.get("choice_id")?,
    })
}
