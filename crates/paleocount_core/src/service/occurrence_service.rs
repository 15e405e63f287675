//! Occurrence tally use cases.
//!
//! # Responsibility
//! - Record how many specimens of a species were seen in one sample of a
//!   counting, or a non-numeric status for them.
//! - Apply relative `shift` updates to the stored quantity.
//! - Aggregate one tally sheet into a `SampleReport`.
//!
//! # Invariants
//! - Inside one (counting, sample), `rank` and `species_id` are each unique
//!   and are checked independently.
//! - The species belongs to the counting's group; the sample belongs to a
//!   section of the counting's project.
//! - A shift that would drive the quantity below zero clears it; one that
//!   would push it past `QUANTITY_MAX` is rejected.

use super::{conclude, ensure_manage, ensure_view, found, require_identity, validate, Step};
use crate::auth::Authorizer;
use crate::model::counting::{shifted_quantity, Counting, Occurrence, OccurrenceStatus};
use crate::model::project::Project;
use crate::model::section::Sample;
use crate::outcome::{Failure, OperationResult, Outcome};
use crate::repo::counting_repo::{CountingRepository, NewOccurrence, OccurrencePatch};
use crate::repo::project_repo::ProjectRepository;
use crate::repo::section_repo::SectionRepository;
use crate::repo::taxonomy_repo::TaxonomyRepository;
use crate::summary::{SampleReport, TallyEntry};
use crate::validate::schema::{occurrence_schema, sample_report_schema, QUANTITY_MAX};
use crate::validate::{
    CleanParams, ErrorCode, FieldErrors, RankScope, RawParams, UniquenessChecker, Verb,
};
use log::debug;

pub struct OccurrenceService<S> {
    store: S,
}

impl<S> OccurrenceService<S>
where
    S: ProjectRepository
        + SectionRepository
        + CountingRepository
        + TaxonomyRepository
        + UniquenessChecker,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a species to a sample's tally sheet.
    ///
    /// # Contract
    /// - Omitted `rank` defaults to one above the current top rank.
    /// - Omitted `status` defaults to `normal`; `uncertain` to `false`.
    /// - `quantity` may be absent (species noted but not counted).
    pub fn create(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Occurrence> {
        conclude("occurrence_create", self.try_create(auth, raw))
    }

    /// Partial update.
    ///
    /// # Contract
    /// - `quantity` sets the value directly; blank clears it.
    /// - `shift` adds a signed delta to the current value (absent counts as
    ///   zero); a negative result clears the quantity; zero is a no-op.
    /// - Supplying both is rejected with `shift: exclusive`.
    pub fn update(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Occurrence> {
        conclude("occurrence_update", self.try_update(auth, raw))
    }

    pub fn find(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Occurrence> {
        conclude("occurrence_find", self.try_find(auth, raw))
    }

    pub fn delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> OperationResult<Occurrence> {
        conclude("occurrence_delete", self.try_delete(auth, raw))
    }

    /// Tally sheet of one sample inside a counting, with its summary.
    pub fn sample_report(
        &self,
        auth: &dyn Authorizer,
        raw: &RawParams,
    ) -> OperationResult<SampleReport> {
        conclude("sample_report", self.try_sample_report(auth, raw))
    }

    /// Renders a successful single-occurrence result as a `TallyEntry`,
    /// reading the sample's current sheet for the summary.
    ///
    /// Failures pass through unchanged. After a delete the summary no longer
    /// includes the removed occurrence.
    pub fn with_summary(
        &self,
        result: OperationResult<Occurrence>,
    ) -> OperationResult<TallyEntry> {
        let occurrence = match result? {
            Outcome::Success(occurrence) => occurrence,
            Outcome::Failure(failure) => return Ok(Outcome::Failure(failure)),
        };
        let sheet = self
            .store
            .list_occurrences(occurrence.counting_id, occurrence.sample_id)?;
        Ok(Outcome::Success(TallyEntry::build(&occurrence, &sheet)))
    }

    fn try_create(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Occurrence> {
        require_identity(auth)?;
        let params = validate(occurrence_schema(Verb::Create), raw)?;
        let (counting, project) = self.resolve_counting(params.require_integer("counting_id")?)?;
        ensure_manage(auth, &project)?;

        let sample = found(self.store.find_sample(params.require_integer("sample_id")?)?)?;
        let species_id = params.require_integer("species_id")?;

        let mut errors = FieldErrors::default();
        if !self.sample_in_project(&sample, counting.project_id)? {
            errors.insert("sample_id", ErrorCode::NotInProject);
        }
        if !self.species_in_group(species_id, &counting)? {
            errors.insert("species_id", ErrorCode::NotInGroup);
        }
        errors.into_result()?;

        let requested_rank = params.integer("rank");
        self.check_free(
            &counting,
            sample.id,
            Some(species_id),
            requested_rank,
            None,
        )?;
        let rank = match requested_rank {
            Some(rank) => rank,
            None => self.store.next_occurrence_rank(counting.id, sample.id)?,
        };

        let occurrence = self.store.create_occurrence(&NewOccurrence {
            counting_id: counting.id,
            sample_id: sample.id,
            species_id,
            rank,
            quantity: params.integer("quantity"),
            status: status_of(&params)?.unwrap_or_default(),
            uncertain: params.flag("uncertain").unwrap_or(false),
        })?;
        Ok(occurrence)
    }

    fn try_update(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Occurrence> {
        require_identity(auth)?;
        let params = validate(occurrence_schema(Verb::Update), raw)?;
        let occurrence = found(self.store.find_occurrence(params.require_integer("id")?)?)?;
        let (counting, project) = self.resolve_counting(occurrence.counting_id)?;
        ensure_manage(auth, &project)?;

        let rank = params.integer("rank");
        self.check_free(
            &counting,
            occurrence.sample_id,
            None,
            rank,
            Some(occurrence.id),
        )?;

        let quantity = match params.integer("shift") {
            Some(shift) => {
                let next = shifted_quantity(occurrence.quantity, shift);
                if next.is_some_and(|quantity| quantity > QUANTITY_MAX) {
                    return Err(Failure::field("shift", ErrorCode::TooLarge).into());
                }
                debug!(
                    "event=occurrence_shift module=service id={} shift={shift} cleared={}",
                    occurrence.id,
                    next.is_none() && occurrence.quantity.is_some()
                );
                Some(next)
            }
            None => params.patch_integer("quantity"),
        };

        let updated = self.store.update_occurrence(
            occurrence.id,
            &OccurrencePatch {
                rank,
                quantity,
                status: status_of(&params)?,
                uncertain: params.flag("uncertain"),
            },
        )?;
        Ok(updated)
    }

    fn try_find(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Occurrence> {
        let params = validate(occurrence_schema(Verb::Find), raw)?;
        let occurrence = found(self.store.find_occurrence(params.require_integer("id")?)?)?;
        let (_, project) = self.resolve_counting(occurrence.counting_id)?;
        ensure_view(auth, &project)?;
        Ok(occurrence)
    }

    fn try_delete(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<Occurrence> {
        require_identity(auth)?;
        let params = validate(occurrence_schema(Verb::Delete), raw)?;
        let occurrence = found(self.store.find_occurrence(params.require_integer("id")?)?)?;
        let (_, project) = self.resolve_counting(occurrence.counting_id)?;
        ensure_manage(auth, &project)?;
        self.store.delete_occurrence(occurrence.id)?;
        Ok(occurrence)
    }

    fn try_sample_report(&self, auth: &dyn Authorizer, raw: &RawParams) -> Step<SampleReport> {
        let params = validate(sample_report_schema(), raw)?;
        let (counting, project) = self.resolve_counting(params.require_integer("counting_id")?)?;
        ensure_view(auth, &project)?;

        let sample = found(self.store.find_sample(params.require_integer("sample_id")?)?)?;
        if !self.sample_in_project(&sample, counting.project_id)? {
            return Err(Failure::field("sample_id", ErrorCode::NotInProject).into());
        }

        let occurrences = self.store.list_occurrences(counting.id, sample.id)?;
        Ok(SampleReport::build(counting.id, sample.id, &occurrences))
    }

    fn resolve_counting(&self, id: i64) -> Step<(Counting, Project)> {
        let counting = found(self.store.find_counting(id)?)?;
        let project = found(self.store.find_project(counting.project_id)?)?;
        Ok((counting, project))
    }

    fn sample_in_project(&self, sample: &Sample, project_id: i64) -> Step<bool> {
        Ok(self
            .store
            .find_section(sample.section_id)?
            .is_some_and(|section| section.project_id == project_id))
    }

    fn species_in_group(&self, species_id: i64, counting: &Counting) -> Step<bool> {
        Ok(self
            .store
            .find_species(species_id)?
            .is_some_and(|species| species.group_id == counting.group_id))
    }

    /// Species and rank are checked independently; both may be reported.
    fn check_free(
        &self,
        counting: &Counting,
        sample_id: i64,
        species_id: Option<i64>,
        rank: Option<i64>,
        except: Option<i64>,
    ) -> Step<()> {
        let mut errors = FieldErrors::default();
        if let Some(species_id) = species_id {
            if self
                .store
                .species_exists_within_scope(counting.id, sample_id, species_id, except)?
            {
                errors.insert("species_id", ErrorCode::Taken);
            }
        }
        if let Some(rank) = rank {
            let scope = RankScope::Occurrences {
                counting_id: counting.id,
                sample_id,
            };
            if self.store.rank_exists(scope, rank, except)? {
                errors.insert("rank", ErrorCode::Taken);
            }
        }
        Ok(errors.into_result()?)
    }
}

fn status_of(params: &CleanParams) -> Result<Option<OccurrenceStatus>, Failure> {
    params
        .text("status")
        .map(|value| {
            OccurrenceStatus::parse(value)
                .ok_or_else(|| Failure::field("status", ErrorCode::NotIncluded))
        })
        .transpose()
}
