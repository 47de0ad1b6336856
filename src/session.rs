//! Per-user selection state on top of a shared, read-only table.

use std::sync::Arc;

use crate::data::error::SelectionError;
use crate::data::filter::{cascade, CascadeView, Selections, Step};
use crate::data::model::{Field, FieldValue, VehicleTable};
use crate::data::resolve::{resolve_record, ResolvedRecord};
use crate::estimate::{estimate, EstimationResult, TripDistance};
use crate::profile::DatasetProfile;

/// Where a session stands between an empty picker and a computed estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPhase {
    Empty,
    PartiallySelected { chosen: usize, total: usize },
    /// The choices so far match no vehicle.
    Unresolvable { field: Field },
    /// Every step is chosen but no record matches.
    NoMatch,
    Resolved,
    Estimated,
}

/// Owns the chosen value of each step for one user.
#[derive(Debug, Clone)]
pub struct Session {
    table: Arc<VehicleTable>,
    profile: DatasetProfile,
    order: Vec<Step>,
    chosen: Vec<Option<FieldValue>>,
}

impl Session {
    pub fn new(table: Arc<VehicleTable>, profile: DatasetProfile) -> Self {
        let order = profile.field_order();
        let chosen = vec![None; order.len()];
        Self {
            table,
            profile,
            order,
            chosen,
        }
    }

    pub fn table(&self) -> &Arc<VehicleTable> {
        &self.table
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    pub fn order(&self) -> &[Step] {
        &self.order
    }

    fn position(&self, field: Field) -> Result<usize, SelectionError> {
        self.order
            .iter()
            .position(|s| s.field == field)
            .ok_or(SelectionError::UnknownField(field))
    }

    /// Choose a value for `field`. A changed value clears every later step.
    pub fn select(
        &mut self,
        field: Field,
        value: impl Into<FieldValue>,
    ) -> Result<(), SelectionError> {
        let i = self.position(field)?;
        let value = value.into();
        if value.is_null() {
            return self.clear(field);
        }
        if self.chosen[i].as_ref() == Some(&value) {
            return Ok(());
        }
        self.chosen[i] = Some(value);
        for later in &mut self.chosen[i + 1..] {
            *later = None;
        }
        Ok(())
    }

    /// Unset `field` and every later step.
    pub fn clear(&mut self, field: Field) -> Result<(), SelectionError> {
        let i = self.position(field)?;
        for slot in &mut self.chosen[i..] {
            *slot = None;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.chosen.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn selected(&self, field: Field) -> Option<&FieldValue> {
        let i = self.position(field).ok()?;
        self.chosen[i].as_ref()
    }

    pub fn selections(&self) -> Selections {
        self.order
            .iter()
            .zip(&self.chosen)
            .filter_map(|(step, value)| value.clone().map(|v| (step.field, v)))
            .collect()
    }

    pub fn view(&self) -> CascadeView {
        cascade(&self.table, &self.order, &self.selections())
    }

    pub fn resolve(&self) -> Result<ResolvedRecord, SelectionError> {
        resolve_record(
            &self.table,
            &self.order,
            &self.selections(),
            self.profile.duplicate_policy,
        )
    }

    pub fn estimate(
        &self,
        distance: TripDistance,
    ) -> Result<(ResolvedRecord, EstimationResult), SelectionError> {
        let resolved = self.resolve()?;
        let result = estimate(&resolved.record, distance);
        Ok((resolved, result))
    }

    pub fn phase(&self, distance: Option<TripDistance>) -> SelectionPhase {
        let view = self.view();
        if let Some(field) = view.unresolvable_at {
            return SelectionPhase::Unresolvable { field };
        }
        let chosen = view.chosen_count();
        let total = self.order.len();
        if chosen == 0 {
            return SelectionPhase::Empty;
        }
        if chosen < total {
            return SelectionPhase::PartiallySelected { chosen, total };
        }
        match self.resolve() {
            Err(_) => SelectionPhase::NoMatch,
            Ok(_) if distance.is_some() => SelectionPhase::Estimated,
            Ok(_) => SelectionPhase::Resolved,
        }
    }
}
