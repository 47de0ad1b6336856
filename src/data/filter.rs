use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::error::SelectionError;
use super::model::{Field, FieldValue, VehicleTable};

// ---------------------------------------------------------------------------
// Field order: which columns the picker walks through, and how each sorts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One position in the cascading field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub field: Field,
    pub sort: SortDirection,
}

impl Step {
    pub fn ascending(field: Field) -> Self {
        Self {
            field,
            sort: SortDirection::Ascending,
        }
    }

    pub fn descending(field: Field) -> Self {
        Self {
            field,
            sort: SortDirection::Descending,
        }
    }
}

/// Chosen value per field. Absent fields are unset.
pub type Selections = BTreeMap<Field, FieldValue>;

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

/// What the picker may offer for one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepCandidates {
    /// Distinct values among the rows matching every earlier selection.
    Available(Vec<FieldValue>),
    /// A dependent step with no earlier selection; nothing may be offered yet.
    Locked,
    /// Earlier selections already match zero rows.
    Unresolvable,
}

impl StepCandidates {
    pub fn values(&self) -> &[FieldValue] {
        match self {
            StepCandidates::Available(values) => values,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub field: Field,
    pub selected: Option<FieldValue>,
    pub candidates: StepCandidates,
}

/// Candidate sets for every step plus the rows matching all selections.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeView {
    pub steps: Vec<StepView>,
    /// Table indices matching every selection, in table order.
    pub matching: Vec<usize>,
    /// First field whose selection (or an empty table) left zero rows.
    pub unresolvable_at: Option<Field>,
}

impl CascadeView {
    pub fn step(&self, field: Field) -> Option<&StepView> {
        self.steps.iter().find(|s| s.field == field)
    }

    pub fn is_unresolvable(&self) -> bool {
        self.unresolvable_at.is_some()
    }

    /// Whether every step has a chosen value.
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.selected.is_some())
    }

    /// First step the user still has to choose.
    pub fn next_unselected(&self) -> Option<&StepView> {
        self.steps.iter().find(|s| s.selected.is_none())
    }

    pub fn chosen_count(&self) -> usize {
        self.steps.iter().filter(|s| s.selected.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Cascading filter
// ---------------------------------------------------------------------------

/// Walk `order`, narrowing the table one selection at a time.
///
/// A step's candidates are drawn from the rows matching every selection made
/// at earlier steps; unset earlier steps do not filter. The first step is
/// always offered, later steps only once some earlier step is selected.
/// Once the matching set is empty every later step is
/// [`StepCandidates::Unresolvable`]; filters are never relaxed.
pub fn cascade(table: &VehicleTable, order: &[Step], selections: &Selections) -> CascadeView {
    let mut matching: Vec<usize> = (0..table.len()).collect();
    let mut unresolvable_at = if table.is_empty() {
        order.first().map(|s| s.field)
    } else {
        None
    };
    let mut any_selected = false;
    let mut steps = Vec::with_capacity(order.len());

    for step in order {
        let selected = selections
            .get(&step.field)
            .filter(|v| !v.is_null())
            .cloned();

        let dependent = !steps.is_empty();
        let candidates = if matching.is_empty() {
            StepCandidates::Unresolvable
        } else if dependent && !any_selected {
            StepCandidates::Locked
        } else {
            StepCandidates::Available(distinct_values(table, &matching, step))
        };

        if let Some(value) = &selected {
            any_selected = true;
            if !matching.is_empty() {
                let records = table.records();
                matching.retain(|&i| records[i].matches(step.field, value));
                if matching.is_empty() {
                    unresolvable_at = Some(step.field);
                }
            }
        }

        steps.push(StepView {
            field: step.field,
            selected,
            candidates,
        });
    }

    CascadeView {
        steps,
        matching,
        unresolvable_at,
    }
}

/// Candidate values per step, or [`SelectionError::Unresolvable`] when the
/// selections leave zero rows. Locked steps map to an empty list.
pub fn get_candidates(
    table: &VehicleTable,
    order: &[Step],
    selections: &Selections,
) -> Result<BTreeMap<Field, Vec<FieldValue>>, SelectionError> {
    let view = cascade(table, order, selections);
    if let Some(field) = view.unresolvable_at {
        log::warn!("selection unresolvable at {field}: {selections:?}");
        return Err(SelectionError::Unresolvable { field });
    }
    Ok(view
        .steps
        .into_iter()
        .map(|s| {
            let values = match s.candidates {
                StepCandidates::Available(values) => values,
                _ => Vec::new(),
            };
            (s.field, values)
        })
        .collect())
}

fn distinct_values(table: &VehicleTable, indices: &[usize], step: &Step) -> Vec<FieldValue> {
    let records = table.records();
    let unique: BTreeSet<FieldValue> = indices
        .iter()
        .map(|&i| records[i].value(step.field))
        .filter(|v| !v.is_null())
        .collect();

    match step.sort {
        SortDirection::Ascending => unique.into_iter().collect(),
        SortDirection::Descending => unique.into_iter().rev().collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::model::VehicleRecord;
    use pretty_assertions::assert_eq;

    fn rec(make: &str, fuel: &str, model: &str, year: i64, co2: f64) -> VehicleRecord {
        let mut r = VehicleRecord::new(make, fuel, model);
        r.year = Some(year);
        r.co2_tailpipe_gpm = Some(co2);
        r
    }

    /// Small fixture shared with the resolver and session tests.
    pub(crate) fn fixture() -> VehicleTable {
        VehicleTable::from_records(vec![
            rec("Toyota", "Petrol", "Yaris", 2018, 240.0),
            rec("Toyota", "Petrol", "Corolla", 2019, 250.0),
            rec("Toyota", "Hybrid", "Prius", 2020, 180.0),
            rec("BMW", "Diesel", "320d", 2019, 300.0),
            rec("BMW", "Diesel", "320d", 2021, 280.0),
            rec("BMW", "Electric", "i3", 2017, 0.0),
            rec("Toyota", "Petrol", "Corolla", 2021, 230.0),
            // Duplicate label combination with a different CO₂ figure.
            rec("Toyota", "Petrol", "Corolla", 2019, 260.0),
            rec("Renault", "Electric", "Zoe", 2021, 0.0),
        ])
    }

    pub(crate) fn order() -> Vec<Step> {
        vec![
            Step::ascending(Field::Manufacturer),
            Step::ascending(Field::FuelType),
            Step::ascending(Field::Model),
            Step::descending(Field::Year),
        ]
    }

    fn text(values: &[&str]) -> Vec<FieldValue> {
        values.iter().map(|v| FieldValue::from(*v)).collect()
    }

    fn select(pairs: &[(Field, FieldValue)]) -> Selections {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn first_step_offers_every_manufacturer() {
        let view = cascade(&fixture(), &order(), &Selections::new());
        assert_eq!(
            view.steps[0].candidates,
            StepCandidates::Available(text(&["BMW", "Renault", "Toyota"]))
        );
        assert_eq!(view.steps[1].candidates, StepCandidates::Locked);
        assert_eq!(view.steps[3].candidates, StepCandidates::Locked);
        assert_eq!(view.matching.len(), 9);
        assert!(!view.is_unresolvable());
    }

    #[test]
    fn candidates_narrow_with_each_selection() {
        let table = fixture();
        let selections = select(&[
            (Field::Manufacturer, "Toyota".into()),
            (Field::FuelType, "Petrol".into()),
            (Field::Model, "Corolla".into()),
        ]);
        let view = cascade(&table, &order(), &selections);
        assert_eq!(view.steps[1].candidates.values(), text(&["Hybrid", "Petrol"]));
        assert_eq!(view.steps[2].candidates.values(), text(&["Corolla", "Yaris"]));
        // Years are offered most recent first.
        assert_eq!(
            view.steps[3].candidates.values(),
            vec![FieldValue::Integer(2021), FieldValue::Integer(2019)]
        );
        assert_eq!(view.matching, vec![1, 6, 7]);
        assert_eq!(view.next_unselected().map(|s| s.field), Some(Field::Year));
    }

    #[test]
    fn candidates_match_brute_force_for_every_prefix() {
        let table = fixture();
        let order = order();
        let records = table.records();

        // Enumerate every reachable prefix by walking the data itself.
        let mut level: Vec<Selections> = vec![Selections::new()];
        let mut prefixes = level.clone();
        for step in &order[..order.len() - 1] {
            let mut next = Vec::new();
            for prefix in &level {
                let values: BTreeSet<FieldValue> = records
                    .iter()
                    .filter(|r| prefix.iter().all(|(f, v)| r.matches(*f, v)))
                    .map(|r| r.value(step.field))
                    .collect();
                for v in values {
                    let mut extended = prefix.clone();
                    extended.insert(step.field, v);
                    next.push(extended);
                }
            }
            prefixes.extend(next.iter().cloned());
            level = next;
        }
        assert!(prefixes.len() > 10);

        for prefix in &prefixes {
            let view = cascade(&table, &order, prefix);
            let step = &order[prefix.len()];
            let mut expected: Vec<FieldValue> = records
                .iter()
                .filter(|r| prefix.iter().all(|(f, v)| r.matches(*f, v)))
                .map(|r| r.value(step.field))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if step.sort == SortDirection::Descending {
                expected.reverse();
            }
            assert_eq!(
                view.steps[prefix.len()].candidates,
                StepCandidates::Available(expected),
                "prefix {prefix:?}"
            );
        }
    }

    #[test]
    fn repeated_calls_are_identical() {
        let table = fixture();
        let selections = select(&[(Field::Manufacturer, "BMW".into())]);
        let a = get_candidates(&table, &order(), &selections).unwrap();
        let b = get_candidates(&table, &order(), &selections).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[&Field::FuelType], text(&["Diesel", "Electric"]));
        assert_eq!(a[&Field::Model], text(&["320d", "i3"]));
    }

    #[test]
    fn unset_middle_steps_do_not_filter_later_ones() {
        let table = fixture();
        let selections = select(&[(Field::Manufacturer, "Toyota".into())]);
        let candidates = get_candidates(&table, &order(), &selections).unwrap();
        assert_eq!(candidates[&Field::Model], text(&["Corolla", "Prius", "Yaris"]));
        assert_eq!(
            candidates[&Field::Year],
            vec![
                FieldValue::Integer(2021),
                FieldValue::Integer(2020),
                FieldValue::Integer(2019),
                FieldValue::Integer(2018),
            ]
        );
    }

    #[test]
    fn impossible_selection_is_unresolvable_downstream() {
        let table = fixture();
        let selections = select(&[
            (Field::Manufacturer, "Renault".into()),
            (Field::FuelType, "Diesel".into()),
        ]);
        let view = cascade(&table, &order(), &selections);
        assert_eq!(view.unresolvable_at, Some(Field::FuelType));
        assert!(view.matching.is_empty());
        assert_eq!(view.steps[2].candidates, StepCandidates::Unresolvable);
        assert_eq!(view.steps[3].candidates, StepCandidates::Unresolvable);
        // Earlier steps stay usable so the user can change them.
        assert_eq!(view.steps[1].candidates.values(), text(&["Electric"]));

        let err = get_candidates(&table, &order(), &selections).unwrap_err();
        assert_eq!(err, SelectionError::Unresolvable { field: Field::FuelType });
    }

    #[test]
    fn empty_table_is_unresolvable_everywhere() {
        let table = VehicleTable::default();
        let view = cascade(&table, &order(), &Selections::new());
        assert!(view
            .steps
            .iter()
            .all(|s| s.candidates == StepCandidates::Unresolvable));
        assert_eq!(
            get_candidates(&table, &order(), &Selections::new()),
            Err(SelectionError::Unresolvable {
                field: Field::Manufacturer
            })
        );
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        let table = fixture();
        let selections = select(&[(Field::Manufacturer, "toyota".into())]);
        let view = cascade(&table, &order(), &selections);
        assert_eq!(view.unresolvable_at, Some(Field::Manufacturer));
    }

    #[test]
    fn dependent_steps_lock_until_an_earlier_one_is_chosen() {
        let table = fixture();
        let selections = select(&[(Field::Model, "320d".into())]);
        let view = cascade(&table, &order(), &selections);
        assert_eq!(view.steps[0].candidates.values().len(), 3);
        assert_eq!(view.steps[1].candidates, StepCandidates::Locked);
        assert_eq!(view.steps[2].candidates, StepCandidates::Locked);
        assert_eq!(
            view.steps[3].candidates,
            StepCandidates::Available(vec![FieldValue::Integer(2021), FieldValue::Integer(2019)])
        );
        assert_eq!(view.matching, vec![3, 4]);
    }
}
