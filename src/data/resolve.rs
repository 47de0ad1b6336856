use serde::{Deserialize, Serialize};

use super::error::SelectionError;
use super::filter::{cascade, Selections, Step};
use super::model::{Field, VehicleRecord, VehicleTable};

/// How to pick a record when several rows share the chosen labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// First matching row in table order.
    #[default]
    FirstMatch,
    /// First matching row, with each numeric metric averaged over the
    /// duplicates that carry it.
    Mean,
}

/// The record a complete selection resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub record: VehicleRecord,
    /// Table index of the first matching row.
    pub row: usize,
    /// How many rows matched the selection.
    pub matches: usize,
}

impl ResolvedRecord {
    pub fn has_duplicates(&self) -> bool {
        self.matches > 1
    }
}

/// Resolve a fully specified selection to one record.
///
/// Every step in `order` must have a value, otherwise
/// [`SelectionError::Incomplete`] is returned. Zero matching rows yields
/// [`SelectionError::NoMatch`].
pub fn resolve_record(
    table: &VehicleTable,
    order: &[Step],
    selections: &Selections,
    policy: DuplicatePolicy,
) -> Result<ResolvedRecord, SelectionError> {
    let missing: Vec<Field> = order
        .iter()
        .map(|s| s.field)
        .filter(|f| selections.get(f).map_or(true, |v| v.is_null()))
        .collect();
    if !missing.is_empty() {
        return Err(SelectionError::Incomplete { missing });
    }

    let view = cascade(table, order, selections);
    let Some(&row) = view.matching.first() else {
        log::warn!("no record matches complete selection {selections:?}");
        return Err(SelectionError::NoMatch);
    };
    let records = table.records();
    let first = &records[row];

    let record = match policy {
        DuplicatePolicy::FirstMatch => first.clone(),
        DuplicatePolicy::Mean => {
            let rows: Vec<&VehicleRecord> = view.matching.iter().map(|&i| &records[i]).collect();
            VehicleRecord {
                co2_tailpipe_gpm: mean(rows.iter().map(|r| r.co2_tailpipe_gpm)),
                combined_mpg: mean(rows.iter().map(|r| r.combined_mpg)),
                ghg_score: mean(rows.iter().map(|r| r.ghg_score)),
                ..first.clone()
            }
        }
    };

    if view.matching.len() > 1 {
        log::debug!(
            "{} rows match {}; policy {policy:?}",
            view.matching.len(),
            first.summary()
        );
    }
    log::debug!("resolved row {row}: {}", record.summary());

    Ok(ResolvedRecord {
        record,
        row,
        matches: view.matching.len(),
    })
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::tests::{fixture, order};
    use crate::data::model::FieldValue;

    fn corolla_2019() -> Selections {
        [
            (Field::Manufacturer, FieldValue::from("Toyota")),
            (Field::FuelType, "Petrol".into()),
            (Field::Model, "Corolla".into()),
            (Field::Year, FieldValue::Integer(2019)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn unique_selection_resolves() {
        let mut selections = corolla_2019();
        selections.insert(Field::Year, FieldValue::Integer(2021));
        let resolved =
            resolve_record(&fixture(), &order(), &selections, DuplicatePolicy::FirstMatch)
                .unwrap();
        assert_eq!(resolved.row, 6);
        assert!(!resolved.has_duplicates());
        assert_eq!(resolved.record.co2_tailpipe_gpm, Some(230.0));
    }

    #[test]
    fn first_match_wins_for_duplicates() {
        let table = fixture();
        for _ in 0..3 {
            let resolved =
                resolve_record(&table, &order(), &corolla_2019(), DuplicatePolicy::FirstMatch)
                    .unwrap();
            assert_eq!(resolved.row, 1);
            assert_eq!(resolved.matches, 2);
            assert_eq!(resolved.record.co2_tailpipe_gpm, Some(250.0));
        }
    }

    #[test]
    fn mean_policy_averages_duplicates() {
        let resolved =
            resolve_record(&fixture(), &order(), &corolla_2019(), DuplicatePolicy::Mean).unwrap();
        assert_eq!(resolved.row, 1);
        assert_eq!(resolved.record.co2_tailpipe_gpm, Some(255.0));
        assert_eq!(resolved.record.combined_mpg, None);
        assert_eq!(resolved.record.year, Some(2019));
    }

    #[test]
    fn incomplete_selection_lists_missing_steps() {
        let mut selections = corolla_2019();
        selections.remove(&Field::Year);
        selections.remove(&Field::FuelType);
        let err = resolve_record(&fixture(), &order(), &selections, DuplicatePolicy::FirstMatch)
            .unwrap_err();
        assert_eq!(
            err,
            SelectionError::Incomplete {
                missing: vec![Field::FuelType, Field::Year]
            }
        );
    }

    #[test]
    fn no_match_for_impossible_combination() {
        let mut selections = corolla_2019();
        selections.insert(Field::Year, FieldValue::Integer(1990));
        let err = resolve_record(&fixture(), &order(), &selections, DuplicatePolicy::FirstMatch)
            .unwrap_err();
        assert_eq!(err, SelectionError::NoMatch);
    }
}
