//! Pivot builder - flat load records into a dense rows x months matrix
//!
//! Global invariants enforced:
//! - Every row has a load entry for every month of the requested range
//! - Rows keep first-encounter order; ordering is imposed later by the view
//! - The result is a pure function of (records, range)
//! - Individual records never abort a build

use crate::calendar::{self, CalendarKey};
use crate::record::{non_empty, LoadRecord};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hash;

/// Team shown when no contributing record names one
pub const UNKNOWN_TEAM: &str = "Unknown";

/// Comment used for grouping and display when a record has none
pub const NO_COMMENT: &str = "No comment";

/// Strategy deciding which records collapse into the same row
pub trait GroupingKey {
    type Key: Eq + Hash;

    fn key(&self, record: &LoadRecord) -> Self::Key;
}

/// Rows keyed by name, firstname, subject name and comment
///
/// Records with equal names collapse even when their numeric ids differ.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameIdentity;

impl GroupingKey for NameIdentity {
    type Key = (String, String, String, String);

    fn key(&self, record: &LoadRecord) -> Self::Key {
        (
            record.person_name.clone(),
            record.person_firstname.clone(),
            record.subject_name.clone(),
            comment_or_default(record).to_string(),
        )
    }
}

/// Rows keyed by person id, subject id and comment
#[derive(Debug, Clone, Copy, Default)]
pub struct IdIdentity;

impl GroupingKey for IdIdentity {
    type Key = (i64, i64, String);

    fn key(&self, record: &LoadRecord) -> Self::Key {
        (
            record.person_id,
            record.subject_id,
            comment_or_default(record).to_string(),
        )
    }
}

fn comment_or_default(record: &LoadRecord) -> &str {
    non_empty(record.comment.as_deref()).unwrap_or(NO_COMMENT)
}

/// One grouped identity with its month -> load mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PivotRow {
    pub person_id: i64,
    pub subject_id: i64,
    pub name: String,
    pub firstname: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    pub comment: String,
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color_hex: Option<String>,
    pub loads: BTreeMap<CalendarKey, i64>,
}

impl PivotRow {
    fn from_record(record: &LoadRecord) -> Self {
        PivotRow {
            person_id: record.person_id,
            subject_id: record.subject_id,
            name: record.person_name.clone(),
            firstname: record.person_firstname.clone(),
            subject: record.subject_name.clone(),
            subject_type: record.subject_type.clone(),
            comment: comment_or_default(record).to_string(),
            team: UNKNOWN_TEAM.to_string(),
            color_hex: None,
            loads: BTreeMap::new(),
        }
    }

    /// `name firstname`, the grouping used for totals
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.firstname)
    }

    /// Load for `month`, zero when the row has no entry
    pub fn load(&self, month: CalendarKey) -> i64 {
        self.loads.get(&month).copied().unwrap_or(0)
    }
}

/// Build rows with the default name-based identity
pub fn build(records: &[LoadRecord], start: CalendarKey, end: CalendarKey) -> Vec<PivotRow> {
    build_with(records, start, end, &NameIdentity)
}

/// Build rows with a caller-supplied identity
pub fn build_with<G: GroupingKey>(
    records: &[LoadRecord],
    start: CalendarKey,
    end: CalendarKey,
    grouping: &G,
) -> Vec<PivotRow> {
    let full_months = calendar::range(start, end);
    let mut grouped: IndexMap<G::Key, (PivotRow, bool)> = IndexMap::new();
    let mut out_of_range = 0usize;

    for record in records {
        if record.month < start || record.month > end {
            out_of_range += 1;
        }

        let (row, has_team) = grouped
            .entry(grouping.key(record))
            .or_insert_with(|| (PivotRow::from_record(record), false));

        if !*has_team {
            if let Some(team) = non_empty(record.team.as_deref()) {
                row.team = team.to_string();
                *has_team = true;
            }
        }
        if row.color_hex.is_none() {
            row.color_hex = non_empty(record.color_hex.as_deref()).map(str::to_string);
        }

        row.loads.insert(record.month, record.load);
    }

    let rows: Vec<PivotRow> = grouped
        .into_values()
        .map(|(mut row, _)| {
            for month in &full_months {
                row.loads.entry(*month).or_insert(0);
            }
            row
        })
        .collect();

    if out_of_range > 0 {
        tracing::debug!(
            out_of_range,
            start = %start,
            end = %end,
            "records outside the display range kept for grouping only"
        );
    }
    tracing::debug!(
        records = records.len(),
        rows = rows.len(),
        months = full_months.len(),
        "pivot built"
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(raw: u32) -> CalendarKey {
        CalendarKey::new(raw).unwrap()
    }

    fn record(person_id: i64, name: &str, subject: &str, month: u32, load: i64) -> LoadRecord {
        LoadRecord {
            person_id,
            subject_id: 1,
            person_name: name.to_string(),
            person_firstname: "Jo".to_string(),
            subject_name: subject.to_string(),
            subject_type: "Project".to_string(),
            comment: None,
            month: key(month),
            load,
            team: None,
            color_hex: None,
        }
    }

    #[test]
    fn test_fills_missing_month_with_zero() {
        let records = vec![
            record(1, "Martin", "Radar", 202401, 5),
            record(1, "Martin", "Radar", 202403, 8),
        ];
        let rows = build(&records, key(202401), key(202403));
        assert_eq!(rows.len(), 1);
        let loads: Vec<(u32, i64)> = rows[0]
            .loads
            .iter()
            .map(|(k, v)| (k.as_u32(), *v))
            .collect();
        assert_eq!(loads, vec![(202401, 5), (202402, 0), (202403, 8)]);
    }

    #[test]
    fn test_groups_by_names_not_ids() {
        let records = vec![
            record(1, "Martin", "Radar", 202401, 5),
            record(99, "Martin", "Radar", 202402, 3),
        ];
        let rows = build(&records, key(202401), key(202402));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].person_id, 1);

        let by_id = build_with(&records, key(202401), key(202402), &IdIdentity);
        assert_eq!(by_id.len(), 2);
    }

    #[test]
    fn test_comment_splits_rows_and_defaults() {
        let mut with_comment = record(1, "Martin", "Radar", 202401, 5);
        with_comment.comment = Some("night shift".to_string());
        let mut empty_comment = record(1, "Martin", "Radar", 202401, 2);
        empty_comment.comment = Some(String::new());
        let plain = record(1, "Martin", "Radar", 202402, 4);

        let rows = build(&[with_comment, empty_comment, plain], key(202401), key(202402));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].comment, "night shift");
        assert_eq!(rows[1].comment, NO_COMMENT);
        assert_eq!(rows[1].load(key(202401)), 2);
        assert_eq!(rows[1].load(key(202402)), 4);
    }

    #[test]
    fn test_first_encounter_order() {
        let records = vec![
            record(2, "Zed", "Radar", 202401, 1),
            record(1, "Abel", "Radar", 202401, 1),
            record(2, "Zed", "Radar", 202402, 1),
        ];
        let rows = build(&records, key(202401), key(202402));
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Abel"]);
    }

    #[test]
    fn test_team_defaults_to_unknown_and_picks_first_named() {
        let mut a = record(1, "Martin", "Radar", 202401, 1);
        let mut b = record(1, "Martin", "Radar", 202402, 1);
        a.team = None;
        b.team = Some("Optics".to_string());
        let rows = build(&[a.clone(), b], key(202401), key(202402));
        assert_eq!(rows[0].team, "Optics");

        let rows = build(&[a], key(202401), key(202402));
        assert_eq!(rows[0].team, UNKNOWN_TEAM);
    }

    #[test]
    fn test_out_of_range_records_still_group() {
        let records = vec![
            record(1, "Martin", "Radar", 202312, 9),
            record(1, "Martin", "Radar", 202401, 5),
            record(2, "Only", "Outside", 202506, 7),
        ];
        let rows = build(&records, key(202401), key(202402));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].load(key(202312)), 9);
        assert_eq!(rows[1].load(key(202401)), 0);
        assert_eq!(rows[1].load(key(202402)), 0);
    }

    #[test]
    fn test_odd_loads_pass_through() {
        let records = vec![
            record(1, "Martin", "Radar", 202401, -4),
            record(1, "Martin", "Radar", 202402, 45),
        ];
        let rows = build(&records, key(202401), key(202402));
        assert_eq!(rows[0].load(key(202401)), -4);
        assert_eq!(rows[0].load(key(202402)), 45);
    }

    #[test]
    fn test_later_record_overwrites_same_month() {
        let records = vec![
            record(1, "Martin", "Radar", 202401, 4),
            record(1, "Martin", "Radar", 202401, 6),
        ];
        let rows = build(&records, key(202401), key(202401));
        assert_eq!(rows[0].load(key(202401)), 6);
    }

    #[test]
    fn test_build_is_idempotent() {
        let records = vec![
            record(1, "Martin", "Radar", 202401, 4),
            record(2, "Lee", "Sonar", 202403, 6),
        ];
        let first = build(&records, key(202312), key(202404));
        let second = build(&records, key(202312), key(202404));
        assert_eq!(first, second);
    }

    #[test]
    fn test_inverted_range_adds_no_zero_months() {
        let records = vec![record(1, "Martin", "Radar", 202401, 4)];
        let rows = build(&records, key(202405), key(202401));
        assert_eq!(rows[0].loads.len(), 1);
    }
}
