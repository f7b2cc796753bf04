//! View pipeline - filter, sort and column selection over pivoted rows
//!
//! Global invariants enforced:
//! - Filters are case-insensitive substring matches combined with AND
//! - Sorting is stable, so ties keep their pivot order
//! - Every returned row covers exactly the displayed months
//! - Totals are derived from the filtered, sorted rows and never stored

use crate::calendar::{self, CalendarKey};
use crate::error::{LoadgridError, Result};
use crate::pivot::{self, GroupingKey, PivotRow};
use crate::record::LoadRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Substring filters; absent or empty entries always pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Filters {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub team: Option<String>,
    #[serde(rename = "type")]
    pub subject_type: Option<String>,
}

impl Filters {
    pub fn matches(&self, row: &PivotRow) -> bool {
        contains_ci(&row.name, self.name.as_deref())
            && contains_ci(&row.subject, self.subject.as_deref())
            && contains_ci(&row.team, self.team.as_deref())
            && contains_ci(&row.subject_type, self.subject_type.as_deref())
    }

    /// Fill any unset filter from `defaults`
    pub fn or(self, defaults: &Filters) -> Filters {
        Filters {
            name: self.name.or_else(|| defaults.name.clone()),
            subject: self.subject.or_else(|| defaults.subject.clone()),
            team: self.team.or_else(|| defaults.team.clone()),
            subject_type: self.subject_type.or_else(|| defaults.subject_type.clone()),
        }
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Columns the matrix can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Team,
    Name,
    Firstname,
    Subject,
    Type,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Team => "team",
            SortKey::Name => "name",
            SortKey::Firstname => "firstname",
            SortKey::Subject => "subject",
            SortKey::Type => "type",
        }
    }

    fn field<'a>(&self, row: &'a PivotRow) -> &'a str {
        match self {
            SortKey::Team => &row.team,
            SortKey::Name => &row.name,
            SortKey::Firstname => &row.firstname,
            SortKey::Subject => &row.subject,
            SortKey::Type => &row.subject_type,
        }
    }
}

impl FromStr for SortKey {
    type Err = LoadgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "team" => Ok(SortKey::Team),
            "name" => Ok(SortKey::Name),
            "firstname" => Ok(SortKey::Firstname),
            "subject" => Ok(SortKey::Subject),
            "type" => Ok(SortKey::Type),
            other => Err(LoadgridError::UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Active sort column and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortState {
    pub key: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            key: SortKey::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortState {
    pub fn ascending(key: SortKey) -> Self {
        SortState {
            key,
            direction: SortDirection::Ascending,
        }
    }

    /// State after a header click on `key`
    ///
    /// The same key while ascending flips to descending; anything else
    /// sorts ascending.
    pub fn request(self, key: SortKey) -> SortState {
        let direction = if self.key == key && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        SortState { key, direction }
    }

    pub fn compare(&self, a: &PivotRow, b: &PivotRow) -> Ordering {
        let ordering = self.key.field(a).cmp(self.key.field(b));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Filter and sort rows, then restrict their loads to `display_months`
pub fn apply(
    rows: &[PivotRow],
    filters: &Filters,
    sort: SortState,
    display_months: &[CalendarKey],
) -> Vec<PivotRow> {
    let mut selected: Vec<PivotRow> = rows
        .iter()
        .filter(|row| filters.matches(row))
        .map(|row| {
            let loads: BTreeMap<CalendarKey, i64> = display_months
                .iter()
                .map(|month| (*month, row.load(*month)))
                .collect();
            PivotRow {
                loads,
                ..row.clone()
            }
        })
        .collect();

    // `sort_by` is stable; equal keys keep pivot order in both directions
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

/// Per-person and overall monthly sums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Totals {
    pub months: Vec<CalendarKey>,
    /// Keyed by `name firstname`, in order of first appearance
    pub per_person: IndexMap<String, Vec<i64>>,
    pub overall: Vec<i64>,
}

/// Sum loads per person across all of their rows, one value per displayed month
pub fn totals(rows: &[PivotRow], display_months: &[CalendarKey]) -> Totals {
    let mut per_person: IndexMap<String, Vec<i64>> = IndexMap::new();
    let mut overall = vec![0i64; display_months.len()];

    for row in rows {
        let sums = per_person
            .entry(row.full_name())
            .or_insert_with(|| vec![0; display_months.len()]);
        for (i, month) in display_months.iter().enumerate() {
            // Loads are unchecked at this layer, so sums saturate
            let load = row.load(*month);
            sums[i] = sums[i].saturating_add(load);
            overall[i] = overall[i].saturating_add(load);
        }
    }

    Totals {
        months: display_months.to_vec(),
        per_person,
        overall,
    }
}

/// Everything a caller needs to present the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub start: CalendarKey,
    pub end: CalendarKey,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub sort: SortState,
}

impl ViewState {
    pub fn new(start: CalendarKey, end: CalendarKey) -> Self {
        ViewState {
            start,
            end,
            filters: Filters::default(),
            sort: SortState::default(),
        }
    }

    pub fn display_months(&self) -> Vec<CalendarKey> {
        calendar::range(self.start, self.end)
    }
}

/// Pivoted, filtered and sorted matrix with totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixView {
    pub months: Vec<CalendarKey>,
    pub sort: SortState,
    pub rows: Vec<PivotRow>,
    pub totals: Totals,
}

/// Run the full pipeline: pivot, filter, sort, select columns, total
pub fn render_view<G: GroupingKey>(
    records: &[LoadRecord],
    state: &ViewState,
    grouping: &G,
) -> MatrixView {
    let months = state.display_months();
    let pivoted = pivot::build_with(records, state.start, state.end, grouping);
    let rows = apply(&pivoted, &state.filters, state.sort, &months);
    let totals = totals(&rows, &months);
    MatrixView {
        months,
        sort: state.sort,
        rows,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::NameIdentity;
    use pretty_assertions::assert_eq;

    fn key(raw: u32) -> CalendarKey {
        CalendarKey::new(raw).unwrap()
    }

    fn row(name: &str, firstname: &str, subject: &str, team: &str, loads: &[(u32, i64)]) -> PivotRow {
        PivotRow {
            person_id: 1,
            subject_id: 1,
            name: name.to_string(),
            firstname: firstname.to_string(),
            subject: subject.to_string(),
            subject_type: "Project".to_string(),
            comment: pivot::NO_COMMENT.to_string(),
            team: team.to_string(),
            color_hex: None,
            loads: loads.iter().map(|(m, l)| (key(*m), *l)).collect(),
        }
    }

    fn sample() -> Vec<PivotRow> {
        vec![
            row("Martin", "Jo", "Radar", "Optics", &[(202401, 5), (202402, 3)]),
            row("Abel", "Kim", "Sonar", "Acoustics", &[(202401, 2), (202402, 0)]),
            row("Martin", "Jo", "Sonar", "Acoustics", &[(202401, 1), (202402, 7)]),
        ]
    }

    #[test]
    fn test_filters_are_case_insensitive_and_combined() {
        let filters = Filters {
            name: Some("MAR".to_string()),
            team: Some("acou".to_string()),
            ..Filters::default()
        };
        let out = apply(&sample(), &filters, SortState::default(), &[key(202401)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].subject, "Sonar");
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let filters = Filters {
            name: Some(String::new()),
            ..Filters::default()
        };
        let out = apply(&sample(), &filters, SortState::default(), &[key(202401)]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_no_match_yields_empty_and_zero_totals() {
        let filters = Filters {
            name: Some("nobody".to_string()),
            ..Filters::default()
        };
        let months = [key(202401), key(202402)];
        let out = apply(&sample(), &filters, SortState::default(), &months);
        assert!(out.is_empty());
        let t = totals(&out, &months);
        assert!(t.per_person.is_empty());
        assert_eq!(t.overall, vec![0, 0]);
    }

    #[test]
    fn test_sort_request_toggles_and_resets() {
        let s = SortState::default();
        assert_eq!(s.key, SortKey::Name);
        let s = s.request(SortKey::Team);
        assert_eq!(s, SortState::ascending(SortKey::Team));
        let s = s.request(SortKey::Team);
        assert_eq!(s.direction, SortDirection::Descending);
        let s = s.request(SortKey::Team);
        assert_eq!(s.direction, SortDirection::Ascending);
        let s = s.request(SortKey::Team).request(SortKey::Subject);
        assert_eq!(s, SortState::ascending(SortKey::Subject));
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let rows = sample();
        let asc = apply(&rows, &Filters::default(), SortState::ascending(SortKey::Name), &[]);
        let subjects: Vec<&str> = asc.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Sonar", "Radar", "Sonar"]);
        assert_eq!(asc[0].name, "Abel");

        let desc = apply(
            &rows,
            &Filters::default(),
            SortState::ascending(SortKey::Name).request(SortKey::Name),
            &[],
        );
        let order: Vec<(&str, &str)> = desc
            .iter()
            .map(|r| (r.name.as_str(), r.subject.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![("Martin", "Radar"), ("Martin", "Sonar"), ("Abel", "Sonar")]
        );
    }

    #[test]
    fn test_apply_restricts_loads_to_display_months() {
        let months = [key(202402), key(202403)];
        let out = apply(&sample(), &Filters::default(), SortState::default(), &months);
        for r in &out {
            assert_eq!(r.loads.keys().copied().collect::<Vec<_>>(), months.to_vec());
        }
        let martin_radar = out.iter().find(|r| r.subject == "Radar").unwrap();
        assert_eq!(martin_radar.load(key(202403)), 0);
    }

    #[test]
    fn test_totals_group_by_full_name_across_subjects() {
        let months = [key(202401), key(202402)];
        let t = totals(&sample(), &months);
        assert_eq!(t.per_person.len(), 2);
        assert_eq!(t.per_person["Martin Jo"], vec![6, 10]);
        assert_eq!(t.per_person["Abel Kim"], vec![2, 0]);
        assert_eq!(t.overall, vec![8, 10]);
        let names: Vec<&String> = t.per_person.keys().collect();
        assert_eq!(names, vec!["Martin Jo", "Abel Kim"]);
    }

    #[test]
    fn test_totals_saturate_on_extreme_loads() {
        let months = [key(202401)];
        let rows = vec![
            row("Martin", "Jo", "Radar", "Optics", &[(202401, i64::MAX)]),
            row("Martin", "Jo", "Sonar", "Optics", &[(202401, 1)]),
            row("Abel", "Kim", "Sonar", "Optics", &[(202401, i64::MIN)]),
            row("Abel", "Kim", "Radar", "Optics", &[(202401, -1)]),
        ];
        let t = totals(&rows, &months);
        assert_eq!(t.per_person["Martin Jo"], vec![i64::MAX]);
        assert_eq!(t.per_person["Abel Kim"], vec![i64::MIN]);
        assert_eq!(t.overall, vec![-2]);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Firstname".parse::<SortKey>().unwrap(), SortKey::Firstname);
        assert_eq!(
            "comment".parse::<SortKey>(),
            Err(LoadgridError::UnknownSortKey("comment".to_string()))
        );
    }

    #[test]
    fn test_render_view_runs_whole_pipeline() {
        let record = |name: &str, month: u32, load: i64| LoadRecord {
            person_id: 1,
            subject_id: 1,
            person_name: name.to_string(),
            person_firstname: "Jo".to_string(),
            subject_name: "Radar".to_string(),
            subject_type: "Project".to_string(),
            comment: None,
            month: key(month),
            load,
            team: Some("Optics".to_string()),
            color_hex: None,
        };
        let records = vec![record("Martin", 202401, 4), record("Abel", 202403, 9)];
        let state = ViewState::new(key(202401), key(202403));
        let view = render_view(&records, &state, &NameIdentity);
        assert_eq!(view.months.len(), 3);
        assert_eq!(view.rows[0].name, "Abel");
        assert_eq!(view.totals.overall, vec![4, 0, 9]);
    }
}
