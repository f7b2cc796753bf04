//! Workload plan import from semicolon-separated CSV
//!
//! Expected layout: a header row `Name;Firstname;Subject;Type;Comment`
//! followed by one column per month (`YYYYMM` or `YYYY MM`). Header names are
//! matched case-insensitively; unrecognized columns are ignored.
//!
//! Malformed lines are skipped and reported, never fatal. Only a missing
//! header or an unreadable month header aborts the import.

use crate::calendar::CalendarKey;
use crate::record::LoadRecord;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Default field delimiter of exported plans
pub const DEFAULT_DELIMITER: u8 = b';';

/// One imported plan line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlanRow {
    pub line: u64,
    pub name: String,
    pub firstname: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
    pub loads: BTreeMap<CalendarKey, i64>,
}

/// A line left out of the import, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SkippedLine {
    pub line: u64,
    pub name: String,
    pub firstname: String,
    pub subject: String,
    pub reason: String,
}

/// Result of a plan import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedPlan {
    pub rows: Vec<PlanRow>,
    pub skipped: Vec<SkippedLine>,
}

/// Column positions resolved from the header row
struct Columns {
    width: usize,
    name: usize,
    firstname: usize,
    subject: usize,
    subject_type: Option<usize>,
    comment: Option<usize>,
    months: Vec<(usize, CalendarKey)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        };

        let mut months = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header.starts_with("20") {
                let month: CalendarKey = header
                    .parse()
                    .with_context(|| format!("invalid month column \"{}\"", header))?;
                months.push((idx, month));
            }
        }

        Ok(Columns {
            width: headers.len(),
            name: find("name").context("missing \"Name\" column")?,
            firstname: find("firstname").context("missing \"Firstname\" column")?,
            subject: find("subject").context("missing \"Subject\" column")?,
            subject_type: find("type"),
            comment: find("comment"),
            months,
        })
    }
}

fn field(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").trim().to_string()
}

/// Parse a plan from any reader, using `delimiter` between fields
pub fn parse_plan<R: Read>(reader: R, delimiter: u8) -> Result<ImportedPlan> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("failed to read CSV header row")?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut plan = ImportedPlan::default();
    for result in csv_reader.records() {
        let record = result.context("failed to read CSV line")?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let skip = |reason: String| SkippedLine {
            line,
            name: field(&record, columns.name),
            firstname: field(&record, columns.firstname),
            subject: field(&record, columns.subject),
            reason,
        };

        if record.len() != columns.width {
            let skipped = skip(format!(
                "incorrect number of fields: expected {}, found {}",
                columns.width,
                record.len()
            ));
            tracing::warn!(line, reason = %skipped.reason, "skipping plan line");
            plan.skipped.push(skipped);
            continue;
        }

        match parse_row(&record, &columns, line) {
            Ok(row) => plan.rows.push(row),
            Err(reason) => {
                tracing::warn!(line, reason = %reason, "skipping plan line");
                plan.skipped.push(skip(reason));
            }
        }
    }

    tracing::debug!(
        imported = plan.rows.len(),
        skipped = plan.skipped.len(),
        "plan import finished"
    );
    Ok(plan)
}

fn parse_row(
    record: &StringRecord,
    columns: &Columns,
    line: u64,
) -> std::result::Result<PlanRow, String> {
    let name = field(record, columns.name);
    let subject = field(record, columns.subject);
    if name.is_empty() || subject.is_empty() {
        return Err("missing name or subject".to_string());
    }

    let mut loads = BTreeMap::new();
    for (idx, month) in &columns.months {
        let raw = field(record, *idx);
        if raw.is_empty() {
            continue;
        }
        let load: i64 = raw
            .parse()
            .map_err(|_| format!("invalid load \"{}\" for {}", raw, month))?;
        loads.insert(*month, load);
    }

    Ok(PlanRow {
        line,
        name,
        firstname: field(record, columns.firstname),
        subject,
        subject_type: columns
            .subject_type
            .map(|idx| field(record, idx))
            .unwrap_or_default(),
        comment: columns
            .comment
            .map(|idx| field(record, idx))
            .filter(|c| !c.is_empty()),
        loads,
    })
}

/// Parse a plan held in memory with the default delimiter
pub fn parse_plan_str(content: &str) -> Result<ImportedPlan> {
    parse_plan(content.as_bytes(), DEFAULT_DELIMITER)
}

/// Read and parse a plan file with the default delimiter
pub fn load_plan_file(path: &Path) -> Result<ImportedPlan> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open plan file: {}", path.display()))?;
    parse_plan(file, DEFAULT_DELIMITER)
        .with_context(|| format!("failed to import plan file: {}", path.display()))
}

impl ImportedPlan {
    /// Flatten into load records
    ///
    /// Person and subject ids are synthetic: 1-based, in order of first
    /// appearance of each `(name, firstname)` and each subject name.
    pub fn to_records(&self, team: Option<&str>) -> Vec<LoadRecord> {
        let mut people: IndexMap<(&str, &str), i64> = IndexMap::new();
        let mut subjects: IndexMap<&str, i64> = IndexMap::new();
        let mut records = Vec::new();

        for row in &self.rows {
            let next_person = people.len() as i64 + 1;
            let person_id = *people
                .entry((row.name.as_str(), row.firstname.as_str()))
                .or_insert(next_person);
            let next_subject = subjects.len() as i64 + 1;
            let subject_id = *subjects.entry(row.subject.as_str()).or_insert(next_subject);

            for (month, load) in &row.loads {
                records.push(LoadRecord {
                    person_id,
                    subject_id,
                    person_name: row.name.clone(),
                    person_firstname: row.firstname.clone(),
                    subject_name: row.subject.clone(),
                    subject_type: row.subject_type.clone(),
                    comment: row.comment.clone(),
                    month: *month,
                    load: *load,
                    team: team.map(str::to_string),
                    color_hex: None,
                });
            }
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(raw: u32) -> CalendarKey {
        CalendarKey::new(raw).unwrap()
    }

    const PLAN: &str = "Name;Firstname;Subject;Type;Comment;202401;202402;2024 03\n\
        Martin;Jo;Radar;Project;;5;;8\n\
        Abel;Kim;Sonar;Support;on call;1;2;3\n";

    #[test]
    fn test_parse_well_formed_plan() {
        let plan = parse_plan_str(PLAN).unwrap();
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.rows.len(), 2);

        let martin = &plan.rows[0];
        assert_eq!(martin.name, "Martin");
        assert_eq!(martin.comment, None);
        assert_eq!(
            martin.loads.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(),
            vec![(key(202401), 5), (key(202403), 8)]
        );
        assert_eq!(plan.rows[1].comment.as_deref(), Some("on call"));
    }

    #[test]
    fn test_skip_wrong_field_count() {
        let content = "Name;Firstname;Subject;Type;Comment;202401\n\
            Martin;Jo;Radar;Project;;5\n\
            Broken;Line;Only\n";
        let plan = parse_plan_str(content).unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].line, 3);
        assert_eq!(plan.skipped[0].name, "Broken");
        assert!(plan.skipped[0].reason.contains("incorrect number of fields"));
    }

    #[test]
    fn test_skip_invalid_load_and_missing_subject() {
        let content = "Name;Firstname;Subject;Type;Comment;202401\n\
            Martin;Jo;Radar;Project;;lots\n\
            Abel;Kim;;Project;;3\n\
            Lee;Sam;Optics;Project;;4\n";
        let plan = parse_plan_str(content).unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].name, "Lee");
        let reasons: Vec<&str> = plan.skipped.iter().map(|s| s.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec!["invalid load \"lots\" for 2024 01", "missing name or subject"]
        );
    }

    #[test]
    fn test_blank_lines_ignored() {
        let content = "Name;Firstname;Subject;Type;Comment;202401\n\n\
            Martin;Jo;Radar;Project;;5\n\n";
        let plan = parse_plan_str(content).unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn test_missing_required_header_fails() {
        let err = parse_plan_str("Firstname;Subject;202401\nJo;Radar;3\n").unwrap_err();
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn test_invalid_month_header_fails() {
        assert!(parse_plan_str("Name;Firstname;Subject;202413\nA;B;C;1\n").is_err());
    }

    #[test]
    fn test_to_records_assigns_stable_ids() {
        let content = "Name;Firstname;Subject;Type;Comment;202401;202402\n\
            Martin;Jo;Radar;Project;;5;6\n\
            Abel;Kim;Radar;Project;;1;\n\
            Martin;Jo;Sonar;Project;;2;\n";
        let records = parse_plan_str(content).unwrap().to_records(Some("Optics"));
        assert_eq!(records.len(), 4);
        let ids: Vec<(i64, i64)> = records
            .iter()
            .map(|r| (r.person_id, r.subject_id))
            .collect();
        assert_eq!(ids, vec![(1, 1), (1, 1), (2, 1), (1, 2)]);
        assert!(records.iter().all(|r| r.team.as_deref() == Some("Optics")));
    }

    #[test]
    fn test_load_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.csv");
        std::fs::write(&path, PLAN).unwrap();
        let plan = load_plan_file(&path).unwrap();
        assert_eq!(plan.rows.len(), 2);
        assert!(load_plan_file(&dir.path().join("missing.csv")).is_err());
    }
}
