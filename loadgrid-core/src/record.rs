//! Load records - one person x subject x month effort entry

use crate::calendar::CalendarKey;
use serde::{Deserialize, Serialize};

/// Flat input record as served by the planning API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRecord {
    #[serde(rename = "id_pers")]
    pub person_id: i64,
    #[serde(rename = "id_subject")]
    pub subject_id: i64,
    #[serde(rename = "name")]
    pub person_name: String,
    #[serde(rename = "firstname")]
    pub person_firstname: String,
    #[serde(rename = "subject")]
    pub subject_name: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub month: CalendarKey,
    pub load: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
}

impl LoadRecord {
    /// `name firstname`, the key used for per-person totals
    pub fn full_name(&self) -> String {
        format!("{} {}", self.person_name, self.person_firstname)
    }
}

/// Treat absent and empty strings alike
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_api_payload() {
        let json = r##"{
            "id_pers": 7,
            "id_subject": 3,
            "name": "Durand",
            "firstname": "Alice",
            "subject": "Telemetry",
            "type": "Project",
            "comment": null,
            "month": "202402",
            "load": 12,
            "team": "Ground",
            "color_hex": "#aabbcc"
        }"##;
        let record: LoadRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.person_id, 7);
        assert_eq!(record.month.as_u32(), 202402);
        assert_eq!(record.comment, None);
        assert_eq!(record.team.as_deref(), Some("Ground"));
        assert_eq!(record.full_name(), "Durand Alice");
        assert_eq!(record.color_hex.as_deref(), Some("#aabbcc"));

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["color_hex"], "#aabbcc");
        assert_eq!(out["id_pers"], 7);
    }

    #[test]
    fn test_optional_fields_may_be_missing() {
        let json = r#"{"id_pers":1,"id_subject":2,"name":"A","firstname":"B",
            "subject":"S","type":"T","month":202401,"load":-2}"#;
        let record: LoadRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.load, -2);
        assert!(record.team.is_none());
        assert!(record.color_hex.is_none());
    }

    #[test]
    fn test_reject_invalid_month() {
        let json = r#"{"id_pers":1,"id_subject":2,"name":"A","firstname":"B",
            "subject":"S","type":"T","month":202413,"load":1}"#;
        assert!(serde_json::from_str::<LoadRecord>(json).is_err());
    }
}
