use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Intensity, Severity};

/// A side effect the patient reported against one medication course.
///
/// Reports form an append-only log: the patient never edits one after
/// submitting it. `resolved`, `doctor_notes` and `resolved_at` are written
/// by the prescribing doctor only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectReport {
    pub side_effect_name: String,
    pub reported_at: Option<DateTime<Utc>>,
    pub severity: Severity,
    pub notes: Option<String>,
    pub intensity: Option<Intensity>,
    #[serde(default)]
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub doctor_notes: Option<String>,
    pub doctor_id: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl SideEffectReport {
    /// Apply a doctor's resolution locally. Provisional until the next refresh.
    pub fn apply_doctor_update(&mut self, update: &DoctorSideEffectUpdate, now: DateTime<Utc>) {
        self.resolved = update.resolved;
        self.doctor_notes = Some(update.doctor_notes.clone());
        self.resolved_at = update.resolved.then_some(now);
        self.last_updated = Some(now);
    }
}

/// Body of `POST /:id/report-side-effect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectInput {
    pub side_effect_name: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
    pub notes: String,
}

impl SideEffectInput {
    /// The quick-report shape used when a patient ticks a listed side effect.
    pub fn quick(name: &str) -> Self {
        Self {
            side_effect_name: name.to_string(),
            severity: Severity::Mild,
            intensity: None,
            notes: String::new(),
        }
    }
}

/// Body of `PUT /:id/side-effects/:index/doctor-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSideEffectUpdate {
    pub resolved: bool,
    pub doctor_notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report() -> SideEffectReport {
        serde_json::from_str(
            r#"{"sideEffectName": "Headache", "severity": "moderate",
                "reportedAt": "2024-01-05T09:30:00.000Z", "intensity": "very severe"}"#,
        )
        .unwrap()
    }

    #[test]
    fn missing_resolved_defaults_to_false() {
        let se = report();
        assert!(!se.resolved);
        assert_eq!(se.intensity, Some(Intensity::VerySevere));
        assert!(se.reported_at.is_some());
    }

    #[test]
    fn doctor_update_sets_resolution_fields() {
        let mut se = report();
        let now = Utc.with_ymd_and_hms(2024, 1, 6, 8, 0, 0).unwrap();
        se.apply_doctor_update(
            &DoctorSideEffectUpdate {
                resolved: true,
                doctor_notes: "Reduce dose".into(),
            },
            now,
        );
        assert!(se.resolved);
        assert_eq!(se.resolved_at, Some(now));
        assert_eq!(se.doctor_notes.as_deref(), Some("Reduce dose"));

        se.apply_doctor_update(
            &DoctorSideEffectUpdate {
                resolved: false,
                doctor_notes: "Reopened".into(),
            },
            now,
        );
        assert_eq!(se.resolved_at, None);
        assert_eq!(se.last_updated, Some(now));
    }

    #[test]
    fn quick_report_body_matches_backend() {
        let body = serde_json::to_value(SideEffectInput::quick("Nausea")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"sideEffectName": "Nausea", "severity": "mild", "notes": ""})
        );
    }
}
