use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AdherenceStatus, DayStatus, MedicationStatus, PotentialSeverity, Severity};
use super::side_effect::SideEffectReport;
use crate::timing::{self, MedicationTiming};

/// A person reference as the backend sends it: either a bare id or a
/// populated profile object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartyRef {
    Id(String),
    Profile(PartyProfile),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyProfile {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub specialization: Option<String>,
}

impl PartyRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Profile(p) => &p.id,
        }
    }

    /// Display name, if the reference was populated with one.
    pub fn full_name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Profile(p) if p.full_name.trim().is_empty() => None,
            Self::Profile(p) => Some(&p.full_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub allergy_name: String,
    pub severity: Severity,
    #[serde(default)]
    pub reaction: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialSideEffect {
    pub name: String,
    pub severity: PotentialSeverity,
    pub description: Option<String>,
}

/// One line of the per-course adherence log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceEntry {
    pub date: String,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl AdherenceEntry {
    /// Day-level outcome, when the logged status is one of the calendar states.
    pub fn outcome(&self) -> Option<DayStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adherence {
    pub current_status: Option<AdherenceStatus>,
    pub reason_for_stopping: Option<String>,
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub history: Vec<AdherenceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakenDose {
    pub taken_at: DateTime<Utc>,
    pub dose_time: Option<String>,
}

/// A prescribed medication course as returned by the reminders API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(rename = "_id")]
    pub id: String,
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    /// Free-form course length ("7 days", "2 weeks", "as needed").
    pub duration: Option<String>,
    /// `YYYY-MM-DD` or a full ISO timestamp.
    pub start_date: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub reminders: Vec<String>,
    pub status: MedicationStatus,
    pub adherence: Option<Adherence>,
    #[serde(default)]
    pub patient_allergies: Vec<Allergy>,
    #[serde(default)]
    pub potential_side_effects: Vec<PotentialSideEffect>,
    #[serde(default)]
    pub experienced_side_effects: Vec<SideEffectReport>,
    pub last_taken: Option<DateTime<Utc>>,
    #[serde(default)]
    pub taken_history: Vec<TakenDose>,
    pub prescribed_by: Option<PartyRef>,
    #[serde(alias = "patient")]
    pub patient_id: Option<PartyRef>,
}

impl Medication {
    /// Course timing relative to `now`. Falls back to `createdAt` when the
    /// course has no explicit start date.
    pub fn timing(&self, now: DateTime<Local>) -> MedicationTiming {
        let start = self.start_text();
        timing::get_timing(&start, self.duration.as_deref().unwrap_or(""), now)
    }

    /// Last day of the course, if it has a parseable start and length.
    pub fn end_date(&self) -> Option<NaiveDate> {
        timing::compute_end_date(&self.start_text(), self.duration.as_deref()?)
    }

    fn start_text(&self) -> String {
        match (&self.start_date, self.created_at) {
            (Some(start), _) => start.clone(),
            (None, Some(created)) => created.to_rfc3339(),
            (None, None) => String::new(),
        }
    }

    pub fn unresolved_side_effects(&self) -> impl Iterator<Item = &SideEffectReport> {
        self.experienced_side_effects.iter().filter(|se| !se.resolved)
    }

    /// Whether this side effect is currently on the patient's reported list.
    pub fn has_reported(&self, side_effect_name: &str) -> bool {
        self.experienced_side_effects
            .iter()
            .any(|se| se.side_effect_name == side_effect_name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn medication(id: &str, name: &str, status: MedicationStatus) -> Medication {
        Medication {
            id: id.into(),
            medication_name: name.into(),
            dosage: "10mg".into(),
            frequency: "once daily".into(),
            duration: Some("7 days".into()),
            start_date: Some("2024-01-01".into()),
            created_at: None,
            instructions: String::new(),
            reminders: vec!["08:00".into()],
            status,
            adherence: None,
            patient_allergies: Vec::new(),
            potential_side_effects: Vec::new(),
            experienced_side_effects: Vec::new(),
            last_taken: None,
            taken_history: Vec::new(),
            prescribed_by: None,
            patient_id: None,
        }
    }
}
