//! Medication lifecycle actions.
//!
//! The backend owns every status transition. This module only knows which
//! actions a dashboard may offer for a given status, which of them need an
//! explicit confirmation, what request each one sends, and how to show a
//! provisional result until the next refresh brings the server's answer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::{ApiError, ApiRequest};
use crate::models::{
    Adherence, AdherenceEntry, AdherenceStatus, Intensity, Medication, MedicationStatus, MissReason,
    SideEffectInput, SideEffectReport, StopReason, TakenDose,
};

const REMINDERS_PATH: &str = "/api/medications/reminders";

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{action} needs confirmation")]
    ConfirmationRequired { action: &'static str },
    #[error("{action} is not available for a {status} medication")]
    NotAvailable {
        action: &'static str,
        status: MedicationStatus,
    },
    #[error("Side effect name is required")]
    EmptySideEffectName,
    #[error("Medication {0} is not loaded")]
    UnknownMedication(String),
    #[error("Another request is still in progress")]
    Busy,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A patient-initiated change to one medication course.
#[derive(Debug, Clone, PartialEq)]
pub enum MedicationAction {
    MarkTaken,
    MarkMissed {
        reason: MissReason,
        notes: String,
    },
    Stop {
        reason: StopReason,
        notes: String,
        side_effects_intensity: Option<Intensity>,
    },
    Restart,
    Delete,
    ReportSideEffect(SideEffectInput),
    RemoveSideEffect {
        side_effect_name: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReasonBody<'a> {
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    side_effects_intensity: Option<Intensity>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SideEffectNameBody<'a> {
    side_effect_name: &'a str,
}

impl MedicationAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MarkTaken => "mark-taken",
            Self::MarkMissed { .. } => "mark-missed",
            Self::Stop { .. } => "stop-taking",
            Self::Restart => "restart-taking",
            Self::Delete => "delete",
            Self::ReportSideEffect(_) => "report-side-effect",
            Self::RemoveSideEffect { .. } => "remove-side-effect",
        }
    }

    /// Restart and delete must be confirmed by the user first.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Restart | Self::Delete)
    }

    /// Whether a dashboard should offer this action for `status`.
    pub fn is_available_for(&self, status: MedicationStatus) -> bool {
        use MedicationStatus::*;
        match self {
            Self::MarkTaken | Self::MarkMissed { .. } | Self::Stop { .. } => status == Active,
            Self::Restart => status == Stopped,
            Self::ReportSideEffect(_) | Self::RemoveSideEffect { .. } => {
                matches!(status, Active | Stopped)
            }
            Self::Delete => true,
        }
    }

    /// Check everything that can be checked without the server.
    pub fn validate(&self, status: MedicationStatus, confirmed: bool) -> Result<(), ActionError> {
        if !self.is_available_for(status) {
            return Err(ActionError::NotAvailable {
                action: self.name(),
                status,
            });
        }
        if self.requires_confirmation() && !confirmed {
            return Err(ActionError::ConfirmationRequired { action: self.name() });
        }
        match self {
            Self::ReportSideEffect(input) if input.side_effect_name.trim().is_empty() => {
                Err(ActionError::EmptySideEffectName)
            }
            Self::RemoveSideEffect { side_effect_name } if side_effect_name.trim().is_empty() => {
                Err(ActionError::EmptySideEffectName)
            }
            _ => Ok(()),
        }
    }

    /// The request that performs this action on the backend.
    pub fn to_request(&self, medication_id: &str) -> Result<ApiRequest, ApiError> {
        let base = format!("{REMINDERS_PATH}/{medication_id}");
        let request = match self {
            Self::MarkTaken => ApiRequest::post(format!("{base}/mark-taken")),
            Self::MarkMissed { reason, notes } => {
                ApiRequest::post(format!("{base}/mark-missed")).with_json(&ReasonBody {
                    reason: reason.as_str(),
                    notes: Some(notes.as_str()),
                    side_effects_intensity: None,
                })?
            }
            Self::Stop {
                reason,
                notes,
                side_effects_intensity,
            } => ApiRequest::post(format!("{base}/stop-taking")).with_json(&ReasonBody {
                reason: reason.as_str(),
                notes: Some(notes.as_str()),
                side_effects_intensity: *side_effects_intensity,
            })?,
            Self::Restart => ApiRequest::post(format!("{base}/restart-taking")).with_json(&ReasonBody {
                reason: "Patient restarted medication",
                notes: None,
                side_effects_intensity: None,
            })?,
            Self::Delete => ApiRequest::delete(base),
            Self::ReportSideEffect(input) => {
                ApiRequest::post(format!("{base}/report-side-effect")).with_json(input)?
            }
            Self::RemoveSideEffect { side_effect_name } => ApiRequest::delete(format!(
                "{base}/remove-side-effect"
            ))
            .with_json(&SideEffectNameBody { side_effect_name })?,
        };
        Ok(request)
    }

    /// Provisional local effect, shown until the post-action refresh lands.
    /// Delete is handled by the caller removing the record.
    pub fn apply_provisional(&self, med: &mut Medication, now: DateTime<Utc>) {
        match self {
            Self::MarkTaken => {
                med.last_taken = Some(now);
                med.taken_history.push(TakenDose {
                    taken_at: now,
                    dose_time: Some(now.format("%H:%M").to_string()),
                });
                record(med, AdherenceStatus::Taken, now, None, None);
            }
            Self::MarkMissed { reason, notes } => {
                record(med, AdherenceStatus::Missed, now, Some(reason.as_str()), Some(notes.as_str()));
            }
            Self::Stop {
                reason,
                notes,
                side_effects_intensity,
            } => {
                med.status = MedicationStatus::Stopped;
                record(med, AdherenceStatus::Stopped, now, Some(reason.as_str()), Some(notes.as_str()));
                if let Some(adherence) = med.adherence.as_mut() {
                    adherence.reason_for_stopping = Some(reason.as_str().to_string());
                    adherence.stopped_at = Some(now);
                }
                if let Some(intensity) = side_effects_intensity {
                    for se in &mut med.experienced_side_effects {
                        se.intensity = Some(*intensity);
                        se.last_updated = Some(now);
                    }
                }
            }
            Self::Restart => {
                med.status = MedicationStatus::Active;
                record(med, AdherenceStatus::Taken, now, Some("Restarted medication"), None);
                if let Some(adherence) = med.adherence.as_mut() {
                    adherence.reason_for_stopping = None;
                    adherence.stopped_at = None;
                }
            }
            Self::Delete => {}
            Self::ReportSideEffect(input) => {
                med.experienced_side_effects.push(SideEffectReport {
                    side_effect_name: input.side_effect_name.clone(),
                    reported_at: Some(now),
                    severity: input.severity,
                    notes: Some(input.notes.clone()),
                    intensity: input.intensity,
                    resolved: false,
                    resolved_at: None,
                    doctor_notes: None,
                    doctor_id: None,
                    last_updated: Some(now),
                });
            }
            Self::RemoveSideEffect { side_effect_name } => {
                med.experienced_side_effects
                    .retain(|se| &se.side_effect_name != side_effect_name);
            }
        }
    }
}

fn record(
    med: &mut Medication,
    status: AdherenceStatus,
    now: DateTime<Utc>,
    reason: Option<&str>,
    notes: Option<&str>,
) {
    let adherence = med.adherence.get_or_insert_with(|| Adherence {
        current_status: Some(status),
        reason_for_stopping: None,
        stopped_at: None,
        history: Vec::new(),
    });
    adherence.current_status = Some(status);
    adherence.history.push(AdherenceEntry {
        date: now.to_rfc3339(),
        status: status.as_str().to_string(),
        reason: reason.map(str::to_string),
        notes: notes.map(str::to_string),
    });
}
