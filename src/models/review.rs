use serde::{Deserialize, Serialize};

use super::admin::Doctor;
use super::enums::MedicationStatus;
use super::medication::{Medication, PartyRef};
use super::side_effect::SideEffectReport;

/// Payload of `GET /doctor-view/:patientId`: one patient's courses as
/// prescribed by the signed-in doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatientView {
    pub medications: Vec<Medication>,
    pub patient: Option<PartyRef>,
}

/// One side effect in the doctor's cross-patient summary, flattened with
/// the course it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedSideEffect {
    #[serde(flatten)]
    pub report: SideEffectReport,
    pub medication_id: String,
    pub medication_name: String,
    pub patient: Option<PartyRef>,
    pub status: MedicationStatus,
    /// Position in the course's side-effect list; the doctor-update
    /// endpoint addresses reports by this index.
    pub effect_index: usize,
}

/// Payload of `GET /side-effects/doctor-summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectSummary {
    pub total_side_effects: u32,
    pub total_patients: u32,
    pub total_medications: u32,
    pub unresolved_count: u32,
    pub recent_side_effects: Vec<FlaggedSideEffect>,
}

/// Body of `GET /api/doctors` (not enveloped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorList {
    pub doctors: Vec<Doctor>,
}
