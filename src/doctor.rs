//! Doctor-facing medication review.
//!
//! Two scopes feed the same view: one patient's prescriptions, or the
//! cross-patient side-effect summary regrouped per course. Side-effect
//! resolution is applied locally first, then the list is re-fetched.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::api::{Ack, ApiError, CareApiClient, FailureKind};
use crate::board::Banner;
use crate::freshness::{RequestTracker, Resource, Ticket};
use crate::lifecycle::ActionError;
use crate::models::{
    DoctorSideEffectUpdate, FlaggedSideEffect, Intensity, Medication, MedicationStatus, PartyRef,
    Severity, SideEffectReport,
};
use crate::timing::ExpirySummary;

pub const UNKNOWN_PATIENT: &str = "Unknown Patient";

/// The patient a doctor opened the review for. Used to name courses whose
/// patient reference came back as a bare id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPatient {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewScope {
    Patient(FallbackPatient),
    Summary,
}

/// A course under review together with the server-side index of each of
/// its side-effect reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewedMedication {
    pub medication: Medication,
    effect_indices: Vec<usize>,
}

impl ReviewedMedication {
    pub fn new(medication: Medication) -> Self {
        let effect_indices = (0..medication.experienced_side_effects.len()).collect();
        Self {
            medication,
            effect_indices,
        }
    }

    /// Index the doctor-update endpoint expects for the report at `position`.
    pub fn effect_index(&self, position: usize) -> Option<usize> {
        self.effect_indices.get(position).copied()
    }
}

/// Regroup the flat summary feed into one entry per course, keeping the
/// feed's order of first appearance.
pub fn group_summary(flagged: Vec<FlaggedSideEffect>) -> Vec<ReviewedMedication> {
    let mut order: Vec<ReviewedMedication> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for item in flagged {
        let slot = *slots.entry(item.medication_id.clone()).or_insert_with(|| {
            order.push(ReviewedMedication {
                medication: summary_course(&item),
                effect_indices: Vec::new(),
            });
            order.len() - 1
        });
        let entry = &mut order[slot];
        entry.medication.experienced_side_effects.push(item.report);
        entry.effect_indices.push(item.effect_index);
    }
    order
}

fn summary_course(item: &FlaggedSideEffect) -> Medication {
    Medication {
        id: item.medication_id.clone(),
        medication_name: item.medication_name.clone(),
        dosage: String::new(),
        frequency: String::new(),
        duration: None,
        start_date: None,
        created_at: None,
        instructions: String::new(),
        reminders: Vec::new(),
        status: item.status,
        adherence: None,
        patient_allergies: Vec::new(),
        potential_side_effects: Vec::new(),
        experienced_side_effects: Vec::new(),
        last_taken: None,
        taken_history: Vec::new(),
        prescribed_by: None,
        patient_id: item.patient.clone(),
    }
}

/// Severe by its own rating or by the patient's reported intensity.
pub fn is_severe(report: &SideEffectReport) -> bool {
    report.severity == Severity::Severe
        || matches!(report.intensity, Some(Intensity::Severe | Intensity::VerySevere))
}

/// Header counts for the review screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStats {
    pub total: u32,
    pub active: u32,
    pub stopped: u32,
    pub completed: u32,
    pub total_side_effects: u32,
    pub severe_side_effects: u32,
    pub unresolved_side_effects: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub search: String,
    /// `None` means all statuses.
    pub status: Option<MedicationStatus>,
    /// `None` means any severity. Matches a report's severity or intensity.
    pub severity: Option<Severity>,
}

impl ReviewFilter {
    pub fn is_active(&self) -> bool {
        !self.search.is_empty() || self.status.is_some() || self.severity.is_some()
    }

    fn matches(&self, med: &Medication, patient_name: &str) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || med.medication_name.to_lowercase().contains(&needle)
            || patient_name.to_lowercase().contains(&needle);

        let matches_status = self.status.map_or(true, |s| med.status == s);

        let matches_severity = self.severity.map_or(true, |wanted| {
            med.experienced_side_effects.iter().any(|se| {
                se.severity == wanted || se.intensity.is_some_and(|i| i.as_str() == wanted.as_str())
            })
        });

        matches_search && matches_status && matches_severity
    }
}

#[derive(Debug)]
pub struct DoctorReview {
    scope: ReviewScope,
    entries: Vec<ReviewedMedication>,
    tracker: RequestTracker,
    refreshing: bool,
    banner: Option<Banner>,
    access_denied: Option<String>,
    needs_login: bool,
    loaded: bool,
}

impl DoctorReview {
    pub fn new(scope: ReviewScope) -> Self {
        Self {
            scope,
            entries: Vec::new(),
            tracker: RequestTracker::new(),
            refreshing: false,
            banner: None,
            access_denied: None,
            needs_login: false,
            loaded: false,
        }
    }

    pub fn for_patient(id: &str, full_name: &str) -> Self {
        Self::new(ReviewScope::Patient(FallbackPatient {
            id: id.to_string(),
            full_name: full_name.to_string(),
        }))
    }

    pub fn scope(&self) -> &ReviewScope {
        &self.scope
    }

    // ── Loading ──────────────────────────────────────────

    pub fn refresh(&mut self, api: &CareApiClient) {
        if self.refreshing {
            tracing::debug!("Review refresh already in progress");
            return;
        }
        self.reload(api);
    }

    pub fn begin_refresh(&mut self) -> Ticket {
        self.refreshing = true;
        self.tracker.issue(Resource::DoctorMedications)
    }

    pub fn complete_refresh(&mut self, ticket: Ticket, result: Result<Vec<ReviewedMedication>, ApiError>) -> bool {
        let Some(result) = self.tracker.accept(ticket, result) else {
            return false;
        };
        self.refreshing = false;
        self.loaded = true;

        match result {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "Review refreshed");
                self.entries = entries;
                self.access_denied = None;
            }
            Err(e) => {
                // A failed load shows an empty review rather than stale rows.
                self.entries.clear();
                self.record_failure(&e);
            }
        }
        true
    }

    fn reload(&mut self, api: &CareApiClient) {
        let ticket = self.begin_refresh();
        let result = fetch(api, &self.scope);
        self.complete_refresh(ticket, result);
    }

    // ── Mutations ────────────────────────────────────────

    /// Resolve or annotate the side effect at `position` in a course's list.
    pub fn resolve_side_effect(
        &mut self,
        api: &CareApiClient,
        medication_id: &str,
        position: usize,
        update: &DoctorSideEffectUpdate,
        now: DateTime<Utc>,
    ) -> Result<Ack, ApiError> {
        let entry = self
            .find_entry_mut(medication_id)
            .ok_or_else(|| ApiError::NotFound("Medication not found".to_string()))?;
        let effect_index = entry
            .effect_index(position)
            .ok_or_else(|| ApiError::NotFound("Side effect not found".to_string()))?;

        let slot = entry
            .medication
            .experienced_side_effects
            .get_mut(position)
            .ok_or_else(|| ApiError::NotFound("Side effect not found".to_string()))?;
        let previous = slot.clone();
        slot.apply_doctor_update(update, now);

        match api.update_side_effect(medication_id, effect_index, update) {
            Ok(ack) => {
                tracing::info!(medication_id, effect_index, resolved = update.resolved, "Side effect updated");
                self.reload(api);
                Ok(ack)
            }
            Err(e) => {
                if let Some(entry) = self.find_entry_mut(medication_id) {
                    if let Some(slot) = entry.medication.experienced_side_effects.get_mut(position) {
                        *slot = previous;
                    }
                }
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    pub fn update_status(
        &mut self,
        api: &CareApiClient,
        medication_id: &str,
        status: MedicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Ack, ApiError> {
        match api.update_medication_status(medication_id, status, now) {
            Ok(ack) => {
                if let Some(entry) = self.find_entry_mut(medication_id) {
                    entry.medication.status = status;
                }
                self.reload(api);
                Ok(ack)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Delete a prescription. Irreversible, so `confirmed` must be set.
    pub fn delete(&mut self, api: &CareApiClient, medication_id: &str, confirmed: bool) -> Result<Ack, ActionError> {
        if !confirmed {
            return Err(ActionError::ConfirmationRequired { action: "delete" });
        }
        match api.delete_prescription(medication_id) {
            Ok(ack) => {
                self.entries.retain(|e| e.medication.id != medication_id);
                self.reload(api);
                Ok(ack)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn record_failure(&mut self, err: &ApiError) {
        match err.kind() {
            FailureKind::Authentication => {
                self.needs_login = true;
                self.entries.clear();
            }
            FailureKind::AccessDenied if !self.loaded || self.entries.is_empty() => {
                self.access_denied = Some(err.user_message());
            }
            FailureKind::NotFound if self.entries.is_empty() => {}
            kind => {
                if kind == FailureKind::Failure {
                    tracing::error!(error = %err, "Doctor review request failed");
                }
                self.banner = Some(Banner {
                    message: err.user_message(),
                    kind,
                });
            }
        }
    }

    fn find_entry_mut(&mut self, medication_id: &str) -> Option<&mut ReviewedMedication> {
        self.entries.iter_mut().find(|e| e.medication.id == medication_id)
    }

    // ── View state ───────────────────────────────────────

    pub fn entries(&self) -> &[ReviewedMedication] {
        &self.entries
    }

    pub fn medications(&self) -> impl Iterator<Item = &Medication> {
        self.entries.iter().map(|e| &e.medication)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn needs_login(&self) -> bool {
        self.needs_login
    }

    pub fn access_denied(&self) -> Option<&str> {
        self.access_denied.as_deref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn fallback_patient(&self) -> Option<&FallbackPatient> {
        match &self.scope {
            ReviewScope::Patient(p) => Some(p),
            ReviewScope::Summary => None,
        }
    }

    pub fn patient_name(&self, med: &Medication) -> String {
        patient_name(med.patient_id.as_ref(), self.fallback_patient())
    }

    pub fn filtered(&self, filter: &ReviewFilter) -> Vec<&ReviewedMedication> {
        self.entries
            .iter()
            .filter(|e| filter.matches(&e.medication, &self.patient_name(&e.medication)))
            .collect()
    }

    pub fn stats(&self) -> ReviewStats {
        let mut stats = ReviewStats {
            total: self.entries.len() as u32,
            ..ReviewStats::default()
        };
        for med in self.medications() {
            match med.status {
                MedicationStatus::Active => stats.active += 1,
                MedicationStatus::Stopped => stats.stopped += 1,
                MedicationStatus::Completed => stats.completed += 1,
                _ => {}
            }
            for se in &med.experienced_side_effects {
                stats.total_side_effects += 1;
                if is_severe(se) {
                    stats.severe_side_effects += 1;
                }
                if !se.resolved {
                    stats.unresolved_side_effects += 1;
                }
            }
        }
        stats
    }

    /// Courses ending soon, for the expiring-medications banner.
    pub fn expiry_summary(&self, today: NaiveDate) -> ExpirySummary {
        ExpirySummary::from_end_dates(
            self.medications()
                .filter(|m| m.status == MedicationStatus::Active)
                .map(Medication::end_date),
            today,
        )
    }
}

fn fetch(api: &CareApiClient, scope: &ReviewScope) -> Result<Vec<ReviewedMedication>, ApiError> {
    match scope {
        ReviewScope::Patient(patient) => {
            let view = api.doctor_patient_medications(&patient.id)?;
            Ok(dedup(view.medications).into_iter().map(ReviewedMedication::new).collect())
        }
        ReviewScope::Summary => Ok(group_summary(api.side_effects_summary()?.recent_side_effects)),
    }
}

/// Drop repeated courses, keeping the first.
fn dedup(medications: Vec<Medication>) -> Vec<Medication> {
    let mut seen = std::collections::HashSet::new();
    medications
        .into_iter()
        .filter(|m| {
            let fresh = seen.insert(m.id.clone());
            if !fresh {
                tracing::debug!(medication_id = %m.id, "Duplicate course skipped");
            }
            fresh
        })
        .collect()
}

/// Display name for a course's patient reference.
pub fn patient_name(patient: Option<&PartyRef>, fallback: Option<&FallbackPatient>) -> String {
    match patient {
        Some(PartyRef::Profile(_)) => patient
            .and_then(PartyRef::full_name)
            .unwrap_or(UNKNOWN_PATIENT)
            .to_string(),
        Some(PartyRef::Id(id)) => match fallback {
            Some(p) if &p.id == id => p.full_name.clone(),
            _ => UNKNOWN_PATIENT.to_string(),
        },
        None => fallback
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
    }
}
