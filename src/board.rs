//! Patient medication board.
//!
//! Holds the server's list of today's courses and runs lifecycle actions
//! against it. Every mutation is applied provisionally, sent, then followed
//! by a fresh fetch so the displayed state always converges on the server's.
//! A failed mutation restores the pre-action list.

use chrono::{DateTime, Duration, Local, NaiveTime, Timelike, Utc};

use crate::api::{Ack, ApiError, CareApiClient, FailureKind};
use crate::freshness::{RequestTracker, Resource, Ticket};
use crate::lifecycle::{ActionError, MedicationAction};
use crate::models::{Medication, MedicationStatus};

/// A dose logged this recently hides the course from the "to take" list.
pub const RECENTLY_TAKEN_HOURS: i64 = 2;
/// A reminder this close counts as due soon.
pub const DUE_SOON_MINUTES: i64 = 30;

/// Dismissible failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub kind: FailureKind,
}

/// Counts for the board header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStats {
    pub total: u32,
    pub active: u32,
    pub stopped: u32,
    pub with_side_effects: u32,
}

#[derive(Debug, Default)]
pub struct MedicationBoard {
    medications: Vec<Medication>,
    tracker: RequestTracker,
    refreshing: bool,
    /// Medication whose action is in flight.
    busy: Option<String>,
    banner: Option<Banner>,
    needs_login: bool,
    access_denied: Option<String>,
    loaded: bool,
}

impl MedicationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Refresh ──────────────────────────────────────────

    /// User-initiated refresh. Ignored while one is already running.
    pub fn refresh(&mut self, api: &CareApiClient) {
        if self.refreshing {
            tracing::debug!("Refresh already in progress");
            return;
        }
        self.reload(api);
    }

    /// Take a ticket for a fetch of today's list. Any earlier ticket
    /// becomes stale.
    pub fn begin_refresh(&mut self) -> Ticket {
        self.refreshing = true;
        self.tracker.issue(Resource::TodayMedications)
    }

    /// Apply a fetch result. Returns false when the ticket was stale and the
    /// result was dropped.
    pub fn complete_refresh(&mut self, ticket: Ticket, result: Result<Vec<Medication>, ApiError>) -> bool {
        let Some(result) = self.tracker.accept(ticket, result) else {
            return false;
        };
        self.refreshing = false;
        self.loaded = true;

        match result {
            Ok(medications) => {
                tracing::debug!(count = medications.len(), "Medications refreshed");
                self.medications = medications;
                self.access_denied = None;
                self.needs_login = false;
            }
            Err(e) => {
                if e.kind() == FailureKind::NotFound {
                    self.medications.clear();
                }
                self.record_failure(&e);
            }
        }
        true
    }

    fn reload(&mut self, api: &CareApiClient) {
        let ticket = self.begin_refresh();
        let result = api.today_medications();
        self.complete_refresh(ticket, result);
    }

    // ── Actions ──────────────────────────────────────────

    /// Run a lifecycle action. Restart and delete need `confirmed`.
    pub fn dispatch(
        &mut self,
        api: &CareApiClient,
        medication_id: &str,
        action: MedicationAction,
        confirmed: bool,
    ) -> Result<Ack, ActionError> {
        if self.busy.is_some() {
            return Err(ActionError::Busy);
        }
        let status = self
            .find(medication_id)
            .map(|m| m.status)
            .ok_or_else(|| ActionError::UnknownMedication(medication_id.to_string()))?;
        action.validate(status, confirmed)?;

        let snapshot = self.medications.clone();
        self.apply_provisional(medication_id, &action, Utc::now());

        self.busy = Some(medication_id.to_string());
        let result = api.perform(medication_id, &action);
        self.busy = None;

        match result {
            Ok(ack) => {
                tracing::info!(action = action.name(), medication_id, "Action accepted");
                self.reload(api);
                Ok(ack)
            }
            Err(e) => {
                tracing::warn!(action = action.name(), medication_id, error = %e, "Action failed, reverting");
                self.medications = snapshot;
                self.record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn apply_provisional(&mut self, medication_id: &str, action: &MedicationAction, now: DateTime<Utc>) {
        if matches!(action, MedicationAction::Delete) {
            self.medications.retain(|m| m.id != medication_id);
        } else if let Some(med) = self.medications.iter_mut().find(|m| m.id == medication_id) {
            action.apply_provisional(med, now);
        }
    }

    fn record_failure(&mut self, err: &ApiError) {
        match err.kind() {
            FailureKind::Authentication => {
                self.needs_login = true;
                self.medications.clear();
            }
            FailureKind::AccessDenied => {
                self.access_denied = Some(err.user_message());
            }
            FailureKind::NotFound => {}
            FailureKind::Failure => {
                tracing::error!(error = %err, "Medication board request failed");
                self.banner = Some(Banner {
                    message: err.user_message(),
                    kind: FailureKind::Failure,
                });
            }
        }
    }

    // ── View state ───────────────────────────────────────

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    pub fn find(&self, medication_id: &str) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == medication_id)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Whether the action buttons for this course should be disabled.
    pub fn is_busy(&self, medication_id: &str) -> bool {
        self.busy.as_deref() == Some(medication_id)
    }

    /// True once any fetch has completed; an empty list before that is
    /// "loading", after it "nothing prescribed".
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

    /// Active courses still to take, i.e. not taken in the last two hours.
    pub fn due_medications(&self, now: DateTime<Utc>) -> Vec<&Medication> {
        self.medications
            .iter()
            .filter(|m| m.status == MedicationStatus::Active && !is_recently_taken(m, now))
            .collect()
    }

    pub fn stopped_medications(&self) -> Vec<&Medication> {
        self.medications
            .iter()
            .filter(|m| m.status == MedicationStatus::Stopped)
            .collect()
    }

    /// Distinct allergy names across all courses, in first-seen order.
    pub fn allergies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for allergy in self.medications.iter().flat_map(|m| &m.patient_allergies) {
            if !names.contains(&allergy.allergy_name.as_str()) {
                names.push(&allergy.allergy_name);
            }
        }
        names
    }

    pub fn stats(&self) -> BoardStats {
        let mut stats = BoardStats {
            total: self.medications.len() as u32,
            ..BoardStats::default()
        };
        for med in &self.medications {
            match med.status {
                MedicationStatus::Active => stats.active += 1,
                MedicationStatus::Stopped => stats.stopped += 1,
                _ => {}
            }
            if !med.experienced_side_effects.is_empty() {
                stats.with_side_effects += 1;
            }
        }
        stats
    }
}

// ═══════════════════════════════════════════
// Reminder helpers
// ═══════════════════════════════════════════

fn parse_reminder(reminder: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(reminder.trim(), "%H:%M").ok()
}

/// Earliest reminder after `now`, wrapping to the first listed one once
/// the day's doses are past.
pub fn next_dose(reminders: &[String], now: NaiveTime) -> Option<&str> {
    let current = NaiveTime::from_hms_opt(now.hour(), now.minute(), 0)?;
    reminders
        .iter()
        .filter_map(|r| parse_reminder(r).filter(|t| *t > current).map(|t| (t, r)))
        .min_by_key(|(t, _)| *t)
        .map(|(_, r)| r)
        .or_else(|| reminders.first())
        .map(String::as_str)
}

/// Reminder falls within the next half hour (inclusive of now).
pub fn is_due_soon(reminder: &str, now: DateTime<Local>) -> bool {
    let Some(time) = parse_reminder(reminder) else {
        return false;
    };
    let Some(at) = now.date_naive().and_time(time).and_local_timezone(Local).single() else {
        return false;
    };
    let minutes = (at - now).num_seconds().div_euclid(60);
    (0..=DUE_SOON_MINUTES).contains(&minutes)
}

pub fn is_recently_taken(med: &Medication, now: DateTime<Utc>) -> bool {
    med.last_taken
        .is_some_and(|taken| now - taken < Duration::hours(RECENTLY_TAKEN_HOURS))
}
