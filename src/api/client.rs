//! Typed client for the care backend.
//!
//! Every call reads the bearer token from the shared [`SessionStore`].
//! A 401 from the server tears the session down before the error is
//! returned, so the next call reports `NotAuthenticated` without a round
//! trip.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::envelope::{self, Ack};
use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
use crate::adherence::week_param;
use crate::config::ApiConfig;
use crate::lifecycle::MedicationAction;
use crate::models::{
    Doctor, DoctorList, DoctorPatientView, DoctorSideEffectUpdate, Medication, MedicationStatus,
    PatientPage, PatientQuery, PatientStatistics, RelativeAccountRequest, SideEffectSummary,
    WeeklyAdherence,
};
use crate::session::{Session, SessionError, SessionStore, SessionUser};

const REMINDERS: &str = "/api/medications/reminders";

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: SessionUser,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate {
    status: MedicationStatus,
    last_updated: DateTime<Utc>,
}

pub struct CareApiClient {
    transport: Box<dyn HttpTransport>,
    session: Arc<SessionStore>,
}

impl CareApiClient {
    pub fn new(transport: Box<dyn HttpTransport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Client over HTTP using `config`.
    pub fn connect(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        Ok(Self::new(Box::new(ReqwestTransport::new(config)?), session))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.session.bearer(Utc::now()).map_err(|e| match e {
            SessionError::NotSignedIn | SessionError::Expired(_) => ApiError::NotAuthenticated,
            other => ApiError::Session(other),
        })?;

        let response = self.transport.send(&request, Some(token.as_str()))?;
        if response.status == 401 {
            tracing::warn!(path = %request.path, "Server rejected session, signing out");
            if let Err(e) = self.session.logout() {
                tracing::error!(error = %e, "Failed to clear rejected session");
            }
        }
        Ok(response)
    }

    // ── Session ──────────────────────────────────────────

    /// Exchange credentials for a token and install the session.
    pub fn login(&self, email: &str, password: &str) -> Result<SessionUser, ApiError> {
        let request = ApiRequest::post("/api/login").with_json(&Credentials { email, password })?;
        let response = self.transport.send(&request, None)?;

        // On this endpoint a 401 means bad credentials, not a stale session.
        if response.status == 401 {
            return Err(ApiError::Rejected(envelope::server_message(&response.body)));
        }

        let body: LoginResponse = envelope::decode_plain("login", &response)?;
        let user = body.user.clone();
        self.session
            .login(Session::issued(body.token.as_str(), Utc::now(), Some(body.user)))?;
        Ok(user)
    }

    /// Notify the backend (best effort) and clear the local session.
    pub fn logout(&self) -> Result<(), ApiError> {
        if self.session.is_active(Utc::now()) {
            if let Err(e) = self.execute(ApiRequest::post("/api/logout")) {
                tracing::warn!(error = %e, "Logout call failed, clearing session anyway");
            }
        }
        self.session.logout()?;
        Ok(())
    }

    // ── Patient ──────────────────────────────────────────

    /// Active and stopped courses for the signed-in patient.
    pub fn today_medications(&self) -> Result<Vec<Medication>, ApiError> {
        let response = self.execute(ApiRequest::get(format!("{REMINDERS}/today")))?;
        envelope::decode_data("today", &response)
    }

    pub fn weekly_adherence(&self, week_start: NaiveDate) -> Result<WeeklyAdherence, ApiError> {
        let request = ApiRequest::get(format!("{REMINDERS}/weekly-adherence"))
            .with_query(vec![("weekStart".to_string(), week_param(week_start))]);
        let response = self.execute(request)?;
        envelope::decode_data("weekly-adherence", &response)
    }

    /// Send a lifecycle action. Callers validate the action first.
    pub fn perform(&self, medication_id: &str, action: &MedicationAction) -> Result<Ack, ApiError> {
        let response = self.execute(action.to_request(medication_id)?)?;
        envelope::decode_ack(action.name(), &response)
    }

    // ── Doctor ───────────────────────────────────────────

    pub fn doctor_patient_medications(&self, patient_id: &str) -> Result<DoctorPatientView, ApiError> {
        let response = self.execute(ApiRequest::get(format!("{REMINDERS}/doctor-view/{patient_id}")))?;
        envelope::decode_data("doctor-view", &response)
    }

    pub fn side_effects_summary(&self) -> Result<SideEffectSummary, ApiError> {
        let response = self.execute(ApiRequest::get(format!("{REMINDERS}/side-effects/doctor-summary")))?;
        envelope::decode_data("side-effects-summary", &response)
    }

    pub fn update_medication_status(
        &self,
        medication_id: &str,
        status: MedicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Ack, ApiError> {
        let request = ApiRequest::put(format!("/api/medications/{medication_id}")).with_json(&StatusUpdate {
            status,
            last_updated: now,
        })?;
        let response = self.execute(request)?;
        envelope::decode_ack("update-status", &response)
            .map_err(|e| prescriber_error(e, "You can only update medications you prescribed"))
    }

    pub fn delete_prescription(&self, medication_id: &str) -> Result<Ack, ApiError> {
        let response = self.execute(MedicationAction::Delete.to_request(medication_id)?)?;
        envelope::decode_ack("delete", &response)
            .map_err(|e| prescriber_error(e, "You can only delete medications you prescribed"))
    }

    pub fn update_side_effect(
        &self,
        medication_id: &str,
        effect_index: usize,
        update: &DoctorSideEffectUpdate,
    ) -> Result<Ack, ApiError> {
        let request = ApiRequest::put(format!(
            "{REMINDERS}/{medication_id}/side-effects/{effect_index}/doctor-update"
        ))
        .with_json(update)?;
        let response = self.execute(request)?;
        envelope::decode_ack("doctor-update", &response)
    }

    // ── Admin ────────────────────────────────────────────

    pub fn admin_patients(&self, query: &PatientQuery) -> Result<PatientPage, ApiError> {
        let request = ApiRequest::get("/api/admin/patients").with_query(query.to_pairs());
        let response = self.execute(request)?;
        envelope::decode_data("admin-patients", &response)
    }

    pub fn admin_statistics(&self) -> Result<PatientStatistics, ApiError> {
        let response = self.execute(ApiRequest::get("/api/admin/statistics"))?;
        envelope::decode_data("admin-statistics", &response)
    }

    pub fn create_relative_account(&self, request: &RelativeAccountRequest) -> Result<Ack, ApiError> {
        request.validate()?;
        let response = self.execute(ApiRequest::post("/api/admin/create-relative-account").with_json(request)?)?;
        envelope::decode_ack("create-relative-account", &response)
    }

    pub fn doctors(&self) -> Result<Vec<Doctor>, ApiError> {
        let response = self.execute(ApiRequest::get("/api/doctors"))?;
        let list: DoctorList = envelope::decode_plain("doctors", &response)?;
        Ok(list.doctors)
    }
}

/// Doctor mutations report ownership and missing-record failures with
/// fixed wording.
fn prescriber_error(err: ApiError, forbidden: &str) -> ApiError {
    match err {
        ApiError::Forbidden(_) => ApiError::Forbidden(forbidden.to_string()),
        ApiError::NotFound(_) => ApiError::NotFound("Medication not found".to_string()),
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{FailureKind, Method, MockTransport};
    use crate::models::{AccessLevel, MissReason};
    use chrono::Duration;
    use serde_json::{json, Value};

    pub(crate) fn medication_json(id: &str, name: &str, status: &str) -> Value {
        json!({
            "_id": id,
            "medicationName": name,
            "dosage": "5mg",
            "frequency": "daily",
            "duration": "7 days",
            "startDate": "2024-01-01",
            "status": status,
            "reminders": ["08:00"]
        })
    }

    pub(crate) fn signed_in() -> Arc<SessionStore> {
        let store = SessionStore::new();
        store
            .login(Session::new("tok", Utc::now() + Duration::hours(1), None))
            .unwrap();
        Arc::new(store)
    }

    fn client(mock: MockTransport) -> (CareApiClient, Arc<SessionStore>) {
        let session = signed_in();
        (CareApiClient::new(Box::new(mock), Arc::clone(&session)), session)
    }

    #[test]
    fn login_installs_session() {
        let mock = MockTransport::new().respond(
            Method::Post,
            "/api/login",
            200,
            json!({"user": {"id": "u1", "email": "a@b.co", "name": "A B"}, "token": "jwt"}),
        );
        let session = Arc::new(SessionStore::new());
        let api = CareApiClient::new(Box::new(mock), Arc::clone(&session));

        let user = api.login("a@b.co", "pw").unwrap();
        assert_eq!(user.name, "A B");
        assert_eq!(session.bearer(Utc::now()).unwrap().as_str(), "jwt");
    }

    #[test]
    fn bad_credentials_are_rejected_without_session() {
        let mock = MockTransport::new().respond(
            Method::Post,
            "/api/login",
            401,
            json!({"message": "Invalid credentials"}),
        );
        let session = Arc::new(SessionStore::new());
        let api = CareApiClient::new(Box::new(mock), Arc::clone(&session));

        match api.login("a@b.co", "nope") {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(!session.is_active(Utc::now()));
    }

    #[test]
    fn calls_without_session_never_hit_the_network() {
        let api = CareApiClient::new(Box::new(MockTransport::new()), Arc::new(SessionStore::new()));
        let err = api.today_medications().unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        assert_eq!(err.kind(), FailureKind::Authentication);
    }

    #[test]
    fn unauthorized_clears_session() {
        let mock = MockTransport::new().respond(
            Method::Get,
            "/api/medications/reminders/today",
            401,
            json!({"message": "jwt expired"}),
        );
        let (api, session) = client(mock);

        assert!(matches!(api.today_medications(), Err(ApiError::Unauthorized)));
        assert!(!session.is_active(Utc::now()));
        assert!(matches!(api.today_medications(), Err(ApiError::NotAuthenticated)));
    }

    #[test]
    fn unauthorized_survives_a_stuck_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = Arc::new(SessionStore::open(&path).unwrap());
        session
            .login(Session::new("tok", Utc::now() + Duration::hours(1), None))
            .unwrap();
        // A directory in place of the file makes removal fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let mock = MockTransport::new().respond(Method::Get, "/api/medications/reminders/today", 401, json!({}));
        let api = CareApiClient::new(Box::new(mock), Arc::clone(&session));

        let err = api.today_medications().unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(err.kind(), FailureKind::Authentication);
        assert!(!session.is_active(Utc::now()));
    }

    #[test]
    fn today_decodes_medications() {
        let mock = MockTransport::new().respond(
            Method::Get,
            "/api/medications/reminders/today",
            200,
            json!({"success": true, "data": [medication_json("m1", "Losartan", "active")], "count": 1}),
        );
        let (api, _) = client(mock);
        let meds = api.today_medications().unwrap();
        assert_eq!(meds[0].medication_name, "Losartan");
    }

    #[test]
    fn weekly_sends_week_start() {
        let mock = MockTransport::new().respond(
            Method::Get,
            "/api/medications/reminders/weekly-adherence",
            200,
            json!({"success": true, "data": {
                "weekStart": "2024-01-07T00:00:00Z", "weekEnd": "2024-01-13T23:59:59Z",
                "weekDays": [], "medications": [],
                "summary": {"totalMedications": 0, "activeMedications": 0,
                            "takenThisWeek": 0, "missedThisWeek": 0, "pendingThisWeek": 0}
            }}),
        );
        let mock = Arc::new(mock);
        let api = CareApiClient::new(Box::new(Arc::clone(&mock)), signed_in());

        api.weekly_adherence(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap())
            .unwrap();
        let sent = &mock.requests()[0];
        assert!(sent.had_bearer);
        assert_eq!(sent.request.query, vec![("weekStart".into(), "2024-01-07".into())]);
    }

    #[test]
    fn perform_posts_action() {
        let mock = MockTransport::new().respond(
            Method::Post,
            "/api/medications/reminders/m1/mark-missed",
            200,
            json!({"success": true, "message": "Medication marked as missed"}),
        );
        let (api, _) = client(mock);
        let ack = api
            .perform(
                "m1",
                &MedicationAction::MarkMissed {
                    reason: MissReason::Forgot,
                    notes: String::new(),
                },
            )
            .unwrap();
        assert_eq!(ack.message, "Medication marked as missed");
    }

    #[test]
    fn prescriber_errors_use_fixed_wording() {
        let mock = MockTransport::new()
            .respond(Method::Put, "/api/medications/m1", 403, json!({"message": "nope"}))
            .respond(Method::Delete, "/api/medications/reminders/m2", 404, json!({}));
        let (api, _) = client(mock);

        let err = api
            .update_medication_status("m1", MedicationStatus::Completed, Utc::now())
            .unwrap_err();
        assert_eq!(err.user_message(), "You can only update medications you prescribed");
        assert_eq!(err.kind(), FailureKind::AccessDenied);

        let err = api.delete_prescription("m2").unwrap_err();
        assert_eq!(err.user_message(), "Medication not found");
    }

    #[test]
    fn relative_request_is_validated_before_sending() {
        let (api, _) = client(MockTransport::new());
        let request = RelativeAccountRequest {
            patient_id: "p1".into(),
            emergency_contact_email: "bad".into(),
            access_level: AccessLevel::Caretaker,
            admin_notes: String::new(),
        };
        let err = api.create_relative_account(&request).unwrap_err();
        assert_eq!(err.user_message(), "Please enter a valid email address");
    }

    #[test]
    fn doctors_list_is_plain_json() {
        let mock = MockTransport::new().respond(
            Method::Get,
            "/api/doctors",
            200,
            json!({"doctors": [{"_id": "d1", "firstName": "Grace", "lastName": "Achieng",
                               "createdAt": "2024-02-01T00:00:00Z"}]}),
        );
        let (api, _) = client(mock);
        assert_eq!(api.doctors().unwrap()[0].first_name, "Grace");
    }
}
