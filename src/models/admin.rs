use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::{AccessLevel, Disease};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Default page size of the admin patient table.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// A patient row as listed by `GET /api/admin/patients`.
///
/// `firstname`/`lastname`/`phone_number`/`relationship` describe the
/// emergency contact; the `patient_*` fields come from the user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPatient {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub relationship: String,
    /// `YYYY-MM-DD` or a full ISO timestamp.
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub diabetes: bool,
    #[serde(default)]
    pub hypertension: bool,
    pub picture: Option<String>,
    #[serde(default)]
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: String,
    pub patient_first_name: Option<String>,
    pub patient_last_name: Option<String>,
}

impl AdminPatient {
    /// Account name when both parts are known, profile name otherwise.
    pub fn display_name(&self) -> String {
        match (&self.patient_first_name, &self.patient_last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{first} {last}")
            }
            _ => self.full_name.clone(),
        }
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.dob.as_deref().and_then(crate::timing::parse_calendar_date)
    }

    pub fn emergency_contact_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname).trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_patients: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatistics {
    pub total_patients: u32,
    pub total_users: u32,
    pub diabetes_count: u32,
    pub hypertension_count: u32,
}

/// Payload of `GET /api/admin/patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPage {
    pub patients: Vec<AdminPatient>,
    pub pagination: Pagination,
    pub statistics: PatientStatistics,
}

/// Query for the admin patient table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    pub page: Option<u32>,
    pub limit: u32,
    pub search: Option<String>,
    pub disease: Option<Disease>,
}

impl Default for PatientQuery {
    fn default() -> Self {
        Self {
            page: Some(1),
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
            disease: None,
        }
    }
}

impl PatientQuery {
    /// Query for a full export: no page, large limit, same filters.
    pub fn export(search: Option<String>, disease: Option<Disease>) -> Self {
        Self {
            page: None,
            limit: 1000,
            search,
            disease,
        }
    }

    /// Query-string pairs; empty search and "all diseases" are omitted.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        pairs.push(("limit".to_string(), self.limit.to_string()));
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        if let Some(disease) = self.disease {
            pairs.push(("disease".to_string(), disease.as_str().to_string()));
        }
        pairs
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelativeRequestError {
    #[error("Please select a patient")]
    MissingPatient,
    #[error("Please enter emergency contact email")]
    MissingEmail,
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// Body of `POST /api/admin/create-relative-account`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeAccountRequest {
    pub patient_id: String,
    pub emergency_contact_email: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub admin_notes: String,
}

impl RelativeAccountRequest {
    pub fn validate(&self) -> Result<(), RelativeRequestError> {
        if self.patient_id.trim().is_empty() {
            return Err(RelativeRequestError::MissingPatient);
        }
        if self.emergency_contact_email.trim().is_empty() {
            return Err(RelativeRequestError::MissingEmail);
        }
        if !EMAIL_PATTERN.is_match(&self.emergency_contact_email) {
            return Err(RelativeRequestError::InvalidEmail);
        }
        Ok(())
    }
}

/// A registered doctor as listed on the admin doctors page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub specialization: String,
    #[serde(default)]
    pub license_number: String,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub diabetes: bool,
    #[serde(default)]
    pub hypertension: bool,
    pub created_at: DateTime<Utc>,
}
