//! CSV exports for the doctor and admin dashboards.
//!
//! Header rows are written bare; data cells are quoted with embedded quotes
//! doubled, except in the doctors list which the admin page writes unquoted.

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::doctor::{patient_name, FallbackPatient};
use crate::models::{AdminPatient, Doctor, Medication};
use crate::vitals::age_on;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NOT_SET: &str = "Not set";

const SIDE_EFFECT_HEADERS: [&str; 10] = [
    "Patient",
    "Medication",
    "Side Effect",
    "Severity",
    "Intensity",
    "Patient Notes",
    "Doctor Notes",
    "Resolved",
    "Reported Date",
    "Last Updated",
];

const PATIENT_HEADERS: [&str; 11] = [
    "Patient Name",
    "Patient Email",
    "Patient Phone",
    "Age",
    "Gender",
    "Diabetes",
    "Hypertension",
    "Emergency Contact Name",
    "Emergency Contact Relationship",
    "Emergency Contact Phone",
    "Registration Date",
];

const DOCTOR_HEADERS: [&str; 9] = [
    "Name",
    "Email",
    "Phone",
    "Specialization",
    "License",
    "Hospital",
    "Treats Diabetes",
    "Treats Hypertension",
    "Registered Date",
];

pub const DOCTORS_FILE_NAME: &str = "doctors-list.csv";

/// A rendered export ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    pub file_name: String,
    pub content: String,
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn quoted_row<S: AsRef<str>>(cells: &[S]) -> String {
    cells.iter().map(|c| quote(c.as_ref())).collect::<Vec<_>>().join(",")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn or_na(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// `Jan 5, 2024, 09:30 AM` in local time.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %-d, %Y, %I:%M %p").to_string()
}

// ═══════════════════════════════════════════
// Side effects
// ═══════════════════════════════════════════

/// One row per reported side effect. `None` when there is nothing to export.
pub fn side_effects_report<'a, I>(
    medications: I,
    fallback: Option<&FallbackPatient>,
    today: NaiveDate,
) -> Option<CsvFile>
where
    I: IntoIterator<Item = &'a Medication>,
{
    let mut rows = Vec::new();
    for med in medications {
        let patient = patient_name(med.patient_id.as_ref(), fallback);
        for se in &med.experienced_side_effects {
            rows.push(quoted_row(&[
                patient.clone(),
                med.medication_name.clone(),
                se.side_effect_name.clone(),
                se.severity.as_str().to_string(),
                or_na(se.intensity.as_ref().map(|i| i.as_str())),
                or_na(se.notes.as_deref()),
                or_na(se.doctor_notes.as_deref()),
                yes_no(se.resolved).to_string(),
                se.reported_at.map_or_else(|| NOT_SET.to_string(), format_timestamp),
                se.last_updated.map_or_else(|| NOT_AVAILABLE.to_string(), format_timestamp),
            ]));
        }
    }

    if rows.is_empty() {
        tracing::info!("No side effects to export");
        return None;
    }

    tracing::debug!(rows = rows.len(), "Side-effects report built");
    Some(CsvFile {
        file_name: format!("side-effects-report-{}.csv", today.format("%Y-%m-%d")),
        content: join_csv(&SIDE_EFFECT_HEADERS, rows),
    })
}

// ═══════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════

pub fn format_relationship(relationship: &str) -> String {
    match relationship {
        "parent" => "Parent",
        "sibling" => "Sibling",
        "spouse" => "Spouse",
        "friend" => "Friend",
        "other" => "Other",
        other => other,
    }
    .to_string()
}

pub fn patients_export(patients: &[AdminPatient], today: NaiveDate) -> CsvFile {
    let rows = patients
        .iter()
        .map(|p| {
            let age = p
                .birth_date()
                .and_then(|dob| age_on(dob, today))
                .map_or_else(|| NOT_AVAILABLE.to_string(), |a| format!("{a} years"));
            quoted_row(&[
                p.display_name(),
                p.patient_email.clone(),
                p.patient_phone.clone(),
                age,
                or_na(p.gender.as_deref()),
                yes_no(p.diabetes).to_string(),
                yes_no(p.hypertension).to_string(),
                p.emergency_contact_name(),
                format_relationship(&p.relationship),
                p.phone_number.clone(),
                p.created_at.with_timezone(&Local).format("%b %-d, %Y").to_string(),
            ])
        })
        .collect();

    CsvFile {
        file_name: format!("patients_{}.csv", today.format("%Y-%m-%d")),
        content: join_csv(&PATIENT_HEADERS, rows),
    }
}

// ═══════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════

/// `(555) 123-4567` for ten-character numbers, as entered otherwise.
pub fn format_phone(phone: &str) -> String {
    if phone.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    if phone.len() == 10 && phone.is_ascii() {
        return format!("({}) {}-{}", &phone[..3], &phone[3..6], &phone[6..]);
    }
    phone.to_string()
}

pub fn specialization_label(code: &str) -> String {
    match code {
        "general-practice" => "General Practice",
        "endocrinology" => "Endocrinology",
        "cardiology" => "Cardiology",
        "nephrology" => "Nephrology",
        "internal-medicine" => "Internal Medicine",
        "other" => "Other",
        other => other,
    }
    .to_string()
}

pub fn doctors_export(doctors: &[Doctor]) -> CsvFile {
    let rows = doctors
        .iter()
        .map(|d| {
            [
                format!("{} {}", d.first_name, d.last_name),
                d.email.clone(),
                format_phone(&d.phone_number),
                specialization_label(&d.specialization),
                d.license_number.clone(),
                d.hospital.clone(),
                yes_no(d.diabetes).to_string(),
                yes_no(d.hypertension).to_string(),
                d.created_at.with_timezone(&Local).format("%-m/%-d/%Y").to_string(),
            ]
            .join(",")
        })
        .collect();

    CsvFile {
        file_name: DOCTORS_FILE_NAME.to_string(),
        content: join_csv(&DOCTOR_HEADERS, rows),
    }
}

fn join_csv(headers: &[&str], rows: Vec<String>) -> String {
    std::iter::once(headers.join(","))
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::medication::fixtures::medication;
    use crate::models::{MedicationStatus, PartyRef, SideEffectReport};
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn report(name: &str) -> SideEffectReport {
        serde_json::from_value(serde_json::json!({
            "sideEffectName": name,
            "severity": "moderate",
            "notes": "after \"big\" meals"
        }))
        .unwrap()
    }

    #[test]
    fn side_effects_report_rows() {
        let mut med = medication("m1", "Metformin", MedicationStatus::Active);
        med.patient_id = Some(PartyRef::Id("p1".into()));
        med.experienced_side_effects = vec![report("Nausea")];
        let fallback = FallbackPatient {
            id: "p1".into(),
            full_name: "Mary Otieno".into(),
        };

        let file = side_effects_report([&med], Some(&fallback), today()).unwrap();
        assert_eq!(file.file_name, "side-effects-report-2024-02-01.csv");

        let lines: Vec<&str> = file.content.lines().collect();
        assert_eq!(lines[0], SIDE_EFFECT_HEADERS.join(","));
        assert_eq!(
            lines[1],
            r#""Mary Otieno","Metformin","Nausea","moderate","N/A","after ""big"" meals","N/A","No","Not set","N/A""#
        );
    }

    #[test]
    fn empty_report_is_none() {
        let med = medication("m1", "Metformin", MedicationStatus::Active);
        assert!(side_effects_report([&med], None, today()).is_none());
    }

    #[test]
    fn timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 1, 5, 9, 30, 0).unwrap().with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "Jan 5, 2024, 09:30 AM");
    }

    #[test]
    fn patients_export_formats_row() {
        let patient: AdminPatient = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "fullName": "Mary Otieno",
            "firstname": "John",
            "lastname": "Otieno",
            "phoneNumber": "0712345678",
            "relationship": "spouse",
            "dob": "1980-06-15",
            "diabetes": true,
            "createdAt": "2024-01-05T12:00:00Z",
            "patientEmail": "mary@example.com",
            "patientPhone": "0700000000"
        }))
        .unwrap();

        let file = patients_export(&[patient], today());
        assert_eq!(file.file_name, "patients_2024-02-01.csv");
        let row = file.content.lines().nth(1).unwrap();
        assert!(row.starts_with(r#""Mary Otieno","mary@example.com","0700000000","43 years","N/A","Yes","No","John Otieno","Spouse","0712345678","#));
        assert!(row.ends_with(r#""Jan 5, 2024""#));
    }

    #[test]
    fn doctors_export_is_unquoted() {
        let doctor: Doctor = serde_json::from_value(serde_json::json!({
            "firstName": "Amina",
            "lastName": "Wanjiru",
            "email": "amina@example.com",
            "phoneNumber": "5551234567",
            "specialization": "internal-medicine",
            "licenseNumber": "LIC-1",
            "hospital": "Central",
            "hypertension": true,
            "createdAt": "2024-03-09T12:00:00Z"
        }))
        .unwrap();

        let file = doctors_export(&[doctor]);
        assert_eq!(file.file_name, "doctors-list.csv");
        let row = file.content.lines().nth(1).unwrap();
        assert!(row.starts_with("Amina Wanjiru,amina@example.com,(555) 123-4567,Internal Medicine,LIC-1,Central,No,Yes,"));
    }

    #[test]
    fn phone_and_relationship_fallbacks() {
        assert_eq!(format_phone(""), "N/A");
        assert_eq!(format_phone("+254700"), "+254700");
        assert_eq!(format_relationship("cousin"), "cousin");
        assert_eq!(specialization_label("oncology"), "oncology");
    }
}
