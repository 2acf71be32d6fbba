use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{DayStatus, MedicationStatus};
use super::medication::{Allergy, PartyRef};
use super::side_effect::SideEffectReport;

/// One column of the weekly adherence calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekDay {
    pub name: String,
    pub date: NaiveDate,
    pub formatted: String,
    pub is_today: bool,
    pub is_past: bool,
}

/// One cell of the weekly adherence calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub taken: bool,
    pub status: DayStatus,
    pub taken_time: Option<String>,
    pub is_today: bool,
    pub is_past: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyMedication {
    pub medication_id: String,
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    pub status: MedicationStatus,
    #[serde(default)]
    pub patient_allergies: Vec<Allergy>,
    #[serde(default)]
    pub experienced_side_effects: Vec<SideEffectReport>,
    pub weekly_data: BTreeMap<NaiveDate, DayEntry>,
    pub prescribed_by: Option<PartyRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub total_medications: u32,
    pub active_medications: u32,
    pub taken_this_week: u32,
    pub missed_this_week: u32,
    pub pending_this_week: u32,
}

/// Payload of `GET /weekly-adherence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyAdherence {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub week_days: Vec<WeekDay>,
    pub medications: Vec<WeeklyMedication>,
    pub summary: WeeklySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_payload_deserializes_with_date_keys() {
        let json = r#"{
            "weekStart": "2024-01-07T00:00:00.000Z",
            "weekEnd": "2024-01-13T23:59:59.999Z",
            "weekDays": [
                {"name": "Sunday", "date": "2024-01-07", "formatted": "Sun, Jan 7",
                 "isToday": false, "isPast": true}
            ],
            "medications": [{
                "medicationId": "m1",
                "medicationName": "Amlodipine",
                "status": "active",
                "weeklyData": {
                    "2024-01-07": {"taken": true, "status": "taken", "takenTime": "08:05",
                                   "isToday": false, "isPast": true}
                }
            }],
            "summary": {"totalMedications": 1, "activeMedications": 1,
                        "takenThisWeek": 1, "missedThisWeek": 0, "pendingThisWeek": 6}
        }"#;

        let weekly: WeeklyAdherence = serde_json::from_str(json).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(weekly.week_days[0].date, day);
        let entry = &weekly.medications[0].weekly_data[&day];
        assert_eq!(entry.status, DayStatus::Taken);
        assert_eq!(weekly.summary.pending_this_week, 6);
    }
}
