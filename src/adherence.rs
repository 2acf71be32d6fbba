//! Weekly adherence calendar helpers.
//!
//! Weeks run Sunday to Saturday. The server builds the grid; these helpers
//! pick which week to ask for and re-derive the summary counts from the grid
//! so a mismatch can be spotted.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{DayStatus, MedicationStatus, WeekDay, WeeklyMedication, WeeklySummary};

/// Sunday on or before `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Move a week start forward (`weeks > 0`) or back (`weeks < 0`).
pub fn shift_week(start: NaiveDate, weeks: i64) -> NaiveDate {
    let days = Days::new(weeks.unsigned_abs() * 7);
    let shifted = if weeks >= 0 {
        start.checked_add_days(days)
    } else {
        start.checked_sub_days(days)
    };
    shifted.unwrap_or(start)
}

/// `weekStart` query value.
pub fn week_param(start: NaiveDate) -> String {
    start.format("%Y-%m-%d").to_string()
}

/// The seven calendar columns for the week starting at `start`.
pub fn week_days(start: NaiveDate, today: NaiveDate) -> Vec<WeekDay> {
    start
        .iter_days()
        .take(7)
        .map(|date| WeekDay {
            name: date.format("%A").to_string(),
            date,
            formatted: date.format("%a, %b %-d").to_string(),
            is_today: date == today,
            is_past: date < today,
        })
        .collect()
}

impl WeeklySummary {
    /// Rebuild the counts from the per-day grid.
    pub fn recount(medications: &[WeeklyMedication]) -> Self {
        let mut summary = Self {
            total_medications: medications.len() as u32,
            active_medications: medications
                .iter()
                .filter(|m| m.status == MedicationStatus::Active)
                .count() as u32,
            ..Self::default()
        };

        for entry in medications.iter().flat_map(|m| m.weekly_data.values()) {
            // Stopped courses keep the taken flag under a `stopped` status.
            if entry.taken {
                summary.taken_this_week += 1;
                continue;
            }
            match entry.status {
                DayStatus::Missed => summary.missed_this_week += 1,
                DayStatus::Pending if !entry.is_past => summary.pending_this_week += 1,
                DayStatus::Taken | DayStatus::Pending | DayStatus::Stopped => {}
            }
        }
        summary
    }

    /// Share of due doses that were taken, `None` when nothing was due yet.
    pub fn adherence_rate(&self) -> Option<f64> {
        let due = self.taken_this_week + self.missed_this_week;
        (due > 0).then(|| f64::from(self.taken_this_week) / f64::from(due))
    }

    /// Whole-percent rendering of [`Self::adherence_rate`].
    pub fn adherence_percent(&self) -> Option<u32> {
        self.adherence_rate().map(|rate| (rate * 100.0).round() as u32)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::DayEntry;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(status: DayStatus, is_past: bool) -> DayEntry {
        DayEntry {
            taken: status == DayStatus::Taken,
            status,
            taken_time: None,
            is_today: false,
            is_past,
        }
    }

    fn weekly(status: MedicationStatus, days: Vec<(NaiveDate, DayEntry)>) -> WeeklyMedication {
        WeeklyMedication {
            medication_id: "m1".into(),
            medication_name: "Amlodipine".into(),
            dosage: "5mg".into(),
            frequency: "daily".into(),
            status,
            patient_allergies: Vec::new(),
            experienced_side_effects: Vec::new(),
            weekly_data: days.into_iter().collect::<BTreeMap<_, _>>(),
            prescribed_by: None,
        }
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-01-10 is a Wednesday
        assert_eq!(week_start_for(date(2024, 1, 10)), date(2024, 1, 7));
        assert_eq!(week_start_for(date(2024, 1, 7)), date(2024, 1, 7));
        assert_eq!(week_start_for(date(2024, 1, 13)), date(2024, 1, 7));
    }

    #[test]
    fn shifting_weeks() {
        let start = date(2024, 1, 7);
        assert_eq!(shift_week(start, 1), date(2024, 1, 14));
        assert_eq!(shift_week(start, -2), date(2023, 12, 24));
        assert_eq!(shift_week(start, 0), start);
        assert_eq!(week_param(start), "2024-01-07");
    }

    #[test]
    fn week_days_flag_today_and_past() {
        let days = week_days(date(2024, 1, 7), date(2024, 1, 9));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].name, "Sunday");
        assert_eq!(days[0].formatted, "Sun, Jan 7");
        assert!(days[1].is_past);
        assert!(days[2].is_today);
        assert!(!days[2].is_past);
        assert!(!days[6].is_past);
    }

    #[test]
    fn recount_ignores_past_pending() {
        let meds = vec![
            weekly(
                MedicationStatus::Active,
                vec![
                    (date(2024, 1, 7), entry(DayStatus::Taken, true)),
                    (date(2024, 1, 8), entry(DayStatus::Missed, true)),
                    (date(2024, 1, 9), entry(DayStatus::Pending, true)),
                    (date(2024, 1, 10), entry(DayStatus::Pending, false)),
                ],
            ),
            weekly(
                MedicationStatus::Stopped,
                vec![(date(2024, 1, 7), entry(DayStatus::Stopped, true))],
            ),
        ];

        let summary = WeeklySummary::recount(&meds);
        assert_eq!(summary.total_medications, 2);
        assert_eq!(summary.active_medications, 1);
        assert_eq!(summary.taken_this_week, 1);
        assert_eq!(summary.missed_this_week, 1);
        assert_eq!(summary.pending_this_week, 1);
        assert_eq!(summary.adherence_percent(), Some(50));
    }

    #[test]
    fn recount_keeps_doses_taken_before_a_stop() {
        let taken_then_stopped = DayEntry {
            taken: true,
            ..entry(DayStatus::Stopped, true)
        };
        let meds = vec![weekly(
            MedicationStatus::Stopped,
            vec![
                (date(2024, 1, 7), taken_then_stopped),
                (date(2024, 1, 8), entry(DayStatus::Stopped, true)),
            ],
        )];

        let summary = WeeklySummary::recount(&meds);
        assert_eq!(summary.taken_this_week, 1);
        assert_eq!(summary.missed_this_week, 0);
        assert_eq!(summary.active_medications, 0);
    }

    #[test]
    fn no_due_doses_means_no_rate() {
        assert_eq!(WeeklySummary::default().adherence_rate(), None);
    }
}
