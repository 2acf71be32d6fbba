//! Patient dashboard snapshot: today's list and the weekly grid, fetched
//! side by side.

use chrono::NaiveDate;

use crate::api::{ApiError, CareApiClient};
use crate::models::{Medication, WeeklyAdherence};

/// Both halves of the dashboard. Each succeeds or fails on its own.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub today: Result<Vec<Medication>, ApiError>,
    pub weekly: Result<WeeklyAdherence, ApiError>,
}

/// Fetch today's medications and the week starting `week_start`
/// concurrently.
pub fn fetch_dashboard(api: &CareApiClient, week_start: NaiveDate) -> DashboardSnapshot {
    let (today, weekly) = std::thread::scope(|s| {
        let weekly = s.spawn(|| api.weekly_adherence(week_start));
        let today = api.today_medications();
        let weekly = weekly
            .join()
            .unwrap_or_else(|_| Err(ApiError::HttpClient("weekly adherence worker panicked".into())));
        (today, weekly)
    });

    if let Err(e) = &today {
        tracing::warn!(error = %e, "Today's medications unavailable");
    }
    if let Err(e) = &weekly {
        tracing::warn!(error = %e, "Weekly adherence unavailable");
    }
    DashboardSnapshot { today, weekly }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::tests::{medication_json, signed_in};
    use crate::api::{Method, MockTransport};
    use serde_json::json;

    #[test]
    fn one_failure_keeps_the_other_half() {
        let mock = MockTransport::new()
            .respond(
                Method::Get,
                "/api/medications/reminders/today",
                200,
                json!({"success": true, "data": [medication_json("m1", "Losartan", "active")]}),
            )
            .respond(
                Method::Get,
                "/api/medications/reminders/weekly-adherence",
                500,
                json!({"success": false, "message": "Failed to fetch weekly adherence"}),
            );
        let api = CareApiClient::new(Box::new(mock), signed_in());

        let snapshot = fetch_dashboard(&api, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(snapshot.today.unwrap().len(), 1);
        assert!(matches!(snapshot.weekly, Err(ApiError::Server { status: 500, .. })));
    }
}
