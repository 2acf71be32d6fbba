use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};

use carelink_lib::adherence::{shift_week, week_start_for};
use carelink_lib::api::ApiError;
use carelink_lib::board::{next_dose, MedicationBoard};
use carelink_lib::config::{ApiConfig, ConfigError};
use carelink_lib::doctor::DoctorReview;
use carelink_lib::export::side_effects_report;
use carelink_lib::lifecycle::{ActionError, MedicationAction};
use carelink_lib::models::{Intensity, MissReason, StopReason};
use carelink_lib::timing::timing_today;

#[derive(Parser, Debug)]
#[command(name = "carelink")]
#[command(version)]
#[command(about = "Medication schedule and adherence client")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show end date and days left for a course
    Timing {
        #[arg(value_name = "START_DATE")]
        start_date: String,
        #[arg(value_name = "DURATION")]
        duration: String,
    },
    /// Sign in and keep the session for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CARELINK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the saved session
    Logout,
    /// List today's medications
    Today,
    /// Weekly adherence summary
    Week {
        /// Weeks relative to the current one (-1 is last week)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i64,
    },
    /// Record a dose as taken
    Take {
        #[arg(value_name = "MEDICATION_ID")]
        id: String,
    },
    /// Record a missed dose
    Miss {
        #[arg(value_name = "MEDICATION_ID")]
        id: String,
        #[arg(long)]
        reason: MissReason,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Stop taking a medication
    Stop {
        #[arg(value_name = "MEDICATION_ID")]
        id: String,
        #[arg(long)]
        reason: StopReason,
        #[arg(long, default_value = "")]
        notes: String,
        /// Intensity applied to already reported side effects
        #[arg(long)]
        intensity: Option<Intensity>,
    },
    /// Resume a stopped medication
    Restart {
        #[arg(value_name = "MEDICATION_ID")]
        id: String,
        /// Confirm the restart
        #[arg(long)]
        yes: bool,
    },
    /// Write the side-effects report for one patient as CSV
    ExportSideEffects {
        #[arg(long, value_name = "PATIENT_ID")]
        patient: String,
        #[arg(long, default_value = "")]
        patient_name: String,
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("{0}")]
    Refresh(String),
    #[error("Cannot write export: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    carelink_lib::init_tracing();

    let args = CliArgs::parse();
    if let Err(e) = run(args.command) {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", user_facing(&e));
        std::process::exit(1);
    }
}

fn user_facing(err: &CliError) -> String {
    match err {
        CliError::Api(e) | CliError::Action(ActionError::Api(e)) => e.user_message(),
        other => other.to_string(),
    }
}

fn run(command: Command) -> Result<(), CliError> {
    if let Command::Timing { start_date, duration } = &command {
        let timing = timing_today(start_date, duration);
        match timing.total_days {
            Some(days) => println!("Course:    {days} days"),
            None => println!("Course:    open-ended"),
        }
        println!("Ends:      {}", timing.end_date_label());
        println!("Remaining: {}", timing.remaining_label());
        return Ok(());
    }

    let config = ApiConfig::from_env()?;
    let api = carelink_lib::connect(&config)?;

    match command {
        Command::Timing { .. } => {}
        Command::Login { email, password } => {
            let user = api.login(&email, &password)?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            api.logout()?;
            println!("Signed out");
        }
        Command::Today => {
            let board = load_board(&api)?;
            let now = Local::now();
            for med in board.medications() {
                let timing = med.timing(now);
                let next = next_dose(&med.reminders, now.time()).unwrap_or("-");
                println!(
                    "{:<26} {:<22} {:<9} next {:<6} {}  [{}]",
                    med.medication_name,
                    format!("{} {}", med.dosage, med.frequency),
                    med.status.as_str(),
                    next,
                    timing.remaining_label(),
                    med.id
                );
            }
            let allergies = board.allergies();
            if !allergies.is_empty() {
                println!("Allergies: {}", allergies.join(", "));
            }
        }
        Command::Week { offset } => {
            let start = shift_week(week_start_for(Local::now().date_naive()), offset);
            let week = api.weekly_adherence(start)?;
            let summary = week.summary;
            println!("Week of {}", start.format("%b %-d, %Y"));
            println!(
                "Taken {}  Missed {}  Pending {}",
                summary.taken_this_week, summary.missed_this_week, summary.pending_this_week
            );
            if let Some(percent) = summary.adherence_percent() {
                println!("Adherence {percent}%");
            }
        }
        Command::Take { id } => act(&api, &id, MedicationAction::MarkTaken, false)?,
        Command::Miss { id, reason, notes } => {
            act(&api, &id, MedicationAction::MarkMissed { reason, notes }, false)?
        }
        Command::Stop {
            id,
            reason,
            notes,
            intensity,
        } => act(
            &api,
            &id,
            MedicationAction::Stop {
                reason,
                notes,
                side_effects_intensity: intensity,
            },
            false,
        )?,
        Command::Restart { id, yes } => act(&api, &id, MedicationAction::Restart, yes)?,
        Command::ExportSideEffects {
            patient,
            patient_name,
            out_dir,
        } => {
            let review = load_review(&api, &patient, &patient_name)?;
            match side_effects_report(review.medications(), review.fallback_patient(), Utc::now().date_naive()) {
                Some(file) => {
                    let path = out_dir.join(&file.file_name);
                    std::fs::write(&path, file.content)?;
                    println!("Wrote {}", path.display());
                }
                None => println!("No side effects data to export"),
            }
        }
    }
    Ok(())
}

fn load_board(api: &carelink_lib::api::CareApiClient) -> Result<MedicationBoard, CliError> {
    let mut board = MedicationBoard::new();
    board.refresh(api);
    if board.needs_login() {
        return Err(ApiError::NotAuthenticated.into());
    }
    if let Some(message) = board.access_denied() {
        return Err(CliError::Refresh(message.to_string()));
    }
    if let Some(banner) = board.banner() {
        return Err(CliError::Refresh(banner.message.clone()));
    }
    Ok(board)
}

fn load_review(
    api: &carelink_lib::api::CareApiClient,
    patient_id: &str,
    patient_name: &str,
) -> Result<DoctorReview, CliError> {
    let mut review = DoctorReview::for_patient(patient_id, patient_name);
    review.refresh(api);
    if review.needs_login() {
        return Err(ApiError::NotAuthenticated.into());
    }
    if let Some(message) = review.access_denied() {
        return Err(CliError::Refresh(message.to_string()));
    }
    if let Some(banner) = review.banner() {
        return Err(CliError::Refresh(banner.message.clone()));
    }
    Ok(review)
}

fn act(
    api: &carelink_lib::api::CareApiClient,
    id: &str,
    action: MedicationAction,
    confirmed: bool,
) -> Result<(), CliError> {
    let mut board = load_board(api)?;
    let ack = board.dispatch(api, id, action, confirmed)?;
    println!("{}", ack.message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use carelink_lib::api::{CareApiClient, MockTransport};
    use carelink_lib::session::SessionStore;

    fn signed_out() -> CareApiClient {
        CareApiClient::new(Box::new(MockTransport::new()), Arc::new(SessionStore::new()))
    }

    #[test]
    fn export_without_session_asks_for_login() {
        let err = load_review(&signed_out(), "p1", "Mary Otieno").unwrap_err();
        assert!(matches!(err, CliError::Api(ApiError::NotAuthenticated)));
    }

    #[test]
    fn board_without_session_asks_for_login() {
        let err = load_board(&signed_out()).unwrap_err();
        assert!(matches!(err, CliError::Api(ApiError::NotAuthenticated)));
    }
}
