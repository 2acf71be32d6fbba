//! Display classifiers for vital signs shown on the dashboards.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Patients this old get the relaxed "normal" threshold.
pub const SENIOR_AGE: u32 = 65;

/// Blood-pressure category for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BpCategory {
    Low,
    Normal,
    /// Normal by the 65+ threshold only.
    NormalAgeAdjusted,
    Elevated,
    Stage1,
    Stage2,
    HypertensiveCrisis,
}

impl BpCategory {
    pub fn classify(systolic: u32, diastolic: u32, age: Option<u32>) -> Self {
        if systolic < 90 || diastolic < 60 {
            return Self::Low;
        }
        match age {
            Some(age) if age >= SENIOR_AGE => {
                if systolic < 150 && diastolic < 90 {
                    return Self::NormalAgeAdjusted;
                }
            }
            _ => {
                if systolic < 120 && diastolic < 80 {
                    return Self::Normal;
                }
            }
        }

        if systolic >= 180 || diastolic >= 120 {
            Self::HypertensiveCrisis
        } else if systolic < 130 && diastolic < 80 {
            Self::Elevated
        } else if systolic < 140 && diastolic < 90 {
            Self::Stage1
        } else {
            Self::Stage2
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Blood Pressure",
            Self::Normal => "Normal",
            Self::NormalAgeAdjusted => "Normal (Age Adjusted)",
            Self::Elevated => "Elevated",
            Self::Stage1 => "Stage 1 Hypertension",
            Self::Stage2 => "Stage 2 Hypertension",
            Self::HypertensiveCrisis => "Hypertensive Crisis",
        }
    }

    /// Whether the dashboard should offer to contact the care team.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Stage1 | Self::Stage2 | Self::HypertensiveCrisis)
    }
}

/// Latest readings behind the relative dashboard's status pill.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VitalsSnapshot {
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
    pub glucose: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    High,
    Low,
    Normal,
    NoData,
}

impl HealthStatus {
    /// Blood pressure wins over glucose when both are present.
    pub fn from_snapshot(snapshot: &VitalsSnapshot) -> Self {
        if let (Some(sys), Some(dia)) = (snapshot.systolic, snapshot.diastolic) {
            return if sys > 140 || dia > 90 {
                Self::High
            } else if sys < 90 || dia < 60 {
                Self::Low
            } else {
                Self::Normal
            };
        }
        match snapshot.glucose {
            Some(g) if g > 180.0 => Self::High,
            Some(g) if g < 70.0 => Self::Low,
            Some(_) => Self::Normal,
            None => Self::NoData,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::NoData => "No Data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn for_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// BMI from kilograms and centimetres, one decimal place.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if !(weight_kg > 0.0 && height_cm > 0.0) {
        return None;
    }
    let metres = height_cm / 100.0;
    Some((weight_kg / (metres * metres) * 10.0).round() / 10.0)
}

/// Completed years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
