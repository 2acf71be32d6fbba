use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Serde goes through the same strings so the wire format matches the backend.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(MedicationStatus {
    Active => "active",
    Completed => "completed",
    Stopped => "stopped",
    Cancelled => "cancelled",
    Missed => "missed",
});

str_enum!(DayStatus {
    Pending => "pending",
    Taken => "taken",
    Missed => "missed",
    Stopped => "stopped",
});

str_enum!(AdherenceStatus {
    Taken => "taken",
    Missed => "missed",
    Stopped => "stopped",
});

str_enum!(Severity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
});

str_enum!(Intensity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    VerySevere => "very severe",
});

str_enum!(PotentialSeverity {
    Common => "common",
    Uncommon => "uncommon",
    Rare => "rare",
});

str_enum!(MissReason {
    Forgot => "forgot",
    NotAvailable => "not_available",
    SideEffects => "side_effects",
    FeltBetter => "felt_better",
    Other => "other",
});

str_enum!(StopReason {
    SideEffects => "side_effects",
    FeelingBetter => "feeling_better",
    ForgotToTake => "forgot_to_take",
    TooExpensive => "too_expensive",
    DoctorAdvised => "doctor_advised",
    Other => "other",
});

str_enum!(AccessLevel {
    ViewOnly => "view_only",
    Caretaker => "caretaker",
    EmergencyOnly => "emergency_only",
});

str_enum!(Disease {
    Diabetes => "diabetes",
    Hypertension => "hypertension",
});

impl MissReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forgot => "Forgot to take",
            Self::NotAvailable => "Medication not available",
            Self::SideEffects => "Due to side effects",
            Self::FeltBetter => "Felt better",
            Self::Other => "Other",
        }
    }
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SideEffects => "Side effects",
            Self::FeelingBetter => "Feeling better",
            Self::ForgotToTake => "Forgot to take",
            Self::TooExpensive => "Too expensive",
            Self::DoctorAdvised => "Doctor advised",
            Self::Other => "Other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn medication_status_round_trip() {
        for (variant, s) in [
            (MedicationStatus::Active, "active"),
            (MedicationStatus::Completed, "completed"),
            (MedicationStatus::Stopped, "stopped"),
            (MedicationStatus::Cancelled, "cancelled"),
            (MedicationStatus::Missed, "missed"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(MedicationStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn intensity_keeps_space_in_wire_value() {
        let json = serde_json::to_string(&Intensity::VerySevere).unwrap();
        assert_eq!(json, "\"very severe\"");
        let back: Intensity = serde_json::from_str("\"very severe\"").unwrap();
        assert_eq!(back, Intensity::VerySevere);
    }

    #[test]
    fn reason_codes_match_dialog_values() {
        let miss: Vec<&str> = MissReason::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            miss,
            ["forgot", "not_available", "side_effects", "felt_better", "other"]
        );
        let stop: Vec<&str> = StopReason::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            stop,
            [
                "side_effects",
                "feeling_better",
                "forgot_to_take",
                "too_expensive",
                "doctor_advised",
                "other"
            ]
        );
    }

    #[test]
    fn deserialize_unknown_value_fails() {
        let err = serde_json::from_str::<MedicationStatus>("\"paused\"").unwrap_err();
        assert!(err.to_string().contains("MedicationStatus"));
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(DayStatus::from_str("later").is_err());
        assert!(Severity::from_str("").is_err());
        assert_eq!(
            AccessLevel::from_str("admin").unwrap_err(),
            ModelError::InvalidEnum {
                field: "AccessLevel".into(),
                value: "admin".into()
            }
        );
    }
}
