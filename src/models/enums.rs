use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ModelError::InvalidEnum {
                    field: stringify!($name).into(),
                    value: s.into(),
                })
            }
        }
    };
}

str_enum!(MetricStatus {
    Low => "Low",
    Normal => "Normal",
    High => "High",
    Unknown => "Unknown",
});

str_enum!(BloodPressureCategory {
    Normal => "Normal",
    Prehypertension => "Prehypertension",
    Hypertension => "Hypertension",
});

str_enum!(MatchSource {
    Table => "table",
    FreeText => "free_text",
    Summary => "summary",
});

str_enum!(RiskLevel {
    Ok => "ok",
    Caution => "caution",
    Alert => "alert",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn metric_status_round_trip() {
        for (variant, s) in [
            (MetricStatus::Low, "Low"),
            (MetricStatus::Normal, "Normal"),
            (MetricStatus::High, "High"),
            (MetricStatus::Unknown, "Unknown"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(MetricStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn metric_status_parse_is_case_insensitive() {
        assert_eq!(MetricStatus::from_str("high").unwrap(), MetricStatus::High);
        assert_eq!(MetricStatus::from_str(" NORMAL ").unwrap(), MetricStatus::Normal);
    }

    #[test]
    fn blood_pressure_category_round_trip() {
        for (variant, s) in [
            (BloodPressureCategory::Normal, "Normal"),
            (BloodPressureCategory::Prehypertension, "Prehypertension"),
            (BloodPressureCategory::Hypertension, "Hypertension"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(BloodPressureCategory::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(MetricStatus::from_str("borderline").is_err());
        assert!(RiskLevel::from_str("").is_err());
        assert!(MatchSource::from_str("ocr").is_err());
    }
}
