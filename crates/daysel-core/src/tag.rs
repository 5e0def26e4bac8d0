use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

pub const MAX_CUSTOM_HOURS: f64 = 24.0;

/// Whether intervals are counted in days or in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarMode {
    #[default]
    Days,
    Hours,
}

impl CalendarMode {
    /// Types offered in this mode. The first one is the default.
    pub fn types(self) -> &'static [ModeType] {
        match self {
            CalendarMode::Days => &[
                ModeType::FullDay,
                ModeType::OnlyMorning,
                ModeType::OnlyAfternoon,
            ],
            CalendarMode::Hours => &[
                ModeType::FullHours,
                ModeType::HalfHours,
                ModeType::CustomHours,
            ],
        }
    }

    pub fn default_type(self) -> ModeType {
        match self {
            CalendarMode::Days => ModeType::FullDay,
            CalendarMode::Hours => ModeType::FullHours,
        }
    }
}

impl FromStr for CalendarMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" => Ok(CalendarMode::Days),
            "hours" => Ok(CalendarMode::Hours),
            other => Err(anyhow!("unknown calendar mode: {other} (expected days or hours)")),
        }
    }
}

/// How an interval is displayed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeType {
    #[default]
    FullDay,
    OnlyMorning,
    OnlyAfternoon,
    FullHours,
    HalfHours,
    CustomHours,
}

impl ModeType {
    pub const ALL: [ModeType; 6] = [
        ModeType::FullDay,
        ModeType::OnlyMorning,
        ModeType::OnlyAfternoon,
        ModeType::FullHours,
        ModeType::HalfHours,
        ModeType::CustomHours,
    ];

    pub fn mode(self) -> CalendarMode {
        match self {
            ModeType::FullDay | ModeType::OnlyMorning | ModeType::OnlyAfternoon => {
                CalendarMode::Days
            }
            ModeType::FullHours | ModeType::HalfHours | ModeType::CustomHours => {
                CalendarMode::Hours
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModeType::FullDay => "FULL_DAY",
            ModeType::OnlyMorning => "ONLY_MORNING",
            ModeType::OnlyAfternoon => "ONLY_AFTERNOON",
            ModeType::FullHours => "FULL_HOURS",
            ModeType::HalfHours => "HALF_HOURS",
            ModeType::CustomHours => "CUSTOM_HOURS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModeType::FullDay => "full day",
            ModeType::OnlyMorning => "morning",
            ModeType::OnlyAfternoon => "afternoon",
            ModeType::FullHours => "full day (hours)",
            ModeType::HalfHours => "half day (hours)",
            ModeType::CustomHours => "custom hours",
        }
    }
}

impl fmt::Display for ModeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ModeType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow!("unknown interval type: {s}"))
    }
}

/// Display classification carried by an interval. Opaque to merging.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "IntervalTagRecord")]
pub struct IntervalTag {
    pub kind: ModeType,

    /// Only meaningful for [`ModeType::CustomHours`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_hours: Option<f64>,
}

#[derive(Deserialize)]
struct IntervalTagRecord {
    kind: ModeType,
    #[serde(default)]
    custom_hours: Option<f64>,
}

impl TryFrom<IntervalTagRecord> for IntervalTag {
    type Error = CalendarError;

    fn try_from(record: IntervalTagRecord) -> Result<Self, Self::Error> {
        match (record.kind, record.custom_hours) {
            (ModeType::CustomHours, Some(hours)) => IntervalTag::custom(hours),
            (ModeType::CustomHours, None) => Err(CalendarError::InvalidCustomHours(
                "missing for CUSTOM_HOURS".to_string(),
            )),
            (kind, None) => Ok(IntervalTag::new(kind)),
            (kind, Some(hours)) => Err(CalendarError::InvalidCustomHours(format!(
                "{hours} given for {kind}"
            ))),
        }
    }
}

impl IntervalTag {
    pub const fn new(kind: ModeType) -> Self {
        Self {
            kind,
            custom_hours: None,
        }
    }

    pub fn custom(hours: f64) -> Result<Self, CalendarError> {
        if !hours.is_finite() || !(0.0..=MAX_CUSTOM_HOURS).contains(&hours) {
            return Err(CalendarError::InvalidCustomHours(hours.to_string()));
        }
        Ok(Self {
            kind: ModeType::CustomHours,
            custom_hours: Some(hours),
        })
    }

    pub fn label(&self) -> String {
        match (self.kind, self.custom_hours) {
            (ModeType::CustomHours, Some(hours)) => format!("{} ({hours}h)", self.kind.label()),
            (kind, _) => kind.label().to_string(),
        }
    }
}

impl fmt::Display for IntervalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.custom_hours) {
            (ModeType::CustomHours, Some(hours)) => write!(f, "{}:{hours}", self.kind),
            (kind, _) => write!(f, "{kind}"),
        }
    }
}

/// Parses user input for a custom number of hours: a plain decimal no
/// greater than 24.
pub fn parse_custom_hours(raw: &str) -> Result<f64, CalendarError> {
    let trimmed = raw.trim();
    let re = Regex::new(r"^\d+(\.\d+)?$")
        .map_err(|e| CalendarError::InvalidCustomHours(format!("{trimmed} ({e})")))?;
    if !re.is_match(trimmed) {
        return Err(CalendarError::InvalidCustomHours(trimmed.to_string()));
    }

    let hours: f64 = trimmed
        .parse()
        .map_err(|_| CalendarError::InvalidCustomHours(trimmed.to_string()))?;
    if hours > MAX_CUSTOM_HOURS {
        return Err(CalendarError::InvalidCustomHours(trimmed.to_string()));
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_hours_accepts_decimals_up_to_a_day() {
        assert_eq!(parse_custom_hours("7.5"), Ok(7.5));
        assert_eq!(parse_custom_hours(" 24 "), Ok(24.0));
        assert_eq!(parse_custom_hours("0"), Ok(0.0));
    }

    #[test]
    fn custom_hours_rejects_malformed_input() {
        for raw in ["", "-1", "24.5", "1e3", "7.", ".5", "seven"] {
            assert!(
                matches!(
                    parse_custom_hours(raw),
                    Err(CalendarError::InvalidCustomHours(_))
                ),
                "{raw:?} should be rejected"
            );
        }
        assert!(IntervalTag::custom(25.0).is_err());
        assert!(IntervalTag::custom(f64::NAN).is_err());
    }

    #[test]
    fn mode_types_follow_their_mode() {
        assert_eq!(CalendarMode::Days.default_type(), ModeType::FullDay);
        assert_eq!(CalendarMode::Hours.default_type(), ModeType::FullHours);
        for mode in [CalendarMode::Days, CalendarMode::Hours] {
            assert!(mode.types().iter().all(|kind| kind.mode() == mode));
            assert_eq!(mode.types()[0], mode.default_type());
        }
    }

    #[test]
    fn mode_type_parsing_is_lenient_about_case_and_dashes() {
        assert_eq!("only-morning".parse::<ModeType>().ok(), Some(ModeType::OnlyMorning));
        assert_eq!("HALF_HOURS".parse::<ModeType>().ok(), Some(ModeType::HalfHours));
        assert!("weekly".parse::<ModeType>().is_err());
    }

    #[test]
    fn tag_serializes_with_screaming_type_names() {
        let tag = IntervalTag::custom(3.5).expect("valid hours");
        let json = serde_json::to_string(&tag).expect("serialize tag");
        assert_eq!(json, r#"{"kind":"CUSTOM_HOURS","custom_hours":3.5}"#);

        let plain: IntervalTag =
            serde_json::from_str(r#"{"kind":"ONLY_AFTERNOON"}"#).expect("deserialize tag");
        assert_eq!(plain, IntervalTag::new(ModeType::OnlyAfternoon));
    }

    #[test]
    fn deserialized_tags_are_validated() {
        for json in [
            r#"{"kind":"CUSTOM_HOURS","custom_hours":-40.0}"#,
            r#"{"kind":"CUSTOM_HOURS","custom_hours":24.5}"#,
            r#"{"kind":"CUSTOM_HOURS"}"#,
            r#"{"kind":"FULL_DAY","custom_hours":99.0}"#,
        ] {
            assert!(
                serde_json::from_str::<IntervalTag>(json).is_err(),
                "{json} should be rejected"
            );
        }

        let tag: IntervalTag =
            serde_json::from_str(r#"{"kind":"CUSTOM_HOURS","custom_hours":24}"#)
                .expect("deserialize custom tag");
        assert_eq!(tag, IntervalTag::custom(24.0).expect("valid hours"));
    }
}
