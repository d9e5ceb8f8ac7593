//! Core records shared by every assignment stage.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a zone in the study area's zoning system (e.g. an output area code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ZoneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for ZoneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row identifier of an activity. Unique across the activity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub u64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reported travel mode.
///
/// Modes outside the fixed set are kept as [`Mode::Other`]. They never match
/// a travel time and are rejected wherever a mode-specific estimate is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    Car,
    Pt,
    Walk,
    Cycle,
    Other(String),
}

impl Mode {
    pub const SUPPORTED: &'static [&'static str] = &["car", "pt", "walk", "cycle"];

    pub fn as_str(&self) -> &str {
        match self {
            Mode::Car => "car",
            Mode::Pt => "pt",
            Mode::Walk => "walk",
            Mode::Cycle => "cycle",
            Mode::Other(other) => other,
        }
    }

    /// Parses one of the supported modes, failing on anything else.
    pub fn parse_supported(value: &str) -> Result<Self> {
        match Mode::from(value) {
            Mode::Other(value) => Err(Error::UnsupportedMode {
                value,
                allowed: Self::SUPPORTED,
            }),
            mode => Ok(mode),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Mode::Other(_))
    }
}

impl From<&str> for Mode {
    fn from(value: &str) -> Self {
        match value {
            "car" => Mode::Car,
            "pt" => Mode::Pt,
            "walk" => Mode::Walk,
            "cycle" => Mode::Cycle,
            other => Mode::Other(other.to_string()),
        }
    }
}

impl From<String> for Mode {
    fn from(value: String) -> Self {
        Mode::from(value.as_str())
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Part of the day a trip starts in. Public transport travel times vary by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Buckets a start time given in minutes after midnight.
    pub fn from_minutes(minutes: f64) -> Self {
        let minutes = minutes.rem_euclid(1440.0);
        if minutes < 300.0 {
            TimeOfDay::Night
        } else if minutes < 720.0 {
            TimeOfDay::Morning
        } else if minutes < 1080.0 {
            TimeOfDay::Afternoon
        } else {
            TimeOfDay::Evening
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "night",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "night" => Some(TimeOfDay::Night),
            "morning" => Some(TimeOfDay::Morning),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "evening" => Some(TimeOfDay::Evening),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    /// Travel days 1-5 are weekdays, everything else is weekend.
    pub fn from_travel_day(day: u8) -> Self {
        if (1..=5).contains(&day) {
            DayType::Weekday
        } else {
            DayType::Weekend
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayType::Weekday => "wkday",
            DayType::Weekend => "wkend",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wkday" => Some(DayType::Weekday),
            "wkend" => Some(DayType::Weekend),
            _ => None,
        }
    }
}

/// Which activity field is read as the activity category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityColumn {
    /// Trip purpose, e.g. "education".
    Purpose,
    /// Specific category, e.g. "education_university".
    #[default]
    Category,
}

/// One trip of a synthetic person's activity chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub pid: u64,
    pub hid: u64,
    pub seq: u32,
    pub purpose: String,
    #[serde(default, deserialize_with = "crate::io::na_string")]
    pub category: Option<String>,
    pub mode: Mode,
    /// Reported trip duration in minutes.
    pub duration: f64,
    /// Reported travel distance in km.
    #[serde(default, deserialize_with = "crate::io::na_f64")]
    pub distance: Option<f64>,
    /// Trip start in minutes after midnight.
    pub start_time: f64,
    pub travel_day: u8,
    pub origin_zone: ZoneId,
}

impl Activity {
    /// The specific category, falling back to the trip purpose.
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(&self.purpose)
    }

    pub fn column(&self, column: ActivityColumn) -> &str {
        match column {
            ActivityColumn::Purpose => &self.purpose,
            ActivityColumn::Category => self.category(),
        }
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_minutes(self.start_time)
    }

    pub fn day_type(&self) -> DayType {
        DayType::from_travel_day(self.travel_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_minutes(0.0), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_minutes(299.0), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_minutes(300.0), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_minutes(720.0), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_minutes(1100.0), TimeOfDay::Evening);
        // past midnight wraps around
        assert_eq!(TimeOfDay::from_minutes(1500.0), TimeOfDay::Night);
    }

    #[test]
    fn test_day_type() {
        assert_eq!(DayType::from_travel_day(1), DayType::Weekday);
        assert_eq!(DayType::from_travel_day(5), DayType::Weekday);
        assert_eq!(DayType::from_travel_day(6), DayType::Weekend);
        assert_eq!(DayType::from_travel_day(7), DayType::Weekend);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from("pt"), Mode::Pt);
        assert_eq!(Mode::from("taxi"), Mode::Other("taxi".to_string()));
        assert!(Mode::parse_supported("cycle").is_ok());

        let err = Mode::parse_supported("taxi").unwrap_err();
        assert!(err.to_string().contains("taxi"));
    }

    #[test]
    fn test_category_falls_back_to_purpose() {
        let mut activity = Activity {
            id: ActivityId(1),
            pid: 1,
            hid: 1,
            seq: 1,
            purpose: "education".to_string(),
            category: None,
            mode: Mode::Walk,
            duration: 10.0,
            distance: None,
            start_time: 480.0,
            travel_day: 2,
            origin_zone: ZoneId::from("Z1"),
        };
        assert_eq!(activity.column(ActivityColumn::Category), "education");

        activity.category = Some("education_school".to_string());
        assert_eq!(activity.column(ActivityColumn::Category), "education_school");
        assert_eq!(activity.column(ActivityColumn::Purpose), "education");
    }
}
