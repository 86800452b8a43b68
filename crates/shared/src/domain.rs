use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const ANONYMOUS_PARTICIPANT: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Warm,
    Cold,
}

impl Condition {
    pub const ALL: [Condition; 2] = [Condition::Warm, Condition::Cold];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Warm => "warm",
            Condition::Cold => "cold",
        }
    }

    /// Human-facing description shown when the condition is revealed.
    pub fn label(self) -> &'static str {
        match self {
            Condition::Warm => "Warm (Friendly)",
            Condition::Cold => "Cold (Neutral)",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Consent,
    Demographics,
    Video,
    Rating,
    Awareness,
    Debrief,
}

impl Screen {
    pub const ORDER: [Screen; 6] = [
        Screen::Consent,
        Screen::Demographics,
        Screen::Video,
        Screen::Rating,
        Screen::Awareness,
        Screen::Debrief,
    ];

    /// The screen a successful forward transition lands on. `None` for the
    /// terminal debrief screen.
    pub fn next(self) -> Option<Screen> {
        match self {
            Screen::Consent => Some(Screen::Demographics),
            Screen::Demographics => Some(Screen::Video),
            Screen::Video => Some(Screen::Rating),
            Screen::Rating => Some(Screen::Awareness),
            Screen::Awareness => Some(Screen::Debrief),
            Screen::Debrief => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Consent => "consent",
            Screen::Demographics => "demographics",
            Screen::Video => "video",
            Screen::Rating => "rating",
            Screen::Awareness => "awareness",
            Screen::Debrief => "debrief",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingDimension {
    Likability,
    Visual,
    Mannerisms,
    Voice,
}

impl RatingDimension {
    pub const ALL: [RatingDimension; 4] = [
        RatingDimension::Likability,
        RatingDimension::Visual,
        RatingDimension::Mannerisms,
        RatingDimension::Voice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RatingDimension::Likability => "likability",
            RatingDimension::Visual => "visual",
            RatingDimension::Mannerisms => "mannerisms",
            RatingDimension::Voice => "voice",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RatingDimension::Likability => "Overall Likability",
            RatingDimension::Visual => "Visual Design",
            RatingDimension::Mannerisms => "Mannerisms",
            RatingDimension::Voice => "Voice Quality",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            RatingDimension::Likability => "Overall, how much did you like the AI instructor?",
            RatingDimension::Visual => "How visually appealing was the instructor's appearance?",
            RatingDimension::Mannerisms => "How engaging were the instructor's mannerisms?",
            RatingDimension::Voice => "How natural did the instructor's voice sound?",
        }
    }
}

impl fmt::Display for RatingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rating dimension `{0}`")]
pub struct UnknownDimension(pub String);

impl FromStr for RatingDimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        RatingDimension::ALL
            .into_iter()
            .find(|dimension| dimension.as_str().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownDimension(key.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingScoreError {
    #[error("`{0}` is not an integer")]
    NotAnInteger(String),
    #[error("{0} is outside the 1-8 scale")]
    OutOfRange(i64),
}

/// One point on the 8-point Likert scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatingScore(u8);

impl RatingScore {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    fn from_i64(value: i64) -> Result<Self, RatingScoreError> {
        u8::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(RatingScoreError::OutOfRange(value))
    }
}

impl FromStr for RatingScore {
    type Err = RatingScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<i64>()
            .map_err(|_| RatingScoreError::NotAnInteger(trimmed.to_string()))?;
        Self::from_i64(value)
    }
}

impl fmt::Display for RatingScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RatingScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

// Browser exports stored the selected radio value as a string ("6"), so both
// spellings are accepted on the way in.
impl<'de> Deserialize<'de> for RatingScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(value) => RatingScore::from_i64(value).map_err(de::Error::custom),
            Raw::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

pub type Ratings = BTreeMap<RatingDimension, RatingScore>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub age: String,
    pub gender: String,
    pub ai_familiarity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticedCondition {
    Yes,
    No,
    Unsure,
}

impl FromStr for NoticedCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(NoticedCondition::Yes),
            "no" | "n" => Ok(NoticedCondition::No),
            "unsure" | "not-sure" | "not sure" => Ok(NoticedCondition::Unsure),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Awareness {
    pub influence_question: String,
    #[serde(default)]
    pub awareness_text: String,
    pub noticed_condition: NoticedCondition,
}

/// Everything collected for one participant. Sections stay `None` (or empty
/// for ratings) until their screen is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub participant_id: String,
    #[serde(default)]
    pub demographics: Option<Demographics>,
    pub condition: Condition,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub awareness: Option<Awareness>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(condition: Condition, start_time: DateTime<Utc>) -> Self {
        Self {
            participant_id: ANONYMOUS_PARTICIPANT.to_string(),
            demographics: None,
            condition,
            ratings: Ratings::new(),
            awareness: None,
            notes: String::new(),
            start_time,
            end_time: None,
        }
    }

    pub fn has_all_ratings(&self) -> bool {
        RatingDimension::ALL
            .iter()
            .all(|dimension| self.ratings.contains_key(dimension))
    }

    pub fn is_complete(&self) -> bool {
        self.demographics.is_some()
            && self.has_all_ratings()
            && self.awareness.is_some()
            && self.end_time.is_some()
    }
}
