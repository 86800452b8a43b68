use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::domain::{
    Awareness, Condition, Demographics, NoticedCondition, RatingDimension, RatingScore, Ratings,
    SessionRecord, ANONYMOUS_PARTICIPANT,
};

use crate::error::ValidationError;

/// Raw demographics answers as typed by the participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemographicsForm {
    pub participant_id: String,
    pub age: String,
    pub gender: String,
    pub ai_familiarity: String,
}

/// Selected value per rating question, keyed by dimension name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingsForm {
    selections: BTreeMap<String, String>,
}

impl RatingsForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(dimension, value);
        self
    }

    pub fn set(&mut self, dimension: impl Into<String>, value: impl Into<String>) {
        self.selections.insert(dimension.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RatingsForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = RatingsForm::new();
        for (dimension, value) in iter {
            form.set(dimension, value);
        }
        form
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwarenessForm {
    pub influence_question: String,
    pub awareness_text: String,
    pub noticed_condition: String,
}

/// Accumulates one participant's answers. Every `record_*` call validates its
/// whole section first, so a rejected submission leaves the record untouched.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    record: SessionRecord,
}

impl ResponseCollector {
    pub fn new(condition: Condition, start_time: DateTime<Utc>) -> Self {
        Self {
            record: SessionRecord::new(condition, start_time),
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn record_demographics(&mut self, form: &DemographicsForm) -> Result<(), ValidationError> {
        let demographics = Demographics {
            age: required(&form.age, "age")?,
            gender: required(&form.gender, "gender")?,
            ai_familiarity: required(&form.ai_familiarity, "aiFamiliarity")?,
        };
        let participant_id = match form.participant_id.trim() {
            "" => ANONYMOUS_PARTICIPANT.to_string(),
            id => id.to_string(),
        };

        self.record.participant_id = participant_id;
        self.record.demographics = Some(demographics);
        Ok(())
    }

    pub fn record_ratings(&mut self, form: &RatingsForm) -> Result<(), ValidationError> {
        let ratings = parse_ratings(form)?;
        self.record.ratings = ratings;
        Ok(())
    }

    pub fn record_awareness(&mut self, form: &AwarenessForm) -> Result<(), ValidationError> {
        let influence_question = required(&form.influence_question, "influenceQuestion")?;
        let noticed_raw = required(&form.noticed_condition, "noticedCondition")?;
        let noticed_condition = noticed_raw.parse::<NoticedCondition>().map_err(|value| {
            ValidationError::InvalidChoice {
                field: "noticedCondition",
                value,
            }
        })?;

        self.record.awareness = Some(Awareness {
            influence_question,
            awareness_text: form.awareness_text.trim().to_string(),
            noticed_condition,
        });
        Ok(())
    }

    pub fn record_notes(&mut self, notes: &str) {
        self.record.notes = notes.to_string();
    }

    /// Stamps the end time; a second call keeps the first stamp.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.record.end_time.get_or_insert(at);
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn parse_ratings(form: &RatingsForm) -> Result<Ratings, ValidationError> {
    let mut ratings = Ratings::new();
    for (key, value) in &form.selections {
        let dimension = key
            .parse::<RatingDimension>()
            .map_err(|err| ValidationError::UnknownDimension(err.0))?;
        let score = value
            .parse::<RatingScore>()
            .map_err(|source| ValidationError::InvalidRating { dimension, source })?;
        ratings.insert(dimension, score);
    }

    if let Some(missing) = RatingDimension::ALL
        .into_iter()
        .find(|dimension| !ratings.contains_key(dimension))
    {
        return Err(ValidationError::MissingRating(missing));
    }

    Ok(ratings)
}

#[cfg(test)]
#[path = "tests/collector_tests.rs"]
mod tests;
