use serde::Serialize;
use shared::domain::{Condition, RatingDimension, RatingScore, Ratings, SessionRecord};

use crate::error::ReportError;

/// Mean of the four rating dimensions. Every dimension must be present; a
/// gap means the flow let an incomplete record through.
pub fn mean_rating(ratings: &Ratings) -> Result<f64, ReportError> {
    let mut sum = 0u32;
    for dimension in RatingDimension::ALL {
        let score = ratings
            .get(&dimension)
            .ok_or(ReportError::MissingRating(dimension))?;
        sum += u32::from(score.value());
    }
    Ok(f64::from(sum) / RatingDimension::ALL.len() as f64)
}

pub fn format_score(value: f64) -> String {
    format!("{value:.2}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Debrief {
    pub condition: Condition,
    pub scores: Vec<(RatingDimension, RatingScore)>,
    pub average: f64,
}

impl Debrief {
    pub fn from_record(record: &SessionRecord) -> Result<Self, ReportError> {
        let average = mean_rating(&record.ratings)?;
        let scores = RatingDimension::ALL
            .into_iter()
            .filter_map(|dimension| record.ratings.get(&dimension).map(|score| (dimension, *score)))
            .collect();
        Ok(Self {
            condition: record.condition,
            scores,
            average,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Thank you for participating!\n\n");
        out.push_str(
            "This study examined whether the instructor's warm or cold demeanor shaped how you \
             rated attributes that were identical in both versions.\n\n",
        );
        out.push_str(&format!(
            "Your condition: {}\n",
            self.condition.as_str().to_ascii_uppercase()
        ));
        out.push_str(&format!("Condition: {}\n", self.condition.label()));
        for (dimension, score) in &self.scores {
            out.push_str(&format!(
                "{}: {} / {}\n",
                dimension.label(),
                score,
                RatingScore::MAX
            ));
        }
        out.push_str(&format!(
            "Average Rating: {} / {}\n",
            format_score(self.average),
            RatingScore::MAX
        ));
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionStats {
    pub count: usize,
    /// Mean of per-session averages; `None` when no session landed here.
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total: usize,
    pub warm: ConditionStats,
    pub cold: ConditionStats,
    /// Warm average minus cold average, when both sides have data.
    pub difference: Option<f64>,
}

impl AggregateReport {
    pub fn render(&self) -> String {
        let average = |stats: &ConditionStats| {
            stats
                .average
                .map(format_score)
                .unwrap_or_else(|| "n/a".to_string())
        };
        format!(
            "Total participants: {}\n\
             Warm condition: {} participants, avg rating: {}\n\
             Cold condition: {} participants, avg rating: {}\n\
             Difference: {}\n",
            self.total,
            self.warm.count,
            average(&self.warm),
            self.cold.count,
            average(&self.cold),
            self.difference
                .map(format_score)
                .unwrap_or_else(|| "n/a".to_string()),
        )
    }
}

pub fn aggregate_by_condition(records: &[SessionRecord]) -> Result<AggregateReport, ReportError> {
    let mut sums = [0.0f64; 2];
    let mut counts = [0usize; 2];

    for (index, record) in records.iter().enumerate() {
        let mean = mean_rating(&record.ratings).map_err(|err| match err {
            ReportError::MissingRating(dimension) => {
                ReportError::IncompleteStoredSession { index, dimension }
            }
            other => other,
        })?;
        let slot = match record.condition {
            Condition::Warm => 0,
            Condition::Cold => 1,
        };
        sums[slot] += mean;
        counts[slot] += 1;
    }

    let stats = |slot: usize| ConditionStats {
        count: counts[slot],
        average: (counts[slot] > 0).then(|| sums[slot] / counts[slot] as f64),
    };
    let warm = stats(0);
    let cold = stats(1);
    let difference = warm
        .average
        .zip(cold.average)
        .map(|(warm, cold)| warm - cold);

    Ok(AggregateReport {
        total: records.len(),
        warm,
        cold,
        difference,
    })
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
