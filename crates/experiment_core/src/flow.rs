//! Screen sequencing for a single participant session.
//!
//! The controller exposes one method per participant action. Each method
//! checks it is being called on the right screen, lets the collector validate
//! and store the answers, and only then moves forward.

use std::time::Duration;

use chrono::Utc;
use shared::domain::{Condition, Screen, SessionRecord};
use tracing::{debug, info};

use crate::{
    assigner::ConditionAssigner,
    collector::{AwarenessForm, DemographicsForm, RatingsForm, ResponseCollector},
    error::{FlowError, ValidationError},
    player::{Playback, PlaybackGeneration, PlaybackUpdate},
};

pub struct FlowController {
    assigner: ConditionAssigner,
    screen: Screen,
    collector: ResponseCollector,
    playback: Option<Playback>,
    last_generation: u64,
}

impl FlowController {
    pub fn new(mut assigner: ConditionAssigner) -> Self {
        let collector = fresh_collector(&mut assigner);
        Self {
            assigner,
            screen: Screen::Consent,
            collector,
            playback: None,
            last_generation: 0,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn condition(&self) -> Condition {
        self.collector.record().condition
    }

    pub fn record(&self) -> &SessionRecord {
        self.collector.record()
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }

    pub fn give_consent(&mut self, agreed: bool) -> Result<Screen, FlowError> {
        self.expect_screen(Screen::Consent)?;
        if !agreed {
            return Err(ValidationError::ConsentNotGiven.into());
        }
        Ok(self.advance())
    }

    pub fn submit_demographics(&mut self, form: &DemographicsForm) -> Result<Screen, FlowError> {
        self.expect_screen(Screen::Demographics)?;
        self.collector.record_demographics(form)?;
        Ok(self.advance())
    }

    /// Starts the presentation from zero. Any playback started earlier is
    /// discarded and its generation stops being accepted by
    /// [`FlowController::tick_playback`].
    pub fn start_playback(&mut self) -> Result<PlaybackUpdate, FlowError> {
        self.expect_screen(Screen::Video)?;
        self.last_generation += 1;
        let generation = PlaybackGeneration(self.last_generation);
        let mut playback = Playback::new(generation, self.condition());
        let update = playback.advance(Duration::ZERO);
        self.playback = Some(playback);
        debug!(generation = generation.0, condition = %self.condition(), "playback started");
        Ok(update)
    }

    pub fn tick_playback(
        &mut self,
        generation: PlaybackGeneration,
        step: Duration,
    ) -> Result<PlaybackUpdate, FlowError> {
        let playback = self.playback.as_mut().ok_or(FlowError::StalePlayback {
            received: generation.0,
            current: self.last_generation,
        })?;
        if playback.generation() != generation {
            return Err(FlowError::StalePlayback {
                received: generation.0,
                current: playback.generation().0,
            });
        }
        Ok(playback.advance(step))
    }

    pub fn record_notes(&mut self, notes: &str) -> Result<(), FlowError> {
        self.expect_screen(Screen::Video)?;
        self.collector.record_notes(notes);
        Ok(())
    }

    pub fn continue_to_rating(&mut self) -> Result<Screen, FlowError> {
        self.expect_screen(Screen::Video)?;
        match &self.playback {
            None => return Err(FlowError::PlaybackNotStarted),
            Some(playback) if !playback.is_complete() => {
                return Err(FlowError::PlaybackIncomplete)
            }
            Some(_) => {}
        }
        self.playback = None;
        Ok(self.advance())
    }

    pub fn submit_ratings(&mut self, form: &RatingsForm) -> Result<Screen, FlowError> {
        self.expect_screen(Screen::Rating)?;
        self.collector.record_ratings(form)?;
        Ok(self.advance())
    }

    /// Final submission. Stamps the end time and returns the frozen record.
    pub fn submit_awareness(&mut self, form: &AwarenessForm) -> Result<&SessionRecord, FlowError> {
        self.expect_screen(Screen::Awareness)?;
        self.collector.record_awareness(form)?;
        self.collector.complete(Utc::now());
        self.advance();
        Ok(self.collector.record())
    }

    /// Throws the current session away and starts over at consent with a
    /// freshly drawn condition.
    pub fn restart(&mut self) -> Condition {
        let abandoned_on = self.screen;
        self.playback = None;
        self.collector = fresh_collector(&mut self.assigner);
        self.screen = Screen::Consent;
        info!(%abandoned_on, condition = %self.condition(), "session restarted");
        self.condition()
    }

    fn expect_screen(&self, expected: Screen) -> Result<(), FlowError> {
        if self.screen == expected {
            Ok(())
        } else {
            Err(FlowError::WrongScreen {
                expected,
                actual: self.screen,
            })
        }
    }

    fn advance(&mut self) -> Screen {
        if let Some(next) = self.screen.next() {
            debug!(from = %self.screen, to = %next, "screen transition");
            self.screen = next;
        }
        self.screen
    }
}

fn fresh_collector(assigner: &mut ConditionAssigner) -> ResponseCollector {
    let condition = assigner.assign();
    info!(%condition, "condition assigned");
    ResponseCollector::new(condition, Utc::now())
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
