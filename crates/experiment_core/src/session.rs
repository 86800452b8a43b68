use std::{path::PathBuf, sync::Arc, time::Duration};

use shared::{
    domain::{Condition, Screen, SessionRecord},
    protocol::SaveDataResponse,
};
use storage::SessionStore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    assigner::ConditionAssigner,
    collector::{AwarenessForm, DemographicsForm, RatingsForm},
    error::{FlowError, SessionError},
    export::ExportSink,
    flow::FlowController,
    player::{PlaybackGeneration, PlaybackUpdate},
    report::Debrief,
};

/// Result of the final submission.
pub struct CompletedSession {
    pub record: SessionRecord,
    pub debrief: Debrief,
    /// Background POST to the persistence service, when one is configured.
    pub persistence: Option<JoinHandle<Option<SaveDataResponse>>>,
}

/// One participant session wired to its collaborators. The flow controller
/// decides what is allowed; this type adds the side effects that follow the
/// final screen.
pub struct ExperimentSession {
    flow: FlowController,
    store: Arc<dyn SessionStore>,
    sink: ExportSink,
}

impl ExperimentSession {
    pub fn new(assigner: ConditionAssigner, store: Arc<dyn SessionStore>, sink: ExportSink) -> Self {
        Self {
            flow: FlowController::new(assigner),
            store,
            sink,
        }
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    pub fn screen(&self) -> Screen {
        self.flow.screen()
    }

    pub fn give_consent(&mut self, agreed: bool) -> Result<Screen, FlowError> {
        self.flow.give_consent(agreed)
    }

    pub fn submit_demographics(&mut self, form: &DemographicsForm) -> Result<Screen, FlowError> {
        self.flow.submit_demographics(form)
    }

    pub fn start_playback(&mut self) -> Result<PlaybackUpdate, FlowError> {
        self.flow.start_playback()
    }

    pub fn tick_playback(
        &mut self,
        generation: PlaybackGeneration,
        step: Duration,
    ) -> Result<PlaybackUpdate, FlowError> {
        self.flow.tick_playback(generation, step)
    }

    pub fn record_notes(&mut self, notes: &str) -> Result<(), FlowError> {
        self.flow.record_notes(notes)
    }

    pub fn continue_to_rating(&mut self) -> Result<Screen, FlowError> {
        self.flow.continue_to_rating()
    }

    pub fn submit_ratings(&mut self, form: &RatingsForm) -> Result<Screen, FlowError> {
        self.flow.submit_ratings(form)
    }

    /// Submits the awareness screen, then hands the frozen record to the
    /// store and the persistence service. Neither of those can fail the
    /// session; a debrief that cannot be computed can.
    pub async fn finish(&mut self, form: &AwarenessForm) -> Result<CompletedSession, SessionError> {
        let record = self.flow.submit_awareness(form)?.clone();
        info!(
            participant_id = %record.participant_id,
            condition = %record.condition,
            "session completed"
        );

        if let Err(error) = self.store.append(&record).await {
            warn!(%error, "failed to append session to local store");
        }
        let persistence = self.sink.transmit(&record);

        let debrief = Debrief::from_record(&record).inspect_err(|err| {
            error!(%err, "completed session cannot be summarized");
        })?;

        Ok(CompletedSession {
            record,
            debrief,
            persistence,
        })
    }

    /// Writes the finished record as a downloadable artifact. Only available
    /// on the debrief screen; can be repeated there.
    pub async fn download_artifact(&self) -> Result<Option<PathBuf>, SessionError> {
        if self.screen() != Screen::Debrief {
            return Err(FlowError::WrongScreen {
                expected: Screen::Debrief,
                actual: self.screen(),
            }
            .into());
        }
        let path = self.sink.download(self.flow.record()).await?;
        if let Some(path) = &path {
            info!(path = %path.display(), "session artifact written");
        }
        Ok(path)
    }

    pub fn restart(&mut self) -> Condition {
        self.flow.restart()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
