//! Line-oriented presentation of the study. Each screen is a handful of
//! prompts; rejected answers are explained and asked again.

use std::{io::Write, time::Duration};

use anyhow::{bail, Result};
use experiment_core::{
    AwarenessForm, CompletedSession, DemographicsForm, ExperimentSession, PlaybackUpdate,
    RatingsForm, TICK_STEP,
};
use shared::domain::{RatingDimension, RatingScore, Screen};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    task::JoinHandle,
};
use tracing::{info, warn};

const PERSISTENCE_GRACE: Duration = Duration::from_secs(5);

pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
    tick: Duration,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, tick: Duration) -> Self {
        Self {
            lines: input.lines(),
            out,
            tick,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs sessions until the participant declines another one. Returns how
    /// many were completed.
    pub async fn run(&mut self, session: &mut ExperimentSession) -> Result<usize> {
        let mut completed = 0;
        let mut pending = Vec::new();

        loop {
            let finished = self.run_session(session).await?;
            completed += 1;
            pending.extend(finished.persistence);

            match session.download_artifact().await {
                Ok(Some(path)) => writeln!(self.out, "Your data was saved to {}", path.display())?,
                Ok(None) => {}
                Err(error) => warn!(%error, "failed to write session artifact"),
            }

            if !self.confirm("Start a new session? [y/N]").await? {
                break;
            }
            let condition = session.restart();
            info!(%condition, "new session assigned");
        }

        wait_for_persistence(pending).await;
        Ok(completed)
    }

    /// Walks one participant from consent to the debrief.
    pub async fn run_session(&mut self, session: &mut ExperimentSession) -> Result<CompletedSession> {
        self.consent(session).await?;
        self.demographics(session).await?;
        self.video(session).await?;
        self.ratings(session).await?;
        let completed = self.awareness(session).await?;
        write!(self.out, "\n{}", completed.debrief.render())?;
        Ok(completed)
    }

    async fn consent(&mut self, session: &mut ExperimentSession) -> Result<()> {
        self.heading(Screen::Consent)?;
        writeln!(
            self.out,
            "You will watch a short presentation by an AI instructor and answer a few \
             questions about it. Participation is voluntary and takes about five minutes."
        )?;
        loop {
            let agreed = self.confirm("I agree to participate [y/N]").await?;
            match session.give_consent(agreed) {
                Ok(_) => return Ok(()),
                Err(error) if error.is_validation() => self.reject(&error)?,
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn demographics(&mut self, session: &mut ExperimentSession) -> Result<()> {
        self.heading(Screen::Demographics)?;
        loop {
            let form = DemographicsForm {
                participant_id: self.ask("Participant ID (optional):").await?,
                age: self.ask("Age:").await?,
                gender: self.ask("Gender:").await?,
                ai_familiarity: self.ask("Familiarity with AI tools:").await?,
            };
            match session.submit_demographics(&form) {
                Ok(_) => return Ok(()),
                Err(error) if error.is_validation() => self.reject(&error)?,
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn video(&mut self, session: &mut ExperimentSession) -> Result<()> {
        self.heading(Screen::Video)?;
        let first = session.start_playback()?;
        let generation = first.generation;
        self.show_playback(&first)?;

        let mut interval = (!self.tick.is_zero()).then(|| tokio::time::interval(self.tick));
        let mut update = first;
        while !update.complete {
            if let Some(interval) = interval.as_mut() {
                interval.tick().await;
            }
            update = session.tick_playback(generation, TICK_STEP)?;
            self.show_playback(&update)?;
        }
        writeln!(self.out, "Presentation complete.")?;

        let notes = self.ask("Notes (optional):").await?;
        if !notes.is_empty() {
            session.record_notes(&notes)?;
        }
        session.continue_to_rating()?;
        Ok(())
    }

    async fn ratings(&mut self, session: &mut ExperimentSession) -> Result<()> {
        self.heading(Screen::Rating)?;
        loop {
            let mut form = RatingsForm::new();
            for dimension in RatingDimension::ALL {
                let prompt = format!(
                    "{} ({}-{}):",
                    dimension.prompt(),
                    RatingScore::MIN,
                    RatingScore::MAX
                );
                let answer = self.ask(&prompt).await?;
                if !answer.is_empty() {
                    form.set(dimension.as_str(), answer);
                }
            }
            match session.submit_ratings(&form) {
                Ok(_) => return Ok(()),
                Err(error) if error.is_validation() => self.reject(&error)?,
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn awareness(&mut self, session: &mut ExperimentSession) -> Result<CompletedSession> {
        self.heading(Screen::Awareness)?;
        loop {
            let form = AwarenessForm {
                influence_question: self
                    .ask("Did anything other than the content influence your ratings?")
                    .await?,
                awareness_text: self.ask("If so, what (optional):").await?,
                noticed_condition: self
                    .ask("Did you notice anything unusual about the instructor's manner? [yes/no/unsure]")
                    .await?,
            };
            match session.finish(&form).await {
                Ok(completed) => return Ok(completed),
                Err(experiment_core::SessionError::Flow(error)) if error.is_validation() => {
                    self.reject(&error)?
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn show_playback(&mut self, update: &PlaybackUpdate) -> Result<()> {
        for cue in &update.fired {
            writeln!(self.out, "[{}] {}", update.time_label, cue.text)?;
        }
        Ok(())
    }

    fn heading(&mut self, screen: Screen) -> Result<()> {
        writeln!(self.out, "\n== {} ==", screen.as_str().to_ascii_uppercase())?;
        Ok(())
    }

    fn reject(&mut self, error: &dyn std::error::Error) -> Result<()> {
        writeln!(self.out, "! {error}")?;
        Ok(())
    }

    async fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(prompt).await?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    async fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.out, "{prompt} ")?;
        self.out.flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => bail!("input closed before the session finished"),
        }
    }
}

async fn wait_for_persistence(pending: Vec<JoinHandle<Option<shared::protocol::SaveDataResponse>>>) {
    for handle in pending {
        match tokio::time::timeout(PERSISTENCE_GRACE, handle).await {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => warn!(%error, "persistence task failed"),
            Err(_) => warn!("gave up waiting for the persistence service"),
        }
    }
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
