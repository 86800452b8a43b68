//! Scripted presentation playback.
//!
//! The simulated lecture is a fixed list of subtitle cues per condition,
//! replayed against a simulated clock. Nothing here owns a timer: a scheduler
//! outside the crate calls [`Playback::advance`] once per tick and renders
//! whatever fired.

use std::time::Duration;

use shared::domain::Condition;

pub const PRESENTATION_LENGTH: Duration = Duration::from_secs(30);
pub const TICK_STEP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    pub offset: Duration,
    pub text: &'static str,
}

const fn cue(seconds: u64, text: &'static str) -> Cue {
    Cue {
        offset: Duration::from_secs(seconds),
        text,
    }
}

static WARM_SCRIPT: [Cue; 7] = [
    cue(0, "Hello everyone! Welcome to Introduction to Psychology!"),
    cue(3, "I'm so excited to explore the fascinating world of human behavior with you."),
    cue(7, "Today we'll discuss cognitive biases and how they shape our perceptions."),
    cue(12, "The halo effect is particularly interesting - it shows how one positive trait..."),
    cue(17, "...can influence our overall judgment of a person or thing."),
    cue(22, "I hope you find this as intriguing as I do!"),
    cue(26, "Let's dive into this wonderful topic together!"),
];

static COLD_SCRIPT: [Cue; 7] = [
    cue(0, "Welcome to Introduction to Psychology."),
    cue(3, "We will cover cognitive biases in this session."),
    cue(7, "Today's topic is the halo effect and related phenomena."),
    cue(12, "The halo effect demonstrates how singular characteristics..."),
    cue(17, "...can affect overall evaluations in predictable ways."),
    cue(22, "This concludes the introduction."),
    cue(26, "Proceed to the next section."),
];

pub fn script_for(condition: Condition) -> &'static [Cue] {
    match condition {
        Condition::Warm => &WARM_SCRIPT,
        Condition::Cold => &COLD_SCRIPT,
    }
}

/// Latest cue whose offset is at or before `elapsed`. `cues` must be ordered
/// by offset.
pub fn cue_due_at(cues: &[Cue], elapsed: Duration) -> Option<&Cue> {
    let due = cues.partition_point(|cue| cue.offset <= elapsed);
    due.checked_sub(1).map(|index| &cues[index])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaybackGeneration(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackUpdate {
    pub generation: PlaybackGeneration,
    pub fired: Vec<Cue>,
    pub display: Option<&'static str>,
    pub progress_percent: f64,
    pub time_label: String,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct Playback {
    generation: PlaybackGeneration,
    cues: &'static [Cue],
    length: Duration,
    elapsed: Duration,
    fired: usize,
}

impl Playback {
    pub fn new(generation: PlaybackGeneration, condition: Condition) -> Self {
        Self::with_script(generation, script_for(condition), PRESENTATION_LENGTH)
    }

    pub fn with_script(
        generation: PlaybackGeneration,
        cues: &'static [Cue],
        length: Duration,
    ) -> Self {
        Self {
            generation,
            cues,
            length,
            elapsed: Duration::ZERO,
            fired: 0,
        }
    }

    pub fn generation(&self) -> PlaybackGeneration {
        self.generation
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Moves the clock forward by `step` (clamped at the end of the
    /// presentation) and returns the cues that became due, each exactly once.
    pub fn advance(&mut self, step: Duration) -> PlaybackUpdate {
        self.elapsed = self.elapsed.saturating_add(step).min(self.length);
        let due = self.cues.partition_point(|cue| cue.offset <= self.elapsed);
        let fired = if due > self.fired {
            self.cues[self.fired..due].to_vec()
        } else {
            Vec::new()
        };
        self.fired = self.fired.max(due);
        self.snapshot(fired)
    }

    pub fn display_text(&self) -> Option<&'static str> {
        self.fired
            .checked_sub(1)
            .map(|index| self.cues[index].text)
    }

    pub fn progress_percent(&self) -> f64 {
        if self.length.is_zero() {
            return 100.0;
        }
        (self.elapsed.as_millis() as f64 / self.length.as_millis() as f64 * 100.0).min(100.0)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.length
    }

    /// `m:ss / m:ss`, as shown under the video timeline.
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            clock_label(self.elapsed),
            clock_label(self.length)
        )
    }

    fn snapshot(&self, fired: Vec<Cue>) -> PlaybackUpdate {
        PlaybackUpdate {
            generation: self.generation,
            fired,
            display: self.display_text(),
            progress_percent: self.progress_percent(),
            time_label: self.time_label(),
            complete: self.is_complete(),
        }
    }
}

fn clock_label(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
#[path = "tests/player_tests.rs"]
mod tests;
