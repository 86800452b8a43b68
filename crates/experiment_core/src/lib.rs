//! Participant-facing experiment logic: condition assignment, screen flow,
//! answer collection, scripted playback, reporting, and export.

pub mod assigner;
pub mod collector;
pub mod console;
pub mod error;
pub mod export;
pub mod flow;
pub mod player;
pub mod report;
pub mod session;

pub use assigner::ConditionAssigner;
pub use collector::{AwarenessForm, DemographicsForm, RatingsForm, ResponseCollector};
pub use console::ResearcherConsole;
pub use error::{ExportError, FlowError, ReportError, SessionError, ValidationError};
pub use export::{ExportSink, PersistenceClient};
pub use flow::FlowController;
pub use player::{Playback, PlaybackGeneration, PlaybackUpdate, PRESENTATION_LENGTH, TICK_STEP};
pub use report::{AggregateReport, ConditionStats, Debrief};
pub use session::{CompletedSession, ExperimentSession};
