//! Track status reporting.
//!
//! Workers announce every state change of a track through a [`StatusSink`].
//! Events for one track arrive in order; events of different tracks may
//! interleave.

use std::fmt;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::models::Stage;

/// Observable state of one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    Queued,
    Extracting,
    Tagging,
    Analyzing,
    Done,
    Failed(String),
    Cancelled,
}

impl TrackState {
    /// State announced when a job enters `stage`.
    pub fn entering(stage: Stage) -> Self {
        match stage {
            Stage::Extract => TrackState::Extracting,
            Stage::Tag => TrackState::Tagging,
            Stage::Analyze => TrackState::Analyzing,
            Stage::Done => TrackState::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackState::Done | TrackState::Failed(_) | TrackState::Cancelled
        )
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackState::Queued => write!(f, "queued"),
            TrackState::Extracting => write!(f, "extracting"),
            TrackState::Tagging => write!(f, "tagging"),
            TrackState::Analyzing => write!(f, "analyzing"),
            TrackState::Done => write!(f, "done"),
            TrackState::Failed(reason) => write!(f, "failed: {}", reason),
            TrackState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A track changed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Track ordinal.
    pub index: u32,
    pub title: String,
    pub state: TrackState,
}

/// Receives status events from pipeline workers.
pub trait StatusSink: Send + Sync {
    fn notify(&self, event: StatusEvent);
}

impl<F> StatusSink for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn notify(&self, event: StatusEvent) {
        self(event)
    }
}

/// Forwards events into a channel; a dropped receiver is ignored.
pub struct ChannelSink(pub Sender<StatusEvent>);

impl StatusSink for ChannelSink {
    fn notify(&self, event: StatusEvent) {
        let _ = self.0.send(event);
    }
}

/// Logs events through `tracing`.
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify(&self, event: StatusEvent) {
        match &event.state {
            TrackState::Failed(reason) => {
                tracing::warn!("Track {:02} '{}' failed: {}", event.index, event.title, reason)
            }
            state => tracing::info!("Track {:02} '{}': {}", event.index, event.title, state),
        }
    }
}

/// Drops every event.
pub struct NullSink;

impl StatusSink for NullSink {
    fn notify(&self, _event: StatusEvent) {}
}
