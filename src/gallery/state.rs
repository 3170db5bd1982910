use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::Position;
use crate::gemini::GeneratedImage;

/// Generation counter for the active selection. Results tagged with an
/// older epoch are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn next(self) -> Self {
        Epoch(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a slot shows once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Generated(GeneratedImage),
    /// Static fallback supplied with the region.
    Placeholder(String),
}

impl ImageSource {
    /// Something an `<img src>` can take.
    pub fn url(&self) -> String {
        match self {
            ImageSource::Generated(image) => image.data_url(),
            ImageSource::Placeholder(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayState {
    #[default]
    NotStarted,
    Pending,
    Ready(ImageSource),
    Failed,
}

impl DisplayState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, DisplayState::Ready(_) | DisplayState::Failed)
    }
}

/// Lifecycle of one activation.
///
/// Idle → Activated → Sequencing → Completed | ExhaustedStop.
/// Leaving Sequencing is terminal; a new activation starts a new epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Activated,
    Sequencing,
    Completed,
    ExhaustedStop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Activated => write!(f, "ACTIVATED"),
            Phase::Sequencing => write!(f, "SEQUENCING"),
            Phase::Completed => write!(f, "COMPLETED"),
            Phase::ExhaustedStop => write!(f, "EXHAUSTED_STOP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub position: Position,
    pub label: String,
    pub state: DisplayState,
}

/// Point-in-time copy of the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GallerySnapshot {
    pub epoch: Epoch,
    pub phase: Phase,
    pub region: Option<String>,
    pub slots: Vec<Slot>,
    /// Index of the slot most recently handed to the queue.
    pub cursor: Option<usize>,
    pub images_loading: bool,
    pub exhausted: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

impl GallerySnapshot {
    pub fn state_of(&self, position: &Position) -> DisplayState {
        self.slots
            .iter()
            .find(|s| &s.position == position)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&DisplayState) -> bool) -> usize {
        self.slots.iter().filter(|s| pred(&s.state)).count()
    }

    pub fn resolved(&self) -> usize {
        self.count(DisplayState::is_resolved)
    }
}
