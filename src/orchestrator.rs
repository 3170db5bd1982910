use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::classifier::ErrorClass;
use crate::content::RegionData;
use crate::credential::Credential;
use crate::gallery::{
    DisplayState, Epoch, GallerySnapshot, ImageSource, Phase, Position, SequencePlan, Slot,
};
use crate::gemini::ImageGenerator;
use crate::queue::{Clock, ImageQueue, TokioClock};
use crate::regions::Region;

/// How a sequencing task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEnd {
    /// Every position was attempted.
    Completed,
    /// A job exhausted its rate-limit retries; later positions were skipped.
    ExhaustedStop,
    /// The selection changed underneath the task; its remaining work was dropped.
    Superseded,
}

/// Handle to the background task driving one activation.
#[derive(Debug)]
pub struct SequenceHandle {
    epoch: Epoch,
    task: JoinHandle<SequenceEnd>,
}

impl SequenceHandle {
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<SequenceEnd, JoinError> {
        self.task.await
    }
}

/// Drives image acquisition for the active region, one position at a time.
pub struct SelectionOrchestrator<G, C = TokioClock> {
    queue: ImageQueue<G, C>,
    board: Arc<Mutex<Board>>,
}

/// Display state shared between the orchestrator and its sequencing tasks.
/// Only the task whose epoch matches may write to it.
#[derive(Debug, Default)]
struct Board {
    epoch: Epoch,
    phase: Phase,
    region: Option<String>,
    slots: Vec<Slot>,
    cursor: Option<usize>,
    images_loading: bool,
    exhausted: bool,
    activated_at: Option<chrono::DateTime<Utc>>,
}

impl Board {
    /// Drop everything from the previous selection and move to a new epoch.
    fn advance(&mut self) -> Epoch {
        let epoch = self.epoch.next();
        *self = Board {
            epoch,
            ..Board::default()
        };
        epoch
    }

    fn header_resolved(&self) -> bool {
        self.slots
            .iter()
            .filter(|s| s.position.is_header())
            .all(|s| s.state.is_resolved())
    }

    fn snapshot(&self) -> GallerySnapshot {
        GallerySnapshot {
            epoch: self.epoch,
            phase: self.phase,
            region: self.region.clone(),
            slots: self.slots.clone(),
            cursor: self.cursor,
            images_loading: self.images_loading,
            exhausted: self.exhausted,
            activated_at: self.activated_at,
        }
    }
}

impl<G: ImageGenerator, C: Clock> SelectionOrchestrator<G, C> {
    pub fn new(queue: ImageQueue<G, C>) -> Self {
        Self {
            queue,
            board: Arc::new(Mutex::new(Board::default())),
        }
    }

    /// Start a fresh epoch for `region` and begin sequencing its images in
    /// the background. Any earlier activation is superseded.
    pub fn activate(
        &self,
        region: &Region,
        dataset: &RegionData,
        credential: &Credential,
    ) -> SequenceHandle {
        let plan = SequencePlan::build(&region.name, dataset);

        let epoch = {
            let mut board = self.board.lock();
            let epoch = board.advance();
            board.phase = Phase::Activated;
            board.region = Some(region.name.clone());
            board.images_loading = true;
            board.activated_at = Some(Utc::now());
            board.slots = plan
                .items()
                .iter()
                .map(|item| Slot {
                    position: item.position.clone(),
                    label: item.label.clone(),
                    state: DisplayState::NotStarted,
                })
                .collect();
            epoch
        };

        info!(%epoch, region = %region.name, positions = plan.len(), "selection activated");

        let task = tokio::spawn(run_sequence(
            self.queue.clone(),
            Arc::clone(&self.board),
            epoch,
            plan,
            credential.clone(),
            ImageSource::Placeholder(region.placeholder_img.clone()),
        ));

        SequenceHandle { epoch, task }
    }

    /// Invalidate the current selection without starting a new one.
    pub fn deactivate(&self) {
        let epoch = self.board.lock().advance();
        info!(%epoch, "selection deactivated");
    }

    pub fn display(&self, position: &Position) -> DisplayState {
        let board = self.board.lock();
        board
            .slots
            .iter()
            .find(|s| &s.position == position)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn images_loading(&self) -> bool {
        self.board.lock().images_loading
    }

    pub fn epoch(&self) -> Epoch {
        self.board.lock().epoch
    }

    pub fn phase(&self) -> Phase {
        self.board.lock().phase
    }

    pub fn is_exhausted(&self) -> bool {
        self.board.lock().exhausted
    }

    pub fn snapshot(&self) -> GallerySnapshot {
        self.board.lock().snapshot()
    }
}

async fn run_sequence<G: ImageGenerator, C: Clock>(
    queue: ImageQueue<G, C>,
    board: Arc<Mutex<Board>>,
    epoch: Epoch,
    plan: SequencePlan,
    credential: Credential,
    placeholder: ImageSource,
) -> SequenceEnd {
    {
        let mut state = board.lock();
        if state.epoch != epoch {
            return SequenceEnd::Superseded;
        }
        state.phase = Phase::Sequencing;
    }

    for (index, planned) in plan.into_iter().enumerate() {
        {
            let mut state = board.lock();
            if state.epoch != epoch {
                return SequenceEnd::Superseded;
            }
            state.cursor = Some(index);
            state.slots[index].state = DisplayState::Pending;
        }

        let position = planned.position;
        let outcome = queue.submit(planned.prompt, &credential).await;

        let mut state = board.lock();
        if state.epoch != epoch {
            debug!(%epoch, current = %state.epoch, %position, "discarding stale image outcome");
            return SequenceEnd::Superseded;
        }

        let mut exhausted = false;
        state.slots[index].state = match outcome {
            Ok(image) => DisplayState::Ready(ImageSource::Generated(image)),
            Err(err) => {
                warn!(%epoch, %position, error = %err, "image unavailable");
                exhausted = err.class() == ErrorClass::RateLimited;
                if position == Position::History {
                    DisplayState::Ready(placeholder.clone())
                } else {
                    DisplayState::Failed
                }
            }
        };

        if state.header_resolved() {
            state.images_loading = false;
        }

        if exhausted {
            warn!(%epoch, %position, "quota exhausted, stopping further image generation");
            state.exhausted = true;
            state.images_loading = false;
            state.phase = Phase::ExhaustedStop;
            return SequenceEnd::ExhaustedStop;
        }
    }

    let mut state = board.lock();
    if state.epoch != epoch {
        return SequenceEnd::Superseded;
    }
    state.phase = Phase::Completed;
    state.images_loading = false;
    info!(%epoch, "image sequence completed");
    SequenceEnd::Completed
}
