mod plan;
mod state;

pub use plan::{PlannedImage, Position, SequencePlan};
pub use state::{DisplayState, Epoch, GallerySnapshot, ImageSource, Phase, Slot};
