//! Miras: regional heritage explorer for Azerbaijan.
//!
//! Fetches a cultural narrative per region and illustrates it through a
//! single process-wide image queue that paces calls to the generative
//! service and backs off when its quota runs out.

pub mod classifier;
pub mod config;
pub mod content;
pub mod credential;
pub mod error;
pub mod gallery;
pub mod gemini;
pub mod logging;
pub mod orchestrator;
pub mod queue;
pub mod regions;
