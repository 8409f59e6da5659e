//! Pipeline controller for the bandstack reframing run.
//!
//! Wires the frame source, band compositor and segment writer into a
//! cancellable run on a dedicated tokio task, reporting whole-percentage
//! progress over a channel and a [`bandstack_models::RunOutcome`] at the
//! end.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod progress;

pub use config::PipelineConfig;
pub use controller::{run_loop, PipelineController, RunHandle};
pub use error::{PipelineError, PipelineResult};
pub use progress::{progress_channel, ProgressSender};
