//! Session module - client-side model of one analysis run
//!
//! - `Session`: authoritative state (step, message log, phase, report)
//! - `Message`: entries of the append-only log
//! - `SessionChange` / `Notice`: what the presentation layer reacts to
//! - `steps`: static descriptors for the five pipeline stages
//!
//! # Phases
//!
//! ```text
//! AwaitingConnection ──open──▶ Streaming ◀──submit── WaitingForInput
//!                                  │  └──requires_input──▶  │
//!                                  └──────completed──────▶ Completed ◀──┘
//! ```

mod state;
pub mod steps;
mod types;

pub use state::Session;
pub use steps::{step_descriptor, StepDescriptor, MAX_STEP, MIN_STEP, STEPS};
pub use types::{Message, Notice, Phase, SessionChange, SessionId};
