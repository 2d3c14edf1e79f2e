//! # reconr core
//!
//! The pipeline controller and everything it needs at runtime:
//!
//! * **[`pipeline`]**: the phase-sequencing state machine.
//! * **[`store`]**: JSON file persistence of recon documents.
//! * **[`modules`]**: reference implementations of the collaborator ports.
//! * **[`secrets`]**: the GitHub secret hunt, which writes its own artifact.

pub mod modules;
pub mod pipeline;
pub mod secrets;
pub mod store;
