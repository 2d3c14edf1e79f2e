//! # reconr common
//!
//! Domain models and contracts shared by every crate in the workspace.
//!
//! * **[`target`]**: classification of a raw target into root-domain or subdomain mode.
//! * **[`document`]**: the [`document::ReconDocument`], the persisted state of one target.
//! * **[`phase`]**: phase identifiers and the static phase registry.
//! * **[`ports`]**: traits every scanning capability implements.
//! * **[`config`]**: run configuration, loaded from TOML and the command line.

pub mod config;
pub mod document;
pub mod error;
pub mod phase;
pub mod ports;
pub mod target;

#[doc(hidden)]
pub use tracing;

/// Logs a completed step. Rendered with the `[+]` prefix by the CLI formatter.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "reconr::success", $($arg)*)
    };
}
