//! Request handlers.
//!
//! Each submodule owns the handlers for one resource. Handlers delegate to
//! the repositories in `ledgerwell_db`, the engines in [`crate::engine`] and
//! the integration ports on [`AppState`](crate::state::AppState), and map
//! errors via [`AppError`](crate::error::AppError).

pub mod billing;
pub mod bookings;
pub mod client_notes;
pub mod completion;
pub mod documents;
pub mod intake_forms;
pub mod therapists;
pub mod users;
pub mod webhooks;
