//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod availability;
pub mod booking_session;
pub mod client_note;
pub mod document;
pub mod intake_form;
pub mod status;
pub mod therapist;
pub mod user;
