//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod availability_repo;
pub mod booking_session_repo;
pub mod client_note_repo;
pub mod document_repo;
pub mod intake_form_repo;
pub mod therapist_repo;
pub mod user_repo;

pub use availability_repo::AvailabilityRepo;
pub use booking_session_repo::BookingSessionRepo;
pub use client_note_repo::ClientNoteRepo;
pub use document_repo::DocumentRepo;
pub use intake_form_repo::IntakeFormRepo;
pub use therapist_repo::TherapistRepo;
pub use user_repo::UserRepo;
