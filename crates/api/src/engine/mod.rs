//! Booking workflows shared by HTTP handlers, webhooks and background jobs.
//!
//! - [`booking`] -- validated booking creation from the manual form and the
//!   scheduling widget callback.
//! - [`session_completion`] -- the batch that completes elapsed sessions and
//!   pays therapists.

pub mod booking;
pub mod session_completion;
