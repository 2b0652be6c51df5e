//! # scan-types
//!
//! Wire vocabulary for the Scan to Speak pairing relay.
//!
//! This crate provides the types shared by the relay and its clients:
//! - [`Role`], [`SessionToken`] - Who is joining, and which session
//! - [`Envelope`], [`StatusEvent`] - The `{ type, payload }` JSON frame
//! - [`CloseCode`] - Application close codes sent on rejection
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod close;
mod envelope;
mod error;
mod ids;

pub use close::CloseCode;
pub use envelope::{Envelope, StatusEvent, STATUS_TYPE};
pub use error::WireError;
pub use ids::{Role, SessionToken};
