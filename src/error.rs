//! Error types for the booking system.
//!
//! Store failures are kept separate from "nothing stored yet" so callers can
//! decide whether to retry, alert or fall back to an empty view.

use crate::models::AppointmentStatus;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read slot '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write slot '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("slot '{key}' holds malformed data: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize slot '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A booking input that must be present before an appointment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingField {
    Date,
    Time,
    Doctor,
}

impl BookingField {
    pub fn name(&self) -> &'static str {
        match self {
            BookingField::Date => "date",
            BookingField::Time => "time",
            BookingField::Doctor => "doctor",
        }
    }
}

impl fmt::Display for BookingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Missing booking inputs, in form order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub missing: Vec<BookingField>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.missing.iter().map(BookingField::name).collect();
        write!(f, "missing required booking fields: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("appointment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("missing required user fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("a user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
