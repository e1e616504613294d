//! Local-first medical appointment booking.
//!
//! Patients book slots with doctors from a fixed catalog, admins confirm or
//! cancel bookings and manage users. All state lives in named JSON slots of a
//! key-value store.

pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod store;
pub mod users;

pub use catalog::{default_time_slots, AppointmentView, DoctorCatalog};
pub use config::{AppConfig, ConfigWarning};
pub use error::{AppointmentError, BookingField, StoreError, UserError, ValidationError};
pub use lifecycle::AppointmentManager;
pub use models::{Appointment, AppointmentStatus, BookingRequest, Doctor, PatientRef, Role, User};
pub use store::{CollectionStore, FileBackend, KeyValueBackend, MemoryBackend};
pub use users::UserDirectory;
