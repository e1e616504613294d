//! Data models for the booking system.
//!
//! This module defines the records kept in the store and the inputs that
//! create them:
//! - AppointmentStatus: lifecycle state of a booking
//! - Role: what a user is allowed to see in the app
//! - Appointment: a booked slot with a doctor
//! - User: a registered account
//! - Doctor: an entry of the static doctor catalog
//! - BookingRequest: what the booking form collects before validation

use crate::error::{BookingField, UserError, ValidationError};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

const DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Lifecycle state of an appointment.
///
/// Every booking starts as `Pending`. An admin moves it to `Confirmed` or
/// `Cancelled`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// Convert a string to a status value.
    pub fn from_string(value: &str) -> Result<Self, String> {
        match value.to_lowercase().trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(format!(
                "Invalid status: '{}'. Must be one of: pending, confirmed, cancelled",
                value
            )),
        }
    }

    /// Stored name of the status.
    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Display text. Never persisted or compared against.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }

    /// Allowed transitions: `pending -> confirmed` and `pending -> cancelled`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role label attached to a user. Only drives what the client shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    pub fn from_string(value: &str) -> Result<Self, String> {
        match value.to_lowercase().trim() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            _ => Err(format!(
                "Invalid role: '{}'. Must be one of: admin, doctor, patient",
                value
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A doctor from the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub image: String,
}

/// The patient a booking is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRef {
    pub id: String,
    pub name: String,
}

impl PatientRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        PatientRef {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl From<&User> for PatientRef {
    fn from(user: &User) -> Self {
        PatientRef::new(user.id.clone(), user.name.clone())
    }
}

/// A booked appointment as stored in the appointments slot.
///
/// `doctor_name` and `specialty` are a snapshot taken from the catalog at
/// booking time. Display code joins against the catalog instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub date: String,
    pub time: String,
    pub specialty: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// Build a new pending appointment from validated booking inputs.
    pub fn pending(
        id: String,
        patient: &PatientRef,
        doctor: &Doctor,
        date: &str,
        time: &str,
    ) -> Self {
        Appointment {
            id,
            patient_id: patient.id.clone(),
            patient_name: patient.name.clone(),
            doctor_id: doctor.id.clone(),
            doctor_name: doctor.name.clone(),
            date: date.trim().to_string(),
            time: time.trim().to_string(),
            specialty: doctor.specialty.clone(),
            status: AppointmentStatus::Pending,
        }
    }

    pub fn is_for_patient(&self, patient_id: &str) -> bool {
        self.patient_id == patient_id
    }

    /// Parse the stored date, accepting `DD/MM/YYYY` and `YYYY-MM-DD`.
    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        let date = self.date.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
    }

    pub fn scheduled_time(&self) -> Option<NaiveTime> {
        let time = self.time.trim();
        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
    }
}

/// Pick an identifier for a new appointment.
///
/// Identifiers are creation times in Unix milliseconds. If `now_millis` is
/// already taken the next free millisecond is used instead.
pub fn next_appointment_id(now_millis: i64, existing: &[Appointment]) -> String {
    let taken: HashSet<&str> = existing.iter().map(|a| a.id.as_str()).collect();
    let mut candidate = now_millis;
    while taken.contains(candidate.to_string().as_str()) {
        candidate += 1;
    }
    candidate.to_string()
}

/// What the booking form collected. Nothing is guaranteed present until
/// [`BookingRequest::validate`] succeeds.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient: PatientRef,
    pub doctor: Option<Doctor>,
    pub date: String,
    pub time: String,
}

impl BookingRequest {
    pub fn new(
        patient: PatientRef,
        doctor: Option<Doctor>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        BookingRequest {
            patient,
            doctor,
            date: date.into(),
            time: time.into(),
        }
    }

    /// Check that date, time and doctor are all present.
    ///
    /// Whitespace-only date or time counts as missing. Every missing field is
    /// reported, not just the first.
    pub fn validate(&self) -> Result<&Doctor, ValidationError> {
        let mut missing = Vec::new();
        if self.date.trim().is_empty() {
            missing.push(BookingField::Date);
        }
        if self.time.trim().is_empty() {
            missing.push(BookingField::Time);
        }
        match &self.doctor {
            Some(doctor) if missing.is_empty() => Ok(doctor),
            Some(_) => Err(ValidationError { missing }),
            None => {
                missing.push(BookingField::Doctor);
                Err(ValidationError { missing })
            }
        }
    }
}

/// A registered account as stored in the users slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl User {
    /// Create a new user with validation.
    ///
    /// A specialty is only kept for doctors.
    pub fn new(
        name: String,
        email: String,
        role: Role,
        specialty: Option<String>,
        image: Option<String>,
    ) -> Result<Self, UserError> {
        let name = name.trim().to_string();
        let email = email.trim().to_string();

        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push("name");
        }
        if email.is_empty() {
            missing.push("email");
        }
        if !missing.is_empty() {
            return Err(UserError::Validation { missing });
        }

        let specialty = match role {
            Role::Doctor => specialty
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        };

        Ok(User {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            role,
            specialty,
            image,
        })
    }
}
