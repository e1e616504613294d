//! Static doctor catalog and the display join.
//!
//! Appointments carry a snapshot of the doctor's name and specialty taken at
//! booking time. Everything that renders an appointment goes through
//! [`DoctorCatalog::join`] so the catalog stays the single source of truth for
//! display data.

use crate::models::{Appointment, Doctor};
use chrono::{Duration, NaiveTime};
use std::fmt;

/// Shown in place of a doctor name when the appointment's doctor id is not in
/// the catalog.
pub const DOCTOR_NOT_FOUND: &str = "doctor not found";

#[derive(Debug, Clone)]
pub struct DoctorCatalog {
    doctors: Vec<Doctor>,
}

impl DoctorCatalog {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        DoctorCatalog { doctors }
    }

    /// The doctors offered by the booking screen.
    pub fn builtin() -> Self {
        let entry = |id: &str, name: &str, specialty: &str, image: &str| Doctor {
            id: id.to_string(),
            name: name.to_string(),
            specialty: specialty.to_string(),
            image: image.to_string(),
        };

        DoctorCatalog::new(vec![
            entry(
                "1",
                "Dr. João Silva",
                "Cardiology",
                "https://randomuser.me/api/portraits/men/1.jpg",
            ),
            entry(
                "2",
                "Dra. Maria Santos",
                "Pediatrics",
                "https://randomuser.me/api/portraits/women/1.jpg",
            ),
            entry(
                "3",
                "Dr. Pedro Oliveira",
                "Orthopedics",
                "https://randomuser.me/api/portraits/men/2.jpg",
            ),
            entry(
                "4",
                "Dra. Ana Costa",
                "Dermatology",
                "https://randomuser.me/api/portraits/women/2.jpg",
            ),
            entry(
                "5",
                "Dr. Carlos Mendes",
                "Ophthalmology",
                "https://randomuser.me/api/portraits/men/3.jpg",
            ),
        ])
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn find(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == doctor_id)
    }

    /// Decorate an appointment with catalog data.
    ///
    /// An unknown doctor id does not fail: the view gets the placeholder name,
    /// keeps the booked specialty and is marked `orphaned`.
    pub fn join(&self, appointment: &Appointment) -> AppointmentView {
        match self.find(&appointment.doctor_id) {
            Some(doctor) => AppointmentView {
                appointment: appointment.clone(),
                doctor_name: doctor.name.clone(),
                specialty: doctor.specialty.clone(),
                avatar: Some(doctor.image.clone()),
                orphaned: false,
            },
            None => AppointmentView {
                appointment: appointment.clone(),
                doctor_name: DOCTOR_NOT_FOUND.to_string(),
                specialty: appointment.specialty.clone(),
                avatar: None,
                orphaned: true,
            },
        }
    }

    pub fn join_all(&self, appointments: &[Appointment]) -> Vec<AppointmentView> {
        appointments.iter().map(|a| self.join(a)).collect()
    }
}

impl Default for DoctorCatalog {
    fn default() -> Self {
        DoctorCatalog::builtin()
    }
}

/// Bookable times of day as `HH:MM` labels.
///
/// Slots of `step_minutes` run from `start` while they end by `end`. Slots
/// overlapping the `break_window` are skipped.
pub fn time_slots(
    start: NaiveTime,
    end: NaiveTime,
    step_minutes: i64,
    break_window: Option<(NaiveTime, NaiveTime)>,
) -> Vec<String> {
    let mut slots = Vec::new();
    if step_minutes <= 0 {
        return slots;
    }
    let Some(step) = Duration::try_minutes(step_minutes) else {
        return slots;
    };
    let mut current = start;

    while current < end {
        let (slot_end, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 || slot_end > end {
            break;
        }

        let in_break = match break_window {
            Some((break_start, break_end)) => current < break_end && slot_end > break_start,
            None => false,
        };
        if !in_break {
            slots.push(current.format("%H:%M").to_string());
        }

        current = slot_end;
    }

    slots
}

/// The slots offered by the booking form: every 30 minutes from 09:00 to
/// 17:00 with a 12:00-13:00 lunch break.
pub fn default_time_slots() -> Vec<String> {
    let at = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
    time_slots(at(9), at(17), 30, Some((at(12), at(13))))
}

/// An appointment ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentView {
    pub appointment: Appointment,
    pub doctor_name: String,
    pub specialty: String,
    pub avatar: Option<String>,
    /// The appointment references a doctor id missing from the catalog.
    pub orphaned: bool,
}

impl fmt::Display for AppointmentView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:9}] #{} {} at {} with {} ({})",
            self.appointment.status.label(),
            self.appointment.id,
            self.appointment.date,
            self.appointment.time,
            self.doctor_name,
            self.specialty
        )
    }
}
