//! Appointment lifecycle on top of the collection store.
//!
//! This module provides the AppointmentManager which books appointments,
//! moves them through their status lifecycle and answers the list queries the
//! dashboards need. Every mutation is a single locked read-modify-write of the
//! appointments slot.

use crate::catalog::{AppointmentView, DoctorCatalog};
use crate::error::{AppointmentError, StoreError};
use crate::models::{next_appointment_id, Appointment, AppointmentStatus, BookingRequest};
use crate::store::{keys, Change, CollectionStore, KeyValueBackend};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Appointment counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.pending + self.confirmed + self.cancelled
    }

    /// Share of decided appointments that were confirmed, as a percentage.
    pub fn confirmation_rate(&self) -> f64 {
        let decided = self.confirmed + self.cancelled;
        if decided == 0 {
            return 0.0;
        }
        (self.confirmed as f64 / decided as f64) * 100.0
    }
}

/// Records whose patient id matches, in stored order.
pub fn filter_for_patient(appointments: &[Appointment], patient_id: &str) -> Vec<Appointment> {
    appointments
        .iter()
        .filter(|a| a.is_for_patient(patient_id))
        .cloned()
        .collect()
}

/// The newest `limit` records, newest first.
pub fn most_recent(appointments: &[Appointment], limit: usize) -> Vec<Appointment> {
    appointments.iter().rev().take(limit).cloned().collect()
}

/// Non-cancelled records dated `today` or later, soonest first.
///
/// Records whose date does not parse are left out.
pub fn upcoming(appointments: &[Appointment], today: NaiveDate) -> Vec<Appointment> {
    let mut dated: Vec<(NaiveDate, &Appointment)> = appointments
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .filter_map(|a| a.scheduled_date().map(|d| (d, a)))
        .filter(|(d, _)| *d >= today)
        .collect();
    dated.sort_by_key(|(d, a)| (*d, a.scheduled_time()));
    dated.into_iter().map(|(_, a)| a.clone()).collect()
}

pub fn summarize(appointments: &[Appointment]) -> StatusSummary {
    appointments
        .iter()
        .fold(StatusSummary::default(), |mut summary, a| {
            match a.status {
                AppointmentStatus::Pending => summary.pending += 1,
                AppointmentStatus::Confirmed => summary.confirmed += 1,
                AppointmentStatus::Cancelled => summary.cancelled += 1,
            }
            summary
        })
}

/// Books appointments and applies status transitions.
///
/// Holds no appointment state of its own: every call reads the shared store.
pub struct AppointmentManager<B: KeyValueBackend> {
    store: Arc<CollectionStore<B>>,
    catalog: DoctorCatalog,
    clock: fn() -> i64,
}

impl<B: KeyValueBackend> AppointmentManager<B> {
    pub fn new(store: Arc<CollectionStore<B>>, catalog: DoctorCatalog) -> Self {
        AppointmentManager {
            store,
            catalog,
            clock: now_millis,
        }
    }

    /// Replace the millisecond clock used for new identifiers.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &DoctorCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &CollectionStore<B> {
        &self.store
    }

    /// Validate a booking and append it as a new pending appointment.
    ///
    /// Nothing is read or written when validation fails.
    pub fn create(&self, request: &BookingRequest) -> Result<Appointment, AppointmentError> {
        let doctor = request.validate()?;
        let now = (self.clock)();

        let appointment = self.store.update(keys::APPOINTMENTS, |items: &mut Vec<Appointment>| {
            let id = next_appointment_id(now, items);
            let appointment =
                Appointment::pending(id, &request.patient, doctor, &request.date, &request.time);
            items.push(appointment.clone());
            Ok::<_, AppointmentError>(Change::Commit(appointment))
        })?;

        info!(
            id = %appointment.id,
            patient = %appointment.patient_id,
            doctor = %appointment.doctor_id,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Move an appointment to `to`.
    ///
    /// Returns `Ok(None)` without writing when no appointment has that id.
    /// Transitions not allowed from the current status are rejected and the
    /// slot is left untouched.
    pub fn transition(
        &self,
        appointment_id: &str,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppointmentError> {
        self.store
            .update(keys::APPOINTMENTS, |items: &mut Vec<Appointment>| {
                let Some(appointment) = items.iter_mut().find(|a| a.id == appointment_id) else {
                    debug!(id = appointment_id, "transition target not found");
                    return Ok(Change::Discard(None));
                };

                let from = appointment.status;
                if !from.can_transition_to(to) {
                    warn!(id = appointment_id, %from, %to, "rejected status transition");
                    return Err(AppointmentError::InvalidTransition {
                        id: appointment_id.to_string(),
                        from,
                        to,
                    });
                }

                appointment.status = to;
                info!(id = appointment_id, %from, %to, "appointment status changed");
                Ok(Change::Commit(Some(appointment.clone())))
            })
    }

    pub fn confirm(&self, appointment_id: &str) -> Result<Option<Appointment>, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Confirmed)
    }

    pub fn cancel(&self, appointment_id: &str) -> Result<Option<Appointment>, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled)
    }

    pub fn get(&self, appointment_id: &str) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|a| a.id == appointment_id))
    }

    /// Every appointment in booking order. Admin view.
    pub fn list_all(&self) -> Result<Vec<Appointment>, StoreError> {
        self.store.load(keys::APPOINTMENTS)
    }

    pub fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, StoreError> {
        Ok(filter_for_patient(&self.list_all()?, patient_id))
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<Appointment>, StoreError> {
        Ok(most_recent(&self.list_all()?, limit))
    }

    pub fn list_upcoming_for_patient(
        &self,
        patient_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(upcoming(&self.list_for_patient(patient_id)?, today))
    }

    pub fn summary(&self) -> Result<StatusSummary, StoreError> {
        Ok(summarize(&self.list_all()?))
    }

    pub fn join_for_display(&self, appointments: &[Appointment]) -> Vec<AppointmentView> {
        self.catalog.join_all(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BookingField;
    use crate::models::{Doctor, PatientRef};
    use crate::store::MemoryBackend;

    fn fixed_clock() -> i64 {
        1_700_000_000_000
    }

    fn manager() -> AppointmentManager<MemoryBackend> {
        let store = Arc::new(CollectionStore::new(MemoryBackend::new()));
        AppointmentManager::new(store, DoctorCatalog::builtin()).with_clock(fixed_clock)
    }

    fn doctor(manager: &AppointmentManager<MemoryBackend>, id: &str) -> Doctor {
        manager.catalog().find(id).cloned().unwrap()
    }

    fn book(manager: &AppointmentManager<MemoryBackend>, patient: &str, date: &str) -> Appointment {
        let request = BookingRequest::new(
            PatientRef::new(patient, "Patient"),
            Some(doctor(manager, "1")),
            date,
            "10:00",
        );
        manager.create(&request).unwrap()
    }

    #[test]
    fn create_appends_pending_record() {
        let manager = manager();
        let apt = book(&manager, "p1", "20/05/2025");

        assert_eq!(apt.status, AppointmentStatus::Pending);
        assert_eq!(apt.id, "1700000000000");
        assert_eq!(apt.doctor_name, "Dr. João Silva");
        assert_eq!(apt.specialty, "Cardiology");
        assert_eq!(manager.list_all().unwrap(), vec![apt]);
    }

    #[test]
    fn ids_stay_unique_with_a_frozen_clock() {
        let manager = manager();
        let a = book(&manager, "p1", "20/05/2025");
        let b = book(&manager, "p1", "21/05/2025");
        assert_ne!(a.id, b.id);
        assert_eq!(b.id, "1700000000001");
    }

    #[test]
    fn missing_date_fails_without_writing() {
        let manager = manager();
        let request = BookingRequest::new(
            PatientRef::new("p1", "Ana"),
            Some(doctor(&manager, "2")),
            "",
            "10:00",
        );
        match manager.create(&request) {
            Err(AppointmentError::Validation(err)) => {
                assert_eq!(err.missing, vec![BookingField::Date])
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(manager.store().backend().write_count(), 0);
        assert!(manager.list_all().unwrap().is_empty());
    }

    #[test]
    fn confirm_then_cancel_is_rejected() {
        let manager = manager();
        let apt = book(&manager, "p1", "20/05/2025");

        let confirmed = manager.confirm(&apt.id).unwrap().unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let writes = manager.store().backend().write_count();
        match manager.cancel(&apt.id) {
            Err(AppointmentError::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, AppointmentStatus::Confirmed);
                assert_eq!(to, AppointmentStatus::Cancelled);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(manager.store().backend().write_count(), writes);
        assert_eq!(
            manager.get(&apt.id).unwrap().unwrap().status,
            AppointmentStatus::Confirmed
        );
    }

    #[test]
    fn pending_cannot_be_set_to_pending() {
        let manager = manager();
        let apt = book(&manager, "p1", "20/05/2025");
        assert!(manager
            .transition(&apt.id, AppointmentStatus::Pending)
            .is_err());
    }

    #[test]
    fn unknown_id_is_a_silent_no_op() {
        let manager = manager();
        book(&manager, "p1", "20/05/2025");
        let writes = manager.store().backend().write_count();
        assert_eq!(manager.confirm("nope").unwrap(), None);
        assert_eq!(manager.store().backend().write_count(), writes);
    }

    #[test]
    fn patient_view_keeps_booking_order() {
        let manager = manager();
        let first = book(&manager, "p1", "20/05/2025");
        book(&manager, "p2", "20/05/2025");
        let third = book(&manager, "p1", "01/01/2025");

        let mine = manager.list_for_patient("p1").unwrap();
        assert_eq!(mine, vec![first, third]);
        assert!(manager.list_for_patient("p9").unwrap().is_empty());
    }

    #[test]
    fn recent_is_newest_first() {
        let manager = manager();
        let ids: Vec<String> = (0..4)
            .map(|_| book(&manager, "p1", "20/05/2025").id)
            .collect();
        let recent: Vec<String> = manager
            .list_recent(2)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(recent, vec![ids[3].clone(), ids[2].clone()]);
    }

    #[test]
    fn upcoming_skips_past_cancelled_and_undated() {
        let manager = manager();
        let past = book(&manager, "p1", "01/01/2020");
        let later = book(&manager, "p1", "2025-07-01");
        let sooner = book(&manager, "p1", "15/06/2025");
        let dropped = book(&manager, "p1", "20/06/2025");
        book(&manager, "p1", "someday");
        manager.cancel(&dropped.id).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let ids: Vec<String> = manager
            .list_upcoming_for_patient("p1", today)
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
        assert!(!ids.contains(&past.id));
    }

    #[test]
    fn summary_counts_statuses() {
        let manager = manager();
        let a = book(&manager, "p1", "20/05/2025");
        let b = book(&manager, "p2", "20/05/2025");
        book(&manager, "p3", "20/05/2025");
        manager.confirm(&a.id).unwrap();
        manager.cancel(&b.id).unwrap();

        let summary = manager.summary().unwrap();
        assert_eq!(
            summary,
            StatusSummary {
                pending: 1,
                confirmed: 1,
                cancelled: 1
            }
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.confirmation_rate(), 50.0);
    }

    #[test]
    fn corrupt_slot_surfaces_as_store_error() {
        let backend = MemoryBackend::new().with_slot(keys::APPOINTMENTS, "[{\"id\":");
        let manager = AppointmentManager::new(
            Arc::new(CollectionStore::new(backend)),
            DoctorCatalog::builtin(),
        );
        assert!(matches!(
            manager.list_all(),
            Err(StoreError::Decode { .. })
        ));
        assert!(matches!(
            manager.confirm("1"),
            Err(AppointmentError::Store(StoreError::Decode { .. }))
        ));
    }
}
