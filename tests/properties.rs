use medbook::lifecycle::filter_for_patient;
use medbook::models::Appointment;
use medbook::store::keys;
use medbook::{
    AppointmentManager, AppointmentStatus, BookingRequest, CollectionStore, DoctorCatalog,
    MemoryBackend, PatientRef,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn status() -> impl Strategy<Value = AppointmentStatus> {
    prop_oneof![
        Just(AppointmentStatus::Pending),
        Just(AppointmentStatus::Confirmed),
        Just(AppointmentStatus::Cancelled),
    ]
}

prop_compose! {
    fn appointment()(
        id in "[0-9]{1,13}",
        patient in prop::sample::select(vec!["p1", "p2", "p3"]),
        doctor in prop::sample::select(vec!["1", "2", "3", "4", "5", "99"]),
        day in 1u32..=28,
        month in 1u32..=12,
        time in prop::sample::select(vec!["09:00", "10:30", "14:00"]),
        status in status(),
    ) -> Appointment {
        Appointment {
            id,
            patient_id: patient.to_string(),
            patient_name: format!("Name of {}", patient),
            doctor_id: doctor.to_string(),
            doctor_name: format!("Doctor {}", doctor),
            date: format!("{:02}/{:02}/2025", day, month),
            time: time.to_string(),
            specialty: "General".to_string(),
            status,
        }
    }
}

fn manager_with(seed: &[Appointment]) -> AppointmentManager<MemoryBackend> {
    let store = Arc::new(CollectionStore::new(MemoryBackend::new()));
    store.save(keys::APPOINTMENTS, seed).unwrap();
    AppointmentManager::new(store, DoctorCatalog::builtin())
}

proptest! {
    #[test]
    fn save_then_load_is_identity(items in prop::collection::vec(appointment(), 0..20)) {
        let store = CollectionStore::new(MemoryBackend::new());
        store.save(keys::APPOINTMENTS, &items).unwrap();
        let loaded: Vec<Appointment> = store.load(keys::APPOINTMENTS).unwrap();
        prop_assert_eq!(loaded, items);
    }

    #[test]
    fn patient_filter_is_an_ordered_subset(
        items in prop::collection::vec(appointment(), 0..20).prop_shuffle(),
        patient in prop::sample::select(vec!["p1", "p2", "p3", "nobody"]),
    ) {
        let manager = manager_with(&items);
        let mine = manager.list_for_patient(patient).unwrap();

        let expected: Vec<Appointment> =
            items.iter().filter(|a| a.patient_id == patient).cloned().collect();
        prop_assert_eq!(&mine, &expected);
        prop_assert_eq!(filter_for_patient(&items, patient), expected);
    }

    #[test]
    fn valid_booking_appends_one_fresh_pending_record(
        items in prop::collection::vec(appointment(), 0..15),
        doctor_id in prop::sample::select(vec!["1", "2", "3", "4", "5"]),
    ) {
        let manager = manager_with(&items);
        let doctor = manager.catalog().find(doctor_id).cloned();
        let request =
            BookingRequest::new(PatientRef::new("p1", "Ana"), doctor, "05/05/2025", "09:00");

        let created = manager.create(&request).unwrap();
        let after = manager.list_all().unwrap();

        prop_assert_eq!(after.len(), items.len() + 1);
        prop_assert_eq!(&after[..items.len()], &items[..]);
        prop_assert_eq!(after.last(), Some(&created));
        prop_assert_eq!(created.status, AppointmentStatus::Pending);
        prop_assert!(items.iter().all(|a| a.id != created.id));
    }

    #[test]
    fn incomplete_booking_never_writes(
        date in prop::sample::select(vec!["", "  ", "05/05/2025"]),
        time in prop::sample::select(vec!["", "09:00"]),
        with_doctor in any::<bool>(),
    ) {
        prop_assume!(date.trim().is_empty() || time.is_empty() || !with_doctor);

        let manager = manager_with(&[]);
        let doctor = if with_doctor { manager.catalog().find("1").cloned() } else { None };
        let request = BookingRequest::new(PatientRef::new("p1", "Ana"), doctor, date, time);

        prop_assert!(manager.create(&request).is_err());
        prop_assert_eq!(manager.store().backend().write_count(), 1);
        prop_assert!(manager.list_all().unwrap().is_empty());
    }

    #[test]
    fn repeated_bookings_get_distinct_ids(count in 1usize..30) {
        let manager = manager_with(&[]).with_clock(|| 42);
        let doctor = manager.catalog().find("2").cloned();
        let mut ids = HashSet::new();
        for _ in 0..count {
            let request = BookingRequest::new(
                PatientRef::new("p2", "Bruno"),
                doctor.clone(),
                "01/01/2026",
                "13:00",
            );
            ids.insert(manager.create(&request).unwrap().id);
        }
        prop_assert_eq!(ids.len(), count);
    }

    #[test]
    fn terminal_records_reject_every_transition(
        start in prop_oneof![
            Just(AppointmentStatus::Confirmed),
            Just(AppointmentStatus::Cancelled),
        ],
        target in status(),
    ) {
        let mut record = Appointment {
            id: "1".into(),
            patient_id: "p1".into(),
            patient_name: "Ana".into(),
            doctor_id: "1".into(),
            doctor_name: "Dr. João Silva".into(),
            date: "01/01/2026".into(),
            time: "09:00".into(),
            specialty: "Cardiology".into(),
            status: AppointmentStatus::Pending,
        };
        record.status = start;
        let manager = manager_with(&[record.clone()]);

        prop_assert!(manager.transition("1", target).is_err());
        prop_assert_eq!(manager.list_all().unwrap(), vec![record]);
    }
}
