//! Command-line interface for the booking system.
//!
//! This binary provides an interactive menu for registering users, booking
//! appointments as a patient and confirming or cancelling them as an admin.

use chrono::Local;
use medbook::catalog::default_time_slots;
use medbook::lifecycle::StatusSummary;
use medbook::models::Appointment;
use medbook::{
    AppConfig, AppointmentError, AppointmentManager, BookingRequest, CollectionStore,
    DoctorCatalog, FileBackend, MemoryBackend, PatientRef, Role, User, UserDirectory,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Turn a 1-based menu number into a list index. Zero, negatives and
/// anything out of range of `usize` pick nothing.
fn menu_pick(choice: i64) -> Option<usize> {
    choice.checked_sub(1).and_then(|n| usize::try_from(n).ok())
}

struct MedbookCLI {
    appointments: AppointmentManager<FileBackend>,
    users: UserDirectory<FileBackend>,
    session: Option<User>,
    recent_limit: usize,
    running: bool,
}

impl MedbookCLI {
    fn new(config: &AppConfig) -> Self {
        let store = Arc::new(CollectionStore::new(FileBackend::new(&config.data_dir)));
        MedbookCLI {
            appointments: AppointmentManager::new(Arc::clone(&store), DoctorCatalog::builtin()),
            users: UserDirectory::new(store),
            session: None,
            recent_limit: config.recent_limit,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       MEDICAL APPOINTMENT BOOKING");
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        match &self.session {
            Some(user) => println!("\n--- Signed in as {} ({}) ---", user.name, user.role.label()),
            None => println!("\n--- Not signed in ---"),
        }
        println!("1. Register user");
        println!("2. Sign in");
        println!("3. Sign out");
        println!("4. Book appointment");
        println!("5. My appointments");
        println!("6. My upcoming appointments");
        println!("7. All appointments (admin)");
        println!("8. Recent appointments (admin)");
        println!("9. Confirm appointment (admin)");
        println!("10. Cancel appointment (admin)");
        println!("11. Manage users (admin)");
        println!("12. Migrate legacy appointments");
        println!("13. Run demo");
        println!("14. Exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&mut self, prompt: &str, default: Option<&str>) -> String {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => {
                self.running = false;
                return default.unwrap_or("").to_string();
            }
            Ok(_) => {}
        }
        let input = input.trim();

        if input.is_empty() {
            default.unwrap_or("").to_string()
        } else {
            input.to_string()
        }
    }

    fn get_int_input(&mut self, prompt: &str, default: Option<i64>) -> i64 {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref());

            if let Ok(value) = input.parse::<i64>() {
                return value;
            }
            if !self.running {
                return default.unwrap_or(0);
            }
            println!("Please enter a valid number");
        }
    }

    fn require_session(&self) -> Option<User> {
        if self.session.is_none() {
            println!("\nPlease sign in first (option 2)");
        }
        self.session.clone()
    }

    fn require_admin(&self) -> bool {
        match &self.session {
            Some(user) if user.role == Role::Admin => true,
            Some(_) => {
                println!("\nOnly administrators can do that");
                false
            }
            None => {
                println!("\nPlease sign in as an administrator first (option 2)");
                false
            }
        }
    }

    fn register_user(&mut self) {
        println!("\n--- Register User ---");

        let name = self.get_input("Name", None);
        let email = self.get_input("Email", None);

        println!("\nRoles:");
        println!("  1. Patient");
        println!("  2. Doctor");
        println!("  3. Admin");
        let role = match self.get_int_input("Select role", Some(1)) {
            2 => Role::Doctor,
            3 => Role::Admin,
            _ => Role::Patient,
        };

        let specialty = if role == Role::Doctor {
            Some(self.get_input("Specialty", None))
        } else {
            None
        };

        match self.users.register(&name, &email, role, specialty.as_deref(), None) {
            Ok(user) => println!("\nRegistered {} as {}", user.name, user.role.label()),
            Err(e) => println!("\nCould not register: {}", e),
        }
    }

    fn sign_in(&mut self) {
        println!("\n--- Sign In ---");
        let email = self.get_input("Email", None);

        match self.users.find_by_email(&email) {
            Ok(Some(user)) => {
                info!(id = %user.id, "signed in");
                println!("\nWelcome, {}", user.name);
                self.session = Some(user);
            }
            Ok(None) => println!("\nNo user with that email"),
            Err(e) => println!("\nCould not read users: {}", e),
        }
    }

    fn sign_out(&mut self) {
        if let Some(user) = self.session.take() {
            info!(id = %user.id, "signed out");
            println!("\nGoodbye, {}", user.name);
        }
    }

    fn book_appointment(&mut self) {
        let Some(user) = self.require_session() else {
            return;
        };

        println!("\n--- Book Appointment ---");

        let date = self.get_input("Date (DD/MM/YYYY)", None);

        let slots = default_time_slots();
        println!("\nAvailable times:");
        for (i, slot) in slots.iter().enumerate() {
            println!("  {:2}. {}", i + 1, slot);
        }
        let slot_choice = self.get_int_input("Select time (0 for none)", Some(0));
        let time = menu_pick(slot_choice)
            .and_then(|i| slots.get(i).cloned())
            .unwrap_or_default();

        let doctors = self.appointments.catalog().doctors().to_vec();
        println!("\nDoctors:");
        for (i, doctor) in doctors.iter().enumerate() {
            println!("  {}. {} - {}", i + 1, doctor.name, doctor.specialty);
        }
        let doctor_choice = self.get_int_input("Select doctor (0 for none)", Some(0));
        let doctor = menu_pick(doctor_choice).and_then(|i| doctors.get(i).cloned());

        let request = BookingRequest::new(PatientRef::from(&user), doctor, date, time);
        match self.appointments.create(&request) {
            Ok(apt) => println!(
                "\nAppointment booked with {} on {} at {} (#{})",
                apt.doctor_name, apt.date, apt.time, apt.id
            ),
            Err(AppointmentError::Validation(e)) => println!("\nPlease fill in: {}", e),
            Err(e) => {
                error!(error = %e, "booking failed");
                println!("\nCould not book the appointment, please try again");
            }
        }
    }

    fn show_appointments(&self, title: &str, appointments: &[Appointment]) {
        if appointments.is_empty() {
            println!("\nNo appointments");
            return;
        }

        println!("\n--- {} ({}) ---", title, appointments.len());
        for view in self.appointments.join_for_display(appointments) {
            println!("  {}", view);
            if !view.appointment.patient_name.is_empty() {
                println!("             patient: {}", view.appointment.patient_name);
            }
        }
    }

    fn view_my_appointments(&self) {
        let Some(user) = self.require_session() else {
            return;
        };
        match self.appointments.list_for_patient(&user.id) {
            Ok(list) => self.show_appointments("My Appointments", &list),
            Err(e) => println!("\nCould not load appointments: {}", e),
        }
    }

    fn view_upcoming(&self) {
        let Some(user) = self.require_session() else {
            return;
        };
        let today = Local::now().date_naive();
        match self.appointments.list_upcoming_for_patient(&user.id, today) {
            Ok(list) => self.show_appointments("Upcoming Appointments", &list),
            Err(e) => println!("\nCould not load appointments: {}", e),
        }
    }

    fn print_summary(summary: &StatusSummary) {
        println!("\n  Total: {}", summary.total());
        println!("  Pending: {}", summary.pending);
        println!("  Confirmed: {}", summary.confirmed);
        println!("  Cancelled: {}", summary.cancelled);
        println!("  Confirmation rate: {:.1}%", summary.confirmation_rate());
    }

    fn view_all_appointments(&self) {
        if !self.require_admin() {
            return;
        }
        match self.appointments.list_all() {
            Ok(list) => {
                self.show_appointments("All Appointments", &list);
                Self::print_summary(&medbook::lifecycle::summarize(&list));
            }
            Err(e) => println!("\nCould not load appointments: {}", e),
        }
    }

    fn view_recent(&self) {
        if !self.require_admin() {
            return;
        }
        match self.appointments.list_recent(self.recent_limit) {
            Ok(list) => self.show_appointments("Recent Appointments", &list),
            Err(e) => println!("\nCould not load appointments: {}", e),
        }
    }

    fn change_status(&mut self, confirm: bool) {
        if !self.require_admin() {
            return;
        }

        let pending: Vec<Appointment> = match self.appointments.list_all() {
            Ok(list) => list.into_iter().filter(|a| !a.status.is_terminal()).collect(),
            Err(e) => {
                println!("\nCould not load appointments: {}", e);
                return;
            }
        };
        if pending.is_empty() {
            println!("\nNo pending appointments");
            return;
        }
        self.show_appointments("Pending Appointments", &pending);

        let id = self.get_input("Appointment id", None);
        let result = if confirm {
            self.appointments.confirm(&id)
        } else {
            self.appointments.cancel(&id)
        };

        match result {
            Ok(Some(apt)) => println!("\nAppointment #{} is now {}", apt.id, apt.status.label()),
            Ok(None) => println!("\nNo appointment with id {}", id),
            Err(e) => println!("\n{}", e),
        }
    }

    fn manage_users(&mut self) {
        if !self.require_admin() {
            return;
        }
        let current = self.session.as_ref().map(|u| u.id.clone()).unwrap_or_default();

        let others = match self.users.list_except(&current) {
            Ok(list) => list,
            Err(e) => {
                println!("\nCould not load users: {}", e);
                return;
            }
        };
        if others.is_empty() {
            println!("\nNo other users");
            return;
        }

        println!("\n--- Users ({}) ---", others.len());
        for (i, user) in others.iter().enumerate() {
            print!("  {}. {} <{}> [{}]", i + 1, user.name, user.email, user.role.label());
            if let Some(specialty) = &user.specialty {
                print!(" {}", specialty);
            }
            println!();
        }

        let choice = self.get_int_input("Delete user number (0 to keep all)", Some(0));
        let Some(target) = menu_pick(choice).and_then(|i| others.get(i)) else {
            return;
        };
        match self.users.delete(&target.id) {
            Ok(true) => println!("\nDeleted {}", target.name),
            Ok(false) => println!("\n{} was already gone", target.name),
            Err(e) => println!("\nCould not delete user: {}", e),
        }
    }

    fn migrate_legacy(&self) {
        match self.appointments.store().migrate_legacy_appointments() {
            Ok(0) => println!("\nNothing to migrate"),
            Ok(n) => println!("\nMigrated {} appointments", n),
            Err(e) => println!("\nMigration failed: {}", e),
        }
    }

    fn run(&mut self) {
        self.print_header();

        while self.running {
            self.print_menu();

            let choice = self.get_int_input("Enter choice", Some(13));
            if !self.running {
                break;
            }

            match choice {
                1 => self.register_user(),
                2 => self.sign_in(),
                3 => self.sign_out(),
                4 => self.book_appointment(),
                5 => self.view_my_appointments(),
                6 => self.view_upcoming(),
                7 => self.view_all_appointments(),
                8 => self.view_recent(),
                9 => self.change_status(true),
                10 => self.change_status(false),
                11 => self.manage_users(),
                12 => self.migrate_legacy(),
                13 => {
                    if let Err(e) = run_demo() {
                        println!("\nDemo failed: {}", e);
                    }
                }
                14 => {
                    self.running = false;
                    println!("\nGoodbye!");
                }
                _ => println!("Invalid choice"),
            }
        }
    }
}

/// Walk through a booking and its review against a throwaway in-memory store.
fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n--- Running Demo ---");

    let store = Arc::new(CollectionStore::new(MemoryBackend::new()));
    let users = UserDirectory::new(Arc::clone(&store));
    let manager = AppointmentManager::new(Arc::clone(&store), DoctorCatalog::builtin());

    let admin = users.register("Admin", "admin@medical.app", Role::Admin, None, None)?;
    let ana = users.register("Ana Lima", "ana@medical.app", Role::Patient, None, None)?;
    let bruno = users.register("Bruno Reis", "bruno@medical.app", Role::Patient, None, None)?;
    println!("Registered {}, {} and {}", admin.name, ana.name, bruno.name);

    let catalog = manager.catalog().clone();
    let bookings = [
        (&ana, "1", "20/05/2026", "09:00"),
        (&bruno, "2", "20/05/2026", "10:30"),
        (&ana, "4", "02/06/2026", "14:00"),
    ];
    let mut booked = Vec::new();
    for (patient, doctor_id, date, time) in bookings {
        let request = BookingRequest::new(
            PatientRef::from(patient),
            catalog.find(doctor_id).cloned(),
            date,
            time,
        );
        booked.push(manager.create(&request)?);
    }
    println!("Booked {} appointments", booked.len());

    let incomplete = BookingRequest::new(PatientRef::from(&ana), None, "", "09:30");
    if let Err(e) = manager.create(&incomplete) {
        println!("Incomplete booking rejected: {}", e);
    }

    manager.confirm(&booked[0].id)?;
    manager.cancel(&booked[1].id)?;
    if let Err(e) = manager.cancel(&booked[0].id) {
        println!("Second transition rejected: {}", e);
    }

    println!("\nAna's appointments:");
    for view in manager.join_for_display(&manager.list_for_patient(&ana.id)?) {
        println!("  {}", view);
    }

    println!("\nAll appointments:");
    for view in manager.join_for_display(&manager.list_all()?) {
        println!("  {}", view);
    }

    MedbookCLI::print_summary(&manager.summary()?);
    println!("\n{} writes hit the in-memory store", store.backend().write_count());
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let (config, warnings) = AppConfig::from_env();
    init_tracing(&config);
    for warning in &warnings {
        warning.log();
    }
    info!(data_dir = %config.data_dir.display(), "starting");

    let mut cli = MedbookCLI::new(&config);
    cli.run();
}
