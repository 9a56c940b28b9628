//! Shared clinic state and the entry points the web layer calls.
//!
//! Every operation takes the state lock once and performs all of its checks
//! and writes while holding it. Two bookings racing for the same seat or the
//! same patient window are therefore serialized, and the loser sees the
//! winner's write when it runs its checks.

use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::directory::{Directory, Doctor};
use crate::doctor::{self, DoctorRegistrationView};
use crate::error::{ClinicError, Result};
use crate::identity::Identity;
use crate::record::{ClinicalRecord, RecordBook, RecordFields};
use crate::registration::engine::{self, BookingPolicy};
use crate::registration::{NewRegistration, Registration, RegistrationBook, RegistrationPatch};
use crate::schedule::{SlotBook, SlotDraft, TimeSlot};

#[derive(Debug, Default)]
pub struct ClinicState {
    pub slots: SlotBook,
    pub registrations: RegistrationBook,
    pub records: RecordBook,
}

/// Outcome of a bulk slot import
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: Vec<TimeSlot>,
    /// (source line, reason)
    pub rejected: Vec<(usize, String)>,
}

pub struct Clinic {
    directory: Directory,
    policy: BookingPolicy,
    clock: Box<dyn Clock>,
    state: Mutex<ClinicState>,
}

impl Clinic {
    pub fn new(directory: Directory) -> Self {
        Self {
            directory,
            policy: BookingPolicy::default(),
            clock: Box::new(SystemClock),
            state: Mutex::new(ClinicState::default()),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_policy(mut self, policy: BookingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClinicState>> {
        self.state
            .lock()
            .map_err(|_| ClinicError::Internal("clinic state lock poisoned".to_string()))
    }

    // Slots

    pub fn create_slot(&self, draft: SlotDraft) -> Result<TimeSlot> {
        let now = self.now();
        self.lock()?.slots.create(&self.directory, draft, now)
    }

    /// Replaces a slot's definition. Live registrations holding a seat must
    /// still fall inside the new window.
    pub fn update_slot(&self, id: u64, draft: SlotDraft) -> Result<TimeSlot> {
        let now = self.now();
        let mut state = self.lock()?;
        if state.slots.get(id).is_some() {
            let stranded = state
                .registrations
                .by_slot(id)
                .into_iter()
                .filter(|r| r.status.is_active())
                .find(|r| !draft.contains(r.appointment_time));
            if let Some(registration) = stranded {
                return Err(ClinicError::validation(format!(
                    "registration {} at {} would fall outside the new schedule window",
                    registration.id, registration.appointment_time
                )));
            }
        }
        state.slots.update(id, &self.directory, draft, now)
    }

    /// Removes a slot. Registrations pointing at it are left as they are.
    pub fn delete_slot(&self, id: u64) -> Result<()> {
        let mut state = self.lock()?;
        let slot = state.slots.delete(id)?;
        let dangling = state
            .registrations
            .by_slot(slot.id)
            .iter()
            .filter(|r| r.status.is_active())
            .count();
        if dangling > 0 {
            warn!("Deleted schedule {} still referenced by {} live registrations", slot.id, dangling);
        } else {
            info!("Deleted schedule {}", slot.id);
        }
        Ok(())
    }

    pub fn get_slot(&self, id: u64) -> Result<TimeSlot> {
        self.lock()?
            .slots
            .get(id)
            .cloned()
            .ok_or_else(|| ClinicError::not_found("schedule not found"))
    }

    pub fn list_slots(&self) -> Result<Vec<TimeSlot>> {
        Ok(self.lock()?.slots.list())
    }

    pub fn list_slots_by_date(&self, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        Ok(self.lock()?.slots.list_by_date(date))
    }

    /// Creates each draft in order. A rejected row does not stop the rest.
    pub fn import_slots(&self, drafts: Vec<(usize, SlotDraft)>) -> Result<ImportReport> {
        let now = self.now();
        let mut state = self.lock()?;
        let mut report = ImportReport::default();
        for (line, draft) in drafts {
            match state.slots.create(&self.directory, draft, now) {
                Ok(slot) => report.created.push(slot),
                Err(e) => {
                    warn!("Skipping schedule row {}: {}", line, e);
                    report.rejected.push((line, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    // Registrations

    pub fn create_registration(&self, booking: NewRegistration) -> Result<Registration> {
        let now = self.now();
        let mut state = self.lock()?;
        engine::create_registration(&mut state, &self.directory, &self.policy, booking, now)
    }

    pub fn update_registration(&self, id: u64, patch: RegistrationPatch) -> Result<Registration> {
        let now = self.now();
        let mut state = self.lock()?;
        engine::update_registration(&mut state, &self.policy, id, patch, now)
    }

    pub fn cancel_registration(&self, id: u64) -> Result<Registration> {
        let now = self.now();
        let mut state = self.lock()?;
        engine::cancel_registration(&mut state, id, now)
    }

    pub fn get_registration(&self, id: u64) -> Result<Registration> {
        self.lock()?
            .registrations
            .get(id)
            .cloned()
            .ok_or_else(|| ClinicError::not_found("registration not found"))
    }

    pub fn registrations_for_patient(&self, patient_id: u64) -> Result<Vec<Registration>> {
        Ok(self.lock()?.registrations.by_patient(patient_id))
    }

    pub fn registrations_for_doctor(&self, doctor_id: u64) -> Result<Vec<Registration>> {
        Ok(self.lock()?.registrations.by_doctor(doctor_id))
    }

    pub fn has_record(&self, registration_id: u64) -> Result<bool> {
        Ok(self.lock()?.records.has_record(registration_id))
    }

    // Doctor-scoped

    /// The doctor behind `identity`, or Forbidden.
    pub fn acting_doctor(&self, identity: Option<&Identity>) -> Result<Doctor> {
        doctor::resolve_acting_doctor(&self.directory, identity)
            .cloned()
            .ok_or_else(|| ClinicError::forbidden("current user is not a doctor or not authenticated"))
    }

    pub fn doctor_registrations(&self, doctor: &Doctor) -> Result<Vec<DoctorRegistrationView>> {
        let state = self.lock()?;
        Ok(doctor::list_registrations(&state, &self.directory, doctor))
    }

    pub fn doctor_update_status(&self, doctor: &Doctor, id: u64, status: &str) -> Result<DoctorRegistrationView> {
        let now = self.now();
        let mut state = self.lock()?;
        let updated = doctor::update_status(&mut state, doctor, id, status, now)?;
        Ok(doctor::view(&state, &self.directory, &updated))
    }

    pub fn doctor_update_registration(
        &self,
        doctor: &Doctor,
        id: u64,
        patch: RegistrationPatch,
    ) -> Result<DoctorRegistrationView> {
        let now = self.now();
        let mut state = self.lock()?;
        let updated = doctor::update_registration(&mut state, &self.policy, doctor, id, patch, now)?;
        Ok(doctor::view(&state, &self.directory, &updated))
    }

    pub fn doctor_batch_update_status(&self, doctor: &Doctor, ids: &[u64], status: &str) -> Result<usize> {
        let now = self.now();
        let mut state = self.lock()?;
        doctor::batch_update_status(&mut state, doctor, ids, status, now)
    }

    pub fn doctor_record(&self, doctor: &Doctor, registration_id: u64) -> Result<ClinicalRecord> {
        let state = self.lock()?;
        doctor::get_record(&state, doctor, registration_id)
    }

    pub fn doctor_upsert_record(
        &self,
        doctor: &Doctor,
        registration_id: u64,
        fields: RecordFields,
    ) -> Result<ClinicalRecord> {
        let now = self.now();
        let mut state = self.lock()?;
        doctor::upsert_record(&mut state, doctor, registration_id, fields, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::directory::{Department, Patient};
    use crate::identity::Role;
    use crate::registration::RegistrationStatus;
    use crate::schedule::{parse_time_of_day, parse_work_date, SlotType};
    use std::sync::Arc;
    use std::thread;

    fn clinic() -> Clinic {
        let mut directory = Directory::default();
        directory.add_department(Department { id: 1, name: "General".into() });
        directory.add_doctor(Doctor {
            id: 10,
            username: "dr.wang".into(),
            name: "Wang Li".into(),
            department_id: 1,
            title: None,
        });
        for id in 100..120 {
            directory.add_patient(Patient { id, username: None, name: format!("patient {id}") });
        }
        let now = parse_work_date("2024-01-01").unwrap().and_hms_opt(8, 0, 0).unwrap();
        Clinic::new(directory).with_clock(FixedClock(now))
    }

    fn draft(start: &str, end: &str, capacity: u32) -> SlotDraft {
        SlotDraft {
            doctor_id: 10,
            department_id: 1,
            work_date: parse_work_date("2024-01-10").unwrap(),
            start_time: parse_time_of_day(start).unwrap(),
            end_time: parse_time_of_day(end).unwrap(),
            slot_type: SlotType::Regular,
            status: None,
            capacity,
        }
    }

    #[test]
    fn concurrent_bookings_never_overfill_a_slot() {
        let clinic = Arc::new(clinic());
        let slot = clinic.create_slot(draft("09:00", "12:00", 3)).unwrap();
        let at = parse_work_date("2024-01-10").unwrap().and_hms_opt(10, 0, 0).unwrap();

        let handles: Vec<_> = (100..120)
            .map(|patient_id| {
                let clinic = Arc::clone(&clinic);
                thread::spawn(move || {
                    let mut booking = NewRegistration::new(patient_id, 10, at);
                    booking.slot_id = Some(slot.id);
                    clinic.create_registration(booking).is_ok()
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 3);

        let slot = clinic.get_slot(slot.id).unwrap();
        assert_eq!(slot.booked, 3);
    }

    #[test]
    fn concurrent_double_booking_by_one_patient_admits_one() {
        let clinic = Arc::new(clinic());
        let at = parse_work_date("2024-01-10").unwrap().and_hms_opt(10, 0, 0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let clinic = Arc::clone(&clinic);
                thread::spawn(move || {
                    let booking = NewRegistration::new(100, 10, at + chrono::Duration::minutes(i));
                    clinic.create_registration(booking).is_ok()
                })
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
        assert_eq!(clinic.registrations_for_patient(100).unwrap().len(), 1);
        assert_eq!(clinic.registrations_for_doctor(10).unwrap().len(), 1);
    }

    #[test]
    fn booking_at_the_end_of_the_calendar_keeps_the_clinic_serving() {
        let clinic = clinic();
        let far = chrono::NaiveDateTime::MAX;
        assert!(clinic.create_registration(NewRegistration::new(100, 10, far)).is_ok());
        assert!(matches!(
            clinic.create_registration(NewRegistration::new(100, 10, far)),
            Err(ClinicError::TimeConflict { .. })
        ));

        let at = parse_work_date("2024-01-10").unwrap().and_hms_opt(10, 0, 0).unwrap();
        assert!(clinic.create_registration(NewRegistration::new(101, 10, at)).is_ok());
        assert_eq!(clinic.list_slots().unwrap().len(), 0);
    }

    #[test]
    fn reshaping_a_booked_slot_keeps_its_registrations_inside() {
        let clinic = clinic();
        let slot = clinic.create_slot(draft("09:00", "12:00", 3)).unwrap();
        let at = parse_work_date("2024-01-10").unwrap().and_hms_opt(10, 0, 0).unwrap();
        let mut booking = NewRegistration::new(100, 10, at);
        booking.slot_id = Some(slot.id);
        let reg = clinic.create_registration(booking).unwrap();

        assert!(matches!(
            clinic.update_slot(slot.id, draft("09:00", "09:30", 3)),
            Err(ClinicError::Validation(_))
        ));
        assert_eq!(clinic.get_slot(slot.id).unwrap().end_time, parse_time_of_day("12:00").unwrap());

        let narrowed = clinic.update_slot(slot.id, draft("09:30", "11:00", 3)).unwrap();
        assert_eq!(narrowed.booked, 1);

        // a cancelled registration no longer pins the window
        clinic.cancel_registration(reg.id).unwrap();
        assert!(clinic.update_slot(slot.id, draft("13:00", "14:00", 3)).is_ok());
    }

    #[test]
    fn deleting_a_slot_keeps_its_registrations() {
        let clinic = clinic();
        let slot = clinic.create_slot(draft("09:00", "12:00", 3)).unwrap();
        let mut booking = NewRegistration::new(100, 10, parse_work_date("2024-01-10").unwrap().and_hms_opt(9, 30, 0).unwrap());
        booking.slot_id = Some(slot.id);
        let reg = clinic.create_registration(booking).unwrap();

        clinic.delete_slot(slot.id).unwrap();
        assert!(matches!(clinic.get_slot(slot.id), Err(ClinicError::NotFound(_))));
        assert!(matches!(clinic.delete_slot(slot.id), Err(ClinicError::NotFound(_))));

        // cancelling still works once the slot is gone
        let cancelled = clinic.cancel_registration(reg.id).unwrap();
        assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
        assert_eq!(cancelled.slot_id, Some(slot.id));
    }

    #[test]
    fn import_skips_bad_rows() {
        let clinic = clinic();
        let report = clinic
            .import_slots(vec![
                (2, draft("09:00", "12:00", 10)),
                (3, draft("11:00", "13:00", 10)),
                (4, draft("13:00", "17:00", 10)),
            ])
            .unwrap();
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 3);
        assert_eq!(clinic.list_slots().unwrap().len(), 2);
    }

    #[test]
    fn acting_doctor_requires_doctor_role() {
        let clinic = clinic();
        let admin = Identity::new("dr.wang", Role::Admin);
        assert!(matches!(clinic.acting_doctor(Some(&admin)), Err(ClinicError::Forbidden(_))));
        assert!(matches!(clinic.acting_doctor(None), Err(ClinicError::Forbidden(_))));
        let doctor = Identity::new("dr.wang", Role::Doctor);
        assert_eq!(clinic.acting_doctor(Some(&doctor)).unwrap().id, 10);
    }
}
