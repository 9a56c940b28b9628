use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};

use super::types::Registration;

/// Half-width of the window around an appointment in which the same patient
/// may not hold another live registration.
pub const CONFLICT_WINDOW_MINUTES: i64 = 30;

/// Inclusive bounds `[at - 30min, at + 30min]`, clamped to the representable range
pub fn conflict_window(at: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let half = Duration::minutes(CONFLICT_WINDOW_MINUTES);
    (
        at.checked_sub_signed(half).unwrap_or(NaiveDateTime::MIN),
        at.checked_add_signed(half).unwrap_or(NaiveDateTime::MAX),
    )
}

/// All registrations, keyed by id
#[derive(Debug, Default)]
pub struct RegistrationBook {
    registrations: BTreeMap<u64, Registration>,
    next_id: u64,
}

impl RegistrationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&Registration> {
        self.registrations.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Registration> {
        self.registrations.get_mut(&id)
    }

    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert(&mut self, registration: Registration) {
        self.registrations.insert(registration.id, registration);
    }

    pub fn by_patient(&self, patient_id: u64) -> Vec<Registration> {
        self.filtered(|r| r.patient_id == patient_id)
    }

    pub fn by_doctor(&self, doctor_id: u64) -> Vec<Registration> {
        self.filtered(|r| r.doctor_id == doctor_id)
    }

    pub fn by_slot(&self, slot_id: u64) -> Vec<Registration> {
        self.filtered(|r| r.slot_id == Some(slot_id))
    }

    fn filtered<F: Fn(&Registration) -> bool>(&self, keep: F) -> Vec<Registration> {
        let mut found: Vec<Registration> = self.registrations.values().filter(|r| keep(r)).cloned().collect();
        found.sort_by_key(|r| (r.appointment_time, r.id));
        found
    }

    /// First live registration of `patient_id` inside the conflict window
    /// around `at`, ignoring `exclude`.
    pub fn find_conflict(
        &self,
        patient_id: u64,
        at: NaiveDateTime,
        exclude: Option<u64>,
    ) -> Option<&Registration> {
        let (from, to) = conflict_window(at);
        self.registrations.values().find(|r| {
            Some(r.id) != exclude
                && r.patient_id == patient_id
                && r.status.is_active()
                && r.appointment_time >= from
                && r.appointment_time <= to
        })
    }
}
