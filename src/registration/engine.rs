use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::clinic::ClinicState;
use crate::directory::Directory;
use crate::error::{ClinicError, Result};
use crate::record::RecordBook;
use crate::schedule::SlotBook;
use super::status::RegistrationStatus;
use super::types::{NewRegistration, PaymentStatus, Registration, RegistrationPatch};

/// Booking rules that vary between deployments
#[derive(Debug, Clone, Copy)]
pub struct BookingPolicy {
    /// Reject appointments at or before the current time
    pub require_future: bool,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self { require_future: true }
    }
}

/// Books a new registration in WAITING state.
///
/// Every check runs before the first write, and the caller holds the clinic
/// lock for the whole call, so a failed booking leaves no trace.
pub fn create_registration(
    state: &mut ClinicState,
    directory: &Directory,
    policy: &BookingPolicy,
    booking: NewRegistration,
    now: NaiveDateTime,
) -> Result<Registration> {
    if directory.patient(booking.patient_id).is_none() {
        return Err(ClinicError::not_found("patient not found"));
    }
    if directory.doctor(booking.doctor_id).is_none() {
        return Err(ClinicError::not_found("doctor not found"));
    }
    check_future(policy, booking.appointment_time, now)?;

    if let Some(slot_id) = booking.slot_id {
        check_slot(&state.slots, slot_id, booking.doctor_id, booking.appointment_time)?;
    }

    if let Some(existing) = state
        .registrations
        .find_conflict(booking.patient_id, booking.appointment_time, None)
    {
        warn!(
            "Patient {} already booked at {} (registration {})",
            booking.patient_id, existing.appointment_time, existing.id
        );
        return Err(ClinicError::TimeConflict {
            registration_id: existing.id,
        });
    }

    // Last fallible step, so nothing needs rolling back after it
    if let Some(slot_id) = booking.slot_id {
        state.slots.reserve_seat(slot_id, now)?;
    }

    let registration = Registration {
        id: state.registrations.next_id(),
        patient_id: booking.patient_id,
        doctor_id: booking.doctor_id,
        disease_id: booking.disease_id,
        slot_id: booking.slot_id,
        registration_time: booking.registration_time.unwrap_or(now),
        appointment_time: booking.appointment_time,
        registration_type: booking.registration_type,
        channel: booking.channel,
        status: RegistrationStatus::Waiting,
        fee: booking.fee,
        payment_status: PaymentStatus::Unpaid,
        notes: booking.notes,
        created_at: now,
        updated_at: now,
    };
    state.registrations.insert(registration.clone());

    info!(
        "Registration {} booked: patient {} with doctor {} at {}",
        registration.id, registration.patient_id, registration.doctor_id, registration.appointment_time
    );
    Ok(registration)
}

/// Applies the present fields of `patch`. A new appointment time is checked
/// for conflicts against the patient's other registrations; a status goes
/// through the lifecycle rules.
pub fn update_registration(
    state: &mut ClinicState,
    policy: &BookingPolicy,
    id: u64,
    patch: RegistrationPatch,
    now: NaiveDateTime,
) -> Result<Registration> {
    let current = state
        .registrations
        .get(id)
        .cloned()
        .ok_or_else(|| ClinicError::not_found("registration not found"))?;

    let reschedule = patch.appointment_time.filter(|at| *at != current.appointment_time);
    if let Some(at) = reschedule {
        check_future(policy, at, now)?;
        if let Some(slot) = current.slot_id.and_then(|slot_id| state.slots.get(slot_id)) {
            if !slot.contains(at) {
                return Err(ClinicError::validation(
                    "appointment time is outside the booked schedule window",
                ));
            }
        }
        if let Some(existing) = state.registrations.find_conflict(current.patient_id, at, Some(id)) {
            return Err(ClinicError::TimeConflict {
                registration_id: existing.id,
            });
        }
    }

    let status_change = match patch.status {
        Some(target) => check_transition(&state.records, &current, target)?.then_some(target),
        None => None,
    };

    let registration = state
        .registrations
        .get_mut(id)
        .ok_or_else(|| ClinicError::not_found("registration not found"))?;
    if let Some(at) = reschedule {
        registration.appointment_time = at;
    }
    if let Some(disease_id) = patch.disease_id {
        registration.disease_id = Some(disease_id);
    }
    if let Some(notes) = patch.notes {
        registration.notes = Some(notes);
    }
    if let Some(fee) = patch.fee {
        registration.fee = Some(fee);
    }
    if let Some(payment_status) = patch.payment_status {
        registration.payment_status = payment_status;
    }
    if let Some(channel) = patch.channel {
        registration.channel = channel;
    }
    if let Some(registration_type) = patch.registration_type {
        registration.registration_type = registration_type;
    }
    registration.updated_at = now;

    match status_change {
        Some(target) => apply_status(state, id, target, now)
            .ok_or_else(|| ClinicError::not_found("registration not found")),
        None => Ok(registration.clone()),
    }
}

/// Soft delete. Cancelling twice is a successful no-op.
pub fn cancel_registration(state: &mut ClinicState, id: u64, now: NaiveDateTime) -> Result<Registration> {
    set_status(state, id, RegistrationStatus::Cancelled, now)
}

/// Moves one registration to `target`, enforcing the lifecycle and the
/// clinical record requirement for completion.
pub fn set_status(
    state: &mut ClinicState,
    id: u64,
    target: RegistrationStatus,
    now: NaiveDateTime,
) -> Result<Registration> {
    let current = state
        .registrations
        .get(id)
        .cloned()
        .ok_or_else(|| ClinicError::not_found("registration not found"))?;

    if !check_transition(&state.records, &current, target)? {
        debug!("Registration {} already {}", id, target);
        return Ok(current);
    }
    apply_status(state, id, target, now).ok_or_else(|| ClinicError::not_found("registration not found"))
}

/// Validates moving `registration` to `target`.
/// Returns Ok(false) when it is already there and nothing needs writing.
pub(crate) fn check_transition(
    records: &RecordBook,
    registration: &Registration,
    target: RegistrationStatus,
) -> Result<bool> {
    if registration.status == target {
        return Ok(false);
    }
    if target == RegistrationStatus::Completed && !records.has_record(registration.id) {
        return Err(ClinicError::RecordRequired);
    }
    if !registration.status.can_transition_to(target) {
        return Err(ClinicError::IllegalTransition {
            from: registration.status,
            to: target,
        });
    }
    Ok(true)
}

/// Writes a status already accepted by [`check_transition`]. Cancelling hands
/// the slot seat back.
pub(crate) fn apply_status(
    state: &mut ClinicState,
    id: u64,
    target: RegistrationStatus,
    now: NaiveDateTime,
) -> Option<Registration> {
    let registration = state.registrations.get_mut(id)?;
    let from = registration.status;
    registration.status = target;
    registration.updated_at = now;
    let updated = registration.clone();

    if target == RegistrationStatus::Cancelled {
        if let Some(slot_id) = updated.slot_id {
            if !state.slots.release_seat(slot_id, now) {
                debug!("Schedule {} is gone, no seat to release", slot_id);
            }
        }
    }

    info!("Registration {} moved from {} to {}", id, from, target);
    Some(updated)
}

fn check_future(policy: &BookingPolicy, at: NaiveDateTime, now: NaiveDateTime) -> Result<()> {
    if policy.require_future && at <= now {
        return Err(ClinicError::validation("appointment time must be in the future"));
    }
    Ok(())
}

fn check_slot(slots: &SlotBook, slot_id: u64, doctor_id: u64, at: NaiveDateTime) -> Result<()> {
    let slot = slots
        .get(slot_id)
        .ok_or_else(|| ClinicError::validation("schedule not found"))?;
    if slot.doctor_id != doctor_id {
        return Err(ClinicError::validation("schedule belongs to another doctor"));
    }
    if !slot.contains(at) {
        return Err(ClinicError::validation(
            "appointment time is outside the schedule window",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Department, Doctor, Patient};
    use crate::record::RecordFields;
    use crate::schedule::{parse_time_of_day, parse_work_date, SlotDraft, SlotType};
    use chrono::NaiveDate;

    fn directory() -> Directory {
        let mut directory = Directory::default();
        directory.add_department(Department { id: 1, name: "General".into() });
        for (id, username) in [(10, "dr.wang"), (11, "dr.zhao")] {
            directory.add_doctor(Doctor {
                id,
                username: username.into(),
                name: username.into(),
                department_id: 1,
                title: None,
            });
        }
        for id in [100, 101] {
            directory.add_patient(Patient { id, username: None, name: format!("patient {id}") });
        }
        directory
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    fn book(state: &mut ClinicState, patient_id: u64, time: NaiveDateTime) -> Result<Registration> {
        create_registration(
            state,
            &directory(),
            &BookingPolicy::default(),
            NewRegistration::new(patient_id, 10, time),
            now(),
        )
    }

    fn slot(state: &mut ClinicState, capacity: u32) -> u64 {
        let draft = SlotDraft {
            doctor_id: 10,
            department_id: 1,
            work_date: parse_work_date("2024-01-10").unwrap(),
            start_time: parse_time_of_day("09:00").unwrap(),
            end_time: parse_time_of_day("12:00").unwrap(),
            slot_type: SlotType::Regular,
            status: None,
            capacity,
        };
        state.slots.create(&directory(), draft, now()).unwrap().id
    }

    #[test]
    fn double_booking_within_thirty_minutes_is_rejected() {
        let mut state = ClinicState::default();
        let first = book(&mut state, 100, at(9, 0)).unwrap();
        assert_eq!(first.status, RegistrationStatus::Waiting);
        assert_eq!(first.registration_time, now());

        let err = book(&mut state, 100, at(9, 20)).unwrap_err();
        assert!(matches!(err, ClinicError::TimeConflict { registration_id } if registration_id == first.id));

        assert!(book(&mut state, 100, at(9, 35)).is_ok());
        // another patient may take the same instant
        assert!(book(&mut state, 101, at(9, 0)).is_ok());
    }

    #[test]
    fn cancelled_registrations_free_the_window() {
        let mut state = ClinicState::default();
        let first = book(&mut state, 100, at(9, 0)).unwrap();
        cancel_registration(&mut state, first.id, now()).unwrap();
        assert!(book(&mut state, 100, at(9, 10)).is_ok());
    }

    #[test]
    fn unknown_references_and_past_times() {
        let mut state = ClinicState::default();
        let dir = directory();
        let policy = BookingPolicy::default();
        let unknown_patient = NewRegistration::new(999, 10, at(9, 0));
        assert!(matches!(
            create_registration(&mut state, &dir, &policy, unknown_patient, now()),
            Err(ClinicError::NotFound(_))
        ));
        let unknown_doctor = NewRegistration::new(100, 99, at(9, 0));
        assert!(matches!(
            create_registration(&mut state, &dir, &policy, unknown_doctor, now()),
            Err(ClinicError::NotFound(_))
        ));

        let past = NewRegistration::new(100, 10, now());
        assert!(create_registration(&mut state, &dir, &policy, past.clone(), now()).is_err());
        let lenient = BookingPolicy { require_future: false };
        assert!(create_registration(&mut state, &dir, &lenient, past, now()).is_ok());
    }

    #[test]
    fn slot_bookings_respect_capacity() {
        let mut state = ClinicState::default();
        let slot_id = slot(&mut state, 1);
        let dir = directory();
        let policy = BookingPolicy::default();

        let mut first = NewRegistration::new(100, 10, at(9, 0));
        first.slot_id = Some(slot_id);
        let booked = create_registration(&mut state, &dir, &policy, first, now()).unwrap();
        assert_eq!(state.slots.get(slot_id).unwrap().booked, 1);

        let mut second = NewRegistration::new(101, 10, at(9, 0));
        second.slot_id = Some(slot_id);
        let err = create_registration(&mut state, &dir, &policy, second.clone(), now()).unwrap_err();
        assert!(matches!(err, ClinicError::CapacityExceeded(id) if id == slot_id));
        assert_eq!(state.slots.get(slot_id).unwrap().booked, 1);

        cancel_registration(&mut state, booked.id, now()).unwrap();
        assert_eq!(state.slots.get(slot_id).unwrap().booked, 0);
        assert!(create_registration(&mut state, &dir, &policy, second, now()).is_ok());
    }

    #[test]
    fn conflict_does_not_consume_a_seat() {
        let mut state = ClinicState::default();
        let slot_id = slot(&mut state, 5);
        book(&mut state, 100, at(9, 0)).unwrap();

        let mut clash = NewRegistration::new(100, 10, at(9, 15));
        clash.slot_id = Some(slot_id);
        assert!(create_registration(&mut state, &directory(), &BookingPolicy::default(), clash, now()).is_err());
        assert_eq!(state.slots.get(slot_id).unwrap().booked, 0);
    }

    #[test]
    fn slot_must_match_doctor_and_window() {
        let mut state = ClinicState::default();
        let slot_id = slot(&mut state, 5);
        let dir = directory();
        let policy = BookingPolicy::default();

        let mut wrong_doctor = NewRegistration::new(100, 11, at(9, 0));
        wrong_doctor.slot_id = Some(slot_id);
        assert!(create_registration(&mut state, &dir, &policy, wrong_doctor, now()).is_err());

        let mut outside = NewRegistration::new(100, 10, at(12, 0));
        outside.slot_id = Some(slot_id);
        assert!(create_registration(&mut state, &dir, &policy, outside, now()).is_err());

        let mut missing = NewRegistration::new(100, 10, at(9, 0));
        missing.slot_id = Some(404);
        assert!(create_registration(&mut state, &dir, &policy, missing, now()).is_err());
    }

    #[test]
    fn reschedule_reruns_conflict_check_excluding_itself() {
        let mut state = ClinicState::default();
        let policy = BookingPolicy::default();
        let first = book(&mut state, 100, at(9, 0)).unwrap();
        let second = book(&mut state, 100, at(11, 0)).unwrap();

        // Moving within its own window only collides with itself
        let moved = update_registration(
            &mut state,
            &policy,
            first.id,
            RegistrationPatch { appointment_time: Some(at(9, 10)), ..Default::default() },
            now(),
        )
        .unwrap();
        assert_eq!(moved.appointment_time, at(9, 10));

        let err = update_registration(
            &mut state,
            &policy,
            first.id,
            RegistrationPatch {
                appointment_time: Some(at(10, 45)),
                notes: Some("later please".into()),
                ..Default::default()
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, ClinicError::TimeConflict { registration_id } if registration_id == second.id));
        // rejected patch leaves every field alone
        assert!(state.registrations.get(first.id).unwrap().notes.is_none());

        assert!(matches!(
            update_registration(&mut state, &policy, 404, RegistrationPatch::default(), now()),
            Err(ClinicError::NotFound(_))
        ));
    }

    #[test]
    fn completion_requires_a_clinical_record() {
        let mut state = ClinicState::default();
        let reg = book(&mut state, 100, at(9, 0)).unwrap();
        set_status(&mut state, reg.id, RegistrationStatus::Confirmed, now()).unwrap();

        let err = set_status(&mut state, reg.id, RegistrationStatus::Completed, now()).unwrap_err();
        assert!(matches!(err, ClinicError::RecordRequired));
        assert_eq!(state.registrations.get(reg.id).unwrap().status, RegistrationStatus::Confirmed);

        let snapshot = state.registrations.get(reg.id).unwrap().clone();
        state.records.upsert(&snapshot, RecordFields::default(), now());
        let done = set_status(&mut state, reg.id, RegistrationStatus::Completed, now()).unwrap();
        assert_eq!(done.status, RegistrationStatus::Completed);
    }

    #[test]
    fn terminal_states_do_not_move() {
        let mut state = ClinicState::default();
        let reg = book(&mut state, 100, at(9, 0)).unwrap();

        let skip = set_status(&mut state, reg.id, RegistrationStatus::Completed, now());
        assert!(matches!(skip, Err(ClinicError::RecordRequired)));

        cancel_registration(&mut state, reg.id, now()).unwrap();
        let err = set_status(&mut state, reg.id, RegistrationStatus::Confirmed, now()).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::IllegalTransition { from: RegistrationStatus::Cancelled, to: RegistrationStatus::Confirmed }
        ));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut state = ClinicState::default();
        let reg = book(&mut state, 100, at(9, 0)).unwrap();
        let later = now() + chrono::Duration::hours(1);

        let first = cancel_registration(&mut state, reg.id, later).unwrap();
        assert_eq!(first.status, RegistrationStatus::Cancelled);
        assert_eq!(first.updated_at, later);

        let again = cancel_registration(&mut state, reg.id, later + chrono::Duration::hours(1)).unwrap();
        assert_eq!(again.status, RegistrationStatus::Cancelled);
        assert_eq!(again.updated_at, later);

        assert!(matches!(
            cancel_registration(&mut state, 404, now()),
            Err(ClinicError::NotFound(_))
        ));
    }
}
