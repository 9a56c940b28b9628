//! Doctor-scoped access to registrations.
//!
//! A doctor only ever sees and mutates registrations assigned to them. On
//! single-registration calls, "does not exist" and "belongs to someone else"
//! produce the same NotFound so callers cannot probe other doctors' data.

use chrono::NaiveDateTime;
use log::{info, warn};
use serde::Serialize;

use crate::clinic::ClinicState;
use crate::directory::{Directory, Doctor};
use crate::error::{ClinicError, Result};
use crate::identity::{Identity, Role};
use crate::record::{ClinicalRecord, RecordFields};
use crate::registration::engine::{self, BookingPolicy};
use crate::registration::{external_status, parse_status, Registration, RegistrationPatch};

/// Registration as presented on a doctor's worklist
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRegistrationView {
    pub id: u64,
    pub patient_id: u64,
    pub patient_name: Option<String>,
    pub department: Option<String>,
    pub disease_id: Option<u64>,
    pub slot_id: Option<u64>,
    pub appointment_time: NaiveDateTime,
    pub status: &'static str,
    pub notes: Option<String>,
    pub has_medical_record: bool,
}

/// Maps the caller to a doctor. Only DOCTOR identities with a directory
/// entry resolve; everyone else gets None and must be refused.
pub fn resolve_acting_doctor<'a>(directory: &'a Directory, identity: Option<&Identity>) -> Option<&'a Doctor> {
    let identity = identity?;
    if identity.role != Role::Doctor {
        return None;
    }
    directory.doctor_by_username(&identity.username)
}

fn owned_registration<'a>(state: &'a ClinicState, doctor: &Doctor, id: u64) -> Result<&'a Registration> {
    state
        .registrations
        .get(id)
        .filter(|r| r.doctor_id == doctor.id)
        .ok_or_else(|| ClinicError::not_found("registration not found for this doctor"))
}

pub fn view(state: &ClinicState, directory: &Directory, registration: &Registration) -> DoctorRegistrationView {
    DoctorRegistrationView {
        id: registration.id,
        patient_id: registration.patient_id,
        patient_name: directory.patient(registration.patient_id).map(|p| p.name.clone()),
        department: directory.department_of(registration.doctor_id).map(|d| d.name.clone()),
        disease_id: registration.disease_id,
        slot_id: registration.slot_id,
        appointment_time: registration.appointment_time,
        status: external_status(registration.status),
        notes: registration.notes.clone(),
        has_medical_record: state.records.has_record(registration.id),
    }
}

pub fn list_registrations(state: &ClinicState, directory: &Directory, doctor: &Doctor) -> Vec<DoctorRegistrationView> {
    state
        .registrations
        .by_doctor(doctor.id)
        .iter()
        .map(|r| view(state, directory, r))
        .collect()
}

pub fn update_status(
    state: &mut ClinicState,
    doctor: &Doctor,
    id: u64,
    status: &str,
    now: NaiveDateTime,
) -> Result<Registration> {
    owned_registration(state, doctor, id)?;
    let target = parse_status(status)?;
    engine::set_status(state, id, target, now)
}

/// Doctor-side edit of status, appointment time, notes and disease.
pub fn update_registration(
    state: &mut ClinicState,
    policy: &BookingPolicy,
    doctor: &Doctor,
    id: u64,
    patch: RegistrationPatch,
    now: NaiveDateTime,
) -> Result<Registration> {
    owned_registration(state, doctor, id)?;
    let patch = RegistrationPatch {
        appointment_time: patch.appointment_time,
        disease_id: patch.disease_id,
        notes: patch.notes,
        status: patch.status,
        ..RegistrationPatch::default()
    };
    engine::update_registration(state, policy, id, patch, now)
}

/// Sets the same status on every listed registration, or on none of them.
///
/// All ids must exist and belong to `doctor`, and every transition must be
/// legal, before anything is written. Returns how many registrations changed.
pub fn batch_update_status(
    state: &mut ClinicState,
    doctor: &Doctor,
    ids: &[u64],
    status: &str,
    now: NaiveDateTime,
) -> Result<usize> {
    if ids.is_empty() {
        return Err(ClinicError::validation("no registration ids provided"));
    }
    let target = parse_status(status)?;

    let mut requested = ids.to_vec();
    requested.sort_unstable();
    requested.dedup();

    let resolved: Vec<&Registration> = requested
        .iter()
        .filter_map(|id| state.registrations.get(*id))
        .collect();
    if resolved.len() != requested.len() {
        return Err(ClinicError::not_found("some registrations not found"));
    }
    if resolved.iter().any(|r| r.doctor_id != doctor.id) {
        warn!("Doctor {} attempted a batch update on foreign registrations", doctor.id);
        return Err(ClinicError::forbidden(
            "contains registration that does not belong to current doctor",
        ));
    }

    let mut pending = Vec::with_capacity(resolved.len());
    for registration in &resolved {
        if engine::check_transition(&state.records, registration, target)? {
            pending.push(registration.id);
        }
    }

    for id in &pending {
        engine::apply_status(state, *id, target, now);
    }
    info!(
        "Doctor {} set {} of {} registrations to {}",
        doctor.id,
        pending.len(),
        requested.len(),
        target
    );
    Ok(pending.len())
}

pub fn get_record(state: &ClinicState, doctor: &Doctor, registration_id: u64) -> Result<ClinicalRecord> {
    owned_registration(state, doctor, registration_id)?;
    state
        .records
        .get(registration_id)
        .cloned()
        .ok_or_else(|| ClinicError::not_found("medical record not found"))
}

pub fn upsert_record(
    state: &mut ClinicState,
    doctor: &Doctor,
    registration_id: u64,
    fields: RecordFields,
    now: NaiveDateTime,
) -> Result<ClinicalRecord> {
    let registration = owned_registration(state, doctor, registration_id)?.clone();
    Ok(state.records.upsert(&registration, fields, now))
}
