use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::{ClinicError, Result};
use crate::record::RecordFields;
use crate::registration::{
    parse_channel, parse_status, NewRegistration, PaymentStatus, RegistrationPatch, RegistrationType,
};

/// Booking request from the patient portal or the front desk
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub patient_id: Option<u64>,
    pub doctor_id: Option<u64>,
    pub disease_id: Option<u64>,
    pub slot_id: Option<u64>,
    pub appointment_time: Option<String>,
    pub registration_time: Option<String>,
    #[serde(rename = "type")]
    pub registration_type: Option<RegistrationType>,
    pub channel: Option<String>,
    pub fee: Option<u64>,
    pub notes: Option<String>,
}

/// Partial registration update (admin and patient side)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationUpdateRequest {
    pub appointment_time: Option<String>,
    pub disease_id: Option<u64>,
    pub notes: Option<String>,
    pub status: Option<String>,
    pub fee: Option<u64>,
    pub payment_status: Option<PaymentStatus>,
    pub channel: Option<String>,
    #[serde(rename = "type")]
    pub registration_type: Option<RegistrationType>,
}

/// Partial update a doctor may make on their own registration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdateRequest {
    pub status: Option<String>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
    pub disease_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchStatusRequest {
    #[serde(default)]
    pub ids: Vec<u64>,
    pub status: String,
}

pub type RecordRequest = RecordFields;

/// Parses ISO local date-times, with or without seconds
pub fn parse_appointment_time(raw: &str) -> Option<NaiveDateTime> {
    let clean = raw.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(clean, format).ok())
}

fn parse_time_field(raw: &str, field: &str) -> Result<NaiveDateTime> {
    parse_appointment_time(raw).ok_or_else(|| {
        ClinicError::validation(format!("invalid {field} format, expected ISO date time"))
    })
}

/// Validates a booking request
///
/// Required fields are checked in a fixed order (patient, doctor, appointment
/// time) so the caller always gets the first missing one.
pub fn validate_booking(req: &BookingRequest) -> Result<NewRegistration> {
    let patient_id = req.patient_id.ok_or(ClinicError::MissingPatient)?;
    let doctor_id = req.doctor_id.ok_or(ClinicError::MissingDoctor)?;
    let raw_time = req
        .appointment_time
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ClinicError::MissingAppointmentTime)?;
    let appointment_time = parse_time_field(raw_time, "appointmentTime")?;

    let registration_time = req
        .registration_time
        .as_deref()
        .map(|raw| parse_time_field(raw, "registrationTime"))
        .transpose()?;
    let channel = req
        .channel
        .as_deref()
        .map(parse_channel)
        .transpose()?
        .unwrap_or_default();

    Ok(NewRegistration {
        patient_id,
        doctor_id,
        disease_id: req.disease_id,
        slot_id: req.slot_id,
        appointment_time,
        registration_time,
        registration_type: req.registration_type.unwrap_or_default(),
        channel,
        fee: req.fee,
        notes: req.notes.clone(),
    })
}

pub fn validate_update(req: &RegistrationUpdateRequest) -> Result<RegistrationPatch> {
    Ok(RegistrationPatch {
        appointment_time: req
            .appointment_time
            .as_deref()
            .map(|raw| parse_time_field(raw, "appointmentTime"))
            .transpose()?,
        disease_id: req.disease_id,
        notes: req.notes.clone(),
        status: req.status.as_deref().map(parse_status).transpose()?,
        fee: req.fee,
        payment_status: req.payment_status,
        channel: req.channel.as_deref().map(parse_channel).transpose()?,
        registration_type: req.registration_type,
    })
}

pub fn validate_doctor_update(req: &DoctorUpdateRequest) -> Result<RegistrationPatch> {
    Ok(RegistrationPatch {
        status: req.status.as_deref().map(parse_status).transpose()?,
        appointment_time: req
            .appointment_time
            .as_deref()
            .map(|raw| parse_time_field(raw, "appointmentTime"))
            .transpose()?,
        notes: req.notes.clone(),
        disease_id: req.disease_id,
        ..RegistrationPatch::default()
    })
}
