use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::status::RegistrationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationType {
    #[default]
    Regular,
    Specialist,
    Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    #[default]
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Refunded,
}

/// One patient's appointment claim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: u64,
    pub patient_id: u64,
    pub doctor_id: u64,
    pub disease_id: Option<u64>,
    pub slot_id: Option<u64>,
    pub registration_time: NaiveDateTime,
    pub appointment_time: NaiveDateTime,
    #[serde(rename = "type")]
    pub registration_type: RegistrationType,
    pub channel: Channel,
    pub status: RegistrationStatus,
    /// In minor currency units
    pub fee: Option<u64>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A validated booking, ready for the engine
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    pub patient_id: u64,
    pub doctor_id: u64,
    pub disease_id: Option<u64>,
    pub slot_id: Option<u64>,
    pub appointment_time: NaiveDateTime,
    pub registration_time: Option<NaiveDateTime>,
    pub registration_type: RegistrationType,
    pub channel: Channel,
    pub fee: Option<u64>,
    pub notes: Option<String>,
}

impl NewRegistration {
    pub fn new(patient_id: u64, doctor_id: u64, appointment_time: NaiveDateTime) -> Self {
        Self {
            patient_id,
            doctor_id,
            disease_id: None,
            slot_id: None,
            appointment_time,
            registration_time: None,
            registration_type: RegistrationType::default(),
            channel: Channel::default(),
            fee: None,
            notes: None,
        }
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationPatch {
    pub appointment_time: Option<NaiveDateTime>,
    pub disease_id: Option<u64>,
    pub notes: Option<String>,
    pub status: Option<RegistrationStatus>,
    pub fee: Option<u64>,
    pub payment_status: Option<PaymentStatus>,
    pub channel: Option<Channel>,
    pub registration_type: Option<RegistrationType>,
}

impl RegistrationPatch {
    /// True when the patch sets anything only staff may change.
    pub fn touches_staff_fields(&self) -> bool {
        self.status.is_some()
            || self.payment_status.is_some()
            || self.fee.is_some()
            || self.registration_type.is_some()
    }
}
