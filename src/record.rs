//! Clinical records, at most one per registration.
//!
//! A registration may only be completed once its record exists, so this is
//! also the gate the engine consults before a COMPLETED transition.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::info;
use serde::{Deserialize, Serialize};

use crate::registration::Registration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalRecord {
    pub id: u64,
    pub registration_id: u64,
    pub patient_id: u64,
    pub doctor_id: u64,
    pub visit_date: NaiveDateTime,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub medication: Option<String>,
    pub examinations: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Writable part of a record. An upsert replaces all of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub medication: Option<String>,
    pub examinations: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct RecordBook {
    by_registration: HashMap<u64, ClinicalRecord>,
    next_id: u64,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_record(&self, registration_id: u64) -> bool {
        self.by_registration.contains_key(&registration_id)
    }

    pub fn get(&self, registration_id: u64) -> Option<&ClinicalRecord> {
        self.by_registration.get(&registration_id)
    }

    /// Creates the registration's record or overwrites the existing one.
    pub fn upsert(
        &mut self,
        registration: &Registration,
        fields: RecordFields,
        now: NaiveDateTime,
    ) -> ClinicalRecord {
        let next_id = &mut self.next_id;
        let record = self
            .by_registration
            .entry(registration.id)
            .or_insert_with(|| {
                *next_id += 1;
                info!("Opening clinical record {} for registration {}", *next_id, registration.id);
                ClinicalRecord {
                    id: *next_id,
                    registration_id: registration.id,
                    patient_id: registration.patient_id,
                    doctor_id: registration.doctor_id,
                    visit_date: now,
                    symptoms: None,
                    diagnosis: None,
                    medication: None,
                    examinations: None,
                    treatment: None,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                }
            });

        record.patient_id = registration.patient_id;
        record.doctor_id = registration.doctor_id;
        // visit date tracks the appointment
        record.visit_date = registration.appointment_time;
        record.symptoms = fields.symptoms;
        record.diagnosis = fields.diagnosis;
        record.medication = fields.medication;
        record.examinations = fields.examinations;
        record.treatment = fields.treatment;
        record.notes = fields.notes;
        record.updated_at = now;
        record.clone()
    }
}
