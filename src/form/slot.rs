use serde::Deserialize;

use crate::error::{ClinicError, Result};
use crate::schedule::{parse_time_of_day, parse_work_date, SlotDraft, SlotStatus, SlotType};

/// Schedule form as sent by the admin console
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotForm {
    pub doctor_id: Option<u64>,
    pub department_id: Option<u64>,
    pub work_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub capacity: Option<u32>,
    #[serde(rename = "type")]
    pub slot_type: Option<String>,
    pub status: Option<SlotStatus>,
}

/// Validates a schedule form and turns it into a draft
pub fn validate_slot_form(form: &SlotForm) -> Result<SlotDraft> {
    let doctor_id = form
        .doctor_id
        .ok_or_else(|| ClinicError::validation("doctor is required"))?;
    let department_id = form
        .department_id
        .ok_or_else(|| ClinicError::validation("department is required"))?;

    let work_date = form
        .work_date
        .as_deref()
        .and_then(parse_work_date)
        .ok_or_else(|| ClinicError::validation("work date must be YYYY-MM-DD"))?;
    let start_time = form
        .start_time
        .as_deref()
        .and_then(parse_time_of_day)
        .ok_or_else(|| ClinicError::validation("start time must be HH:MM"))?;
    let end_time = form
        .end_time
        .as_deref()
        .and_then(parse_time_of_day)
        .ok_or_else(|| ClinicError::validation("end time must be HH:MM"))?;

    let slot_type = match form.slot_type.as_deref() {
        Some(raw) => raw.parse::<SlotType>()?,
        None => SlotType::default(),
    };

    Ok(SlotDraft {
        doctor_id,
        department_id,
        work_date,
        start_time,
        end_time,
        slot_type,
        status: form.status,
        capacity: form.capacity.unwrap_or(0),
    })
}
