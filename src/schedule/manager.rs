use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};

use crate::directory::Directory;
use crate::error::{ClinicError, Result};
use super::slot_utils::{format_window, intervals_overlap};
use super::types::{SlotDraft, SlotStatus, TimeSlot};

/// All slots known to the clinic, keyed by id
#[derive(Debug, Default)]
pub struct SlotBook {
    slots: BTreeMap<u64, TimeSlot>,
    next_id: u64,
}

impl SlotBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&TimeSlot> {
        self.slots.get(&id)
    }

    /// Every slot, ordered by date, doctor and start time
    pub fn list(&self) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = self.slots.values().cloned().collect();
        slots.sort_by_key(|s| (s.work_date, s.doctor_id, s.start_time));
        slots
    }

    pub fn list_by_date(&self, date: NaiveDate) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = self
            .slots
            .values()
            .filter(|s| s.work_date == date)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.doctor_id, s.start_time));
        slots
    }

    /// Finds a slot of the same doctor on the same date whose window overlaps
    /// `[start, end)`. `exclude` skips the slot being edited.
    pub fn find_overlap(
        &self,
        doctor_id: u64,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        exclude: Option<u64>,
    ) -> Option<&TimeSlot> {
        self.slots.values().find(|existing| {
            Some(existing.id) != exclude
                && existing.doctor_id == doctor_id
                && existing.work_date == date
                && intervals_overlap(start, end, existing.start_time, existing.end_time)
        })
    }

    pub fn create(&mut self, directory: &Directory, draft: SlotDraft, now: NaiveDateTime) -> Result<TimeSlot> {
        validate_draft(directory, &draft)?;

        if let Some(existing) = self.find_overlap(
            draft.doctor_id,
            draft.work_date,
            draft.start_time,
            draft.end_time,
            None,
        ) {
            return Err(ClinicError::SlotOverlap(existing.id));
        }

        self.next_id += 1;
        let mut slot = TimeSlot {
            id: self.next_id,
            doctor_id: draft.doctor_id,
            department_id: draft.department_id,
            work_date: draft.work_date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            slot_type: draft.slot_type,
            status: draft.status.unwrap_or_default(),
            capacity: draft.capacity,
            booked: 0,
            created_at: now,
            updated_at: now,
        };
        settle_status(&mut slot);

        info!(
            "Created schedule {} for doctor {} on {} {} (capacity {})",
            slot.id,
            slot.doctor_id,
            slot.work_date,
            format_window(slot.start_time, slot.end_time),
            slot.capacity
        );
        self.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    /// Replaces a slot's definition. The booked count is kept.
    pub fn update(
        &mut self,
        id: u64,
        directory: &Directory,
        draft: SlotDraft,
        now: NaiveDateTime,
    ) -> Result<TimeSlot> {
        let current = self
            .slots
            .get(&id)
            .ok_or_else(|| ClinicError::not_found("schedule not found"))?;
        let booked = current.booked;
        if booked > 0 && (current.doctor_id != draft.doctor_id || current.work_date != draft.work_date) {
            return Err(ClinicError::validation(format!(
                "schedule {id} has {booked} booked seats, its doctor and date cannot change"
            )));
        }

        validate_draft(directory, &draft)?;

        if let Some(existing) = self.find_overlap(
            draft.doctor_id,
            draft.work_date,
            draft.start_time,
            draft.end_time,
            Some(id),
        ) {
            return Err(ClinicError::SlotOverlap(existing.id));
        }

        if draft.capacity < booked {
            return Err(ClinicError::validation(format!(
                "capacity {} is below the {} seats already booked",
                draft.capacity, booked
            )));
        }

        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| ClinicError::not_found("schedule not found"))?;
        slot.doctor_id = draft.doctor_id;
        slot.department_id = draft.department_id;
        slot.work_date = draft.work_date;
        slot.start_time = draft.start_time;
        slot.end_time = draft.end_time;
        slot.slot_type = draft.slot_type;
        if let Some(status) = draft.status {
            slot.status = status;
        }
        slot.capacity = draft.capacity;
        slot.updated_at = now;
        settle_status(slot);

        info!("Updated schedule {}", id);
        Ok(slot.clone())
    }

    pub fn delete(&mut self, id: u64) -> Result<TimeSlot> {
        self.slots
            .remove(&id)
            .ok_or_else(|| ClinicError::not_found("schedule not found"))
    }

    /// Takes one seat in the slot. Fails once the slot is full or paused.
    pub fn reserve_seat(&mut self, id: u64, now: NaiveDateTime) -> Result<()> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| ClinicError::not_found("schedule not found"))?;

        if slot.status == SlotStatus::Paused {
            return Err(ClinicError::validation(format!(
                "schedule {id} is not accepting bookings"
            )));
        }
        if slot.booked >= slot.capacity {
            return Err(ClinicError::CapacityExceeded(id));
        }

        slot.booked += 1;
        slot.updated_at = now;
        settle_status(slot);
        debug!("Schedule {} now has {}/{} booked", id, slot.booked, slot.capacity);
        Ok(())
    }

    /// Gives a seat back. Returns false when the slot no longer exists.
    pub fn release_seat(&mut self, id: u64, now: NaiveDateTime) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.booked = slot.booked.saturating_sub(1);
                slot.updated_at = now;
                settle_status(slot);
                true
            }
            None => false,
        }
    }
}

fn validate_draft(directory: &Directory, draft: &SlotDraft) -> Result<()> {
    if directory.doctor(draft.doctor_id).is_none() {
        return Err(ClinicError::validation("doctor not found"));
    }
    if directory.department(draft.department_id).is_none() {
        return Err(ClinicError::validation("department not found"));
    }
    if draft.start_time >= draft.end_time {
        return Err(ClinicError::validation("start time must be before end time"));
    }
    Ok(())
}

/// Keeps OPEN/RUNNING/FULL in line with the booked count. PAUSED is left alone.
fn settle_status(slot: &mut TimeSlot) {
    match slot.status {
        SlotStatus::Open | SlotStatus::Running if slot.booked >= slot.capacity => {
            slot.status = SlotStatus::Full;
        }
        SlotStatus::Full if slot.booked < slot.capacity => {
            slot.status = SlotStatus::Open;
        }
        _ => {}
    }
}
