use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ClinicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotType {
    #[default]
    Regular,
    Specialist,
    Extra,
}

impl FromStr for SlotType {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "regular" => Ok(SlotType::Regular),
            "specialist" => Ok(SlotType::Specialist),
            "extra" => Ok(SlotType::Extra),
            other => Err(ClinicError::validation(format!("unknown schedule type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    #[default]
    Open,
    Running,
    Full,
    Paused,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotStatus::Open => "OPEN",
            SlotStatus::Running => "RUNNING",
            SlotStatus::Full => "FULL",
            SlotStatus::Paused => "PAUSED",
        };
        f.write_str(name)
    }
}

/// A doctor's bookable window on one day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: u64,
    pub doctor_id: u64,
    pub department_id: u64,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    pub status: SlotStatus,
    pub capacity: u32,
    pub booked: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TimeSlot {
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.booked)
    }

    /// True when `at` falls on this slot's date inside `[start_time, end_time)`.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at.date() == self.work_date && at.time() >= self.start_time && at.time() < self.end_time
    }
}

/// Everything needed to create or replace a slot's definition
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDraft {
    pub doctor_id: u64,
    pub department_id: u64,
    pub work_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_type: SlotType,
    pub status: Option<SlotStatus>,
    pub capacity: u32,
}

impl SlotDraft {
    /// Same rule as [`TimeSlot::contains`], against the drafted window.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at.date() == self.work_date && at.time() >= self.start_time && at.time() < self.end_time
    }
}
