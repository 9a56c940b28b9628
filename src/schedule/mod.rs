pub mod types;
pub mod slot_utils;
pub mod manager;

pub use types::{SlotDraft, SlotStatus, SlotType, TimeSlot};
pub use slot_utils::{format_window, intervals_overlap, parse_time_of_day, parse_work_date};
pub use manager::SlotBook;
