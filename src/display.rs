use std::fs::File;
use std::io::Write;

use chrono::NaiveDate;

use crate::directory::Directory;
use crate::schedule::{format_window, TimeSlot};

/// Formats a doctor name with department tag
pub fn format_doctor_name(directory: &Directory, doctor_id: u64) -> String {
    let name = directory
        .doctor(doctor_id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| format!("doctor #{doctor_id}"));
    match directory.department_of(doctor_id) {
        Some(dept) => format!("[{}] {}", dept.name, name),
        None => name,
    }
}

/// One roster line per slot: HH:MM-HH:MM [dept] doctor booked/capacity STATUS
pub fn roster_lines(directory: &Directory, slots: &[TimeSlot]) -> Vec<String> {
    slots
        .iter()
        .map(|slot| {
            format!(
                "{} {} {}/{} {}",
                format_window(slot.start_time, slot.end_time),
                format_doctor_name(directory, slot.doctor_id),
                slot.booked,
                slot.capacity,
                slot.status
            )
        })
        .collect()
}

/// Writes a day roster to a file
pub fn write_roster_to_file(
    date: NaiveDate,
    directory: &Directory,
    slots: &[TimeSlot],
    filename: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(filename)?;

    writeln!(file, "** {} **", date)?;
    if slots.is_empty() {
        writeln!(file, "[NO SCHEDULES]")?;
    }
    for line in roster_lines(directory, slots) {
        writeln!(file, "{}", line)?;
    }

    Ok(())
}

/// Prints a day roster in a readable format
pub fn print_roster(date: NaiveDate, directory: &Directory, slots: &[TimeSlot]) {
    println!("\n=== Roster for {} ===", date);
    println!("Schedules: {}", slots.len());

    let full: Vec<&TimeSlot> = slots.iter().filter(|s| s.remaining() == 0).collect();
    if !full.is_empty() {
        println!("Fully booked ({}):", full.len());
        for slot in full {
            println!(
                "  - {} {}",
                format_window(slot.start_time, slot.end_time),
                format_doctor_name(directory, slot.doctor_id)
            );
        }
    }

    println!();
    for line in roster_lines(directory, slots) {
        println!("  {}", line);
    }
}
