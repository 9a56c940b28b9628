use csv::{Reader, StringRecord};
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::form::{validate_slot_form, SlotForm};
use crate::schedule::SlotDraft;

/// Rows read from a schedule CSV, keyed by their line in the file
#[derive(Debug, Default)]
pub struct SlotImport {
    pub drafts: Vec<(usize, SlotDraft)>,
    pub rejected: Vec<(usize, String)>,
}

/// Column positions, located by header name so exports with extra or
/// reordered columns still load
struct Columns {
    doctor: usize,
    department: usize,
    work_date: usize,
    start_time: usize,
    end_time: usize,
    capacity: Option<usize>,
    slot_type: Option<usize>,
}

fn normalize(header: &str) -> String {
    header
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let names: Vec<String> = headers.iter().map(normalize).collect();
        let find = |needle: &str| names.iter().position(|h| h.contains(needle));

        Self {
            doctor: find("doctor").unwrap_or(0),
            department: find("department").or_else(|| find("dept")).unwrap_or(1),
            work_date: find("date").unwrap_or(2),
            start_time: find("start").unwrap_or(3),
            end_time: find("end").unwrap_or(4),
            capacity: find("capacity"),
            slot_type: find("type"),
        }
    }
}

fn cell(record: &StringRecord, col: usize) -> Option<String> {
    record
        .get(col)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_row(record: &StringRecord, cols: &Columns) -> Result<SlotDraft, String> {
    let number = |col: usize, field: &str| -> Result<Option<u64>, String> {
        cell(record, col)
            .map(|v| v.parse::<u64>().map_err(|_| format!("{field} is not a number: {v}")))
            .transpose()
    };

    let capacity = match cols.capacity.and_then(|c| cell(record, c)) {
        Some(v) => Some(v.parse::<u32>().map_err(|_| format!("capacity is not a number: {v}"))?),
        None => None,
    };

    let form = SlotForm {
        doctor_id: number(cols.doctor, "doctor id")?,
        department_id: number(cols.department, "department id")?,
        work_date: cell(record, cols.work_date),
        start_time: cell(record, cols.start_time),
        end_time: cell(record, cols.end_time),
        capacity,
        slot_type: cols.slot_type.and_then(|c| cell(record, c)),
        status: None,
    };
    validate_slot_form(&form).map_err(|e| e.to_string())
}

/// Reads schedule rows from any CSV source. Rows that do not parse are
/// reported rather than aborting the import.
pub fn read_slots<R: Read>(source: R) -> Result<SlotImport, Box<dyn std::error::Error>> {
    let mut reader = Reader::from_reader(source);
    let cols = Columns::locate(reader.headers()?);
    let mut import = SlotImport::default();

    for (index, result) in reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                import.rejected.push((line, e.to_string()));
                continue;
            }
        };
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        match parse_row(&record, &cols) {
            Ok(draft) => import.drafts.push((line, draft)),
            Err(reason) => {
                debug!("Schedule row {} rejected: {}", line, reason);
                import.rejected.push((line, reason));
            }
        }
    }

    Ok(import)
}

/// Loads schedule rows from a CSV file
pub fn load_slots<P: AsRef<Path>>(csv_path: P) -> Result<SlotImport, Box<dyn std::error::Error>> {
    let file = std::fs::File::open(csv_path)?;
    read_slots(file)
}
