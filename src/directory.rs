//! Read-only view of the people and departments the scheduler refers to.
//!
//! Doctors, patients and departments are owned by the account service; the
//! scheduler only needs to know that they exist and who they belong to.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: u64,
    /// Login name of the account this doctor signs in with.
    pub username: String,
    pub name: String,
    pub department_id: u64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    pub name: String,
}

/// On-disk layout of the directory file.
#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    departments: Vec<Department>,
    #[serde(default)]
    doctors: Vec<Doctor>,
    #[serde(default)]
    patients: Vec<Patient>,
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    departments: HashMap<u64, Department>,
    doctors: HashMap<u64, Doctor>,
    patients: HashMap<u64, Patient>,
}

impl Directory {
    /// Loads a directory from a JSON file with `departments`, `doctors` and `patients` arrays.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let file: DirectoryFile = serde_json::from_str(raw)?;
        let mut directory = Directory::default();
        for department in file.departments {
            directory.add_department(department);
        }
        for doctor in file.doctors {
            directory.add_doctor(doctor);
        }
        for patient in file.patients {
            directory.add_patient(patient);
        }
        Ok(directory)
    }

    pub fn add_department(&mut self, department: Department) {
        self.departments.insert(department.id, department);
    }

    pub fn add_doctor(&mut self, doctor: Doctor) {
        self.doctors.insert(doctor.id, doctor);
    }

    pub fn add_patient(&mut self, patient: Patient) {
        self.patients.insert(patient.id, patient);
    }

    pub fn department(&self, id: u64) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn doctor(&self, id: u64) -> Option<&Doctor> {
        self.doctors.get(&id)
    }

    pub fn patient(&self, id: u64) -> Option<&Patient> {
        self.patients.get(&id)
    }

    pub fn doctor_by_username(&self, username: &str) -> Option<&Doctor> {
        self.doctors.values().find(|d| d.username == username)
    }

    pub fn patient_by_username(&self, username: &str) -> Option<&Patient> {
        self.patients
            .values()
            .find(|p| p.username.as_deref() == Some(username))
    }

    /// Department name for a doctor, used when presenting registrations.
    pub fn department_of(&self, doctor_id: u64) -> Option<&Department> {
        self.doctor(doctor_id)
            .and_then(|d| self.department(d.department_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "departments": [{"id": 1, "name": "Cardiology"}],
        "doctors": [{"id": 10, "username": "dr.wang", "name": "Wang Li", "departmentId": 1}],
        "patients": [
            {"id": 100, "username": "p.chen", "name": "Chen Mei"},
            {"id": 101, "name": "Walk-in"}
        ]
    }"#;

    #[test]
    fn loads_directory_from_json() {
        let directory = Directory::from_json(SAMPLE).unwrap();
        assert_eq!(directory.department(1).unwrap().name, "Cardiology");
        assert_eq!(directory.doctor_by_username("dr.wang").unwrap().id, 10);
        assert_eq!(directory.patient_by_username("p.chen").unwrap().id, 100);
        assert!(directory.patient(101).unwrap().username.is_none());
        assert_eq!(directory.department_of(10).unwrap().name, "Cardiology");
        assert!(directory.doctor(11).is_none());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let directory = Directory::from_json("{}").unwrap();
        assert!(directory.doctor_by_username("anyone").is_none());
    }
}
