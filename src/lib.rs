pub mod clinic;
pub mod clock;
pub mod config;
pub mod directory;
pub mod display;
pub mod doctor;
pub mod error;
pub mod form;
pub mod identity;
pub mod parser;
pub mod record;
pub mod registration;
pub mod schedule;
pub mod web;

pub use clinic::{Clinic, ClinicState, ImportReport};
pub use error::{ClinicError, ErrorKind, Result};
