//! Start-up configuration: a mode taken from the command line plus a few
//! environment variables.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::schedule::parse_work_date;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_DIRECTORY: &str = "data/directory.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("invalid roster date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("usage: clinic-scheduler web [port] | clinic-scheduler roster <date> [output]")]
    Usage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Web { port: u16 },
    Roster { date: NaiveDate, output: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub bind: String,
    pub directory_path: PathBuf,
    pub slots_csv: Option<PathBuf>,
    pub allow_past_appointments: bool,
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl Config {
    /// Reads the process arguments and environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_parts(&args, |key| std::env::var(key).ok())
    }

    /// `args` excludes the program name. With no arguments the server starts
    /// on the default port.
    pub fn from_parts<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match args.first().map(String::as_str) {
            None | Some("web") => {
                let port = match args.get(1) {
                    Some(raw) => raw
                        .parse::<u16>()
                        .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
                    None => DEFAULT_PORT,
                };
                Mode::Web { port }
            }
            Some("roster") => {
                let raw = args.get(1).ok_or(ConfigError::Usage)?;
                let date = parse_work_date(raw).ok_or_else(|| ConfigError::InvalidDate(raw.clone()))?;
                Mode::Roster {
                    date,
                    output: args.get(2).cloned(),
                }
            }
            Some(_) => return Err(ConfigError::Usage),
        };

        Ok(Self {
            mode,
            bind: env("CLINIC_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            directory_path: env("CLINIC_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIRECTORY)),
            slots_csv: env("CLINIC_SLOTS_CSV")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            allow_past_appointments: env("CLINIC_ALLOW_PAST_APPOINTMENTS")
                .map(|v| flag(&v))
                .unwrap_or(false),
        })
    }
}
