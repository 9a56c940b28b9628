//! Mapping between the internal status/channel enums and the lowercase
//! vocabulary used by clients.

use crate::error::{ClinicError, Result};
use super::status::RegistrationStatus;
use super::types::Channel;

/// Parses a client status value. The internal names are accepted as well.
/// Anything else is an error, never a default.
pub fn parse_status(raw: &str) -> Result<RegistrationStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" | "waiting" => Ok(RegistrationStatus::Waiting),
        "processing" | "confirmed" => Ok(RegistrationStatus::Confirmed),
        "completed" => Ok(RegistrationStatus::Completed),
        "cancelled" => Ok(RegistrationStatus::Cancelled),
        _ => Err(ClinicError::InvalidStatus(raw.to_string())),
    }
}

pub fn external_status(status: RegistrationStatus) -> &'static str {
    match status {
        RegistrationStatus::Waiting => "pending",
        RegistrationStatus::Confirmed => "processing",
        RegistrationStatus::Completed => "completed",
        RegistrationStatus::Cancelled => "cancelled",
    }
}

pub fn parse_channel(raw: &str) -> Result<Channel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "online" => Ok(Channel::Online),
        "offline" => Ok(Channel::Offline),
        _ => Err(ClinicError::validation(format!("invalid channel value: {raw}"))),
    }
}

pub fn external_channel(channel: Channel) -> &'static str {
    match channel {
        Channel::Online => "online",
        Channel::Offline => "offline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_vocabulary() {
        assert_eq!(parse_status("pending").unwrap(), RegistrationStatus::Waiting);
        assert_eq!(parse_status("Processing").unwrap(), RegistrationStatus::Confirmed);
        assert_eq!(parse_status("confirmed").unwrap(), RegistrationStatus::Confirmed);
        assert_eq!(parse_status("COMPLETED").unwrap(), RegistrationStatus::Completed);
        assert_eq!(parse_status(" cancelled ").unwrap(), RegistrationStatus::Cancelled);
        assert_eq!(parse_status("WAITING").unwrap(), RegistrationStatus::Waiting);
    }

    #[test]
    fn unknown_values_are_rejected() {
        for raw in ["", "done", "registered", "consulted"] {
            assert!(matches!(parse_status(raw), Err(ClinicError::InvalidStatus(_))));
        }
        assert!(parse_channel("phone").is_err());
    }

    #[test]
    fn outbound_names() {
        assert_eq!(external_status(RegistrationStatus::Waiting), "pending");
        assert_eq!(external_status(RegistrationStatus::Confirmed), "processing");
        assert_eq!(external_channel(parse_channel("OFFLINE").unwrap()), "offline");
    }
}
