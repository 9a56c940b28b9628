//! Error type shared by every clinic operation.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::registration::RegistrationStatus;

/// Coarse failure category a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    PreconditionFailed,
    Unauthenticated,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("patient information is required")]
    MissingPatient,

    #[error("doctor information is required")]
    MissingDoctor,

    #[error("appointment time is required")]
    MissingAppointmentTime,

    #[error("{0}")]
    Validation(String),

    #[error("invalid status value: {0}")]
    InvalidStatus(String),

    /// Another live registration of the same patient sits inside the conflict window.
    #[error("time slot already booked (registration {registration_id}), please choose another time")]
    TimeConflict { registration_id: u64 },

    #[error("schedule conflict with existing schedule: {0}")]
    SlotOverlap(u64),

    #[error("schedule {0} is fully booked")]
    CapacityExceeded(u64),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("medical record is required before completing the registration")]
    RecordRequired,

    #[error("registration cannot move from {from} to {to}")]
    IllegalTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },

    #[error("authentication required")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClinicError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPatient
            | Self::MissingDoctor
            | Self::MissingAppointmentTime
            | Self::Validation(_)
            | Self::InvalidStatus(_) => ErrorKind::Validation,
            Self::TimeConflict { .. } | Self::SlotOverlap(_) | Self::CapacityExceeded(_) => {
                ErrorKind::Conflict
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::RecordRequired | Self::IllegalTransition { .. } => ErrorKind::PreconditionFailed,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Application-level code carried in the response envelope.
    pub fn code(&self) -> u16 {
        match self {
            Self::MissingPatient => 4001,
            Self::MissingDoctor => 4002,
            Self::MissingAppointmentTime => 4003,
            Self::TimeConflict { .. } => 4004,
            Self::CapacityExceeded(_) => 4005,
            Self::SlotOverlap(_) => 4006,
            Self::RecordRequired => 4007,
            Self::Validation(_) | Self::InvalidStatus(_) | Self::IllegalTransition { .. } => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }
}

impl ResponseError for ClinicError {
    fn status_code(&self) -> StatusCode {
        match self {
            // Slot overlaps are reported as a bad request, booking clashes as a conflict.
            Self::SlotOverlap(_) => StatusCode::BAD_REQUEST,
            Self::TimeConflict { .. } | Self::CapacityExceeded(_) => StatusCode::CONFLICT,
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::PreconditionFailed | ErrorKind::Conflict => {
                    StatusCode::BAD_REQUEST
                }
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "code": self.code(),
            "msg": self.to_string(),
            "data": null,
        }))
    }
}

/// Result type for clinic operations
pub type Result<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_failures_keep_their_domain_codes() {
        assert_eq!(ClinicError::MissingPatient.code(), 4001);
        assert_eq!(ClinicError::MissingDoctor.code(), 4002);
        assert_eq!(ClinicError::MissingAppointmentTime.code(), 4003);
        assert_eq!(ClinicError::TimeConflict { registration_id: 7 }.code(), 4004);
    }

    #[test]
    fn http_status_follows_kind() {
        assert_eq!(
            ClinicError::TimeConflict { registration_id: 1 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ClinicError::SlotOverlap(3).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ClinicError::RecordRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ClinicError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ClinicError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ClinicError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ClinicError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn precondition_kinds() {
        assert_eq!(ClinicError::RecordRequired.kind(), ErrorKind::PreconditionFailed);
        let illegal = ClinicError::IllegalTransition {
            from: RegistrationStatus::Completed,
            to: RegistrationStatus::Waiting,
        };
        assert_eq!(illegal.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(illegal.to_string(), "registration cannot move from COMPLETED to WAITING");
    }
}
