pub mod booking;
pub mod slot;

pub use booking::{
    parse_appointment_time, validate_booking, validate_doctor_update, validate_update, BatchStatusRequest,
    BookingRequest, DoctorUpdateRequest, RecordRequest, RegistrationUpdateRequest, StatusRequest,
};
pub use slot::{validate_slot_form, SlotForm};
