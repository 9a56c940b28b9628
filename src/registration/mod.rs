pub mod types;
pub mod status;
pub mod translate;
pub mod conflict;
pub mod engine;

pub use types::{Channel, NewRegistration, PaymentStatus, Registration, RegistrationPatch, RegistrationType};
pub use status::RegistrationStatus;
pub use translate::{external_channel, external_status, parse_channel, parse_status};
pub use conflict::{conflict_window, RegistrationBook, CONFLICT_WINDOW_MINUTES};
pub use engine::BookingPolicy;
