pub mod handler;
pub mod patient;
pub mod recommendations;

pub use handler::{AppState, home, json_body, parse_body, predict};
pub use patient::{PatientPayload, ValidationError, display_value};
