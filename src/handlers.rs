pub mod auth_handlers;
pub mod error_response;
pub mod record_handlers;
pub mod registration_handlers;
pub mod report_handlers;

pub use error_response::ErrorResponse;
