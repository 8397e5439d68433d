//! API middleware

mod jwt;
mod logging;

pub use jwt::{Claims, JwtAuth};
pub use logging::RequestLogging;
