// Handle Service Core - Domain Types & Ports
// NO transport dependencies: the HTTP caller lives in infra-http

pub mod domain;
pub mod error;
pub mod port;

pub use error::{ClientError, Result};

/// Remote module name; every wire method is `SERVICE_NAME.<method>`
pub const SERVICE_NAME: &str = "AbstractHandle";
