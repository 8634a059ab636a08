//! Admission control logic and state management.

mod key;
mod limiter;
mod log;

pub use key::ClientKey;
pub use limiter::{AdmissionLimiter, Decision};
pub use log::RequestLog;
