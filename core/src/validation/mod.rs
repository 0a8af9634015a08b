mod admission;
mod service;
mod types;

pub use admission::{Admission, AdmissionPermit, AdmissionSnapshot};
pub use service::{ServiceSnapshot, ValidationService};
pub use types::{ErrorBody, ValidationRequest, ValidationResult, Verdict};
