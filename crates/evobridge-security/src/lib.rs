pub mod allowlist;
pub mod phone;
pub mod validation;

pub use allowlist::{SenderFilter, is_authorized};
pub use phone::normalize_phone;
pub use validation::OutputSanitizer;
