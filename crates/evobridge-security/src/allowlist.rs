use tracing::debug;

use crate::phone::normalize_phone;

/// Single-owner allowlist: only messages from the configured number pass.
#[derive(Debug, Clone)]
pub struct SenderFilter {
    owner: String,
}

impl SenderFilter {
    pub fn new(own_number: &str) -> Self {
        Self {
            owner: normalize_phone(own_number),
        }
    }

    /// The owner's number in normalized form.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_allowed(&self, sender: &str) -> bool {
        let allowed = normalize_phone(sender) == self.owner;
        if !allowed {
            debug!("sender {sender} is not the configured owner");
        }
        allowed
    }
}

/// True iff `sender` and `own_number` name the same phone after normalization.
pub fn is_authorized(sender: &str, own_number: &str) -> bool {
    normalize_phone(sender) == normalize_phone(own_number)
}
