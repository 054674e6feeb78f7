//! Response types shared across models.

use serde::{Deserialize, Serialize};

/// `{"message": "..."}` acknowledgement returned by mutating endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
