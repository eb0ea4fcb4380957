//! Request and response bodies of the HTTP API.

pub mod browsing;
pub mod conversation;
pub mod data_source;
pub mod task;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
