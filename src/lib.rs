use serde::{Deserialize, Serialize};

pub mod auth;
pub mod task;
pub mod user;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct SuccessResponse {
    pub message: String,
}
