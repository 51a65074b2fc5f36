use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Request body for `/queue/set`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetQueueRequest {
    /// Song ids in play order.
    #[schema(example = json!([12, 7, 31]))]
    pub queue: Vec<i32>,
}

/// Request body for `/queue/change-song`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangeSongRequest {
    #[schema(example = "forward")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    Forward,
    Backward,
}

impl QueueAction {
    pub fn parse(action: Option<&str>) -> Result<Self, AppError> {
        match action {
            Some("forward") => Ok(QueueAction::Forward),
            Some("backward") => Ok(QueueAction::Backward),
            _ => Err(AppError::Validation(
                "Action must either be forward or backward".into(),
            )),
        }
    }

    /// Move `index` one step, staying within a queue of `len` songs.
    pub fn apply(self, index: i32, len: usize) -> i32 {
        let last = i32::try_from(len).unwrap_or(i32::MAX).saturating_sub(1).max(0);
        let next = match self {
            QueueAction::Forward => index.saturating_add(1),
            QueueAction::Backward => index.saturating_sub(1),
        };
        next.clamp(0, last)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub success: bool,
    pub message: String,
    /// Absent when the queue is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_index: Option<i32>,
    pub queue: Vec<i32>,
}
