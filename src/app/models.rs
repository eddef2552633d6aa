use serde::{Deserialize, Serialize};

pub type TaskId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Task {
        Task {
            id,
            text: text.into(),
            completed: false,
        }
    }
}

// Body of POST /api/tasks. A missing text is stored as an empty string.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateTask {
    #[serde(default)]
    pub text: String,
}

// Body of PUT /api/tasks/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCompletion {
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAck {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
