// Blocking HTTP client for the task API, used by the terminal view
use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};

use crate::app::models::{CreateTask, ErrorBody, Task, TaskId, UpdateCompletion};

pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ApiClient {
        ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn tasks_url(&self) -> String {
        format!("{}/api/tasks", self.base_url)
    }

    fn task_url(&self, id: TaskId) -> String {
        format!("{}/api/tasks/{}", self.base_url, id)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let response = self
            .http
            .get(self.tasks_url())
            .send()
            .context("Failed to load tasks")?;
        Ok(check(response)?.json()?)
    }

    pub fn create_task(&self, text: &str) -> Result<Task> {
        let response = self
            .http
            .post(self.tasks_url())
            .json(&CreateTask {
                text: text.to_string(),
            })
            .send()
            .context("Failed to add task")?;
        Ok(check(response)?.json()?)
    }

    pub fn set_completed(&self, id: TaskId, completed: bool) -> Result<Task> {
        let response = self
            .http
            .put(self.task_url(id))
            .json(&UpdateCompletion { completed })
            .send()
            .context("Failed to update task")?;
        Ok(check(response)?.json()?)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        let response = self
            .http
            .delete(self.task_url(id))
            .send()
            .context("Failed to delete task")?;
        check(response)?;
        Ok(())
    }
}

// Turn a non-2xx answer into an error carrying the server's message
fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorBody>() {
        Ok(body) => bail!("{} ({})", body.error, status),
        Err(_) => bail!("Request failed ({})", status),
    }
}
