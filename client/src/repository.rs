use std::sync::Arc;

use log::debug;
use reqwest::Method;

use taskdeck::task::{Task, TaskDraft, TaskId};

use crate::{errors::ClientError, services::api::ApiClient, session::Session};

/// CRUD calls against the remote task service. Every call attaches the
/// current session credential; transient failures are surfaced immediately,
/// retry policy belongs to the caller.
#[derive(Clone)]
pub struct TaskRepository {
    api: ApiClient,
    session: Arc<Session>,
}

impl TaskRepository {
    pub(crate) fn new(api: ApiClient, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let tasks: Vec<Task> = self
            .api
            .call_api(Method::GET, "tasks", None::<i32>, Some(self.session.as_ref()))
            .await?;
        debug!("{} tasks loaded", tasks.len());
        Ok(tasks)
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ClientError> {
        self.api
            .call_api(Method::POST, "tasks", Some(draft), Some(self.session.as_ref()))
            .await
    }

    /// Full replace of the mutable fields: the caller is responsible for
    /// carrying forward unchanged values in the draft.
    pub async fn update_task(&self, task_id: TaskId, draft: &TaskDraft) -> Result<Task, ClientError> {
        self.api
            .call_api(
                Method::PUT,
                &format!("tasks/{task_id}"),
                Some(draft),
                Some(self.session.as_ref()),
            )
            .await
    }

    pub async fn delete_task(&self, task_id: TaskId) -> Result<(), ClientError> {
        self.api
            .call_api_no_content(
                Method::DELETE,
                &format!("tasks/{task_id}"),
                None::<i32>,
                Some(self.session.as_ref()),
            )
            .await
    }
}
