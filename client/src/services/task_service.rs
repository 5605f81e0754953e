use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::debug;
use validator::Validate;

use taskdeck::task::{Task, TaskDraft, TaskId, TaskPriority, TaskStatus};

use crate::{
    errors::ClientError,
    model::{TaskListModel, TaskListStats, ViewParameters},
    repository::TaskRepository,
    session::{Session, SessionState},
};

#[derive(Debug, Default)]
struct MutationState {
    in_flight: HashSet<TaskId>,
    pending_delete: HashSet<TaskId>,
    refresh_sequence: u64,
}

/// Snapshot of the mutation state, for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationSnapshot {
    pub in_flight: Vec<TaskId>,
    pub pending_delete: Vec<TaskId>,
}

/// Create/update/delete operations over the task collection. Every
/// successful mutation is followed by a full reconciling read: the rendered
/// collection always comes from the remote service, never from a locally
/// patched object.
pub struct TaskService {
    repository: TaskRepository,
    session: Arc<Session>,
    model: Arc<RwLock<TaskListModel>>,
    mutations: Mutex<MutationState>,
}

impl TaskService {
    pub(crate) fn new(
        repository: TaskRepository,
        session: Arc<Session>,
        model: Arc<RwLock<TaskListModel>>,
    ) -> Self {
        Self {
            repository,
            session,
            model,
            mutations: Mutex::default(),
        }
    }

    pub fn model(&self) -> &Arc<RwLock<TaskListModel>> {
        &self.model
    }

    pub fn derived_tasks(&self) -> Vec<Task> {
        self.model_read().filtered_tasks()
    }

    pub fn stats(&self) -> TaskListStats {
        self.model_read().stats()
    }

    pub fn view_parameters(&self) -> ViewParameters {
        self.model_read().view_parameters().clone()
    }

    pub fn set_search_text(&self, search_text: impl Into<String>) {
        self.model_write().set_search_text(search_text);
    }

    pub fn set_status_filter(&self, status_filter: Option<TaskStatus>) {
        self.model_write().set_status_filter(status_filter);
    }

    pub fn set_priority_filter(&self, priority_filter: Option<TaskPriority>) {
        self.model_write().set_priority_filter(priority_filter);
    }

    pub fn clear_filters(&self) {
        self.model_write().clear_filters();
    }

    pub fn mutation_state(&self) -> MutationSnapshot {
        let mutations = self.mutations_lock();
        MutationSnapshot {
            in_flight: mutations.in_flight.iter().copied().collect(),
            pending_delete: mutations.pending_delete.iter().copied().collect(),
        }
    }

    pub async fn create(&self, draft: TaskDraft) -> Result<Task, ClientError> {
        validate_draft(&draft)?;
        let task = self.repository.create_task(&draft).await?;
        self.refresh().await?;
        Ok(task)
    }

    pub async fn update(&self, task_id: TaskId, draft: TaskDraft) -> Result<Task, ClientError> {
        validate_draft(&draft)?;
        self.begin_mutation(task_id)?;
        let result = self.update_and_refresh(task_id, &draft).await;
        self.end_mutation(task_id);
        result
    }

    /// Single-field status change, modeled as a full update carrying forward
    /// the task's other current fields.
    pub async fn set_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, ClientError> {
        let draft = {
            let model = self.model_read();
            let Some(task) = model.task(task_id) else {
                return Err(ClientError::InvalidInputData {
                    user_error: format!("Unknown task {task_id}"),
                });
            };
            let mut draft = task.as_draft();
            draft.status = status;
            draft
        };
        self.update(task_id, draft).await
    }

    /// First step of the two-step delete: mark the task so the presentation
    /// layer can ask for confirmation.
    pub fn request_delete(&self, task_id: TaskId) {
        self.mutations_lock().pending_delete.insert(task_id);
    }

    pub fn cancel_delete(&self, task_id: TaskId) {
        self.mutations_lock().pending_delete.remove(&task_id);
    }

    pub fn has_pending_delete(&self, task_id: TaskId) -> bool {
        self.mutations_lock().pending_delete.contains(&task_id)
    }

    /// Busy state: a mutation for this task is currently in flight.
    pub fn is_mutating(&self, task_id: TaskId) -> bool {
        self.mutations_lock().in_flight.contains(&task_id)
    }

    /// Second step of the two-step delete. Refused when no delete was
    /// requested for this task.
    pub async fn confirm_delete(&self, task_id: TaskId) -> Result<(), ClientError> {
        {
            let mut mutations = self.mutations_lock();
            if !mutations.pending_delete.contains(&task_id) {
                return Err(ClientError::InvalidInputData {
                    user_error: format!("Delete has not been requested for task {task_id}"),
                });
            }
            if mutations.in_flight.contains(&task_id) {
                debug!("Dropping delete for task {task_id}: a mutation is already in flight");
                return Err(ClientError::Conflict(task_id));
            }
            mutations.in_flight.insert(task_id);
            mutations.pending_delete.remove(&task_id);
        }
        let result = self.delete_and_refresh(task_id).await;
        self.end_mutation(task_id);
        result
    }

    /// Full reconciling read of the collection. Each call is
    /// sequence-stamped; a completion that is no longer the latest issued
    /// one, or that lands after the session left `LoggedIn`, is discarded
    /// instead of overwriting newer state.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let sequence = {
            let mut mutations = self.mutations_lock();
            mutations.refresh_sequence += 1;
            mutations.refresh_sequence
        };

        let tasks = self.repository.list_tasks().await?;

        if self.session.state() != SessionState::LoggedIn {
            debug!("Discarding refresh #{sequence}: session is no longer active");
            return Ok(());
        }
        let mutations = self.mutations_lock();
        if sequence != mutations.refresh_sequence {
            debug!("Discarding refresh #{sequence}: a newer refresh was issued");
            return Ok(());
        }
        self.model_write().set_tasks(tasks);
        Ok(())
    }

    /// Cancels the effect of any in-flight refresh, e.g. when navigating
    /// away from the task view.
    pub fn invalidate_refreshes(&self) {
        self.mutations_lock().refresh_sequence += 1;
    }

    async fn update_and_refresh(
        &self,
        task_id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, ClientError> {
        let task = self.repository.update_task(task_id, draft).await?;
        self.refresh().await?;
        Ok(task)
    }

    async fn delete_and_refresh(&self, task_id: TaskId) -> Result<(), ClientError> {
        self.repository.delete_task(task_id).await?;
        self.refresh().await
    }

    fn begin_mutation(&self, task_id: TaskId) -> Result<(), ClientError> {
        let mut mutations = self.mutations_lock();
        if !mutations.in_flight.insert(task_id) {
            debug!("Dropping mutation for task {task_id}: one is already in flight");
            return Err(ClientError::Conflict(task_id));
        }
        Ok(())
    }

    fn end_mutation(&self, task_id: TaskId) {
        self.mutations_lock().in_flight.remove(&task_id);
    }

    fn mutations_lock(&self) -> MutexGuard<MutationState> {
        self.mutations.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn model_read(&self) -> RwLockReadGuard<TaskListModel> {
        self.model.read().unwrap_or_else(|err| err.into_inner())
    }

    fn model_write(&self) -> RwLockWriteGuard<TaskListModel> {
        self.model.write().unwrap_or_else(|err| err.into_inner())
    }
}

fn validate_draft(draft: &TaskDraft) -> Result<(), ClientError> {
    draft.validate().map_err(ClientError::invalid_input)
}
