use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

pub mod config;
pub mod errors;
pub mod model;
pub mod repository;
pub mod services;
pub mod session;

use crate::{
    config::ClientSettings,
    errors::ClientError,
    model::TaskListModel,
    repository::TaskRepository,
    services::{api::ApiClient, task_service::TaskService, user_service::UserService},
    session::{CredentialStorage, FileCredentialStore, Session},
};

/// The assembled client: one shared session and task list model, with the
/// task and user services wired over them. The presentation layer reads
/// derived state from `tasks`/`model` and forwards user intents to the
/// services.
pub struct TaskdeckClient {
    pub session: Arc<Session>,
    pub model: Arc<RwLock<TaskListModel>>,
    pub tasks: TaskService,
    pub users: UserService,
}

impl TaskdeckClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let storage = FileCredentialStore::new(settings.storage.credentials_file.clone());
        Self::with_storage(settings, Box::new(storage))
    }

    pub fn with_storage(
        settings: &ClientSettings,
        storage: Box<dyn CredentialStorage>,
    ) -> Result<Self, ClientError> {
        let session = Arc::new(Session::new(storage));
        let api = ApiClient::new(
            settings.api.base_url.clone(),
            settings.api.timeout_seconds.map(Duration::from_secs),
        )?;
        let model = Arc::new(RwLock::new(TaskListModel::default()));
        let repository = TaskRepository::new(api.clone(), session.clone());
        let tasks = TaskService::new(repository, session.clone(), model.clone());
        let users = UserService::new(api, session.clone());

        Ok(Self {
            session,
            model,
            tasks,
            users,
        })
    }
}
