use crate::entities::*;
use chrono::{DateTime, Utc};

pub mod api;
pub mod store;
pub mod web;

pub use store::{SeaOrmTaskStore, TaskStore};
pub use web::create_task_router;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: Option<i32>,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task that has not been persisted yet. The creation timestamp is taken now.
    pub fn new(title: String, description: Option<String>, completed: bool) -> Self {
        Self {
            id: None,
            title,
            description,
            completed,
            created_at: Utc::now(),
        }
    }

    /// Returns the ID of the task, or `None` if it was never saved.
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Returns the moment the task was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the user-editable fields. `id` and `created_at` are left untouched.
    fn apply(&mut self, input: TaskInput) {
        self.title = input.title;
        self.description = input.description;
        self.completed = input.completed;
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: Some(model.id),
            title: model.title,
            description: model.description,
            completed: model.completed,
            created_at: model.created_at,
        }
    }
}

/// Client-supplied fields for creating or updating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

impl TaskInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Messages describing every rule a [`TaskInput`] violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .0.join(", "))]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}

/// Checks a task input before it is allowed to reach the store.
///
/// A title made only of whitespace counts as missing.
pub fn validate(input: &TaskInput) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if input.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// No task has the requested ID.
    #[error("Task with id {0} not found")]
    NotFound(i32),
    /// The input failed validation; nothing was persisted.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Aggregate task counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
}

/// Shared state for the JSON and HTML task routers.
#[derive(Clone, Debug)]
pub struct TaskState {
    pub db: std::sync::Arc<sea_orm::DatabaseConnection>,
}

pub struct TaskService<S> {
    store: S,
}

impl<'a> TaskService<SeaOrmTaskStore<'a>> {
    /// Creates a service backed by the given database connection.
    pub fn from_db(db: &'a sea_orm::DatabaseConnection) -> Self {
        Self::new(SeaOrmTaskStore::new(db))
    }
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Retrieves all tasks.
    #[tracing::instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.find_all().await?)
    }

    /// Retrieves a task by its ID.
    ///
    /// # Returns
    ///
    /// The task, or [`TaskServiceError::NotFound`] if no task has that ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> Result<Task, TaskServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::NotFound(id))
    }

    /// Validates and persists a new task.
    ///
    /// # Arguments
    ///
    /// * `input` - The title, description and completion flag of the new task.
    ///
    /// # Returns
    ///
    /// The stored task, now carrying its generated ID.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, input: TaskInput) -> Result<Task, TaskServiceError> {
        validate(&input)?;
        let task = Task::new(input.title, input.description, input.completed);
        let created = self.store.save(task).await?;
        tracing::info!("Created task {:?}", created.id());
        Ok(created)
    }

    /// Replaces the title, description and completion flag of an existing task.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update.
    /// * `input` - The new field values.
    ///
    /// # Returns
    ///
    /// The updated task. Its ID and creation time are those of the original.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, id: i32, input: TaskInput) -> Result<Task, TaskServiceError> {
        validate(&input)?;
        let mut existing = self.get_by_id(id).await?;
        existing.apply(input);
        Ok(self.store.save(existing).await?)
    }

    /// Deletes a task by its ID.
    ///
    /// # Returns
    ///
    /// The deleted task.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<Task, TaskServiceError> {
        let existing = self.get_by_id(id).await?;
        self.store.delete(&existing).await?;
        tracing::info!("Deleted task {}", id);
        Ok(existing)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_completed_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.find_by_completed(true).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_pending_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.find_by_completed(false).await?)
    }

    /// Marks a task as completed. Marking an already completed task is a no-op in effect.
    #[tracing::instrument(skip(self))]
    pub async fn mark_as_completed(&self, id: i32) -> Result<Task, TaskServiceError> {
        self.set_completed(id, true).await
    }

    /// Marks a task as pending. Marking an already pending task is a no-op in effect.
    #[tracing::instrument(skip(self))]
    pub async fn mark_as_pending(&self, id: i32) -> Result<Task, TaskServiceError> {
        self.set_completed(id, false).await
    }

    async fn set_completed(&self, id: i32, completed: bool) -> Result<Task, TaskServiceError> {
        let mut task = self.get_by_id(id).await?;
        task.completed = completed;
        Ok(self.store.save(task).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_tasks(&self) -> Result<u64, TaskServiceError> {
        Ok(self.store.count().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_completed_tasks(&self) -> Result<u64, TaskServiceError> {
        Ok(self.store.count_by_completed(true).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_pending_tasks(&self) -> Result<u64, TaskServiceError> {
        Ok(self.store.count_by_completed(false).await?)
    }

    /// Collects the total, completed and pending counts.
    #[tracing::instrument(skip(self))]
    pub async fn stats(&self) -> Result<TaskStats, TaskServiceError> {
        Ok(TaskStats {
            total: self.count_tasks().await?,
            completed: self.count_completed_tasks().await?,
            pending: self.count_pending_tasks().await?,
        })
    }
}
