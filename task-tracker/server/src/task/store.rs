use async_trait::async_trait;
use sea_orm::*;

use crate::entities::*;
use crate::task::Task;

/// Trait defining the operations on the durable collection of tasks, keyed by ID.
///
/// Implementations give no atomicity across calls. A read followed by a write may
/// interleave with other callers touching the same task; the last write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Loads every task, ordered by ID.
    async fn find_all(&self) -> Result<Vec<Task>, DbErr>;

    /// Loads a single task. A missing task is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr>;

    /// Loads every task whose completion flag equals `completed`.
    async fn find_by_completed(&self, completed: bool) -> Result<Vec<Task>, DbErr>;

    /// Inserts the task if it has no ID yet, otherwise overwrites the row with its ID.
    ///
    /// # Returns
    ///
    /// * `Result<Task, DbErr>` - The persisted state of the task
    async fn save(&self, task: Task) -> Result<Task, DbErr>;

    /// Removes the row matching the task's ID. The caller guarantees the row exists.
    async fn delete(&self, task: &Task) -> Result<(), DbErr>;

    async fn count(&self) -> Result<u64, DbErr>;

    async fn count_by_completed(&self, completed: bool) -> Result<u64, DbErr>;
}

/// Task store backed by a SeaORM database connection.
pub struct SeaOrmTaskStore<'a> {
    db: &'a DatabaseConnection,
}

impl SeaOrmTaskStore<'_> {
    pub fn new(db: &DatabaseConnection) -> SeaOrmTaskStore<'_> {
        SeaOrmTaskStore { db }
    }
}

#[async_trait]
impl TaskStore for SeaOrmTaskStore<'_> {
    #[tracing::instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<Task>, DbErr> {
        let tasks = task::Entity::find()
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> Result<Option<Task>, DbErr> {
        let task_model = task::Entity::find_by_id(id).one(self.db).await?;
        Ok(task_model.map(Task::from))
    }

    #[tracing::instrument(skip(self))]
    async fn find_by_completed(&self, completed: bool) -> Result<Vec<Task>, DbErr> {
        let tasks = task::Entity::find()
            .filter(task::Column::Completed.eq(completed))
            .order_by_asc(task::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn save(&self, task: Task) -> Result<Task, DbErr> {
        let saved_model = match task.id {
            None => {
                let active_model = task::ActiveModel {
                    title: ActiveValue::Set(task.title),
                    description: ActiveValue::Set(task.description),
                    completed: ActiveValue::Set(task.completed),
                    created_at: ActiveValue::Set(task.created_at),
                    ..Default::default()
                };
                active_model.insert(self.db).await?
            }
            // created_at stays NotSet so an update can never rewrite it.
            Some(id) => {
                let active_model = task::ActiveModel {
                    id: ActiveValue::Unchanged(id),
                    title: ActiveValue::Set(task.title),
                    description: ActiveValue::Set(task.description),
                    completed: ActiveValue::Set(task.completed),
                    created_at: ActiveValue::NotSet,
                };
                active_model.update(self.db).await?
            }
        };
        Ok(Task::from(saved_model))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, task: &Task) -> Result<(), DbErr> {
        let id = task
            .id
            .ok_or_else(|| DbErr::Custom("Cannot delete a task that was never saved".to_string()))?;
        task::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn count(&self) -> Result<u64, DbErr> {
        task::Entity::find().count(self.db).await
    }

    #[tracing::instrument(skip(self))]
    async fn count_by_completed(&self, completed: bool) -> Result<u64, DbErr> {
        task::Entity::find()
            .filter(task::Column::Completed.eq(completed))
            .count(self.db)
            .await
    }
}
