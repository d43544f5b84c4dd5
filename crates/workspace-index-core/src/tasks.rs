//! Scheduled task registry.
//!
//! Tasks are plain records describing work the agent daemon runs on a
//! schedule. This module stores and lists them; it never executes them.

use anyhow::Result;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{NewScheduledTask, ScheduledTask, TaskStatus};
use crate::store::TaskStore;

/// Listing filter. `from`/`to` bound `next_run_at` inclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TaskFilter {
    pub fn matches(&self, task: &ScheduledTask) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.from.map_or(true, |from| task.next_run_at >= from)
            && self.to.map_or(true, |to| task.next_run_at <= to)
    }
}

/// Validate and store a new task. Status starts as [`TaskStatus::Active`].
pub async fn create<S: TaskStore + ?Sized>(
    store: &S,
    new_task: NewScheduledTask,
) -> Result<ScheduledTask> {
    for (field, value) in [
        ("name", &new_task.name),
        ("scheduleExpr", &new_task.schedule_expr),
        ("command", &new_task.command),
    ] {
        if value.trim().is_empty() {
            return Err(CoreError::validation(format!("{} is required", field)).into());
        }
    }

    let task = ScheduledTask {
        id: Uuid::new_v4().to_string(),
        name: new_task.name.trim().to_string(),
        description: new_task.description,
        schedule_type: new_task.schedule_type,
        schedule_expr: new_task.schedule_expr.trim().to_string(),
        command: new_task.command,
        next_run_at: new_task.next_run_at,
        last_run_at: None,
        status: TaskStatus::Active,
    };
    store.insert_task(&task).await?;
    tracing::info!(id = %task.id, name = %task.name, "scheduled task created");
    Ok(task)
}

/// Tasks matching `filter`, soonest first.
pub async fn list<S: TaskStore + ?Sized>(store: &S, filter: &TaskFilter) -> Result<Vec<ScheduledTask>> {
    store.list_tasks(filter).await
}

pub async fn update_status<S: TaskStore + ?Sized>(
    store: &S,
    id: &str,
    status: TaskStatus,
) -> Result<()> {
    if !store.set_task_status(id, status).await? {
        return Err(CoreError::not_found(format!("task '{}'", id)).into());
    }
    tracing::info!(id, status = status.as_str(), "task status updated");
    Ok(())
}

pub async fn delete<S: TaskStore + ?Sized>(store: &S, id: &str) -> Result<()> {
    if !store.delete_task(id).await? {
        return Err(CoreError::not_found(format!("task '{}'", id)).into());
    }
    tracing::info!(id, "scheduled task deleted");
    Ok(())
}
