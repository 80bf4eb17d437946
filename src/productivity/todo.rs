use std::{fmt::Display, path::PathBuf};

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::DaybookError, store::json_store::JsonStore};

pub const TODO_FILE_NAME: &str = "todo_list.json";

/// Stored as 1, 2, 3 so that the file stays compatible with older todo lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, ValueEnum, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            v => Err(anyhow!("Unknown priority {v}")),
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub task: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: NaiveDateTime,
}

impl TodoItem {
    pub fn new(task: String, priority: Priority, due_date: Option<NaiveDate>) -> Self {
        Self {
            task,
            priority,
            due_date,
            completed: false,
            created_at: Local::now().naive_local(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct TodoSummary {
    pub total: usize,
    pub pending: usize,
    pub next_due: Option<TodoItem>,
}

/// Todo list backed by [TODO_FILE_NAME]. Items are addressed by their position in the file.
pub struct TodoManager {
    store: JsonStore<TodoItem>,
    todos: Vec<TodoItem>,
}

impl TodoManager {
    pub async fn open(path: PathBuf) -> Result<Self> {
        let store = JsonStore::new(path);
        let todos = store.load().await?;
        Ok(Self { store, todos })
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub async fn add(
        &mut self,
        task: String,
        priority: Priority,
        due_date: Option<NaiveDate>,
    ) -> Result<&TodoItem> {
        info!("Adding task {task:?}");
        self.todos.push(TodoItem::new(task, priority, due_date));
        self.store.save(&self.todos).await?;
        Ok(&self.todos[self.todos.len() - 1])
    }

    pub async fn complete(&mut self, index: usize) -> Result<&TodoItem> {
        let item = self
            .todos
            .get_mut(index)
            .ok_or(DaybookError::InvalidIndex(index))?;
        item.completed = true;
        self.store.save(&self.todos).await?;
        Ok(&self.todos[index])
    }

    pub async fn remove(&mut self, index: usize) -> Result<TodoItem> {
        if index >= self.todos.len() {
            return Err(DaybookError::InvalidIndex(index).into());
        }
        let removed = self.todos.remove(index);
        self.store.save(&self.todos).await?;
        Ok(removed)
    }

    /// Pending items, or every item with `show_completed`. Indices are the positions used by
    /// [TodoManager::complete] and [TodoManager::remove].
    pub fn list(&self, show_completed: bool) -> Vec<(usize, &TodoItem)> {
        self.todos
            .iter()
            .enumerate()
            .filter(|(_, todo)| show_completed || !todo.completed)
            .collect()
    }

    pub fn today(&self, date: NaiveDate) -> Vec<&TodoItem> {
        self.todos
            .iter()
            .filter(|todo| !todo.completed && todo.due_date == Some(date))
            .collect()
    }

    pub fn summary(&self) -> TodoSummary {
        let next_due = self
            .todos
            .iter()
            .filter(|todo| !todo.completed)
            .filter_map(|todo| todo.due_date.map(|due| (due, todo)))
            .min_by_key(|(due, _)| *due)
            .map(|(_, todo)| todo.clone());

        TodoSummary {
            total: self.todos.len(),
            pending: self.todos.iter().filter(|todo| !todo.completed).count(),
            next_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::error::DaybookError;

    use super::{Priority, TodoManager, TODO_FILE_NAME};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    #[tokio::test]
    async fn added_todo_is_listed_as_pending() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(TODO_FILE_NAME);
        let mut manager = TodoManager::open(path.clone()).await?;
        manager
            .add("write report".into(), Priority::High, Some(TEST_DATE))
            .await?;

        let reopened = TodoManager::open(path).await?;
        let listed = reopened.list(false);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, 0);
        assert_eq!(listed[0].1.task, "write report");
        assert!(!listed[0].1.completed);
        assert_eq!(listed[0].1.priority, Priority::High);
        Ok(())
    }

    #[tokio::test]
    async fn completed_todos_are_hidden_unless_requested() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = TodoManager::open(dir.path().join(TODO_FILE_NAME)).await?;
        manager.add("a".into(), Priority::Low, None).await?;
        manager.add("b".into(), Priority::Medium, None).await?;
        manager.complete(0).await?;

        let pending = manager.list(false);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, 1);
        assert_eq!(manager.list(true).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_index_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = TodoManager::open(dir.path().join(TODO_FILE_NAME)).await?;
        manager.add("a".into(), Priority::Low, None).await?;

        let err = manager.remove(3).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DaybookError>(),
            Some(DaybookError::InvalidIndex(3))
        ));
        assert!(manager.complete(1).await.is_err());
        assert_eq!(manager.todos().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn due_today_and_summary() -> Result<()> {
        let dir = tempdir()?;
        let mut manager = TodoManager::open(dir.path().join(TODO_FILE_NAME)).await?;
        let later = TEST_DATE.succ_opt().unwrap();
        manager.add("later".into(), Priority::Low, Some(later)).await?;
        manager.add("today".into(), Priority::Low, Some(TEST_DATE)).await?;
        manager.add("done".into(), Priority::Low, Some(TEST_DATE)).await?;
        manager.complete(2).await?;

        let today = manager.today(TEST_DATE);
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].task, "today");

        let summary = manager.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.next_due.map(|v| v.task), Some("today".into()));
        Ok(())
    }

    #[tokio::test]
    async fn priority_is_stored_as_number() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(TODO_FILE_NAME);
        let mut manager = TodoManager::open(path.clone()).await?;
        manager.add("a".into(), Priority::High, None).await?;
        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        assert_eq!(raw[0]["priority"], 3);
        assert_eq!(raw[0]["due_date"], serde_json::Value::Null);
        Ok(())
    }
}
