use std::path::Path;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use crate::{
    error::DaybookError,
    productivity::todo::{Priority, TodoItem, TodoManager, TODO_FILE_NAME},
};

#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    #[command(about = "Add a task")]
    Add {
        task: String,
        #[arg(short, long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(short, long, help = "Due date as YYYY-MM-DD")]
        due: Option<NaiveDate>,
    },
    #[command(about = "List pending tasks")]
    List {
        #[arg(short, long, help = "Include completed tasks")]
        all: bool,
    },
    #[command(about = "Mark a task as done. Numbers are the ones shown by list")]
    Complete { number: usize },
    #[command(about = "Remove a task. Numbers are the ones shown by list")]
    Remove { number: usize },
    #[command(about = "Pending tasks due today")]
    Today,
}

/// The list shows 1-based numbers.
fn to_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| DaybookError::InvalidIndex(number).into())
}

fn describe(item: &TodoItem) -> String {
    let status = if item.completed { "✓" } else { "○" };
    let mut line = format!("[{status}] {} (Priority: {})", item.task, item.priority);
    if let Some(due) = item.due_date {
        line.push_str(&format!(" (Due: {due})"));
    }
    line
}

pub async fn process_todo_command(command: TodoCommand, dir: &Path) -> Result<()> {
    let mut manager = TodoManager::open(dir.join(TODO_FILE_NAME)).await?;
    match command {
        TodoCommand::Add {
            task,
            priority,
            due,
        } => {
            let item = manager.add(task, priority, due).await?;
            println!("Added: {}", describe(item));
        }
        TodoCommand::List { all } => {
            let items = manager.list(all);
            if items.is_empty() {
                println!("No tasks");
            }
            for (index, item) in items {
                println!("{}. {}", index + 1, describe(item));
            }
        }
        TodoCommand::Complete { number } => {
            let item = manager.complete(to_index(number)?).await?;
            println!("Completed: {}", item.task);
        }
        TodoCommand::Remove { number } => {
            let item = manager.remove(to_index(number)?).await?;
            println!("Removed: {}", item.task);
        }
        TodoCommand::Today => {
            let items = manager.today(Local::now().date_naive());
            if items.is_empty() {
                println!("Nothing due today");
            }
            for item in items {
                println!("- {}", describe(item));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::productivity::todo::{Priority, TodoManager, TODO_FILE_NAME};

    use super::{process_todo_command, to_index, TodoCommand};

    #[test]
    fn numbers_are_one_based() {
        assert_eq!(to_index(1).ok(), Some(0));
        assert!(to_index(0).is_err());
    }

    #[tokio::test]
    async fn add_then_complete_by_number() -> Result<()> {
        let dir = tempdir()?;
        process_todo_command(
            TodoCommand::Add {
                task: "write report".into(),
                priority: Priority::High,
                due: NaiveDate::from_ymd_opt(2024, 4, 5),
            },
            dir.path(),
        )
        .await?;
        process_todo_command(TodoCommand::Complete { number: 1 }, dir.path()).await?;

        let manager = TodoManager::open(dir.path().join(TODO_FILE_NAME)).await?;
        assert!(manager.todos()[0].completed);
        assert!(
            process_todo_command(TodoCommand::Remove { number: 2 }, dir.path())
                .await
                .is_err()
        );
        Ok(())
    }
}
