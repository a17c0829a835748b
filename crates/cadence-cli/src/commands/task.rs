//! Task management commands for CLI.

use clap::Subcommand;

use super::{open_app, warning_sink};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the top of the list
    Add {
        /// Task text (1-100 characters)
        text: String,
    },
    /// List tasks, newest first
    List {
        /// Only tasks not yet completed
        #[arg(long)]
        open: bool,
    },
    /// Replace a task's text
    Edit {
        /// Task ID
        id: String,
        /// New text
        text: String,
    },
    /// Toggle a task's completed flag
    Toggle {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Select a task for the next work sessions (again to deselect)
    Select {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = open_app(warning_sink())?;

    match action {
        TaskAction::Add { text } => {
            let task = app.add_task(&text)?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { open } => {
            let active = app.active_task().map(|t| t.id.clone());
            let tasks: Vec<_> = app
                .tasks()
                .iter()
                .filter(|t| !open || !t.completed)
                .map(|t| -> Result<serde_json::Value, serde_json::Error> {
                    let mut value = serde_json::to_value(t)?;
                    value["active"] = serde_json::Value::Bool(active.as_deref() == Some(t.id.as_str()));
                    Ok(value)
                })
                .collect::<Result<_, _>>()?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Edit { id, text } => {
            if !app.edit_task(&id, &text)? {
                return Err(format!("Task not found: {id}").into());
            }
            println!("Task updated: {id}");
        }
        TaskAction::Toggle { id } => {
            let completed = app
                .toggle_task_complete(&id)
                .ok_or(format!("Task not found: {id}"))?;
            let status = if completed { "completed" } else { "reopened" };
            println!("Task {status}: {id}");
        }
        TaskAction::Delete { id } => {
            if !app.delete_task(&id) {
                return Err(format!("Task not found: {id}").into());
            }
            println!("Task deleted: {id}");
        }
        TaskAction::Select { id } => {
            if app.tasks().iter().all(|t| t.id != id) {
                return Err(format!("Task not found: {id}").into());
            }
            match app.select_task(&id)? {
                Some(active) => println!("Active task: {active}"),
                None => println!("No active task"),
            }
        }
    }
    Ok(())
}
