//! Rendering of command results.

use colored::Colorize;
use serde::Serialize;
use tasknest_application::ActionOutcome;
use tasknest_core::session::{Session, SessionPhase};
use tasknest_core::task::{Task, TaskFilter, TaskStats, TaskStatus};

/// Prints results either as colored text or as JSON lines.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    /// Prints `outcome`, using `describe` for the success line. Returns
    /// whether the action succeeded.
    pub fn outcome<T, F>(&self, outcome: &ActionOutcome<T>, describe: F) -> bool
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            self.print_json(outcome);
            return outcome.success;
        }

        match (&outcome.data, &outcome.error) {
            (Some(data), _) if outcome.success => println!("{}", describe(data).green()),
            (_, Some(error)) => eprintln!("{}", format!("Error: {}", error).red()),
            _ => eprintln!("{}", "Error: unknown failure".red()),
        }
        outcome.success
    }

    /// Reports a failure that happened before any action ran.
    pub fn refuse(&self, message: &str) -> bool {
        self.outcome::<(), _>(
            &ActionOutcome {
                success: false,
                data: None,
                error: Some(message.to_string()),
                code: None,
            },
            |_| String::new(),
        )
    }

    pub fn session(&self, session: &Session) {
        if self.json {
            self.print_json(session);
            return;
        }

        match session.phase() {
            SessionPhase::Anonymous => println!("{}", "Not logged in".yellow()),
            phase => {
                let email = session.email.as_deref().unwrap_or("?");
                let user_id = session.user_id.as_deref().unwrap_or("?");
                let state = if phase == SessionPhase::Verified {
                    "verified".green()
                } else {
                    "email not verified".yellow()
                };
                println!("{} ({}) [{}]", email.bold(), user_id.dimmed(), state);
            }
        }
    }

    pub fn tasks(&self, filter: TaskFilter, tasks: &[Task]) {
        if self.json {
            self.print_json(tasks);
            return;
        }

        if tasks.is_empty() {
            println!("{}", format!("No tasks ({})", filter).dimmed());
            return;
        }

        for task in tasks {
            let marker = match task.status {
                TaskStatus::Completed => "[x]".green(),
                TaskStatus::Pending => "[ ]".normal(),
            };
            let id = task.id.as_deref().unwrap_or("(unsynced)");
            println!(
                "{} {}  {}  due {}",
                marker,
                task.name.bold(),
                id.dimmed(),
                task.deadline
            );
            println!("      {}", task.description);
        }
    }

    pub fn stats(&self, stats: &TaskStats) {
        if self.json {
            self.print_json(stats);
            return;
        }

        println!(
            "{} total, {} completed, {} pending, {} overdue",
            stats.total.to_string().bold(),
            stats.completed.to_string().green(),
            stats.pending,
            if stats.overdue > 0 {
                stats.overdue.to_string().red()
            } else {
                stats.overdue.to_string().normal()
            }
        );
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{}", format!("Failed to encode output: {}", e).red()),
        }
    }
}
