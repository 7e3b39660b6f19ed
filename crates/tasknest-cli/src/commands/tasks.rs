use chrono::NaiveDate;
use tasknest_application::AppContext;
use tasknest_core::session::SessionPhase;
use tasknest_core::task::{TaskDraft, TaskUpdate};

use super::output::Printer;

/// Task commands need a signed-in, verified session.
async fn guard(context: &AppContext, printer: &Printer) -> bool {
    match context.auth.session().await.phase() {
        SessionPhase::Verified => true,
        SessionPhase::Unverified => printer.refuse(
            "Please verify your email first (tasknest check-verification, or tasknest verify <code>)",
        ),
        SessionPhase::Anonymous => printer.refuse("Please log in first"),
    }
}

pub async fn add(
    context: &AppContext,
    printer: &Printer,
    name: String,
    description: String,
    deadline: NaiveDate,
) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    let outcome = context
        .tasks
        .add_task(TaskDraft::new(name, description, deadline))
        .await;
    printer.outcome(&outcome, |task| {
        format!(
            "Added \"{}\" ({})",
            task.name,
            task.id.as_deref().unwrap_or("no id")
        )
    })
}

pub async fn list(
    context: &AppContext,
    printer: &Printer,
    filter: Option<String>,
    search: Option<String>,
    local: bool,
) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    if !local {
        let outcome = context.tasks.sync().await;
        if let Some(error) = &outcome.error {
            tracing::warn!("Showing the local list, sync failed: {}", error);
        }
    }
    if let Some(filter) = filter {
        context.tasks.set_filter(filter).await;
    }
    let tasks = context.tasks.visible_tasks(search.as_deref()).await;
    printer.tasks(context.tasks.filter().await, &tasks);
    true
}

pub async fn edit(
    context: &AppContext,
    printer: &Printer,
    id: &str,
    name: Option<String>,
    description: Option<String>,
    deadline: Option<NaiveDate>,
) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    let update = TaskUpdate {
        name,
        description,
        deadline,
        status: None,
    };
    let outcome = context.tasks.edit_task(id, update).await;
    printer.outcome(&outcome, |_| format!("Updated {}", id))
}

pub async fn toggle(context: &AppContext, printer: &Printer, id: &str) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    let outcome = context.tasks.toggle_status(id).await;
    printer.outcome(&outcome, |status| format!("{} is now {}", id, status))
}

pub async fn delete(context: &AppContext, printer: &Printer, id: &str) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    let outcome = context.tasks.delete_task(id).await;
    printer.outcome(&outcome, |_| format!("Deleted {}", id))
}

pub async fn sync(context: &AppContext, printer: &Printer) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    let outcome = context.tasks.sync().await;
    printer.outcome(&outcome, |count| format!("Synced {} task(s)", count))
}

pub async fn stats(context: &AppContext, printer: &Printer) -> bool {
    if !guard(context, printer).await {
        return false;
    }
    printer.stats(&context.tasks.stats().await);
    true
}
