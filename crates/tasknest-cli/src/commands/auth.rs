use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use tasknest_application::AppContext;

use super::output::Printer;

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }

    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("No password given");
    }
    Ok(password)
}

pub async fn register(
    context: &AppContext,
    printer: &Printer,
    email: &str,
    name: &str,
    password: Option<String>,
) -> Result<bool> {
    let password = read_password(password)?;
    let outcome = context.auth.register(email, &password, name).await;
    let succeeded = printer.outcome(&outcome, |session| {
        format!(
            "Registered {}. Check your inbox to verify your email.",
            session.email.as_deref().unwrap_or(email)
        )
    });
    if !succeeded && context.auth.session().await.is_authenticated {
        tracing::warn!("Account created and signed in; run `tasknest resend-verification` to retry the email");
    }
    Ok(succeeded)
}

pub async fn login(
    context: &AppContext,
    printer: &Printer,
    email: &str,
    password: Option<String>,
) -> Result<bool> {
    let password = read_password(password)?;
    let outcome = context.auth.login(email, &password).await;
    Ok(printer.outcome(&outcome, |session| {
        if session.is_email_verified {
            "Logged in.".to_string()
        } else {
            "Logged in. Your email is not verified yet; run `tasknest check-verification` once you have clicked the link.".to_string()
        }
    }))
}

pub async fn logout(context: &AppContext, printer: &Printer) -> bool {
    let outcome = context.auth.logout().await;
    printer.outcome(&outcome, |_| "Logged out.".to_string())
}

pub async fn reset_password(context: &AppContext, printer: &Printer, email: &str) -> bool {
    let outcome = context.auth.request_password_reset(email).await;
    printer.outcome(&outcome, |_| format!("Password reset email sent to {}.", email))
}

pub async fn resend_verification(context: &AppContext, printer: &Printer) -> bool {
    let outcome = context.auth.resend_verification().await;
    printer.outcome(&outcome, |_| "Verification email sent.".to_string())
}

pub async fn check_verification(context: &AppContext, printer: &Printer) -> bool {
    let outcome = context.auth.check_verification().await;
    printer.outcome(&outcome, |verified| {
        if *verified {
            "Email verified.".to_string()
        } else {
            "Email not verified yet.".to_string()
        }
    })
}

pub async fn verify(context: &AppContext, printer: &Printer, code: &str) -> bool {
    let outcome = context.auth.apply_verification_code(code).await;
    printer.outcome(&outcome, |_| "Email verified.".to_string())
}

pub async fn whoami(context: &AppContext, printer: &Printer) -> bool {
    printer.session(&context.auth.session().await);
    true
}
