pub mod auth;
pub mod output;
pub mod tasks;

use anyhow::Result;
use tasknest_application::AppContext;
use tasknest_infrastructure::ConfigService;

use crate::Commands;
use output::Printer;

/// Runs one command. Returns whether it succeeded.
pub async fn run(command: Commands, config_service: &ConfigService, json: bool) -> Result<bool> {
    let context = AppContext::firebase(config_service).await?;
    let listener = context.listen();
    let printer = Printer::new(json);

    let succeeded = match command {
        Commands::Register {
            email,
            name,
            password,
        } => auth::register(&context, &printer, &email, &name, password).await?,
        Commands::Login { email, password } => {
            auth::login(&context, &printer, &email, password).await?
        }
        Commands::Logout => auth::logout(&context, &printer).await,
        Commands::ResetPassword { email } => auth::reset_password(&context, &printer, &email).await,
        Commands::ResendVerification => auth::resend_verification(&context, &printer).await,
        Commands::CheckVerification => auth::check_verification(&context, &printer).await,
        Commands::Verify { code } => auth::verify(&context, &printer, &code).await,
        Commands::Whoami => auth::whoami(&context, &printer).await,
        Commands::Add {
            name,
            description,
            deadline,
        } => tasks::add(&context, &printer, name, description, deadline).await,
        Commands::List {
            filter,
            search,
            local,
        } => tasks::list(&context, &printer, filter, search, local).await,
        Commands::Edit {
            id,
            name,
            description,
            deadline,
        } => tasks::edit(&context, &printer, &id, name, description, deadline).await,
        Commands::Toggle { id } => tasks::toggle(&context, &printer, &id).await,
        Commands::Delete { id } => tasks::delete(&context, &printer, &id).await,
        Commands::Sync => tasks::sync(&context, &printer).await,
        Commands::Stats => tasks::stats(&context, &printer).await,
    };

    listener.stop();
    Ok(succeeded)
}
