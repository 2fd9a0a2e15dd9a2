mod cli;
mod commands;

use clap::{CommandFactory, Parser};
use groupauthz::app_state::AppState;
use groupauthz::http::setup_http_server;
use groupauthz::init_telemetry::init_tracing;
use groupauthz::settings::config::Settings;
use groupauthz_core::StoreRegistry;

use crate::cli::{print_completions, Cli, Commands};

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.config {
        Some(path) => Ok(Settings::from_file(path)?),
        None => Ok(Settings::new()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Subcommands that need no settings.
    match cli.command.as_ref() {
        Some(Commands::Completion(cmd)) => {
            print_completions(cmd.shell, &mut Cli::command());
            return Ok(());
        }
        Some(Commands::DbCreate(cmd)) => return commands::db::create(cmd),
        Some(Commands::DbSet(cmd)) => return commands::db::set(cmd),
        Some(Commands::DbGet(cmd)) => return commands::db::get(cmd),
        Some(Commands::DbRemove(cmd)) => return commands::db::remove(cmd),
        Some(Commands::DbList(cmd)) => return commands::db::list(cmd),
        _ => {}
    }

    let settings = load_settings(&cli)?;

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            println!("{:#?}", &settings);
            return Ok(());
        }
        Commands::Check(cmd) => {
            init_tracing(settings.debug)?;
            let app_state = AppState::from_settings(settings, StoreRegistry::with_defaults())?;
            return commands::check::check_access(&app_state, cmd);
        }
        _ => {
            // Continue with the normal server startup
        }
    }

    init_tracing(settings.debug)?;
    let app_state = AppState::from_settings(settings, StoreRegistry::with_defaults())?;

    let handle = setup_http_server(
        app_state.clone(),
        &app_state.clone().settings.api.bind_address,
    )
    .await?;

    handle.await??;
    Ok(())
}
