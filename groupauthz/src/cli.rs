use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use groupauthz_core::settings::group_file::DEFAULT_DBM_TYPE;

#[derive(Parser)]
#[command(name = "groupauthz")]
#[command(about = "Serve files behind DBM group authorization and maintain group files")]
#[command(version)]
pub struct Cli {
    /// Load settings from this file instead of config/default and friends
    #[arg(long, env = "GROUPAUTHZ_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Run,
    /// Show current configuration and exit
    Config,
    /// Run the authorization chain for a user and print the outcome
    Check(CheckCommand),
    /// Create an empty group file
    #[command(name = "db:create")]
    DbCreate(DbFileCommand),
    /// Store the groups (and optional password hash) of a user
    #[command(name = "db:set")]
    DbSet(DbSetCommand),
    /// Show the stored value and decoded groups of a user
    #[command(name = "db:get")]
    DbGet(DbUserCommand),
    /// Remove a user from a group file
    #[command(name = "db:remove")]
    DbRemove(DbUserCommand),
    /// List all users of a group file
    #[command(name = "db:list")]
    DbList(DbFileCommand),
    /// Generate shell completions
    Completion(CompletionCommand),
}

#[derive(Debug, Parser)]
pub struct CheckCommand {
    /// Request path, e.g. /private/report.html
    pub path: String,

    /// Authenticated user name
    #[arg(long)]
    pub user: String,

    #[arg(long, default_value = "GET")]
    pub method: String,
}

#[derive(Debug, Parser)]
pub struct DbFileCommand {
    pub file: PathBuf,

    /// Store type, decides how keys are encoded
    #[arg(long = "type", default_value = DEFAULT_DBM_TYPE)]
    pub dbm_type: String,
}

#[derive(Debug, Parser)]
pub struct DbUserCommand {
    #[command(flatten)]
    pub db: DbFileCommand,

    pub user: String,
}

#[derive(Debug, Parser)]
pub struct DbSetCommand {
    #[command(flatten)]
    pub db: DbFileCommand,

    pub user: String,

    /// Comma separated group names
    #[arg(long, value_delimiter = ',', required = true)]
    pub groups: Vec<String>,

    /// Store the groups next to this password hash (password:groups layout)
    #[arg(long)]
    pub password_hash: Option<String>,

    /// Trailing free-form field, ignored by authorization
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CompletionCommand {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn print_completions<G: clap_complete::Generator>(gen: G, cmd: &mut clap::Command) {
    let name = cmd.get_name().to_string();
    clap_complete::generate(gen, cmd, name, &mut std::io::stdout());
}
