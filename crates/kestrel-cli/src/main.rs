mod commands;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::TypeArg;
use kestrel_core::KestrelConfig;
use kestrel_translation::ActionTypeRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kestrel", version, about = "Kestrel identity translation profiles")]
struct Cli {
    /// Configuration file (YAML). Defaults apply when omitted.
    #[arg(long, short, global = true, env = "KESTREL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate profile documents (schema, actions, conditions, includes).
    Check {
        /// Profile documents to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Execute a profile document against an input context file and print the result.
    Run {
        /// Profile document to execute
        #[arg(long)]
        profile: PathBuf,

        /// JSON file with the remote authentication context
        #[arg(long)]
        input: PathBuf,

        /// Additional profile documents available for inclusion
        #[arg(long)]
        include: Vec<PathBuf>,
    },

    /// List registered action types and their parameters.
    Actions {
        #[arg(long = "type", value_enum)]
        profile_type: Option<TypeArg>,
    },

    /// Manage profiles in the configured store.
    Profiles {
        #[command(subcommand)]
        cmd: ProfilesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfilesCommand {
    /// List stored and system profiles
    List {
        #[arg(long = "type", value_enum)]
        profile_type: Option<TypeArg>,
    },

    /// Print one profile as a JSON document
    Show {
        #[arg(value_enum)]
        profile_type: TypeArg,
        name: String,
    },

    /// Validate a profile document and save it to the store
    Import {
        file: PathBuf,

        /// Replace an existing profile with the same name
        #[arg(long, default_value_t = false)]
        replace: bool,
    },

    /// Remove a stored profile
    Remove {
        #[arg(value_enum)]
        profile_type: TypeArg,
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => KestrelConfig::load_with_context(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => KestrelConfig::default(),
    };
    logging::init(&config.logging)?;

    let registry = Arc::new(ActionTypeRegistry::with_builtin_actions()?);
    tracing::debug!(action_types = registry.len(), "action registry ready");

    match cli.cmd {
        Command::Check { files } => commands::check::run(&files, &registry)?,

        Command::Run { profile, input, include } => {
            let args = commands::run::RunArgs { profile, input, include };
            commands::run::run(&args, &registry, &config.translation)?
        }

        Command::Actions { profile_type } => commands::actions::list(&registry, profile_type)?,

        Command::Profiles { cmd } => {
            let manager = commands::profiles::open_manager(&config, registry.clone()).await?;
            match cmd {
                ProfilesCommand::List { profile_type } => commands::profiles::list(&manager, profile_type)?,
                ProfilesCommand::Show { profile_type, name } => {
                    commands::profiles::show(&manager, profile_type, &name)?
                }
                ProfilesCommand::Import { file, replace } => {
                    commands::profiles::import(&manager, &file, replace).await?
                }
                ProfilesCommand::Remove { profile_type, name } => {
                    commands::profiles::remove(&manager, profile_type, &name).await?
                }
            }
        }
    }

    Ok(())
}
