//! `mentorlink` - CLI for mentor and student records.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;

use anyhow::{bail, Context};
use clap::Parser;

use mentorlink::cli::{Cli, Command, ConfigCommand};
use mentorlink::{init_logging, Config, Console, Services, Tables};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match &cli.command {
        Command::Session => handle_session(&load_config(&cli)?),
        Command::Status(status_cmd) => handle_status(&load_config(&cli)?, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&cli, config_cmd),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let path = cli.config_file();
    Config::load_from(Some(path.clone()))
        .with_context(|| format!("loading configuration from {}", path.display()))
}

fn handle_session(config: &Config) -> anyhow::Result<()> {
    let services = Services::open(config).context("opening storage")?;
    let stdin = io::stdin();
    let mut console = Console::new(&services, stdin.lock(), io::stdout());
    console.run()?;
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let tables = Tables::open(config).context("opening storage")?;
    let stats = tables.stats()?;

    if json {
        let status = serde_json::json!({
            "data_dir": config.data_dir(),
            "storage": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("mentorlink status");
        println!("-----------------");
        println!("Backend:       {}", stats.backend);
        println!("Data dir:      {}", config.data_dir().display());
        println!();
        for table in &stats.tables {
            println!(
                "{:<14} {:>6} records  {}",
                format!("{}:", table.name),
                table.records,
                table.location.display()
            );
        }
    }
    Ok(())
}

fn handle_config(cli: &Cli, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = &load_config(cli)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Data dir:           {}", config.data_dir().display());
                println!("  Backend:            {}", config.storage.backend);
                println!("  Accounts file:      {}", config.storage.accounts_file);
                println!("  Profiles file:      {}", config.storage.profiles_file);
                println!("  Feedback file:      {}", config.storage.feedback_file);
                println!("  Database file:      {}", config.storage.database_file);
                println!();
                println!("[Auth]");
                println!("  Unique usernames:   {}", config.auth.unique_usernames);
                println!("  Verify role:        {}", config.auth.verify_role);
                println!("  Username pattern:   {}", config.auth.username_pattern);
            }
        }
        ConfigCommand::Path => {
            println!("{}", cli.config_file().display());
        }
        ConfigCommand::Validate { file } => {
            let path = cli.validate_target(file.as_deref());
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
