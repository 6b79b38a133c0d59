//! `atareport` - CLI for the meeting-minutes service
//!
//! This binary runs the HTTP API and offers direct access to the form
//! store for maintenance.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;

use atareport::cli::{Cli, Command, ConfigCommand, FormsCommand, RenderCommand, ServeCommand};
use atareport::form::FormId;
use atareport::report::{Assembler, ReportInput};
use atareport::storage::{DeleteOutcome, FormStore};
use atareport::{init_logging, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd),
        Command::Forms(cmd) => handle_forms(&config, cmd),
        Command::Render(cmd) => handle_render(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn handle_serve(mut config: Config, cmd: ServeCommand) -> Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(atareport::server::serve(&config))?;
    Ok(())
}

fn open_store(config: &Config) -> Result<FormStore> {
    FormStore::open(&config.storage)
        .with_context(|| format!("opening storage at {}", config.data_dir().display()))
}

fn handle_forms(config: &Config, cmd: FormsCommand) -> Result<()> {
    let store = open_store(config)?;
    match cmd {
        FormsCommand::List { json } => {
            let forms = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&forms)?);
            } else if forms.is_empty() {
                println!("No forms.");
            } else {
                println!("{:<38} {:<12} TITLE", "ID", "DATE");
                for form in &forms {
                    println!("{:<38} {:<12} {}", form.id, form.date, form.title);
                }
                let stats = store.stats()?;
                println!();
                println!("{} indexed, {} stored", stats.indexed, stats.forms);
            }
        }
        FormsCommand::Show { id } => {
            let id = FormId::parse(id)?;
            let document = store.read(&id)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        FormsCommand::Create => {
            let id = store.create()?;
            println!("{id}");
        }
        FormsCommand::Delete { id } => {
            let id = FormId::parse(id)?;
            match store.delete(&id)? {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::NotFound => anyhow::bail!("form not found: {id}"),
                DeleteOutcome::PartiallyDeleted { reason } => {
                    println!("Deleted {id}, but the index was not updated: {reason}");
                }
            }
        }
    }
    Ok(())
}

fn handle_render(config: &Config, cmd: &RenderCommand) -> Result<()> {
    let store = open_store(config)?;
    let id = FormId::parse(cmd.id.clone())?;
    let document = store.read(&id)?;

    let assembler = Assembler::from_config(&config.export)?;
    let input = ReportInput::from_document(&document)?;
    let html = assembler.assemble(&input, &document.header_data);

    match &cmd.output {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{html}"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.bind_address());
                println!("  Permissive CORS:    {}", config.server.permissive_cors);
                println!();
                println!("[Storage]");
                println!("  Data directory:     {}", config.data_dir().display());
                println!("  Index file:         {}", config.storage.index_file);
                println!("  Forms directory:    {}", config.storage.forms_dir);
                println!();
                println!("[Export]");
                println!("  Temp directory:     {}", config.temp_dir().display());
                println!("  Renderer:           {}", config.export.renderer_command);
                println!("  Page size:          {}", config.export.page_size);
                println!("  Margin (mm):        {}", config.export.margin_mm);
                println!(
                    "  Render timeout (s): {}",
                    config.export.render_timeout_secs
                );
                match &config.export.logo_path {
                    Some(path) => println!("  Logo:               {}", path.display()),
                    None => println!("  Logo:               (placeholder)"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => anyhow::bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
