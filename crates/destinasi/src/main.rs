//! `destinasi` - CLI for the destination catalog
//!
//! This binary runs the HTTP server and provides the maintenance commands
//! around it: database setup, account creation, seeding and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use destinasi::auth::hash_password;
use destinasi::cli::{Cli, Command, ConfigCommand, DbCommand, SeedCommand, UserCommand};
use destinasi::models::Role;
use destinasi::seed::Seeder;
use destinasi::server::{self, AppState};
use destinasi::validation::UserInput;
use destinasi::{init_logging, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation reports problems instead of failing on them
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        handle_validate(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => {
            let bind = serve_cmd
                .bind
                .unwrap_or_else(|| config.server.bind.clone());
            let state = AppState::from_config(config).context("failed to initialize server")?;
            server::serve(state, &bind).await?;
            Ok(())
        }
        Command::Db(db_cmd) => handle_db(&config, &db_cmd),
        Command::User(user_cmd) => handle_user(&config, user_cmd),
        Command::Seed(seed_cmd) => handle_seed(&config, &seed_cmd),
        Command::Config(config_cmd) => handle_config(&config, &config_cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

fn handle_db(config: &Config, cmd: &DbCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        DbCommand::Init => {
            println!("Database ready at {}", storage.path().display());
        }
        DbCommand::Stats { json } => {
            let stats = storage.stats()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("destinasi database");
                println!("------------------");
                println!("Path:           {}", storage.path().display());
                println!("Schema version: {}", stats.schema_version);
                println!("Size:           {} bytes", stats.db_size_bytes);
                println!("Users:          {}", stats.users);
                println!("Categories:     {}", stats.categories);
                println!(
                    "Destinations:   {} ({} published)",
                    stats.destinations, stats.published_destinations
                );
                println!("Testimonials:   {}", stats.testimonials);
                println!("Sessions:       {}", stats.sessions);
            }
        }
    }
    Ok(())
}

fn handle_user(config: &Config, cmd: UserCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        UserCommand::Create {
            name,
            email,
            password,
            role,
            phone,
        } => {
            let input = UserInput {
                name: Some(name),
                email: Some(email),
                password: Some(password),
                role: Some(Role::from(role).as_str().to_string()),
                phone_number: phone,
            };
            let valid = input.validate(&storage, None)?;
            let mut draft = valid.draft;
            if let Some(password) = valid.password.as_deref() {
                draft.password_hash = Some(hash_password(password)?);
            }
            let user = storage.create_user(&draft)?;
            info!("Created user {} from the command line", user.id);
            println!("Created {} account {} <{}>", user.role, user.id, user.email);
        }
    }
    Ok(())
}

fn handle_seed(config: &Config, cmd: &SeedCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let report = Seeder::new(&storage, cmd.pic)?
        .import_file(&cmd.file)
        .with_context(|| format!("failed to import {}", cmd.file.display()))?;
    println!("Imported {}", cmd.file.display());
    println!("  Destinations:       {}", report.destinations);
    println!("  Testimonials:       {}", report.testimonials);
    println!("  Categories created: {}", report.categories_created);
    println!("  Records skipped:    {}", report.skipped);
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let shown = config.redacted();
            if *json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print_config(&shown);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file.clone()),
    }
    Ok(())
}

fn print_config(config: &Config) {
    let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Server]");
    println!("  Bind:               {}", config.server.bind);
    println!("  Session hours:      {}", config.server.session_hours);
    println!("  Max body bytes:     {}", config.server.max_body_bytes);
    if config.server.cors_origins.is_empty() {
        println!("  CORS origins:       any");
    } else {
        println!("  CORS origins:       {}", config.server.cors_origins.join(", "));
    }
    println!();
    println!("[Storage]");
    println!("  Database path:      {}", config.database_path().display());
    println!();
    println!("[Catalog]");
    println!("  Default per page:   {}", config.catalog.default_per_page);
    println!("  Max per page:       {}", config.catalog.max_per_page);
    println!("  Nearby (home):      {}", config.catalog.home_nearby_limit);
    println!("  Categories (home):  {}", config.catalog.home_category_limit);
    println!("  Nearby (detail):    {}", config.catalog.nearby_limit);
    println!("  Related (detail):   {}", config.catalog.related_limit);
    println!();
    println!("[ImageKit]");
    println!("  Configured:         {}", config.imagekit.is_configured());
    println!("  Public key:         {}", or_unset(&config.imagekit.public_key));
    println!("  Private key:        {}", or_unset(&config.imagekit.private_key));
    println!("  URL endpoint:       {}", or_unset(&config.imagekit.url_endpoint));
    println!("  Timeout (secs):     {}", config.imagekit.timeout_secs);
}

fn handle_validate(file: Option<PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    if !path.exists() {
        println!("(file not found, checking defaults and environment only)");
    }
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
