//! Command-line interface.
//!
//! Without a subcommand the binary runs the HTTP server. Other subcommands:
//! - `create-admin` - Create an admin account directly in the database
//! - `check-config` - Validate the configuration file and print a summary

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "terapia")]
#[command(author, version, about = "Booking API connecting clients with verified therapists", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "TERAPIA_CONFIG", default_value = "terapia.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Create an admin account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TERAPIA_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Validate configuration file
    CheckConfig,
}

/// Create the admin account, or report that the email is already taken
pub async fn cmd_create_admin(config: &Config, email: &str, password: &str) -> Result<()> {
    if let Err(e) = crate::api::validation::validate_email(email) {
        anyhow::bail!("Invalid email: {}", e);
    }
    if let Err(e) = crate::api::validation::validate_password(password) {
        anyhow::bail!("Invalid password: {}", e);
    }

    let db = crate::db::init(config).await?;
    let created = crate::api::auth::ensure_admin_user(&db, email, password).await;
    db.close().await;

    if created? {
        println!("[OK] Admin account created: {}", email);
    } else {
        println!("[!!] An account with email {} already exists, nothing changed", email);
    }
    Ok(())
}

/// Load, validate and summarize the configuration
pub fn cmd_check_config(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!("Defaults and environment variables will be used.");
        println!();
    }

    let config = Config::load(config_path)?;
    config.validate()?;

    println!("[OK] Configuration is valid!");
    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:      {}:{}", config.server.host, config.server.port);
    println!("  Data Dir:     {}", config.server.data_dir.display());
    println!();
    println!("Database:");
    println!("  URL:          {}", config.database_url());
    println!("  Connections:  {}", config.database.max_connections);
    println!("  Demo Data:    {}", enabled(config.database.seed_demo_data));
    println!();
    println!("Auth:");
    println!("  Token TTL:    {}s", config.auth.token_ttl_secs);
    println!(
        "  Admin Signup: {}",
        enabled(config.auth.allow_admin_registration)
    );
    println!(
        "  Bootstrap:    {}",
        config
            .bootstrap_admin()
            .map(|(email, _)| email.to_string())
            .unwrap_or_else(|| "None".to_string())
    );
    println!();
    println!("Security:");
    println!("  Rate Limiting: {}", enabled(config.rate_limit.enabled));
    println!(
        "  CORS Origins: {}",
        if config.cors.allowed_origins.is_empty() {
            "*".to_string()
        } else {
            config.cors.allowed_origins.join(", ")
        }
    );
    Ok(())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}
