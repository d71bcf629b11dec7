// vaultkenv - run a command with environment variables fetched from Vault
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use vaultkenv::config::{Config, StoreConfig, DEFAULT_VAULT_ADDR};
use vaultkenv::error::{exit_code_for, EXIT_USAGE};
use vaultkenv::exec::{resolve_program, run_command};
use vaultkenv::logging;
use vaultkenv::secrets::SecretMap;
use vaultkenv::session::Session;

const EXAMPLES: &str = "\
Examples:
    vaultkenv --secret=kv/data/my-env env
    vaultkenv --secret=kv/data/my-cli python main.py
    vaultkenv --secret=kv/data/my-webapp --role=my-webapp python main.py";

/// Run a command with environment variables fetched from a Vault KV v2 secret
#[derive(Parser, Debug)]
#[command(name = "vaultkenv")]
#[command(version)]
#[command(about = "Run a command with environment variables fetched from Vault", long_about = None)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// The address of the Vault server
    #[arg(short, long, env = "VAULT_ADDR", default_value = DEFAULT_VAULT_ADDR)]
    address: String,

    /// The Vault role name to authenticate against
    #[arg(short, long, env = "VAULT_ROLE", default_value = "", hide_default_value = true)]
    role: String,

    /// The Vault secret path from which to fetch environment variables
    #[arg(short, long, env = "VAULT_SECRET", default_value = "", hide_default_value = true)]
    secret: String,

    /// The Vault token to use, disables authentication via the Kubernetes auth method
    #[arg(short, long, env = "VAULT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Vault Enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE")]
    namespace: Option<String>,

    /// PEM file with CA certificates used to verify the Vault server
    #[arg(long, env = "VAULT_CACERT")]
    ca_cert: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, env = "VAULT_SKIP_VERIFY", value_parser = clap::builder::BoolishValueParser::new())]
    skip_verify: bool,

    /// Enable debug logging (also enabled by DEBUG=true)
    #[arg(long)]
    debug: bool,

    /// The command to run with injected environment variables
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true, value_name = "COMMAND")]
    command: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            store: StoreConfig {
                address: self.address,
                namespace: self.namespace,
                ca_cert: self.ca_cert,
                skip_verify: self.skip_verify,
            },
            role: self.role,
            secret_path: self.secret,
            token: self
                .token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            command: self.command,
        }
    }
}

/// Log in (unless a token was given) and read the secret.
async fn fetch_secrets(config: &Config) -> Result<SecretMap> {
    let mut session = Session::new(&config.store)
        .with_context(|| format!("Failed to set up Vault client for {}", config.store.address))?;

    match &config.token {
        Some(token) => {
            debug!("Using static Vault token, skipping Kubernetes auth");
            session.set_token(SecretString::from(token.expose_secret().to_owned()));
        }
        None => {
            if config.role.is_empty() {
                warn!("No Vault role set (--role or VAULT_ROLE); login will likely be rejected");
            }
            session
                .authenticate(&config.role)
                .await
                .with_context(|| format!("Failed to authenticate with Vault role '{}'", config.role))?;
        }
    }

    let secrets = session
        .read_secret(&config.secret_path)
        .await
        .with_context(|| format!("Failed to read secret '{}'", config.secret_path))?;

    Ok(secrets)
}

fn run(config: Config) -> Result<i32> {
    config.validate().context("Configuration validation failed")?;

    let program = resolve_program(&config.command)?;
    debug!(program = %program.display(), "Resolved command");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let secrets = runtime.block_on(fetch_secrets(&config))?;
    drop(runtime);

    info!(
        secret = %config.secret_path,
        count = secrets.len(),
        "Injecting environment variables from Vault"
    );

    let code = run_command(&config.command, &secrets)?;
    Ok(code)
}

fn main() {
    let cli = Cli::parse();

    let debug = cli.debug || logging::debug_enabled(std::env::var("DEBUG").ok().as_deref());
    logging::init(debug);

    let code = match run(cli.into_config()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\nError: {:#}", e);
            let code = exit_code_for(&e);
            if code == EXIT_USAGE {
                eprintln!("💡 Run 'vaultkenv --help' for usage.");
            }
            code
        }
    };

    std::process::exit(code);
}
