use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; built once at startup
/// and passed down explicitly.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub bot_username: String,
    pub admin_ids: Vec<i64>,
    pub admin_passcode: Option<String>,
    pub webhook_secret: Option<String>,
}

/// One-shot actions that run instead of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Migrate,
    HashPasscode(String),
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Token-based file link registry")]
pub struct Args {
    /// Host to bind to (overrides FILE_REGISTRY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_REGISTRY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FILE_REGISTRY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bot username used in shareable links (overrides FILE_REGISTRY_BOT_USERNAME)
    #[arg(long)]
    pub bot_username: Option<String>,

    /// Comma-separated admin user ids (overrides FILE_REGISTRY_ADMIN_IDS)
    #[arg(long)]
    pub admin_ids: Option<String>,

    /// Dashboard passcode, plaintext or argon2 hash (overrides FILE_REGISTRY_ADMIN_PASSCODE)
    #[arg(long)]
    pub admin_passcode: Option<String>,

    /// Secret expected from the bot transport (overrides FILE_REGISTRY_WEBHOOK_SECRET)
    #[arg(long)]
    pub webhook_secret: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,

    /// Print an argon2 hash of the given passcode and exit
    #[arg(long, value_name = "PASSCODE")]
    pub hash_passcode: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Option<Self>, Mode)> {
        let args = Args::parse();
        Self::from_sources(args, |key| env::var(key))
    }

    /// Merge parsed args over values read through `lookup`.
    ///
    /// Hashing a passcode needs no other settings, so that mode returns no
    /// config and skips validation.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<(Option<Self>, Mode)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        if let Some(plain) = args.hash_passcode {
            return Ok((None, Mode::HashPasscode(plain)));
        }

        let var = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {key}")),
            }
        };

        // --- Environment fallback ---
        let env_host = var("FILE_REGISTRY_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("FILE_REGISTRY_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILE_REGISTRY_PORT value `{}`", value))?,
            None => 8000,
        };
        let env_db = var("FILE_REGISTRY_DATABASE_URL")?
            .unwrap_or_else(|| "sqlite://./data/file_registry.db".into());

        // --- Merge ---
        let bot_username = match args.bot_username.or(var("FILE_REGISTRY_BOT_USERNAME")?) {
            Some(name) => name,
            None => bail!("bot username is required (--bot-username or FILE_REGISTRY_BOT_USERNAME)"),
        };
        let admin_ids = match args.admin_ids.or(var("FILE_REGISTRY_ADMIN_IDS")?) {
            Some(raw) => parse_admin_ids(&raw)?,
            None => bail!("admin ids are required (--admin-ids or FILE_REGISTRY_ADMIN_IDS)"),
        };

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            bot_username,
            admin_ids,
            admin_passcode: args
                .admin_passcode
                .or(var("FILE_REGISTRY_ADMIN_PASSCODE")?),
            webhook_secret: args
                .webhook_secret
                .or(var("FILE_REGISTRY_WEBHOOK_SECRET")?),
        };

        let mode = if args.migrate { Mode::Migrate } else { Mode::Serve };
        Ok((Some(cfg), mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("bot_username", &self.bot_username)
            .field("admin_ids", &self.admin_ids)
            .field("admin_passcode", &self.admin_passcode.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Parse a comma-separated list of integer user ids.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("parsing admin id `{}`", s))
        })
        .collect::<Result<Vec<_>>>()?;

    if ids.is_empty() {
        bail!("at least one admin id is required");
    }
    Ok(ids)
}
