use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the postline binary.
#[derive(Debug, Parser)]
#[command(name = "postline", version, about = "Social feed content listing service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "POSTLINE_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API (default).
    Serve(Box<ServeArgs>),
    /// Register a user and print their bearer token.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct CreateUserArgs {
    /// Username of the new account.
    #[arg(long, value_name = "NAME")]
    pub username: String,

    #[command(flatten)]
    pub storage: StorageOverrides,
}

/// Storage backend selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Postgres,
    Memory,
}

impl BackendArg {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendArg::Postgres => "postgres",
            BackendArg::Memory => "memory",
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the storage backend.
    #[arg(long = "database-backend", value_enum, value_name = "BACKEND")]
    pub database_backend: Option<BackendArg>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the aggregate cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how many popular-tag limits are memoized at once.
    #[arg(long = "cache-popular-tags-capacity", value_name = "COUNT")]
    pub cache_popular_tags_capacity: Option<usize>,

    /// Override the directory media uploads are written to.
    #[arg(
        long = "uploads-directory",
        value_name = "PATH",
        value_hint = ValueHint::DirPath
    )]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request body size for post creation.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,
}
