use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{ServerConfig, DEFAULT_API_PREFIX, DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES};
use crate::db::Database;

#[derive(Parser)]
#[command(name = "contactd")]
#[command(about = "Contact book backend with an HTTP API and spreadsheet import/export")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Server options when no subcommand is given
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve(ServeArgs),
    /// Create or upgrade the database schema and exit
    Migrate(DbArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Default)]
pub struct DbArgs {
    /// SQLite database file [default: <config dir>/contactd/contacts.db]
    #[arg(long, env = "CONTACTD_DB")]
    pub db: Option<PathBuf>,
}

impl DbArgs {
    pub fn resolve(&self) -> Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => Database::default_path(),
        }
    }
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// Address to listen on
    #[arg(long, env = "CONTACTD_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Path prefix for the contact routes ("" or "/" for the root)
    #[arg(long, env = "CONTACTD_API_PREFIX", default_value = DEFAULT_API_PREFIX)]
    pub api_prefix: String,

    /// Maximum request body size in bytes
    #[arg(long, env = "CONTACTD_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind: self.bind,
            db_path: self.db.resolve()?,
            api_prefix: self.api_prefix,
            max_upload_bytes: self.max_upload_bytes,
        })
    }
}

/// Open (and so migrate) the database, then report where it lives.
pub fn run_migrate(args: &DbArgs) -> Result<()> {
    let path = args.resolve()?;
    let db = Database::open_at(&path)?;
    tracing::info!(
        path = %path.display(),
        version = db.schema_version()?,
        contacts = db.count_contacts()?,
        "Database ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from([
            "contactd",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--db",
            "/tmp/c.db",
            "--api-prefix",
            "",
        ]);

        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("/tmp/c.db"));
        assert_eq!(config.mount_path(), None);
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::parse_from(["contactd", "--log-format", "json", "--bind", "127.0.0.1:9000"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.serve.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cli.serve.api_prefix, "/api");
    }

    #[test]
    fn test_migrate_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        run_migrate(&DbArgs {
            db: Some(path.clone()),
        })
        .unwrap();
        assert!(path.exists());
    }
}
