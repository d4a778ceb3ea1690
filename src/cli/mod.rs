use clap::Parser;

use crate::config::{AppConfig, StorageBackend};

/// Command-line overrides applied on top of the environment configuration.
#[derive(Debug, Default, Parser)]
#[command(name = "blog-api")]
#[command(about = "Blog API server - users, posts and comments")]
#[command(version)]
pub struct ServerArgs {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Address to bind (overrides HOST)")]
    pub host: Option<String>,

    #[arg(long, help = "Use the in-memory store instead of Postgres")]
    pub memory: bool,

    #[arg(long, help = "Do not run database migrations at startup")]
    pub skip_migrations: bool,
}

impl ServerArgs {
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if self.memory {
            config.database.backend = StorageBackend::Memory;
        }
        if self.skip_migrations {
            config.database.run_migrations = false;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let args = ServerArgs::parse_from(["blog-api", "--port", "9001", "--memory", "--skip-migrations"]);
        let mut base = AppConfig::for_tests();
        base.database.backend = StorageBackend::Postgres;
        base.database.run_migrations = true;

        let config = args.apply(base);
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn no_flags_keep_config() {
        let config = ServerArgs::parse_from(["blog-api"]).apply(AppConfig::for_tests());
        assert_eq!(config.server.port, AppConfig::for_tests().server.port);
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
