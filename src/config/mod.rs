use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before giving up
    pub connection_timeout: u64,
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_hours: u64,
    /// YAML user realm; the development profile falls back to built-in users
    pub users_file: Option<String>,
    pub authorization_timeout_ms: u64,
    /// Role required to push a backup (checked as `role:<name>`)
    pub backup_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub description: String,
    pub public: bool,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

impl SecurityConfig {
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }
}

impl BackupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("WIKI_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Ok(v) = env::var("WIKI_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("WIKI_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_STATEMENT_TIMEOUT_MS") {
            self.database.statement_timeout_ms = v.parse().unwrap_or(self.database.statement_timeout_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("WIKI_USERS_FILE") {
            self.security.users_file = Some(v);
        }
        if let Ok(v) = env::var("AUTH_TIMEOUT_MS") {
            self.security.authorization_timeout_ms = v.parse().unwrap_or(self.security.authorization_timeout_ms);
        }
        if let Ok(v) = env::var("BACKUP_ROLE") {
            self.security.backup_role = v;
        }

        // Backup overrides
        if let Ok(v) = env::var("BACKUP_ENDPOINT") {
            self.backup.endpoint = v;
        }
        if let Ok(v) = env::var("BACKUP_TOKEN") {
            self.backup.token = Some(v).filter(|t| !t.is_empty());
        }
        if let Ok(v) = env::var("BACKUP_PUBLIC") {
            self.backup.public = v.parse().unwrap_or(self.backup.public);
        }
        if let Ok(v) = env::var("BACKUP_TIMEOUT_SECS") {
            self.backup.timeout_secs = v.parse().unwrap_or(self.backup.timeout_secs);
        }

        self
    }

    fn base_backup() -> BackupConfig {
        BackupConfig {
            endpoint: "https://api.github.com/gists".to_string(),
            token: None,
            description: "A wiki backup".to_string(),
            public: true,
            timeout_secs: 30,
            user_agent: format!("wiki-service/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            database: DatabaseConfig {
                url: "sqlite://wiki.db".to_string(),
                max_connections: 4,
                connection_timeout: 30,
                statement_timeout_ms: 5_000,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_issuer: "wiki-service".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                users_file: None,
                authorization_timeout_ms: 2_000,
                backup_role: "writer".to_string(),
            },
            backup: Self::base_backup(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                enable_cors: true,
            },
            database: DatabaseConfig {
                url: "sqlite://wiki.db".to_string(),
                max_connections: 4,
                connection_timeout: 10,
                statement_timeout_ms: 5_000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "wiki-service".to_string(),
                jwt_expiry_hours: 24,
                users_file: None,
                authorization_timeout_ms: 2_000,
                backup_role: "writer".to_string(),
            },
            backup: Self::base_backup(),
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
                enable_cors: false,
            },
            database: DatabaseConfig {
                url: "sqlite://wiki.db".to_string(),
                max_connections: 8,
                connection_timeout: 5,
                statement_timeout_ms: 3_000,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: "wiki-service".to_string(),
                jwt_expiry_hours: 4,
                users_file: None,
                authorization_timeout_ms: 1_000,
                backup_role: "writer".to_string(),
            },
            backup: BackupConfig {
                public: false,
                timeout_secs: 15,
                ..Self::base_backup()
            },
        }
    }
}

// Global singleton config - initialized once at startup, read by the binary only
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
