use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long, required_unless_present = "hash_password")]
    pub config_file: Option<String>,
    /**
     * Prints an argon2 hash of the given password for use in `security.adminUsers` and exits.
     */
    #[arg(long)]
    pub hash_password: Option<String>,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Security configuration for the application.
     */
    pub security: AppSecurity,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * Presentation settings for the public report.
     */
    #[serde(default)]
    pub report: ReportSettings,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log file.
     */
    pub file: bool,
    /**
     * Path to the log file.
     */
    pub logfile: String,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            target: true,
            thread_ids: true,
            thread_names: true,
            line_number: true,
            level: true,
            ansi: true,
            file: false,
            logfile: "/tmp/registration_report.log".to_string(),
            directives: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database (e.g., `PostgreSQL`).
     */
    pub db_type: DatabaseType,
    /**
     * Whether to apply the bundled migrations on startup.
     */
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `PostgreSQL` database type.
     */
    #[serde(rename_all = "camelCase")]
    Postgresql { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, acquire_slow_threshold: u64, idle_timeout: u64, max_lifetime: u64 },
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSecurity {
    /**
     * Shared secret used to sign and verify session tokens (HS256).
     */
    pub jwt_secret: String,
    /**
     * Lifetime of an issued session token in seconds.
     */
    pub token_expiry_secs: u64,
    /**
     * Users allowed to sign in to the admin area.
     */
    pub admin_users: Vec<AdminUser>,
}

/**
 * An admin account. Every admin has full edit rights.
 */
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub email: String,
    /**
     * Argon2 hash in PHC string format.
     */
    pub password_hash: String,
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

/**
 * Texts and clock settings used when composing the report.
 */
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    pub title: String,
    pub organisation: String,
    pub tagline: String,
    /**
     * Fixed offset from UTC used for the report clock.
     */
    pub utc_offset_hours: i32,
    /**
     * Label appended to the report clock, e.g. EAT.
     */
    pub timezone_label: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            title: "YSO REGISTRATION REPORT".to_string(),
            organisation: "National Youth Council Kenya".to_string(),
            tagline: "Amplifying the Youth Voice".to_string(),
            utc_offset_hours: 3,
            timezone_label: "EAT".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig::default(),
            database: Database {
                db_type: DatabaseType::Postgresql {
                    connection_string: "".to_string(),
                    max_connections: 5,
                    min_connections: 1,
                    acquire_timeout: 30,
                    acquire_slow_threshold: 60,
                    idle_timeout: 300,
                    max_lifetime: 3600,
                },
                run_migrations: true,
            },
            security: AppSecurity {
                jwt_secret: "secret".to_string(),
                token_expiry_secs: 3600,
                admin_users: vec![AdminUser { email: "admin@example.org".to_string(), password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string() }],
            },
            server: Server { workers: 4, http_port: Some(8080), https_config: None },
            report: ReportSettings::default(),
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.thread_ids, deserialized.logging.thread_ids);
        assert_eq!(config.logging.logfile, deserialized.logging.logfile);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(config.server.workers, deserialized.server.workers);
        assert_eq!(config.server.http_port, deserialized.server.http_port);
        assert!(deserialized.server.https_config.is_none());
        assert!(deserialized.database.run_migrations);
        assert_eq!(deserialized.security.token_expiry_secs, 3600);
        assert_eq!(deserialized.security.admin_users, config.security.admin_users);
        assert_eq!(deserialized.report, ReportSettings::default());
    }

    #[test]
    fn test_config_report_section_is_optional() {
        let config_str = r#"
            [logging]
            target = true
            threadIds = false
            threadNames = false
            lineNumber = false
            level = true
            ansi = false
            file = false
            logfile = "/tmp/report.log"
            directives = ["sqlx=warn"]

            [security]
            jwtSecret = "secret"
            tokenExpirySecs = 600
            adminUsers = []

            [server]
            workers = 2
            httpPort = 8080

            [database.dbType.postgresql]
            connectionString = "postgres://localhost/report"
            maxConnections = 5
            minConnections = 1
            acquireTimeout = 3000
            acquireSlowThreshold = 1000
            idleTimeout = 60000
            maxLifetime = 600000
        "#;
        let config: Config = toml::from_str(config_str).unwrap();
        assert_eq!(config.report.utc_offset_hours, 3);
        assert!(!config.database.run_migrations);
        assert_eq!(config.logging.directives, vec!["sqlx=warn".to_string()]);
    }
}
