mod api;
mod dao;
mod metrics;
mod model;
mod service;

use std::fs::OpenOptions;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::endpoints::{configure, json_config};
use crate::api::middleware::timing_middleware;
use crate::api::security::{JwtSecurityService, hash_password};
use crate::api::state::AppState;
use crate::dao::registrations::RegistrationDao;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Config, DatabaseType, HttpsConfig, LoggingConfig};
use crate::service::report::ReportClock;
use crate::service::store::RegistrationService;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use rustls::pki_types::PrivateKeyDer;
use rustls::{ServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, pkcs8_private_keys};
use sqlx::{Pool, Postgres, pool};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Main entry point for the application.
 */
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    if let Some(password) = &args.hash_password {
        let hash = hash_password(password).map_err(|err| std::io::Error::other(format!("Failed to hash password: {err}")))?;
        println!("{hash}");
        return Ok(());
    }
    let Some(config_file) = &args.config_file else {
        return Err(std::io::Error::other("A configuration file is required"));
    };

    let config = get_config(config_file)?;

    init_tracing(&config.logging)?;

    let connection_pool: Pool<Postgres> = match config.clone().database.db_type {
        DatabaseType::Postgresql { connection_string, max_connections, min_connections, acquire_timeout, acquire_slow_threshold, idle_timeout, max_lifetime } => pool::PoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_millis(acquire_timeout))
            .acquire_slow_threshold(std::time::Duration::from_millis(acquire_slow_threshold))
            .idle_timeout(std::time::Duration::from_millis(idle_timeout))
            .max_lifetime(std::time::Duration::from_millis(max_lifetime))
            .connect(connection_string.as_str())
            .await
            .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?,
    };
    if config.database.run_migrations {
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&connection_pool).await.map_err(|err| std::io::Error::other(format!("Failed to run migrations: {err}")))?;
        info!("Database migrations applied");
    }
    let connection_pool = Arc::new(connection_pool);

    let jwt_service = JwtSecurityService::new(&config.security.jwt_secret, config.security.token_expiry_secs, &config.security.admin_users)
        .map_err(|err| std::io::Error::other(format!("Failed to initialize security service: {err}")))?;

    let registration_dao = RegistrationDao::new();
    let registration_service = RegistrationService::new(registration_dao, Some(connection_pool.as_ref().clone()));

    let clock = ReportClock::start(config.report.utc_offset_hours, &config.report.timezone_label).map_err(|err| std::io::Error::other(format!("Failed to start report clock: {err}")))?;

    let state = web::Data::new(AppState::new(jwt_service, registration_service, config.report.clone(), clock));

    let prometheus = PrometheusMetricsBuilder::new("")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    // Initialize custom metrics
    let max_connections_gauge = IntGauge::new("max_connections", "Connection pool maximum").map_err(|err| std::io::Error::other(format!("Failed to create max_connections gauge: {err}")))?;
    let min_connections_gauge = IntGauge::new("min_connections", "Connection pool minimum").map_err(|err| std::io::Error::other(format!("Failed to create min_connections gauge: {err}")))?;
    let active_connections_gauge = IntGauge::new("active_connections", "Connection pool active").map_err(|err| std::io::Error::other(format!("Failed to create active_connections gauge: {err}")))?;
    let idle_connections_gauge = IntGauge::new("idle_connections", "Connection pool idle").map_err(|err| std::io::Error::other(format!("Failed to create idle_connections gauge: {err}")))?;
    //Register custom prometheus metrics
    register_prometheus_metrics(&prometheus, &max_connections_gauge)?;
    register_prometheus_metrics(&prometheus, &min_connections_gauge)?;
    register_prometheus_metrics(&prometheus, &active_connections_gauge)?;
    register_prometheus_metrics(&prometheus, &idle_connections_gauge)?;

    gather_db_metrics(max_connections_gauge, min_connections_gauge, active_connections_gauge, idle_connections_gauge, connection_pool);

    let server_init = HttpServer::new(move || App::new().wrap(prometheus.clone()).wrap(from_fn(timing_middleware)).app_data(json_config()).app_data(state.clone()).configure(configure));

    let server_init = if let Some(http_port) = &config.server.http_port { server_init.bind(("127.0.0.1", *http_port))? } else { server_init };
    let server_init = if let Some(https_config) = &config.server.https_config {
        let ssl_builder = ssl_builder(https_config).map_err(|err| std::io::Error::other(format!("Failed to create SSL/TLS configuration: {err}")))?;
        server_init.bind_rustls_0_23("127.0.0.1:".to_string() + &https_config.port.to_string(), ssl_builder).map_err(|err| std::io::Error::other(format!("Failed to bind HTTPS server: {err}")))?
    } else {
        server_init
    };

    info!("Starting registration report with {} workers", config.server.workers);
    server_init.workers(config.server.workers).run().await
}

/**
 * Initializes logging from the logging configuration.
 *
 * #Arguments
 * `logging`: Which fields to log, where to log and extra filter directives.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.directives {
        let directive: Directive = directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?;
        filter = filter.add_directive(directive);
    }
    let layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi);
    if logging.file {
        let logfile = OpenOptions::new().create(true).append(true).open(&logging.logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {}: {err}", logging.logfile)))?;
        tracing_subscriber::registry().with(filter).with(layer.with_ansi(false).with_writer(Arc::new(logfile))).init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
    Ok(())
}

/**
 * Registers custom Prometheus metrics.
 *
 * #Arguments
 * `prometheus_metrics`: The Prometheus metrics instance to register the gauge with.
 * `gauge`: The gauge to register.
 */
fn register_prometheus_metrics(prometheus_metrics: &PrometheusMetrics, gauge: &IntGauge) -> Result<(), std::io::Error> {
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge: {err}")))?;
    Ok(())
}

/**
 * Gathers database metrics in a separate thread.
 *
 * #Arguments
 * `max_connections_gauge`: Gauge for maximum connections.
 * `min_connections_gauge`: Gauge for minimum connections.
 * `active_connections_gauge`: Gauge for active connections.
 * `idle_connections_gauge`: Gauge for idle connections.
 * `connection_pool`: The connection pool to gather metrics from.
 */
fn gather_db_metrics(max_connections_gauge: IntGauge, min_connections_gauge: IntGauge, active_connections_gauge: IntGauge, idle_connections_gauge: IntGauge, connection_pool: Arc<Pool<Postgres>>) {
    thread::spawn(move || {
        loop {
            max_connections_gauge.set(i64::from(connection_pool.options().get_max_connections()));
            min_connections_gauge.set(i64::from(connection_pool.options().get_min_connections()));
            active_connections_gauge.set(i64::from(connection_pool.size()));
            #[allow(clippy::cast_possible_wrap)]
            idle_connections_gauge.set(connection_pool.num_idle() as i64);
            thread::sleep(Duration::from_secs(1));
        }
    });
}

/**
 * Initializes the SSL/TLS configuration for the server.
 *
 * #Arguments
 * `https_config`: The HTTPS configuration containing the certificate and private key files.
 *
 * #Returns
 * A `Result` containing the initialized `ServerConfig` or an `ApplicationError` if initialization fails.
 */
fn ssl_builder(https_config: &HttpsConfig) -> Result<ServerConfig, ApplicationError> {
    let config_builder = ServerConfig::builder_with_protocol_versions(&get_protocol_versions());
    let cert_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.certificate_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read certificate file: {err}")))?,
    );
    let key_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?,
    );
    let cert_chain = certs(cert_file).collect::<Result<Vec<_>, _>>().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert certificate to der: {err}")))?;
    let key = pkcs8_private_keys(key_file)
        .map(|key| key.map(PrivateKeyDer::Pkcs8))
        .next()
        .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "No private key found".to_string()))?
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert private key to der: {err}")))?;
    let config = config_builder
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create server config: {err}")))?;
    Ok(config)
}

/**
 * Returns the supported TLS protocol versions.
 *
 * #Returns
 * A vector of supported protocol versions.
 */
fn get_protocol_versions() -> Vec<&'static SupportedProtocolVersion> {
    vec![&rustls::version::TLS13]
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_config_missing_file() {
        assert!(get_config("/nonexistent/config.toml").is_err());
    }

    #[test]
    fn test_get_config_example_file() {
        let config = get_config("./config/config.toml").unwrap();
        assert_eq!(config.report.timezone_label, "EAT");
        assert_eq!(config.security.admin_users.len(), 1);
    }

    #[test]
    fn test_ssl_builder_missing_files() {
        let https_config = HttpsConfig { port: 8443, certificate_file: "/nonexistent/cert.pem".to_string(), private_key_file: "/nonexistent/key.pem".to_string() };
        let err = ssl_builder(&https_config).unwrap_err();
        assert_eq!(err.error_type, ErrorType::Initialization);
    }
}
