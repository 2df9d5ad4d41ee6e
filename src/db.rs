//! Database connections described by the `databases` configuration.
//!
//! A [`DatabaseDescriptor`] names the backend with a `type` tag (`mongo`, `mysql` or
//! `pg`) and carries host, credentials and database name. Each backend sits behind a
//! cargo feature of the same name (`postgres` for `pg`).
//!
//! # Example
//!
//! ```no_run
//! use jrc_common::config::{ConfigClient, Settings};
//! use jrc_common::db::{connect_database, DatabaseDescriptor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigClient::from_settings(&Settings::from_env()?)?;
//! let descriptor: DatabaseDescriptor = config.get_config("db_flyboy").await?;
//! let handle = connect_database(&descriptor).await?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::instrument;

#[cfg(any(feature = "mysql", feature = "postgres"))]
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// The descriptor lacks a field the backend needs.
    #[error("database descriptor has no {0}")]
    MissingField(&'static str),

    /// The descriptor's `type` is not a known backend.
    #[error("unsupported database type")]
    Unsupported,

    /// The backend was compiled out.
    #[error("support for {0} databases is not enabled")]
    BackendDisabled(&'static str),

    #[cfg(feature = "mongo")]
    #[error("failed to connect to MongoDB: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[cfg(any(feature = "mysql", feature = "postgres"))]
    #[error("failed to connect to database: {0}")]
    Sql(#[from] sqlx::Error),
}

/// Backend named by a descriptor's `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mongo,
    Mysql,
    #[serde(rename = "pg")]
    Postgres,
    #[serde(other)]
    Other,
}

impl DatabaseKind {
    pub fn default_port(self) -> Option<u16> {
        match self {
            DatabaseKind::Mongo => Some(27017),
            DatabaseKind::Mysql => Some(3306),
            DatabaseKind::Postgres => Some(5432),
            DatabaseKind::Other => None,
        }
    }
}

/// Connection parameters for one database
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseDescriptor {
    #[serde(rename = "type")]
    pub kind: DatabaseKind,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "port_from_number_or_string")]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// SQL database name
    #[serde(default)]
    pub name: Option<String>,
    /// MongoDB database name
    #[serde(default)]
    pub client: Option<String>,
    /// MongoDB connection string; takes precedence over host and port
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub replicaset: Option<String>,
    #[serde(default)]
    pub authsource: Option<String>,
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(any(feature = "mongo", feature = "mysql", feature = "postgres"))]
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl DatabaseDescriptor {
    /// Configured port, or the backend's default
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| self.kind.default_port())
    }

    #[cfg(any(feature = "mongo", feature = "mysql", feature = "postgres"))]
    fn host(&self) -> Result<&str, DbError> {
        non_empty(&self.host).ok_or(DbError::MissingField("host"))
    }

    #[cfg(any(feature = "mongo", feature = "mysql", feature = "postgres"))]
    fn require(value: &Option<String>, field: &'static str) -> Result<String, DbError> {
        non_empty(value)
            .map(str::to_string)
            .ok_or(DbError::MissingField(field))
    }
}

/// An open database connection
#[derive(Debug, Clone)]
pub enum DatabaseHandle {
    #[cfg(feature = "mongo")]
    Mongo(mongodb::Database),
    #[cfg(feature = "mysql")]
    MySql(sqlx::MySqlPool),
    #[cfg(feature = "postgres")]
    Postgres(sqlx::PgPool),
}

/// Connect to the database a descriptor names
#[instrument(skip(descriptor), fields(kind = ?descriptor.kind, host = ?descriptor.host))]
pub async fn connect_database(
    descriptor: &DatabaseDescriptor,
) -> Result<DatabaseHandle, DbError> {
    match descriptor.kind {
        DatabaseKind::Mongo => connect_mongo(descriptor).await,
        DatabaseKind::Mysql => connect_mysql(descriptor).await,
        DatabaseKind::Postgres => connect_postgres(descriptor).await,
        DatabaseKind::Other => Err(DbError::Unsupported),
    }
}

#[cfg(feature = "mongo")]
async fn connect_mongo(descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    let database = DatabaseDescriptor::require(&descriptor.client, "client")?;

    let client = match non_empty(&descriptor.uri) {
        Some(uri) => mongodb::Client::with_uri_str(uri).await?,
        None => mongodb::Client::with_options(mongo_options(descriptor)?)?,
    };
    Ok(DatabaseHandle::Mongo(client.database(&database)))
}

#[cfg(not(feature = "mongo"))]
async fn connect_mongo(_descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    Err(DbError::BackendDisabled("mongo"))
}

/// Client options for a descriptor without a connection string
#[cfg(feature = "mongo")]
pub fn mongo_options(
    descriptor: &DatabaseDescriptor,
) -> Result<mongodb::options::ClientOptions, DbError> {
    use mongodb::options::{ClientOptions, Credential, ServerAddress};

    let address = format!(
        "{}:{}",
        descriptor.host()?,
        descriptor.port_or_default().unwrap_or(27017)
    );

    let mut options = ClientOptions::default();
    options.hosts = vec![ServerAddress::parse(address)?];
    options.repl_set_name = non_empty(&descriptor.replicaset).map(str::to_string);

    if let Some(password) = non_empty(&descriptor.password) {
        let mut credential = Credential::default();
        credential.username = descriptor.user.clone();
        credential.password = Some(password.to_string());
        credential.source = non_empty(&descriptor.authsource).map(str::to_string);
        options.credential = Some(credential);
    }
    Ok(options)
}

#[cfg(feature = "mysql")]
async fn connect_mysql(descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

    let mut options = MySqlConnectOptions::new()
        .host(descriptor.host()?)
        .port(descriptor.port_or_default().unwrap_or(3306))
        .database(&DatabaseDescriptor::require(&descriptor.name, "name")?);
    if let Some(user) = non_empty(&descriptor.user) {
        options = options.username(user);
    }
    if let Some(password) = non_empty(&descriptor.password) {
        options = options.password(password);
    }

    let pool = MySqlPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    Ok(DatabaseHandle::MySql(pool))
}

#[cfg(not(feature = "mysql"))]
async fn connect_mysql(_descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    Err(DbError::BackendDisabled("mysql"))
}

#[cfg(feature = "postgres")]
async fn connect_postgres(descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    let mut options = PgConnectOptions::new()
        .host(descriptor.host()?)
        .port(descriptor.port_or_default().unwrap_or(5432))
        .database(&DatabaseDescriptor::require(&descriptor.name, "name")?);
    if let Some(user) = non_empty(&descriptor.user) {
        options = options.username(user);
    }
    if let Some(password) = non_empty(&descriptor.password) {
        options = options.password(password);
    }

    let pool = PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    Ok(DatabaseHandle::Postgres(pool))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_descriptor: &DatabaseDescriptor) -> Result<DatabaseHandle, DbError> {
    Err(DbError::BackendDisabled("pg"))
}

/// One-line description of an SQL error, with the server's error code when there is one
#[cfg(any(feature = "mysql", feature = "postgres"))]
pub fn sql_error(err: &sqlx::Error) -> String {
    match err.as_database_error() {
        Some(db_err) => match db_err.code() {
            Some(code) => format!("MySQL error [{}]: {}", code, db_err.message()),
            None => format!("MySQL error {}", db_err.message()),
        },
        None => format!("MySQL error {}", err),
    }
}
