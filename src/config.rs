use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::ReportFormat;
use crate::error::ReportError;

pub const DEFAULT_PORT: u16 = 5432;

/// Settings as they appear in the JSON config file. Anything left out falls
/// back to the pipeline environment variables.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub annotation_release: Option<String>,
    #[serde(default)]
    pub database_release: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub input_dir: Option<String>,
    #[serde(default)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub server: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub connection: ConnectionSettings,
    pub annotation_release: Option<String>,
    pub database_release: String,
    pub output_dir: Utf8PathBuf,
    pub input_dir: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
}

impl ResolvedConfig {
    pub fn database(&self) -> &str {
        &self.connection.database
    }

    pub fn output_path(&self, report_label: &str, format: ReportFormat) -> Utf8PathBuf {
        self.output_dir.join(format!(
            "{report_label}_{}.{}",
            self.connection.database,
            format.extension()
        ))
    }

    pub fn log_path(&self, report_label: &str) -> Utf8PathBuf {
        self.log_dir
            .join(format!("{report_label}_{}.log", self.connection.database))
    }

    pub fn input_path(&self, filename: &str) -> Utf8PathBuf {
        self.input_dir.join(filename)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ReportError> {
        let config = match path {
            Some(path) => Self::read(Utf8Path::new(path))?,
            None => Config::default(),
        };
        Self::resolve_config(config, |name| std::env::var(name).ok())
    }

    pub fn read(path: &Utf8Path) -> Result<Config, ReportError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| ReportError::ConfigRead(PathBuf::from(path.as_std_path())))?;
        serde_json::from_str(&content).map_err(|err| ReportError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config<E>(config: Config, env: E) -> Result<ResolvedConfig, ReportError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let pick = |value: Option<String>, var: &str| {
            value
                .or_else(|| env(var))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let server = pick(config.server, "SERVER").ok_or(ReportError::MissingSetting("server"))?;
        let database =
            pick(config.database, "DATABASE").ok_or(ReportError::MissingSetting("database"))?;
        let username =
            pick(config.username, "USER").ok_or(ReportError::MissingSetting("username"))?;
        let database_release = pick(config.database_release, "RELEASE")
            .ok_or(ReportError::MissingSetting("database_release"))?;

        let port = match config.port {
            Some(port) => port,
            None => match env("PGPORT") {
                Some(value) => value.trim().parse().map_err(|_| ReportError::InvalidSetting {
                    name: "port",
                    message: format!("not a port number: {value}"),
                })?,
                None => DEFAULT_PORT,
            },
        };

        Ok(ResolvedConfig {
            connection: ConnectionSettings {
                server,
                port,
                database,
                username,
                password: pick(config.password, "PGPASSWORD"),
            },
            annotation_release: pick(config.annotation_release, "ANNOTATIONRELEASE"),
            database_release,
            output_dir: dir_or_default(config.output_dir, "output"),
            input_dir: dir_or_default(config.input_dir, "input"),
            log_dir: dir_or_default(config.log_dir, "logs"),
        })
    }
}

fn dir_or_default(value: Option<String>, default: &str) -> Utf8PathBuf {
    value
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
        .unwrap_or_else(|| Utf8PathBuf::from(".").join(default))
}
