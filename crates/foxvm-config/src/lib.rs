//! Translator configuration and `tracing` initialisation.
//!
//! ```toml
//! [classpath]
//! runtime = ["jdk/rt.jar"]
//! application = ["build/classes"]
//!
//! [link]
//! root_class = "java/lang/Object"
//! verify_vtables = true
//!
//! [logging]
//! level = "foxvm.link=debug"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::{EnvFilter, Layer as _};

pub use foxvm_link::LinkOptions;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    pub classpath: ClasspathConfig,
    pub link: LinkOptions,
    pub logging: LoggingConfig,
}

/// Class directories and jars, in search order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClasspathConfig {
    /// Runtime library; classes are linked on demand and their bodies dropped.
    pub runtime: Vec<PathBuf>,
    /// Classes to translate.
    pub application: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled nothing is printed.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// `warning` is accepted as an alias; bare levels are lowercased. Anything else is passed
    /// through as an `EnvFilter` directive string.
    fn normalize_level_directives(input: &str) -> String {
        let level = input.trim();
        if level.is_empty() {
            return Self::default_level();
        }
        let lower = level.to_ascii_lowercase();
        match lower.as_str() {
            "warning" => "warn".to_owned(),
            "trace" | "debug" | "info" | "warn" | "error" => lower,
            _ => level.to_owned(),
        }
    }

    fn config_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(Self::normalize_level_directives(&self.level))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::WARN.into()))
    }

    /// The effective filter: the configured level with `RUST_LOG` merged on top.
    pub fn env_filter(&self) -> EnvFilter {
        let Some(rust_log) = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
        else {
            return self.config_env_filter();
        };
        let rust_log = rust_log.trim();
        let merged = format!(
            "{},{rust_log}",
            Self::normalize_level_directives(&self.level)
        );
        EnvFilter::try_new(merged)
            .or_else(|_| EnvFilter::try_new(rust_log))
            .unwrap_or_else(|_| self.config_env_filter())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        let message = err.message().trim();
        match err.span() {
            Some(span) => ConfigError::Toml(format!("{message} (at byte {})", span.start)),
            None => ConfigError::Toml(message.to_owned()),
        }
    }
}

impl TranslatorConfig {
    /// Loads a config file. Relative classpath entries are resolved against the file's directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::load_from_str(&text)?;
        if let Some(base) = path.parent() {
            config.classpath.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

impl ClasspathConfig {
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in self.runtime.iter_mut().chain(self.application.iter_mut()) {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let stderr = config.stderr;
        let writer = move || -> Box<dyn std::io::Write> {
            if stderr {
                Box::new(std::io::stderr())
            } else {
                Box::new(std::io::sink())
            }
        };

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(target = "foxvm.config", json = config.json, "tracing initialized");
        }
    });
}
