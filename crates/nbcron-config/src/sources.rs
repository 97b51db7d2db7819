// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and `NBCRON_*`
//! environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ConfigLayer;
use crate::sections::{
	GeneralConfigLayer, LogFormat, LoggingConfigLayer, MailConfigLayer, NotebookSource,
	NotebooksConfigLayer, RenderConfigLayer, SmtpConfigLayer, TlsMode,
};
use crate::secret::load_secret_env;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source. Defaults live in each section's `finalize`.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		Ok(ConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/nbcron/config.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `NBCRON_<SECTION>_<FIELD>`. Per-job recipient overrides
/// (`mail_for_<job>`) are not settings and are looked up by the resolver.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ConfigLayer {
			general: Some(load_general_from_env()),
			mail: Some(load_mail_from_env()),
			smtp: Some(load_smtp_from_env()?),
			notebooks: Some(load_notebooks_from_env()?),
			render: Some(load_render_from_env()),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_general_from_env() -> GeneralConfigLayer {
	GeneralConfigLayer {
		output_folder: env_var("NBCRON_OUTPUT_FOLDER").map(PathBuf::from),
		jobs_file: env_var("NBCRON_JOBS_FILE").map(PathBuf::from),
	}
}

fn load_mail_from_env() -> MailConfigLayer {
	MailConfigLayer {
		recipient: env_var("NBCRON_MAIL_RECIPIENT"),
		alias_domain: env_var("NBCRON_MAIL_ALIAS_DOMAIN"),
	}
}

fn load_smtp_from_env() -> Result<SmtpConfigLayer, ConfigError> {
	let tls_mode = env_var("NBCRON_SMTP_TLS")
		.map(|v| TlsMode::from_str_value(&v))
		.transpose()?;

	Ok(SmtpConfigLayer {
		host: env_var("NBCRON_SMTP_HOST"),
		port: env_u16("NBCRON_SMTP_PORT")?,
		username: env_var("NBCRON_SMTP_USERNAME"),
		password: load_secret_env("NBCRON_SMTP_PASSWORD")
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
		from_address: env_var("NBCRON_SMTP_FROM_ADDRESS"),
		from_name: env_var("NBCRON_SMTP_FROM_NAME"),
		tls_mode,
	})
}

fn load_notebooks_from_env() -> Result<NotebooksConfigLayer, ConfigError> {
	let source = env_var("NBCRON_NOTEBOOKS_SOURCE")
		.map(|v| NotebookSource::from_str_value(&v))
		.transpose()?;

	Ok(NotebooksConfigLayer {
		source,
		dir: env_var("NBCRON_NOTEBOOKS_DIR").map(PathBuf::from),
		base_url: env_var("NBCRON_NOTEBOOKS_BASE_URL"),
		cache_dir: env_var("NBCRON_NOTEBOOKS_CACHE_DIR").map(PathBuf::from),
	})
}

fn load_render_from_env() -> RenderConfigLayer {
	RenderConfigLayer {
		jupyter_bin: env_var("NBCRON_JUPYTER_BIN"),
		kernel: env_var("NBCRON_KERNEL"),
		wkhtmltopdf_bin: env_var("NBCRON_WKHTMLTOPDF_BIN"),
	}
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = env_var("NBCRON_LOG_FORMAT")
		.map(|v| LogFormat::from_str_value(&v))
		.transpose()?;

	Ok(LoggingConfigLayer {
		level: env_var("NBCRON_LOG_LEVEL"),
		format,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.general.is_none());
		assert!(layer.smtp.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/nbcron.toml").load().unwrap();
		assert!(layer.general.is_none());
	}

	#[test]
	fn test_toml_source_reads_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[general]
output_folder = "/srv/nbcron/output"

[mail]
recipient = "fallback@example.org"

[smtp]
host = "in-v3.mailjet.com"
from_address = "reports@example.org"
tls_mode = "starttls"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		let smtp = layer.smtp.unwrap();
		assert_eq!(smtp.host.as_deref(), Some("in-v3.mailjet.com"));
		assert_eq!(smtp.tls_mode, Some(TlsMode::StartTls));
		assert_eq!(
			layer.mail.unwrap().recipient.as_deref(),
			Some("fallback@example.org")
		);
	}

	#[test]
	fn test_toml_source_reports_parse_errors_with_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[general\noutput_folder = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
		assert!(err.to_string().contains(&file.path().display().to_string()));
	}
}
