// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings management for nbcron.
//!
//! This crate provides:
//! - Layered configuration from built-in defaults, a TOML file and the
//!   environment (`NBCRON_*`)
//! - A [`Secret`] wrapper so SMTP credentials never reach the logs
//!
//! Job definitions are not settings; they live in the jobs file named by
//! [`GeneralConfig::jobs_file`] and are loaded by `nbcron-jobs`.
//!
//! # Usage
//!
//! ```ignore
//! use nbcron_config::load_config_with_file;
//!
//! let config = load_config_with_file("/etc/nbcron/config.toml")?;
//! println!("artifacts go to {}", config.general.output_folder.display());
//! ```

pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use secret::{load_secret_env, Secret, SecretEnvError, SecretString, REDACTED};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved settings.
#[derive(Debug, Clone, Default)]
pub struct NbcronConfig {
	pub general: GeneralConfig,
	pub mail: MailConfig,
	/// `None` when no SMTP host is configured; notifications are then skipped.
	pub smtp: Option<SmtpConfig>,
	pub notebooks: NotebooksConfig,
	pub render: RenderConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`NBCRON_*`)
/// 2. Config file (`/etc/nbcron/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<NbcronConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<NbcronConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<NbcronConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize a merged layer into resolved settings.
pub fn finalize(layer: ConfigLayer) -> Result<NbcronConfig, ConfigError> {
	let general = layer.general.unwrap_or_default().finalize();
	let mail = layer.mail.unwrap_or_default().finalize();
	let smtp = layer.smtp.unwrap_or_default().build()?;
	let notebooks = layer.notebooks.unwrap_or_default().finalize()?;
	let render = layer.render.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		output_folder = %general.output_folder.display(),
		jobs_file = %general.jobs_file.display(),
		default_recipient_configured = mail.recipient.is_some(),
		smtp_configured = smtp.is_some(),
		notebook_source = ?notebooks.source,
		"configuration loaded"
	);

	Ok(NbcronConfig {
		general,
		mail,
		smtp,
		notebooks,
		render,
		logging,
	})
}
