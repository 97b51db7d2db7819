// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where notebooks come from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotebookSource {
	/// Notebooks are read from `notebooks.dir`.
	#[default]
	Local,
	/// Notebooks are downloaded from `notebooks.base_url` into `notebooks.cache_dir`.
	Remote,
}

impl NotebookSource {
	pub fn from_str_value(value: &str) -> Result<Self, ConfigError> {
		match value.to_lowercase().as_str() {
			"local" => Ok(NotebookSource::Local),
			"remote" | "http" => Ok(NotebookSource::Remote),
			_ => Err(ConfigError::InvalidValue {
				key: "notebooks.source".to_string(),
				message: format!("Invalid value: '{value}'. Expected: local, remote"),
			}),
		}
	}
}

fn default_dir() -> PathBuf {
	PathBuf::from("./notebooks")
}

fn default_cache_dir() -> PathBuf {
	PathBuf::from("./.nbcron/notebooks")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NotebooksConfigLayer {
	pub source: Option<NotebookSource>,
	pub dir: Option<PathBuf>,
	pub base_url: Option<String>,
	pub cache_dir: Option<PathBuf>,
}

impl NotebooksConfigLayer {
	pub fn merge(&mut self, other: Self) {
		self.source = other.source.or(self.source.take());
		self.dir = other.dir.or(self.dir.take());
		self.base_url = other.base_url.or(self.base_url.take());
		self.cache_dir = other.cache_dir.or(self.cache_dir.take());
	}

	pub fn finalize(self) -> Result<NotebooksConfig, ConfigError> {
		let source = self.source.unwrap_or_default();
		let base_url = self.base_url.filter(|u| !u.is_empty());

		if source == NotebookSource::Remote && base_url.is_none() {
			return Err(ConfigError::Validation(
				"notebooks.base_url is required when notebooks.source = \"remote\"".to_string(),
			));
		}

		Ok(NotebooksConfig {
			source,
			dir: self.dir.unwrap_or_else(default_dir),
			base_url,
			cache_dir: self.cache_dir.unwrap_or_else(default_cache_dir),
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotebooksConfig {
	pub source: NotebookSource,
	pub dir: PathBuf,
	pub base_url: Option<String>,
	pub cache_dir: PathBuf,
}

impl Default for NotebooksConfig {
	fn default() -> Self {
		Self {
			source: NotebookSource::Local,
			dir: default_dir(),
			base_url: None,
			cache_dir: default_cache_dir(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_local_source() {
		let config = NotebooksConfigLayer::default().finalize().unwrap();
		assert_eq!(config, NotebooksConfig::default());
	}

	#[test]
	fn remote_requires_base_url() {
		let layer = NotebooksConfigLayer {
			source: Some(NotebookSource::Remote),
			..Default::default()
		};
		assert!(matches!(layer.finalize(), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn remote_with_base_url() {
		let layer: NotebooksConfigLayer = toml::from_str(
			r#"
source = "remote"
base_url = "https://notebooks.example.com/raw/main"
"#,
		)
		.unwrap();
		let config = layer.finalize().unwrap();
		assert_eq!(config.source, NotebookSource::Remote);
		assert_eq!(
			config.base_url.as_deref(),
			Some("https://notebooks.example.com/raw/main")
		);
	}

	#[test]
	fn parses_source_values() {
		assert_eq!(
			NotebookSource::from_str_value("LOCAL").unwrap(),
			NotebookSource::Local
		);
		assert_eq!(
			NotebookSource::from_str_value("http").unwrap(),
			NotebookSource::Remote
		);
		assert!(NotebookSource::from_str_value("ftp").is_err());
	}
}
