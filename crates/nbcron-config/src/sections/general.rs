// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! General settings: where run artifacts go and where jobs are declared.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_output_folder() -> PathBuf {
	PathBuf::from("./output")
}

fn default_jobs_file() -> PathBuf {
	PathBuf::from("./jobs.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfigLayer {
	pub output_folder: Option<PathBuf>,
	pub jobs_file: Option<PathBuf>,
}

impl GeneralConfigLayer {
	pub fn merge(&mut self, other: Self) {
		self.output_folder = other.output_folder.or(self.output_folder.take());
		self.jobs_file = other.jobs_file.or(self.jobs_file.take());
	}

	pub fn finalize(self) -> GeneralConfig {
		GeneralConfig {
			output_folder: self.output_folder.unwrap_or_else(default_output_folder),
			jobs_file: self.jobs_file.unwrap_or_else(default_jobs_file),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
	/// Root under which each job gets its own artifact directory.
	pub output_folder: PathBuf,
	/// TOML document declaring the jobs.
	pub jobs_file: PathBuf,
}

impl Default for GeneralConfig {
	fn default() -> Self {
		GeneralConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = GeneralConfigLayer::default().finalize();
		assert_eq!(config.output_folder, PathBuf::from("./output"));
		assert_eq!(config.jobs_file, PathBuf::from("./jobs.toml"));
	}

	#[test]
	fn test_merge_overwrites_only_set_fields() {
		let mut base = GeneralConfigLayer {
			output_folder: Some(PathBuf::from("/srv/old")),
			jobs_file: Some(PathBuf::from("/etc/nbcron/jobs.toml")),
		};
		base.merge(GeneralConfigLayer {
			output_folder: Some(PathBuf::from("/srv/new")),
			jobs_file: None,
		});
		assert_eq!(base.output_folder, Some(PathBuf::from("/srv/new")));
		assert_eq!(base.jobs_file, Some(PathBuf::from("/etc/nbcron/jobs.toml")));
	}

	#[test]
	fn test_deserialize_layer_partial() {
		let layer: GeneralConfigLayer = toml::from_str(r#"output_folder = "/var/lib/nbcron""#).unwrap();
		assert_eq!(layer.output_folder, Some(PathBuf::from("/var/lib/nbcron")));
		assert!(layer.jobs_file.is_none());
	}
}
