// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job definitions and the TOML store they are declared in.
//!
//! ```toml
//! [daily-report]
//! notebook = "reports/daily.ipynb"
//! depends_on = ["lib/helpers.ipynb"]
//! cron = "0 6 * * *"
//! recipient_alias = "reports-team"
//! only_errors = false
//! pdf = true
//! truncate = 10
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JobStoreError;

/// One `[job]` table of the jobs file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDefinition {
	pub notebook: String,
	#[serde(default)]
	pub depends_on: Vec<String>,
	/// Only checked for presence; scheduling is the external trigger's job.
	#[serde(default)]
	pub cron: Option<String>,
	/// Local part of the recipient address, completed with the alias domain.
	#[serde(default, alias = "recipient_alias_dgf")]
	pub recipient_alias: Option<String>,
	#[serde(default)]
	pub only_errors: bool,
	#[serde(default)]
	pub pdf: bool,
	/// Number of runs to keep; 0 keeps everything.
	#[serde(default)]
	pub truncate: u32,
}

/// Job definitions keyed by job name, loaded once per invocation.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
	jobs: BTreeMap<String, JobDefinition>,
}

impl JobStore {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, JobStoreError> {
		let path = path.as_ref();
		debug!(path = %path.display(), "loading jobs file");

		let content = std::fs::read_to_string(path).map_err(|source| JobStoreError::Read {
			path: path.to_path_buf(),
			source,
		})?;

		Self::parse(&content, path)
	}

	pub fn parse(content: &str, origin: impl Into<PathBuf>) -> Result<Self, JobStoreError> {
		let jobs = toml::from_str(content).map_err(|source| JobStoreError::Parse {
			path: origin.into(),
			source,
		})?;
		Ok(Self { jobs })
	}

	pub fn from_definitions(jobs: impl IntoIterator<Item = (String, JobDefinition)>) -> Self {
		Self {
			jobs: jobs.into_iter().collect(),
		}
	}

	pub fn get(&self, name: &str) -> Option<&JobDefinition> {
		self.jobs.get(name)
	}

	/// Jobs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &JobDefinition)> {
		self.jobs.iter().map(|(name, def)| (name.as_str(), def))
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const JOBS: &str = r#"
[daily-report]
notebook = "reports/daily.ipynb"
depends_on = ["lib/helpers.ipynb", "lib/plots.ipynb"]
cron = "0 6 * * *"
recipient_alias = "reports-team"
pdf = true
truncate = 10

[weekly]
notebook = "weekly.ipynb"
cron = "0 7 * * 1"
recipient_alias_dgf = "weekly-team"
only_errors = true

[draft]
notebook = "draft.ipynb"
"#;

	#[test]
	fn parses_all_fields() {
		let store = JobStore::parse(JOBS, "jobs.toml").unwrap();
		assert_eq!(store.len(), 3);

		let daily = store.get("daily-report").unwrap();
		assert_eq!(daily.notebook, "reports/daily.ipynb");
		assert_eq!(daily.depends_on, vec!["lib/helpers.ipynb", "lib/plots.ipynb"]);
		assert_eq!(daily.cron.as_deref(), Some("0 6 * * *"));
		assert_eq!(daily.recipient_alias.as_deref(), Some("reports-team"));
		assert!(daily.pdf);
		assert!(!daily.only_errors);
		assert_eq!(daily.truncate, 10);
	}

	#[test]
	fn accepts_legacy_alias_key() {
		let store = JobStore::parse(JOBS, "jobs.toml").unwrap();
		let weekly = store.get("weekly").unwrap();
		assert_eq!(weekly.recipient_alias.as_deref(), Some("weekly-team"));
		assert!(weekly.only_errors);
	}

	#[test]
	fn optional_fields_default() {
		let store = JobStore::parse(JOBS, "jobs.toml").unwrap();
		let draft = store.get("draft").unwrap();
		assert!(draft.depends_on.is_empty());
		assert!(draft.cron.is_none());
		assert!(draft.recipient_alias.is_none());
		assert!(!draft.pdf);
		assert_eq!(draft.truncate, 0);
	}

	#[test]
	fn iterates_in_name_order() {
		let store = JobStore::parse(JOBS, "jobs.toml").unwrap();
		let names: Vec<_> = store.iter().map(|(name, _)| name).collect();
		assert_eq!(names, vec!["daily-report", "draft", "weekly"]);
	}

	#[test]
	fn rejects_unknown_keys() {
		let err = JobStore::parse(
			"[typo]\nnotebook = \"a.ipynb\"\ncron = \"* * * * *\"\nrecipents = \"x\"\n",
			"jobs.toml",
		)
		.unwrap_err();
		assert!(matches!(err, JobStoreError::Parse { .. }));
	}

	#[test]
	fn rejects_negative_truncate() {
		let result = JobStore::parse(
			"[job]\nnotebook = \"a.ipynb\"\ntruncate = -1\n",
			"jobs.toml",
		);
		assert!(result.is_err());
	}

	#[test]
	fn load_reports_missing_file() {
		let err = JobStore::load("/nonexistent/jobs.toml").unwrap_err();
		assert!(matches!(err, JobStoreError::Read { .. }));
	}

	#[test]
	fn load_reads_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("jobs.toml");
		std::fs::write(&path, JOBS).unwrap();

		let store = JobStore::load(&path).unwrap();
		assert!(store.get("weekly").is_some());
		assert!(!store.is_empty());
	}
}
