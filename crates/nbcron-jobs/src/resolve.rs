// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning a job name into everything needed to run it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nbcron_config::MailConfig;
use tracing::{debug, instrument};

use crate::definition::{JobDefinition, JobStore};
use crate::error::ResolveError;
use crate::fetch::NotebookFetcher;

/// Read-only key/value lookup for per-job overrides.
pub trait VarLookup: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVars;

impl VarLookup for EnvVars {
	fn get(&self, key: &str) -> Option<String> {
		std::env::var(key).ok()
	}
}

impl VarLookup for HashMap<String, String> {
	fn get(&self, key: &str) -> Option<String> {
		HashMap::get(self, key).cloned()
	}
}

/// Name of the variable that overrides the recipient of `job_name`.
pub fn override_key(job_name: &str) -> String {
	format!("mail_for_{job_name}")
}

/// First non-empty of: the per-job override, `{alias}@{alias_domain}`, the
/// default recipient.
pub fn resolve_recipient(
	job_name: &str,
	definition: &JobDefinition,
	vars: &dyn VarLookup,
	mail: &MailConfig,
) -> Option<String> {
	let sources: [&dyn Fn() -> Option<String>; 3] = [
		&|| vars.get(&override_key(job_name)),
		&|| {
			definition
				.recipient_alias
				.as_deref()
				.map(str::trim)
				.filter(|alias| !alias.is_empty())
				.map(|alias| format!("{alias}@{}", mail.alias_domain))
		},
		&|| mail.recipient.clone(),
	];

	sources
		.iter()
		.find_map(|source| source().filter(|value| !value.trim().is_empty()))
}

/// Per-invocation settings derived from a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveJobConfig {
	pub mail_to: Option<String>,
	pub only_errors: bool,
	pub pdf: bool,
	pub truncate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentity {
	pub name: String,
	pub notebook_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJob {
	pub identity: JobIdentity,
	pub config: EffectiveJobConfig,
	pub cron: String,
}

pub struct ConfigResolver {
	store: Arc<JobStore>,
	fetcher: Arc<dyn NotebookFetcher>,
	vars: Arc<dyn VarLookup>,
	mail: MailConfig,
}

impl ConfigResolver {
	pub fn new(
		store: Arc<JobStore>,
		fetcher: Arc<dyn NotebookFetcher>,
		vars: Arc<dyn VarLookup>,
		mail: MailConfig,
	) -> Self {
		Self {
			store,
			fetcher,
			vars,
			mail,
		}
	}

	/// Load the jobs file and resolve overrides from the process environment.
	pub fn load(
		jobs_file: &Path,
		fetcher: Arc<dyn NotebookFetcher>,
		mail: MailConfig,
	) -> Result<Self, ResolveError> {
		let store = JobStore::load(jobs_file)?;
		Ok(Self::new(Arc::new(store), fetcher, Arc::new(EnvVars), mail))
	}

	#[instrument(skip(self), fields(job = %job_name))]
	pub async fn resolve(&self, job_name: &str) -> Result<ResolvedJob, ResolveError> {
		let definition = self
			.store
			.get(job_name)
			.ok_or_else(|| ResolveError::JobNotFound(job_name.to_string()))?;

		let notebook_path = self
			.fetcher
			.fetch(job_name, &definition.notebook, &definition.depends_on)
			.await
			.map_err(|source| ResolveError::NotebookUnresolvable {
				job: job_name.to_string(),
				source,
			})?;

		let cron = definition
			.cron
			.as_deref()
			.map(str::trim)
			.filter(|cron| !cron.is_empty())
			.ok_or_else(|| ResolveError::MissingCron(job_name.to_string()))?
			.to_string();

		let config = EffectiveJobConfig {
			mail_to: resolve_recipient(job_name, definition, self.vars.as_ref(), &self.mail),
			only_errors: definition.only_errors,
			pdf: definition.pdf,
			truncate: definition.truncate,
		};

		debug!(
			notebook = %notebook_path.display(),
			mail_to = config.mail_to.as_deref().unwrap_or("-"),
			"job resolved"
		);

		Ok(ResolvedJob {
			identity: JobIdentity {
				name: job_name.to_string(),
				notebook_path,
			},
			config,
			cron,
		})
	}
}
