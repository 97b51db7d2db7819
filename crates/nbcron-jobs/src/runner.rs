// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One job invocation from name to report.

use std::path::Path;
use std::sync::Arc;

use nbcron_config::NbcronConfig;
use tracing::{error, info, instrument};

use crate::definition::JobStore;
use crate::error::{RunnerError, SetupError};
use crate::executor::{ExecuteRequest, Executor};
use crate::fetch::fetcher_from_config;
use crate::notify::{MailNotifier, Notification, Notifier, NotifyStatus};
use crate::render::{NbconvertRenderer, WkhtmltopdfConverter};
use crate::resolve::{ConfigResolver, EffectiveJobConfig, EnvVars};
use crate::retention::RetentionManager;

/// What happened during one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
	pub job_name: String,
	pub stem: String,
	pub is_error: bool,
	pub failure: Option<String>,
	pub notify: NotifyStatus,
	pub files_removed: usize,
}

pub struct JobRunner {
	resolver: ConfigResolver,
	executor: Executor,
	notifier: Arc<dyn Notifier>,
	retention: RetentionManager,
}

impl JobRunner {
	pub fn new(
		resolver: ConfigResolver,
		executor: Executor,
		notifier: Arc<dyn Notifier>,
		retention: RetentionManager,
	) -> Self {
		Self {
			resolver,
			executor,
			notifier,
			retention,
		}
	}

	/// Wire the production collaborators from settings.
	pub fn from_config(config: &NbcronConfig, store: JobStore) -> Result<Self, SetupError> {
		let output_folder = &config.general.output_folder;
		let resolver = ConfigResolver::new(
			Arc::new(store),
			fetcher_from_config(&config.notebooks)?,
			Arc::new(EnvVars),
			config.mail.clone(),
		);
		let executor = Executor::new(
			output_folder,
			Arc::new(NbconvertRenderer::from_config(&config.render)),
			Arc::new(WkhtmltopdfConverter::from_config(&config.render)),
		);
		let notifier = MailNotifier::from_config(config.smtp.clone())?;

		Ok(Self::new(
			resolver,
			executor,
			Arc::new(notifier),
			RetentionManager::new(output_folder),
		))
	}

	pub fn resolver(&self) -> &ConfigResolver {
		&self.resolver
	}

	pub fn retention(&self) -> &RetentionManager {
		&self.retention
	}

	/// Resolve, execute, notify and apply retention for `job_name`.
	///
	/// Only configuration problems are errors; a failing notebook yields an
	/// `Ok` report with `is_error` set.
	#[instrument(skip(self), fields(job = %job_name))]
	pub async fn run_job(&self, job_name: &str) -> Result<JobReport, RunnerError> {
		let resolved = self.resolver.resolve(job_name).await?;
		info!(cron = %resolved.cron, "running job");

		Ok(self
			.run_resolved(job_name, &resolved.identity.notebook_path, &resolved.config)
			.await)
	}

	/// Execute an already located notebook under `job_name`.
	#[instrument(skip(self, config), fields(job = %job_name, notebook = %notebook_path.display()))]
	pub async fn run_resolved(
		&self,
		job_name: &str,
		notebook_path: &Path,
		config: &EffectiveJobConfig,
	) -> JobReport {
		let outcome = self
			.executor
			.execute(ExecuteRequest {
				job_name: job_name.to_string(),
				notebook_path: notebook_path.to_path_buf(),
				pdf: config.pdf,
			})
			.await;
		let is_error = outcome.is_error();

		let notify = if is_error || !config.only_errors {
			let notification = Notification {
				job_name: job_name.to_string(),
				artifact: outcome.artifact.clone(),
				include_pdf: config.pdf,
				recipient: config.mail_to.clone(),
				is_error,
			};
			match self.notifier.notify(notification).await {
				Ok(status) => status,
				Err(e) => {
					error!(error = %e, "failed to send notification");
					NotifyStatus::Failed(e.to_string())
				}
			}
		} else {
			NotifyStatus::Suppressed
		};

		let files_removed = if config.truncate > 0 {
			self.retention.truncate(job_name, config.truncate).await
		} else {
			0
		};

		info!(
			stem = %outcome.artifact.stem,
			is_error,
			notify = ?notify,
			files_removed,
			"job finished"
		);

		JobReport {
			job_name: job_name.to_string(),
			stem: outcome.artifact.stem,
			is_error,
			failure: outcome.result.err().map(|f| f.to_string()),
			notify,
			files_removed,
		}
	}
}
