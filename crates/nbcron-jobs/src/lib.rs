// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduled notebook jobs.
//!
//! A job is a notebook declared in the jobs file. Running it means:
//!
//! 1. [`ConfigResolver`] looks the job up, fetches the notebook and computes
//!    the recipient (per-job override, alias, default recipient).
//! 2. [`Executor`] runs the notebook into `{output_folder}/{job}/` and renders
//!    HTML (and PDF on request). Failures are captured, never raised.
//! 3. [`Notifier`] mails the result, unless the job only reports errors and
//!    the run succeeded.
//! 4. [`RetentionManager`] keeps the job's most recent runs.
//!
//! [`JobRunner`] sequences the four steps. Scheduling itself is left to an
//! external trigger (cron, a systemd timer) invoking `nbcron run <job>`.

pub mod artifact;
pub mod definition;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod notify;
pub mod render;
pub mod resolve;
pub mod retention;
pub mod runner;

pub use artifact::{job_dir, Clock, RunArtifact, SystemClock, TIMESTAMP_FORMAT};
pub use definition::{JobDefinition, JobStore};
pub use error::{
	FetchError, JobStoreError, NotifyError, RenderError, ResolveError, RunnerError, SetupError,
};
pub use executor::{ExecuteRequest, Executor, RunFailure, RunOutcome};
pub use fetch::{fetcher_from_config, HttpNotebookFetcher, LocalNotebookFetcher, NotebookFetcher};
pub use notify::{subject_for, MailNotifier, MailTransport, Notification, Notifier, NotifyStatus};
pub use render::{
	NbconvertRenderer, PdfConverter, RenderContext, RenderRequest, Renderer, WkhtmltopdfConverter,
	WORKING_DIR_VAR,
};
pub use resolve::{
	override_key, resolve_recipient, ConfigResolver, EffectiveJobConfig, EnvVars, JobIdentity,
	ResolvedJob, VarLookup,
};
pub use retention::RetentionManager;
pub use runner::{JobReport, JobRunner};
