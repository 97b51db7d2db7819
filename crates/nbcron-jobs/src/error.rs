// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use nbcron_smtp::SmtpError;

/// The jobs file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
	#[error("Failed to read jobs file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse jobs file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
}

/// A job cannot run because its configuration is unusable. Always fatal to
/// the invocation: nothing is executed and nobody is notified.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
	#[error("Job \"{0}\" not found")]
	JobNotFound(String),

	#[error("Failed to resolve notebook for \"{job}\": {source}")]
	NotebookUnresolvable {
		job: String,
		#[source]
		source: FetchError,
	},

	#[error("No cron found for job \"{0}\"")]
	MissingCron(String),

	#[error(transparent)]
	Store(#[from] JobStoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("notebook not found: {0}")]
	NotFound(PathBuf),

	#[error("invalid notebook identifier \"{0}\"")]
	InvalidIdentifier(String),

	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("request to {url} failed: {source}")]
	Http {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("{url} returned HTTP {status}")]
	Status { url: String, status: u16 },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
	#[error("failed to start {program}: {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{program} exited with {status}: {stderr}")]
	Failed {
		program: String,
		status: String,
		stderr: String,
	},

	#[error("expected output {0} was not produced")]
	MissingOutput(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
	#[error("mail delivery failed: {0}")]
	Transport(#[from] SmtpError),
}

/// Fatal outcome of one runner invocation. Execution failures are not
/// errors here; they are reported through [`crate::JobReport`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
	#[error(transparent)]
	Config(#[from] ResolveError),
}

/// Wiring the runner from settings failed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
	#[error("SMTP client setup failed: {0}")]
	Smtp(#[from] SmtpError),

	#[error("HTTP client setup failed: {0}")]
	Http(#[from] reqwest::Error),
}
