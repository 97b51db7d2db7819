// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning notebook identifiers into local, executable files.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nbcron_config::{NotebookSource, NotebooksConfig};
use tracing::{debug, info, instrument};

use crate::error::{FetchError, SetupError};

#[async_trait]
pub trait NotebookFetcher: Send + Sync {
	/// Make `notebook` and every entry of `depends_on` available locally and
	/// return the path of `notebook`.
	async fn fetch(
		&self,
		job_name: &str,
		notebook: &str,
		depends_on: &[String],
	) -> Result<PathBuf, FetchError>;
}

/// Build the fetcher selected by `notebooks.source`.
pub fn fetcher_from_config(
	config: &NotebooksConfig,
) -> Result<Arc<dyn NotebookFetcher>, SetupError> {
	match (config.source, config.base_url.as_deref()) {
		(NotebookSource::Remote, Some(base_url)) => Ok(Arc::new(HttpNotebookFetcher::new(
			base_url,
			config.cache_dir.clone(),
		)?)),
		_ => Ok(Arc::new(LocalNotebookFetcher::new(config.dir.clone()))),
	}
}

/// Identifiers are relative paths that must stay inside their root.
fn validate_identifier(identifier: &str) -> Result<&Path, FetchError> {
	let path = Path::new(identifier);
	let escapes = path
		.components()
		.any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

	if identifier.trim().is_empty() || escapes {
		return Err(FetchError::InvalidIdentifier(identifier.to_string()));
	}
	Ok(path)
}

/// Notebooks already present under a local directory.
pub struct LocalNotebookFetcher {
	root: PathBuf,
}

impl LocalNotebookFetcher {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	async fn existing_file(&self, identifier: &str) -> Result<PathBuf, FetchError> {
		let path = self.root.join(validate_identifier(identifier)?);
		match tokio::fs::metadata(&path).await {
			Ok(meta) if meta.is_file() => Ok(path),
			Ok(_) => Err(FetchError::NotFound(path)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound(path)),
			Err(source) => Err(FetchError::Io { path, source }),
		}
	}
}

#[async_trait]
impl NotebookFetcher for LocalNotebookFetcher {
	#[instrument(skip(self, depends_on), fields(root = %self.root.display()))]
	async fn fetch(
		&self,
		job_name: &str,
		notebook: &str,
		depends_on: &[String],
	) -> Result<PathBuf, FetchError> {
		for dependency in depends_on {
			self.existing_file(dependency).await?;
		}
		let path = self.existing_file(notebook).await?;
		debug!(path = %path.display(), "notebook found");
		Ok(path)
	}
}

/// Downloads notebooks from `{base_url}/{identifier}` into a per-job cache
/// directory, dependencies first, so relative references between them keep
/// working.
pub struct HttpNotebookFetcher {
	client: reqwest::Client,
	base_url: String,
	cache_dir: PathBuf,
}

impl HttpNotebookFetcher {
	pub fn new(
		base_url: impl Into<String>,
		cache_dir: impl Into<PathBuf>,
	) -> Result<Self, reqwest::Error> {
		let client = reqwest::Client::builder()
			.user_agent(concat!("nbcron/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self {
			client,
			base_url: base_url.into(),
			cache_dir: cache_dir.into(),
		})
	}

	fn url_for(&self, identifier: &str) -> String {
		notebook_url(&self.base_url, identifier)
	}

	async fn download(&self, job_dir: &Path, identifier: &str) -> Result<PathBuf, FetchError> {
		let relative = validate_identifier(identifier)?;
		let url = self.url_for(identifier);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|source| FetchError::Http {
				url: url.clone(),
				source,
			})?;

		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status {
				url,
				status: status.as_u16(),
			});
		}

		let bytes = response.bytes().await.map_err(|source| FetchError::Http {
			url: url.clone(),
			source,
		})?;

		let target = job_dir.join(relative);
		if let Some(parent) = target.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|source| FetchError::Io {
					path: parent.to_path_buf(),
					source,
				})?;
		}
		tokio::fs::write(&target, &bytes)
			.await
			.map_err(|source| FetchError::Io {
				path: target.clone(),
				source,
			})?;

		debug!(%url, path = %target.display(), bytes = bytes.len(), "notebook downloaded");
		Ok(target)
	}
}

#[async_trait]
impl NotebookFetcher for HttpNotebookFetcher {
	#[instrument(skip(self, depends_on), fields(base_url = %self.base_url))]
	async fn fetch(
		&self,
		job_name: &str,
		notebook: &str,
		depends_on: &[String],
	) -> Result<PathBuf, FetchError> {
		let job_dir = self.cache_dir.join(job_name);

		for dependency in depends_on {
			self.download(&job_dir, dependency).await?;
		}
		let path = self.download(&job_dir, notebook).await?;

		info!(
			dependencies = depends_on.len(),
			path = %path.display(),
			"remote notebook fetched"
		);
		Ok(path)
	}
}

pub(crate) fn notebook_url(base_url: &str, identifier: &str) -> String {
	format!(
		"{}/{}",
		base_url.trim_end_matches('/'),
		identifier.trim_start_matches("./")
	)
}
