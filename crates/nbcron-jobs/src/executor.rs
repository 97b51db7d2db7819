// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runs one notebook and produces its artifact.
//!
//! [`Executor::execute`] never fails: whatever goes wrong in the renderer or
//! the PDF converter ends up in [`RunOutcome::result`], so the caller can
//! always notify and apply retention.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument};

use crate::artifact::{Clock, RunArtifact, SystemClock};
use crate::render::{PdfConverter, RenderContext, RenderRequest, Renderer};

#[derive(Debug, Clone)]
pub struct ExecuteRequest {
	pub job_name: String,
	pub notebook_path: PathBuf,
	pub pdf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunFailure {
	#[error("render failed: {0}")]
	Render(String),

	#[error("PDF conversion failed: {0}")]
	PdfConversion(String),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
	pub artifact: RunArtifact,
	pub result: Result<(), RunFailure>,
}

impl RunOutcome {
	pub fn is_error(&self) -> bool {
		self.result.is_err()
	}

	pub fn failure(&self) -> Option<&RunFailure> {
		self.result.as_ref().err()
	}
}

pub struct Executor {
	output_folder: PathBuf,
	renderer: Arc<dyn Renderer>,
	pdf_converter: Arc<dyn PdfConverter>,
	clock: Arc<dyn Clock>,
}

impl Executor {
	pub fn new(
		output_folder: impl Into<PathBuf>,
		renderer: Arc<dyn Renderer>,
		pdf_converter: Arc<dyn PdfConverter>,
	) -> Self {
		Self {
			output_folder: output_folder.into(),
			renderer,
			pdf_converter,
			clock: Arc::new(SystemClock),
		}
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	#[instrument(skip(self, request), fields(job = %request.job_name, pdf = request.pdf))]
	pub async fn execute(&self, request: ExecuteRequest) -> RunOutcome {
		let artifact = RunArtifact::new(&self.output_folder, &request.job_name, self.clock.now());
		let result = self.produce(&request, &artifact).await;

		match &result {
			Ok(()) => info!(stem = %artifact.stem, "notebook executed"),
			Err(failure) => error!(stem = %artifact.stem, error = %failure, "notebook execution failed"),
		}

		RunOutcome { artifact, result }
	}

	async fn produce(
		&self,
		request: &ExecuteRequest,
		artifact: &RunArtifact,
	) -> Result<(), RunFailure> {
		tokio::fs::create_dir_all(&artifact.dir).await.map_err(|e| {
			RunFailure::Render(format!(
				"cannot create output directory {}: {e}",
				artifact.dir.display()
			))
		})?;

		if !tokio::fs::try_exists(&request.notebook_path)
			.await
			.unwrap_or(false)
		{
			return Err(RunFailure::Render(format!(
				"notebook {} does not exist",
				request.notebook_path.display()
			)));
		}

		let render_request = rooted_request(&request.notebook_path, artifact)
			.map_err(|e| RunFailure::Render(format!("cannot resolve paths: {e}")))?;

		match AssertUnwindSafe(self.renderer.render(&render_request))
			.catch_unwind()
			.await
		{
			Ok(Ok(())) => {}
			Ok(Err(e)) => return Err(RunFailure::Render(e.to_string())),
			Err(panic) => return Err(RunFailure::Render(panic_message(panic.as_ref()))),
		}

		if request.pdf {
			let html = artifact.html_path();
			let pdf = artifact.pdf_path();
			match AssertUnwindSafe(self.pdf_converter.convert(&html, &pdf))
				.catch_unwind()
				.await
			{
				Ok(Ok(())) => {}
				Ok(Err(e)) => return Err(RunFailure::PdfConversion(e.to_string())),
				Err(panic) => {
					return Err(RunFailure::PdfConversion(panic_message(panic.as_ref())));
				}
			}
		}

		Ok(())
	}
}

/// Renderers run inside the notebook's directory and only ever see absolute
/// paths.
fn rooted_request(
	notebook_path: &Path,
	artifact: &RunArtifact,
) -> std::io::Result<RenderRequest> {
	let notebook_path = std::path::absolute(notebook_path)?;
	Ok(RenderRequest {
		executed_path: std::path::absolute(artifact.executed_notebook_path())?,
		html_path: std::path::absolute(artifact.html_path())?,
		context: RenderContext::for_notebook(&notebook_path),
		notebook_path,
	})
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		format!("panicked: {s}")
	} else if let Some(s) = payload.downcast_ref::<String>() {
		format!("panicked: {s}")
	} else {
		"panicked".to_string()
	}
}
