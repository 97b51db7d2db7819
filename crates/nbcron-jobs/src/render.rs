// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notebook execution and document conversion.
//!
//! The executor only sees the [`Renderer`] and [`PdfConverter`] traits; the
//! concrete implementations shell out to `jupyter nbconvert` and
//! `wkhtmltopdf`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use nbcron_config::RenderConfig;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::RenderError;

/// Environment variable through which notebooks learn their own directory.
pub const WORKING_DIR_VAR: &str = "WORKING_DIR";

/// Per-run execution context handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
	pub working_dir: PathBuf,
}

impl RenderContext {
	/// The notebook's parent directory, `.` for a bare file name.
	pub fn for_notebook(notebook_path: &Path) -> Self {
		let working_dir = match notebook_path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => PathBuf::from("."),
		};
		Self { working_dir }
	}
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
	pub notebook_path: PathBuf,
	/// Where the executed copy of the notebook goes.
	pub executed_path: PathBuf,
	pub html_path: PathBuf,
	pub context: RenderContext,
}

/// Executes a notebook and renders it to HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
	async fn render(&self, request: &RenderRequest) -> Result<(), RenderError>;
}

#[async_trait]
pub trait PdfConverter: Send + Sync {
	async fn convert(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError>;
}

/// `jupyter nbconvert`, once to execute and once to export HTML.
#[derive(Debug, Clone)]
pub struct NbconvertRenderer {
	jupyter_bin: String,
	kernel: Option<String>,
}

impl NbconvertRenderer {
	pub fn new(jupyter_bin: impl Into<String>, kernel: Option<String>) -> Self {
		Self {
			jupyter_bin: jupyter_bin.into(),
			kernel,
		}
	}

	pub fn from_config(config: &RenderConfig) -> Self {
		Self::new(config.jupyter_bin.clone(), config.kernel.clone())
	}

	fn execute_args(&self, request: &RenderRequest) -> Vec<String> {
		let mut args = nbconvert_args("notebook", &request.notebook_path, &request.executed_path);
		args.insert(3, "--execute".to_string());
		if let Some(kernel) = &self.kernel {
			args.push(format!("--ExecutePreprocessor.kernel_name={kernel}"));
		}
		args
	}

	fn html_args(&self, request: &RenderRequest) -> Vec<String> {
		nbconvert_args("html", &request.executed_path, &request.html_path)
	}
}

/// `nbconvert --to <format> <input> --output <stem> --output-dir <dir>`
fn nbconvert_args(format: &str, input: &Path, output: &Path) -> Vec<String> {
	let stem = output
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_default();
	let dir = output
		.parent()
		.map(|p| p.to_string_lossy().into_owned())
		.unwrap_or_else(|| ".".to_string());

	vec![
		"nbconvert".to_string(),
		"--to".to_string(),
		format.to_string(),
		input.to_string_lossy().into_owned(),
		"--output".to_string(),
		stem,
		"--output-dir".to_string(),
		dir,
	]
}

#[async_trait]
impl Renderer for NbconvertRenderer {
	#[instrument(skip(self, request), fields(notebook = %request.notebook_path.display()))]
	async fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
		let working_dir = &request.context.working_dir;

		let mut execute = Command::new(&self.jupyter_bin);
		execute
			.args(self.execute_args(request))
			.current_dir(working_dir)
			.env(WORKING_DIR_VAR, working_dir);
		run(&self.jupyter_bin, execute).await?;
		ensure_exists(&request.executed_path).await?;

		let mut html = Command::new(&self.jupyter_bin);
		html.args(self.html_args(request)).current_dir(working_dir);
		run(&self.jupyter_bin, html).await?;
		ensure_exists(&request.html_path).await
	}
}

/// `wkhtmltopdf --quiet <html> <pdf>`
#[derive(Debug, Clone)]
pub struct WkhtmltopdfConverter {
	bin: String,
}

impl WkhtmltopdfConverter {
	pub fn new(bin: impl Into<String>) -> Self {
		Self { bin: bin.into() }
	}

	pub fn from_config(config: &RenderConfig) -> Self {
		Self::new(config.wkhtmltopdf_bin.clone())
	}
}

#[async_trait]
impl PdfConverter for WkhtmltopdfConverter {
	#[instrument(skip(self), fields(html = %html_path.display()))]
	async fn convert(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
		let mut command = Command::new(&self.bin);
		command.arg("--quiet").arg(html_path).arg(pdf_path);
		run(&self.bin, command).await?;
		ensure_exists(pdf_path).await
	}
}

async fn run(program: &str, mut command: Command) -> Result<(), RenderError> {
	debug!(program, "spawning");
	let output = command
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::piped())
		.output()
		.await
		.map_err(|source| RenderError::Spawn {
			program: program.to_string(),
			source,
		})?;

	if output.status.success() {
		return Ok(());
	}

	Err(RenderError::Failed {
		program: program.to_string(),
		status: output.status.to_string(),
		stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
	})
}

async fn ensure_exists(path: &Path) -> Result<(), RenderError> {
	match tokio::fs::metadata(path).await {
		Ok(_) => Ok(()),
		Err(_) => Err(RenderError::MissingOutput(path.to_path_buf())),
	}
}
