// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-job artifact retention.
//!
//! Files are grouped by stem (the name without its last extension), so a
//! run's `.ipynb`, `.html` and `.pdf` are kept or removed together.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::artifact::job_dir;

pub struct RetentionManager {
	output_folder: PathBuf,
}

impl RetentionManager {
	pub fn new(output_folder: impl Into<PathBuf>) -> Self {
		Self {
			output_folder: output_folder.into(),
		}
	}

	/// Keep the `keep` most recent runs of `job_name` and delete the rest.
	/// Returns the number of files deleted. `keep == 0` disables retention.
	#[instrument(skip(self), fields(job = %job_name))]
	pub async fn truncate(&self, job_name: &str, keep: u32) -> usize {
		if keep == 0 {
			return 0;
		}
		if !is_plain_name(job_name) {
			warn!("job name is not a plain directory name, refusing to truncate");
			return 0;
		}

		let dir = job_dir(&self.output_folder, job_name);
		let files = match list_files(&dir).await {
			Ok(files) => files,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(dir = %dir.display(), "no output directory, nothing to truncate");
				return 0;
			}
			Err(e) => {
				warn!(dir = %dir.display(), error = %e, "cannot list output directory");
				return 0;
			}
		};

		let retained = retained_stems(files.iter().map(|(_, stem)| stem.as_str()), keep as usize);

		let mut removed = 0;
		for (path, stem) in &files {
			if retained.contains(stem.as_str()) {
				continue;
			}
			match tokio::fs::remove_file(path).await {
				Ok(()) => {
					debug!(path = %path.display(), "removed");
					removed += 1;
				}
				Err(e) => warn!(path = %path.display(), error = %e, "failed to remove old artifact"),
			}
		}

		if removed > 0 {
			info!(removed, kept = retained.len(), "truncated job output");
		}
		removed
	}
}

/// The `keep` greatest distinct stems.
pub fn retained_stems<'a>(
	stems: impl IntoIterator<Item = &'a str>,
	keep: usize,
) -> BTreeSet<&'a str> {
	let all: BTreeSet<&str> = stems.into_iter().collect();
	all.into_iter().rev().take(keep).collect()
}

/// A single normal path component, so `job_dir` stays inside the output folder.
fn is_plain_name(job_name: &str) -> bool {
	let mut components = Path::new(job_name).components();
	matches!(
		(components.next(), components.next()),
		(Some(Component::Normal(_)), None)
	)
}

/// Regular files of `dir` paired with their stems.
async fn list_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, String)>> {
	let mut entries = tokio::fs::read_dir(dir).await?;
	let mut files = Vec::new();

	while let Some(entry) = entries.next_entry().await? {
		if !entry.file_type().await?.is_file() {
			continue;
		}
		let path = entry.path();
		if let Some(stem) = path.file_stem() {
			let stem = stem.to_string_lossy().into_owned();
			files.push((path, stem));
		}
	}
	Ok(files)
}
