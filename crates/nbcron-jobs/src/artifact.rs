// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

/// Zero-padded so that lexical order of stems is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Source of the timestamp embedded in artifact stems.
pub trait Clock: Send + Sync {
	fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> NaiveDateTime {
		Local::now().naive_local()
	}
}

impl<F> Clock for F
where
	F: Fn() -> NaiveDateTime + Send + Sync,
{
	fn now(&self) -> NaiveDateTime {
		self()
	}
}

/// `{output_folder}/{job_name}`
pub fn job_dir(output_folder: &Path, job_name: &str) -> PathBuf {
	output_folder.join(job_name)
}

/// The files of one execution, all named `{stem}.{ext}` in `dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifact {
	pub job_name: String,
	pub stem: String,
	pub dir: PathBuf,
}

impl RunArtifact {
	pub fn new(output_folder: &Path, job_name: &str, at: NaiveDateTime) -> Self {
		Self {
			job_name: job_name.to_string(),
			stem: format!("{job_name}_{}", at.format(TIMESTAMP_FORMAT)),
			dir: job_dir(output_folder, job_name),
		}
	}

	fn file(&self, extension: &str) -> PathBuf {
		self.dir.join(format!("{}.{extension}", self.stem))
	}

	pub fn executed_notebook_path(&self) -> PathBuf {
		self.file("ipynb")
	}

	pub fn html_path(&self) -> PathBuf {
		self.file("html")
	}

	pub fn pdf_path(&self) -> PathBuf {
		self.file("pdf")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(2025, 3, 7)
			.unwrap()
			.and_hms_opt(h, m, s)
			.unwrap()
	}

	#[test]
	fn stem_embeds_job_and_timestamp() {
		let artifact = RunArtifact::new(Path::new("/srv/output"), "daily", at(6, 5, 9));
		assert_eq!(artifact.stem, "daily_20250307-060509");
		assert_eq!(artifact.dir, PathBuf::from("/srv/output/daily"));
	}

	#[test]
	fn paths_share_the_stem() {
		let artifact = RunArtifact::new(Path::new("out"), "weekly", at(23, 59, 0));
		assert_eq!(
			artifact.html_path(),
			PathBuf::from("out/weekly/weekly_20250307-235900.html")
		);
		assert_eq!(
			artifact.pdf_path(),
			PathBuf::from("out/weekly/weekly_20250307-235900.pdf")
		);
		assert_eq!(
			artifact.executed_notebook_path(),
			PathBuf::from("out/weekly/weekly_20250307-235900.ipynb")
		);
	}

	#[test]
	fn later_runs_sort_after_earlier_ones() {
		let earlier = RunArtifact::new(Path::new("out"), "daily", at(9, 59, 59));
		let later = RunArtifact::new(Path::new("out"), "daily", at(10, 0, 0));
		assert!(earlier.stem < later.stem);
	}

	#[test]
	fn closures_are_clocks() {
		let fixed = || at(1, 2, 3);
		assert_eq!(Clock::now(&fixed), at(1, 2, 3));
	}
}
