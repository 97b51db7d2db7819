// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External tools used to execute notebooks and convert HTML to PDF.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RenderConfigLayer {
	pub jupyter_bin: Option<String>,
	pub kernel: Option<String>,
	pub wkhtmltopdf_bin: Option<String>,
}

impl RenderConfigLayer {
	pub fn merge(&mut self, other: Self) {
		self.jupyter_bin = other.jupyter_bin.or(self.jupyter_bin.take());
		self.kernel = other.kernel.or(self.kernel.take());
		self.wkhtmltopdf_bin = other.wkhtmltopdf_bin.or(self.wkhtmltopdf_bin.take());
	}

	pub fn finalize(self) -> RenderConfig {
		RenderConfig {
			jupyter_bin: self.jupyter_bin.unwrap_or_else(|| "jupyter".to_string()),
			kernel: self.kernel.filter(|k| !k.is_empty()),
			wkhtmltopdf_bin: self
				.wkhtmltopdf_bin
				.unwrap_or_else(|| "wkhtmltopdf".to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
	pub jupyter_bin: String,
	/// Kernel name passed to nbconvert; the notebook's own kernel when unset.
	pub kernel: Option<String>,
	pub wkhtmltopdf_bin: String,
}

impl Default for RenderConfig {
	fn default() -> Self {
		RenderConfigLayer::default().finalize()
	}
}
