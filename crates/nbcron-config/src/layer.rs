// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	GeneralConfigLayer, LoggingConfigLayer, MailConfigLayer, NotebooksConfigLayer,
	RenderConfigLayer, SmtpConfigLayer,
};

/// Settings layer - every section is optional so layers can be stacked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	#[serde(default)]
	pub general: Option<GeneralConfigLayer>,
	#[serde(default)]
	pub mail: Option<MailConfigLayer>,
	#[serde(default)]
	pub smtp: Option<SmtpConfigLayer>,
	#[serde(default)]
	pub notebooks: Option<NotebooksConfigLayer>,
	#[serde(default)]
	pub render: Option<RenderConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.general, other.general, GeneralConfigLayer::merge);
		merge_option(&mut self.mail, other.mail, MailConfigLayer::merge);
		merge_option(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
		merge_option(
			&mut self.notebooks,
			other.notebooks,
			NotebooksConfigLayer::merge,
		);
		merge_option(&mut self.render, other.render, RenderConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ConfigLayer::default();
		base.merge(ConfigLayer::default());
		assert!(base.general.is_none());
		assert!(base.smtp.is_none());
	}

	#[test]
	fn test_merge_other_overwrites_field_by_field() {
		let mut base = ConfigLayer {
			general: Some(GeneralConfigLayer {
				output_folder: Some(PathBuf::from("/srv/file")),
				jobs_file: Some(PathBuf::from("/etc/nbcron/jobs.toml")),
			}),
			..Default::default()
		};
		let env = ConfigLayer {
			general: Some(GeneralConfigLayer {
				output_folder: Some(PathBuf::from("/srv/env")),
				jobs_file: None,
			}),
			..Default::default()
		};
		base.merge(env);

		let general = base.general.unwrap();
		assert_eq!(general.output_folder, Some(PathBuf::from("/srv/env")));
		assert_eq!(general.jobs_file, Some(PathBuf::from("/etc/nbcron/jobs.toml")));
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = ConfigLayer::default();
		base.merge(ConfigLayer {
			mail: Some(MailConfigLayer {
				recipient: Some("ops@example.com".to_string()),
				alias_domain: None,
			}),
			..Default::default()
		});
		assert_eq!(
			base.mail.unwrap().recipient.as_deref(),
			Some("ops@example.com")
		);
	}

	#[test]
	fn test_rejects_unknown_section() {
		let result: Result<ConfigLayer, _> = toml::from_str("[unknown]\nkey = 1\n");
		assert!(result.is_err());
	}
}
