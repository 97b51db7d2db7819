// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mail routing settings: the global default recipient and the domain used
//! to expand per-job recipient aliases.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ALIAS_DOMAIN: &str = "data.gouv.fr";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MailConfigLayer {
	pub recipient: Option<String>,
	pub alias_domain: Option<String>,
}

impl MailConfigLayer {
	pub fn merge(&mut self, other: Self) {
		self.recipient = other.recipient.or(self.recipient.take());
		self.alias_domain = other.alias_domain.or(self.alias_domain.take());
	}

	pub fn finalize(self) -> MailConfig {
		MailConfig {
			recipient: self.recipient.filter(|r| !r.trim().is_empty()),
			alias_domain: self
				.alias_domain
				.filter(|d| !d.trim().is_empty())
				.unwrap_or_else(|| DEFAULT_ALIAS_DOMAIN.to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailConfig {
	/// Fallback recipient when a job has neither an override nor an alias.
	pub recipient: Option<String>,
	pub alias_domain: String,
}

impl Default for MailConfig {
	fn default() -> Self {
		MailConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = MailConfig::default();
		assert!(config.recipient.is_none());
		assert_eq!(config.alias_domain, "data.gouv.fr");
	}

	#[test]
	fn test_blank_recipient_is_unset() {
		let config = MailConfigLayer {
			recipient: Some("   ".to_string()),
			alias_domain: None,
		}
		.finalize();
		assert!(config.recipient.is_none());
	}

	#[test]
	fn test_merge_prefers_other() {
		let mut base = MailConfigLayer {
			recipient: Some("base@example.com".to_string()),
			alias_domain: Some("example.com".to_string()),
		};
		base.merge(MailConfigLayer {
			recipient: Some("env@example.com".to_string()),
			alias_domain: None,
		});
		let config = base.finalize();
		assert_eq!(config.recipient.as_deref(), Some("env@example.com"));
		assert_eq!(config.alias_domain, "example.com");
	}
}
