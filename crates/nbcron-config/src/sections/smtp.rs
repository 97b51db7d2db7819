// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP configuration section for run notifications.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secret::SecretString;

/// TLS mode for SMTP connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
	/// No TLS (plain text connection).
	None,
	/// STARTTLS upgrade after connecting.
	StartTls,
	/// Direct TLS connection.
	#[default]
	Tls,
}

impl TlsMode {
	pub fn from_str_value(value: &str) -> Result<Self, ConfigError> {
		match value.to_lowercase().as_str() {
			"true" | "tls" | "ssl" => Ok(TlsMode::Tls),
			"starttls" => Ok(TlsMode::StartTls),
			"false" | "none" => Ok(TlsMode::None),
			_ => Err(ConfigError::InvalidValue {
				key: "smtp.tls_mode".to_string(),
				message: format!("Invalid value: '{value}'. Expected: tls, starttls, none"),
			}),
		}
	}

	/// Conventional port for the mode.
	pub fn default_port(self) -> u16 {
		match self {
			TlsMode::Tls => 465,
			TlsMode::StartTls => 587,
			TlsMode::None => 25,
		}
	}
}

/// Configuration layer for SMTP settings (all fields optional for layering).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	#[serde(skip_serializing)]
	pub password: Option<SecretString>,
	pub from_address: Option<String>,
	pub from_name: Option<String>,
	pub tls_mode: Option<TlsMode>,
}

impl SmtpConfigLayer {
	/// Merge with another layer, preferring values from `other`.
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		self.host = other.host.or(self.host.take());
		self.port = other.port.or(self.port.take());
		self.username = other.username.or(self.username.take());
		self.password = other.password.or(self.password.take());
		self.from_address = other.from_address.or(self.from_address.take());
		self.from_name = other.from_name.or(self.from_name.take());
		self.tls_mode = other.tls_mode.or(self.tls_mode.take());
	}

	/// Build the final config. `Ok(None)` means mail delivery is switched off.
	pub fn build(self) -> Result<Option<SmtpConfig>, ConfigError> {
		let Some(host) = self.host.filter(|h| !h.is_empty()) else {
			return Ok(None);
		};

		let from_address = self
			.from_address
			.filter(|a| !a.is_empty())
			.ok_or_else(|| {
				ConfigError::Validation(
					"smtp.from_address is required when smtp.host is configured".to_string(),
				)
			})?;

		let tls_mode = self.tls_mode.unwrap_or_default();

		Ok(Some(SmtpConfig {
			host,
			port: self.port.unwrap_or_else(|| tls_mode.default_port()),
			username: self.username,
			password: self.password,
			from_address,
			from_name: self.from_name.unwrap_or_else(|| "nbcron".to_string()),
			tls_mode,
		}))
	}
}

/// Validated SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	pub tls_mode: TlsMode,
}

impl SmtpConfig {
	pub fn has_auth(&self) -> bool {
		self.username.is_some() && self.password.is_some()
	}
}
