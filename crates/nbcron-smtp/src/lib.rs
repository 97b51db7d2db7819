// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP client for nbcron run reports.
//!
//! Sends a multipart message (HTML + plain text) with file attachments, which
//! is how rendered notebooks reach their recipients. Credentials come from
//! [`nbcron_config::SmtpConfig`] and stay wrapped in a [`Secret`] until the
//! transport is built.
//!
//! [`Secret`]: nbcron_config::Secret
//!
//! # Example
//!
//! ```no_run
//! use nbcron_smtp::{MailAttachment, OutgoingMail, SmtpClient};
//!
//! # async fn example(config: nbcron_config::SmtpConfig) -> Result<(), nbcron_smtp::SmtpError> {
//! let client = SmtpClient::new(config)?;
//! let mail = OutgoingMail {
//!     to: "team@example.com".to_string(),
//!     subject: "SUCCESS for notebook daily".to_string(),
//!     body_html: "<p>Notebook output is attached.</p>".to_string(),
//!     body_text: "Notebook output is attached.".to_string(),
//!     attachments: vec![MailAttachment::from_path("output/daily/daily_20250101-060000.html").await?],
//! };
//! client.send(mail).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use lettre::{
	message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use nbcron_config::{SmtpConfig, TlsMode};

/// Errors that can occur during SMTP operations.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	/// Failed to connect to the SMTP server.
	#[error("connection failed: {0}")]
	Connection(String),

	/// Failed to build or send an email message.
	#[error("send failed: {0}")]
	Send(String),

	/// Invalid email address format.
	#[error("invalid email address: {0}")]
	Address(String),

	/// An attachment could not be read from disk.
	#[error("failed to read attachment {path}: {source}")]
	Attachment {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
	pub filename: String,
	pub content_type: &'static str,
	pub data: Vec<u8>,
}

impl MailAttachment {
	/// Read a file from disk; the MIME type is derived from its extension.
	pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SmtpError> {
		let path = path.as_ref();
		let data = tokio::fs::read(path)
			.await
			.map_err(|source| SmtpError::Attachment {
				path: path.to_path_buf(),
				source,
			})?;

		let filename = path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| "attachment".to_string());

		Ok(Self {
			filename,
			content_type: content_type_for(path),
			data,
		})
	}
}

/// MIME type for the artifact kinds nbcron produces.
pub fn content_type_for(path: &Path) -> &'static str {
	match path
		.extension()
		.and_then(|e| e.to_str())
		.map(|e| e.to_ascii_lowercase())
		.as_deref()
	{
		Some("html") | Some("htm") => "text/html",
		Some("pdf") => "application/pdf",
		Some("ipynb") | Some("json") => "application/json",
		_ => "application/octet-stream",
	}
}

/// A fully described message, independent of the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
	pub to: String,
	pub subject: String,
	pub body_html: String,
	pub body_text: String,
	pub attachments: Vec<MailAttachment>,
}

/// Async SMTP client. The connection is opened lazily on send.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
}

impl SmtpClient {
	/// Validate the sender address and build the transport.
	#[tracing::instrument(
		name = "smtp_client_new",
		skip(config),
		fields(host = %config.host, port = %config.port, tls_mode = ?config.tls_mode)
	)]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
			.parse()
			.map_err(|e| SmtpError::Address(format!("{e}")))?;

		let builder = match config.tls_mode {
			TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?,
			TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?,
			TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (config.username, config.password) {
			builder = builder.credentials(Credentials::new(username, password.into_inner()));
		}

		tracing::debug!("SMTP client initialized");

		Ok(Self {
			transport: builder.build(),
			from_mailbox,
		})
	}

	#[tracing::instrument(
		name = "smtp_send",
		skip(self, mail),
		fields(to = %mail.to, subject = %mail.subject, attachments = mail.attachments.len())
	)]
	pub async fn send(&self, mail: OutgoingMail) -> Result<(), SmtpError> {
		let message = build_message(&self.from_mailbox, mail)?;

		self
			.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("email sent");
		Ok(())
	}
}

/// Assemble a `multipart/mixed` message: the text/HTML alternative first,
/// then one part per attachment.
pub fn build_message(from: &Mailbox, mail: OutgoingMail) -> Result<Message, SmtpError> {
	let to_mailbox: Mailbox = mail
		.to
		.parse()
		.map_err(|e| SmtpError::Address(format!("{e}")))?;

	let alternative = MultiPart::alternative()
		.singlepart(
			SinglePart::builder()
				.header(ContentType::TEXT_PLAIN)
				.body(mail.body_text),
		)
		.singlepart(
			SinglePart::builder()
				.header(ContentType::TEXT_HTML)
				.body(mail.body_html),
		);

	let mut body = MultiPart::mixed().multipart(alternative);
	for attachment in mail.attachments {
		let content_type = ContentType::parse(attachment.content_type)
			.map_err(|e| SmtpError::Send(format!("invalid content type: {e}")))?;
		body = body.singlepart(Attachment::new(attachment.filename).body(attachment.data, content_type));
	}

	Message::builder()
		.from(from.clone())
		.to(to_mailbox)
		.subject(mail.subject)
		.multipart(body)
		.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))
}

/// Check an address with lettre's [`Mailbox`] parser.
pub fn is_valid_email(email: &str) -> bool {
	email.parse::<Mailbox>().is_ok()
}
