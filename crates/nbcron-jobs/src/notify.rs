// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mailing run results.

use std::sync::Arc;

use async_trait::async_trait;
use nbcron_config::SmtpConfig;
use nbcron_smtp::{MailAttachment, OutgoingMail, SmtpClient, SmtpError};
use tracing::{info, instrument, warn};

use crate::artifact::RunArtifact;
use crate::error::NotifyError;

const BODY_TEXT: &str = "Notebook output is attached.";
const BODY_HTML: &str = "<p>Notebook output is attached.</p>";

#[derive(Debug, Clone)]
pub struct Notification {
	pub job_name: String,
	pub artifact: RunArtifact,
	pub include_pdf: bool,
	pub recipient: Option<String>,
	pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyStatus {
	Sent,
	/// Nothing to send to, or no way to send it.
	Skipped(String),
	/// Successful run of an `only_errors` job.
	Suppressed,
	Failed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
	async fn notify(&self, notification: Notification) -> Result<NotifyStatus, NotifyError>;
}

/// Delivery of a fully built message.
#[async_trait]
pub trait MailTransport: Send + Sync {
	async fn send(&self, mail: OutgoingMail) -> Result<(), SmtpError>;
}

#[async_trait]
impl MailTransport for SmtpClient {
	async fn send(&self, mail: OutgoingMail) -> Result<(), SmtpError> {
		SmtpClient::send(self, mail).await
	}
}

pub fn subject_for(job_name: &str, is_error: bool) -> String {
	let status = if is_error { "ERROR" } else { "SUCCESS" };
	format!("{status} for notebook {job_name}")
}

/// Sends the rendered HTML (and PDF when asked for) to the job's recipient.
pub struct MailNotifier {
	transport: Option<Arc<dyn MailTransport>>,
}

impl MailNotifier {
	pub fn new(transport: Arc<dyn MailTransport>) -> Self {
		Self {
			transport: Some(transport),
		}
	}

	/// A notifier that skips every notification.
	pub fn disabled() -> Self {
		Self { transport: None }
	}

	pub fn from_config(smtp: Option<SmtpConfig>) -> Result<Self, SmtpError> {
		match smtp {
			Some(config) => Ok(Self::new(Arc::new(SmtpClient::new(config)?))),
			None => Ok(Self::disabled()),
		}
	}

	async fn attachments(notification: &Notification) -> Result<Vec<MailAttachment>, SmtpError> {
		let artifact = &notification.artifact;
		let mut paths = vec![artifact.html_path()];
		if notification.include_pdf {
			paths.push(artifact.pdf_path());
		}

		let mut attachments = Vec::new();
		for path in paths {
			if tokio::fs::try_exists(&path).await.unwrap_or(false) {
				attachments.push(MailAttachment::from_path(&path).await?);
			} else {
				warn!(path = %path.display(), "artifact missing, not attached");
			}
		}
		Ok(attachments)
	}
}

#[async_trait]
impl Notifier for MailNotifier {
	#[instrument(skip(self, notification), fields(job = %notification.job_name, is_error = notification.is_error))]
	async fn notify(&self, notification: Notification) -> Result<NotifyStatus, NotifyError> {
		let recipient = match notification.recipient.as_deref().map(str::trim) {
			Some(r) if !r.is_empty() => r.to_string(),
			_ => {
				info!("no recipient, not sending email");
				return Ok(NotifyStatus::Skipped("no recipient".to_string()));
			}
		};

		let Some(transport) = &self.transport else {
			info!("SMTP not configured, not sending email");
			return Ok(NotifyStatus::Skipped("smtp not configured".to_string()));
		};

		let mail = OutgoingMail {
			to: recipient,
			subject: subject_for(&notification.job_name, notification.is_error),
			body_html: BODY_HTML.to_string(),
			body_text: BODY_TEXT.to_string(),
			attachments: Self::attachments(&notification).await?,
		};

		transport.send(mail).await?;
		Ok(NotifyStatus::Sent)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use std::path::Path;
	use std::sync::Mutex;

	#[derive(Default)]
	struct RecordingTransport {
		sent: Mutex<Vec<OutgoingMail>>,
	}

	#[async_trait]
	impl MailTransport for RecordingTransport {
		async fn send(&self, mail: OutgoingMail) -> Result<(), SmtpError> {
			self.sent.lock().unwrap().push(mail);
			Ok(())
		}
	}

	struct RefusingTransport;

	#[async_trait]
	impl MailTransport for RefusingTransport {
		async fn send(&self, _: OutgoingMail) -> Result<(), SmtpError> {
			Err(SmtpError::Send("550 relay denied".to_string()))
		}
	}

	fn artifact(output: &Path, files: &[&str]) -> RunArtifact {
		let at = NaiveDate::from_ymd_opt(2025, 1, 1)
			.unwrap()
			.and_hms_opt(6, 0, 0)
			.unwrap();
		let artifact = RunArtifact::new(output, "daily", at);
		std::fs::create_dir_all(&artifact.dir).unwrap();
		for ext in files {
			std::fs::write(artifact.dir.join(format!("{}.{ext}", artifact.stem)), "x").unwrap();
		}
		artifact
	}

	fn notification(artifact: RunArtifact, include_pdf: bool, is_error: bool) -> Notification {
		Notification {
			job_name: "daily".to_string(),
			artifact,
			include_pdf,
			recipient: Some("team@data.gouv.fr".to_string()),
			is_error,
		}
	}

	fn attachment_names(mail: &OutgoingMail) -> Vec<&str> {
		mail.attachments.iter().map(|a| a.filename.as_str()).collect()
	}

	#[test]
	fn subjects() {
		assert_eq!(subject_for("daily", true), "ERROR for notebook daily");
		assert_eq!(subject_for("daily", false), "SUCCESS for notebook daily");
	}

	#[tokio::test]
	async fn sends_html_and_requested_pdf() {
		let dir = tempfile::tempdir().unwrap();
		let transport = Arc::new(RecordingTransport::default());
		let notifier = MailNotifier::new(transport.clone());

		let status = notifier
			.notify(notification(artifact(dir.path(), &["html", "pdf"]), true, false))
			.await
			.unwrap();

		assert_eq!(status, NotifyStatus::Sent);
		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].to, "team@data.gouv.fr");
		assert_eq!(sent[0].subject, "SUCCESS for notebook daily");
		assert_eq!(sent[0].body_text, "Notebook output is attached.");
		assert_eq!(
			attachment_names(&sent[0]),
			vec!["daily_20250101-060000.html", "daily_20250101-060000.pdf"]
		);
	}

	#[tokio::test]
	async fn pdf_not_attached_unless_requested() {
		let dir = tempfile::tempdir().unwrap();
		let transport = Arc::new(RecordingTransport::default());
		let notifier = MailNotifier::new(transport.clone());

		notifier
			.notify(notification(artifact(dir.path(), &["html", "pdf"]), false, false))
			.await
			.unwrap();

		let sent = transport.sent.lock().unwrap();
		assert_eq!(attachment_names(&sent[0]), vec!["daily_20250101-060000.html"]);
	}

	#[tokio::test]
	async fn missing_html_still_sends() {
		let dir = tempfile::tempdir().unwrap();
		let transport = Arc::new(RecordingTransport::default());
		let notifier = MailNotifier::new(transport.clone());

		let status = notifier
			.notify(notification(artifact(dir.path(), &[]), true, true))
			.await
			.unwrap();

		assert_eq!(status, NotifyStatus::Sent);
		let sent = transport.sent.lock().unwrap();
		assert_eq!(sent[0].subject, "ERROR for notebook daily");
		assert!(sent[0].attachments.is_empty());
	}

	#[tokio::test]
	async fn empty_recipient_is_skipped() {
		let dir = tempfile::tempdir().unwrap();
		let transport = Arc::new(RecordingTransport::default());
		let notifier = MailNotifier::new(transport.clone());

		for recipient in [None, Some(String::new()), Some("  ".to_string())] {
			let mut n = notification(artifact(dir.path(), &["html"]), false, true);
			n.recipient = recipient;
			let status = notifier.notify(n).await.unwrap();
			assert!(matches!(status, NotifyStatus::Skipped(_)));
		}
		assert!(transport.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn disabled_notifier_skips() {
		let dir = tempfile::tempdir().unwrap();
		let status = MailNotifier::disabled()
			.notify(notification(artifact(dir.path(), &["html"]), false, false))
			.await
			.unwrap();
		assert_eq!(status, NotifyStatus::Skipped("smtp not configured".to_string()));
	}

	#[tokio::test]
	async fn transport_failure_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = MailNotifier::new(Arc::new(RefusingTransport))
			.notify(notification(artifact(dir.path(), &["html"]), false, true))
			.await
			.unwrap_err();
		assert!(matches!(err, NotifyError::Transport(SmtpError::Send(_))));
	}

	#[test]
	fn no_smtp_config_means_disabled() {
		let notifier = MailNotifier::from_config(None).unwrap();
		assert!(notifier.transport.is_none());
	}
}
