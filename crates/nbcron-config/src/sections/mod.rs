// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each section has a `*ConfigLayer` (all fields
//! optional, mergeable) and a resolved `*Config`.

mod general;
mod logging;
mod mail;
mod notebooks;
mod render;
mod smtp;

pub use general::{GeneralConfig, GeneralConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use mail::{MailConfig, MailConfigLayer, DEFAULT_ALIAS_DOMAIN};
pub use notebooks::{NotebookSource, NotebooksConfig, NotebooksConfigLayer};
pub use render::{RenderConfig, RenderConfigLayer};
pub use smtp::{SmtpConfig, SmtpConfigLayer, TlsMode};
