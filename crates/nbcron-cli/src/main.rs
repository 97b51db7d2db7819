// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! nbcron - run notebooks as scheduled jobs
//!
//! An external scheduler calls `nbcron run <job>`; the job's notebook is
//! executed, rendered, mailed and its old output pruned.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nbcron_config::{LogFormat, LoggingConfig, NbcronConfig};
use nbcron_jobs::{EffectiveJobConfig, JobDefinition, JobReport, JobRunner, JobStore, ResolvedJob};
use nbcron_smtp::is_valid_email;

#[derive(Parser, Debug)]
#[command(name = "nbcron", version, about, long_about = None)]
struct Args {
	/// Settings file (defaults to /etc/nbcron/config.toml)
	#[arg(long, global = true, env = "NBCRON_CONFIG")]
	config: Option<PathBuf>,

	/// Jobs file, overriding `general.jobs_file`
	#[arg(long, global = true, env = "NBCRON_JOBS_FILE")]
	jobs: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run a job now
	Run { job: String },

	/// List configured jobs
	List,

	/// Resolve a job without running it
	Show { job: String },

	/// Delete old output of a job
	Truncate {
		job: String,

		/// Runs to keep (defaults to the job's `truncate`)
		#[arg(long)]
		keep: Option<u32>,
	},

	/// Run a notebook file outside of any job definition
	Execute { notebook: PathBuf },
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&logging.level))
		.unwrap_or_else(|_| EnvFilter::new("info"));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

fn load_settings(args: &Args) -> Result<NbcronConfig> {
	let mut config = match &args.config {
		Some(path) => nbcron_config::load_config_with_file(path)
			.with_context(|| format!("failed to load configuration from {}", path.display()))?,
		None => nbcron_config::load_config().context("failed to load configuration")?,
	};
	if let Some(jobs) = &args.jobs {
		config.general.jobs_file = jobs.clone();
	}
	Ok(config)
}

fn load_jobs(config: &NbcronConfig) -> Result<JobStore> {
	JobStore::load(&config.general.jobs_file).context("failed to load jobs")
}

fn build_runner(config: &NbcronConfig, store: JobStore) -> Result<JobRunner> {
	JobRunner::from_config(config, store).context("failed to set up job runner")
}

fn describe_job(name: &str, job: &JobDefinition) -> String {
	let mut flags = Vec::new();
	if job.pdf {
		flags.push("pdf".to_string());
	}
	if job.only_errors {
		flags.push("only-errors".to_string());
	}
	if job.truncate > 0 {
		flags.push(format!("keep={}", job.truncate));
	}

	format!(
		"{name}\t{}\t{}\t{}",
		job.notebook,
		job.cron.as_deref().unwrap_or("-"),
		if flags.is_empty() { "-".to_string() } else { flags.join(",") }
	)
}

fn describe_recipient(mail_to: Option<&str>) -> String {
	match mail_to {
		None => "-".to_string(),
		Some(address) if is_valid_email(address) => address.to_string(),
		Some(address) => format!("{address} (not a valid address)"),
	}
}

fn describe_resolved(resolved: &ResolvedJob) -> String {
	let config = &resolved.config;
	[
		format!("job:         {}", resolved.identity.name),
		format!("notebook:    {}", resolved.identity.notebook_path.display()),
		format!("cron:        {}", resolved.cron),
		format!("mail_to:     {}", describe_recipient(config.mail_to.as_deref())),
		format!("only_errors: {}", config.only_errors),
		format!("pdf:         {}", config.pdf),
		format!("truncate:    {}", config.truncate),
	]
	.join("\n")
}

fn describe_report(report: &JobReport) -> String {
	let status = match &report.failure {
		Some(failure) => format!("ERROR ({failure})"),
		None => "SUCCESS".to_string(),
	};
	format!(
		"{}: {status}, notification {:?}, {} old file(s) removed",
		report.stem, report.notify, report.files_removed
	)
}

/// Runs to keep for `job`. The job must exist even when `keep` is given, so
/// arbitrary names never reach the output folder.
fn retention_keep(store: &JobStore, job: &str, keep: Option<u32>) -> Result<u32> {
	let definition = store.get(job).with_context(|| format!("Job \"{job}\" not found"))?;
	Ok(keep.unwrap_or(definition.truncate))
}

/// Job name for a standalone notebook: its file stem.
fn standalone_job_name(notebook: &Path) -> Result<String> {
	notebook
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.filter(|s| !s.is_empty())
		.with_context(|| format!("cannot derive a job name from {}", notebook.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_settings(&args)?;

	init_tracing(&config.logging);
	info!(command = ?args.command, "starting nbcron");

	match &args.command {
		Command::Run { job } => {
			let runner = build_runner(&config, load_jobs(&config)?)?;
			let report = runner
				.run_job(job)
				.await
				.with_context(|| format!("job {job} could not be started"))?;
			println!("{}", describe_report(&report));
		}
		Command::List => {
			for (name, job) in load_jobs(&config)?.iter() {
				println!("{}", describe_job(name, job));
			}
		}
		Command::Show { job } => {
			let runner = build_runner(&config, load_jobs(&config)?)?;
			let resolved = runner.resolver().resolve(job).await?;
			println!("{}", describe_resolved(&resolved));
		}
		Command::Truncate { job, keep } => {
			let store = load_jobs(&config)?;
			let keep = retention_keep(&store, job, *keep)?;
			let runner = build_runner(&config, store)?;
			let removed = runner.retention().truncate(job, keep).await;
			println!("{removed} file(s) removed");
		}
		Command::Execute { notebook } => {
			let job_name = standalone_job_name(notebook)?;
			let runner = build_runner(&config, JobStore::default())?;
			let effective = EffectiveJobConfig {
				mail_to: config.mail.recipient.clone(),
				..Default::default()
			};
			let report = runner.run_resolved(&job_name, notebook, &effective).await;
			println!("{}", describe_report(&report));
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use nbcron_jobs::{JobIdentity, NotifyStatus};

	mod args {
		use super::*;

		#[test]
		fn parses_run() {
			let args = Args::try_parse_from(["nbcron", "run", "daily"]).unwrap();
			assert!(matches!(args.command, Command::Run { ref job } if job == "daily"));
		}

		#[test]
		fn global_flags_after_subcommand() {
			let args = Args::try_parse_from([
				"nbcron",
				"truncate",
				"daily",
				"--keep",
				"3",
				"--jobs",
				"/srv/jobs.toml",
			])
			.unwrap();
			assert_eq!(args.jobs, Some(PathBuf::from("/srv/jobs.toml")));
			assert!(matches!(args.command, Command::Truncate { keep: Some(3), .. }));
		}

		#[test]
		fn subcommand_is_required() {
			assert!(Args::try_parse_from(["nbcron"]).is_err());
		}

		#[test]
		fn negative_keep_is_rejected() {
			assert!(Args::try_parse_from(["nbcron", "truncate", "daily", "--keep", "-1"]).is_err());
		}
	}

	#[test]
	fn jobs_flag_overrides_settings() {
		let dir = tempfile::tempdir().unwrap();
		let config_path = dir.path().join("config.toml");
		std::fs::write(&config_path, "[general]\njobs_file = \"/from/file.toml\"\n").unwrap();

		let args = Args {
			config: Some(config_path),
			jobs: Some(PathBuf::from("/from/flag.toml")),
			command: Command::List,
		};
		let config = load_settings(&args).unwrap();
		assert_eq!(config.general.jobs_file, PathBuf::from("/from/flag.toml"));
	}

	#[test]
	fn job_line_lists_flags() {
		let job = JobDefinition {
			notebook: "daily.ipynb".to_string(),
			depends_on: Vec::new(),
			cron: None,
			recipient_alias: None,
			only_errors: true,
			pdf: true,
			truncate: 5,
		};
		assert_eq!(
			describe_job("daily", &job),
			"daily\tdaily.ipynb\t-\tpdf,only-errors,keep=5"
		);
	}

	#[test]
	fn resolved_job_shows_recipient() {
		let resolved = ResolvedJob {
			identity: JobIdentity {
				name: "daily".to_string(),
				notebook_path: PathBuf::from("notebooks/daily.ipynb"),
			},
			config: EffectiveJobConfig {
				mail_to: Some("team@data.gouv.fr".to_string()),
				..Default::default()
			},
			cron: "0 6 * * *".to_string(),
		};
		let text = describe_resolved(&resolved);
		assert!(text.contains("mail_to:     team@data.gouv.fr"));
		assert!(text.contains("cron:        0 6 * * *"));
	}

	#[test]
	fn invalid_recipient_is_flagged() {
		assert_eq!(describe_recipient(None), "-");
		assert_eq!(describe_recipient(Some("team@data.gouv.fr")), "team@data.gouv.fr");
		assert_eq!(describe_recipient(Some("team@")), "team@ (not a valid address)");
	}

	mod truncate {
		use super::*;

		fn store() -> JobStore {
			JobStore::parse(
				"[daily]\nnotebook = \"daily.ipynb\"\ntruncate = 4\n",
				"jobs.toml",
			)
			.unwrap()
		}

		#[test]
		fn defaults_to_job_setting() {
			assert_eq!(retention_keep(&store(), "daily", None).unwrap(), 4);
		}

		#[test]
		fn explicit_keep_wins() {
			assert_eq!(retention_keep(&store(), "daily", Some(1)).unwrap(), 1);
		}

		#[test]
		fn unknown_job_is_rejected_even_with_keep() {
			for job in ["weekly", "..", "../etc", "daily/.."] {
				let err = retention_keep(&store(), job, Some(1)).unwrap_err();
				assert!(err.to_string().contains("not found"), "{job}");
			}
		}
	}

	#[test]
	fn report_shows_failure() {
		let report = JobReport {
			job_name: "daily".to_string(),
			stem: "daily_20250101-060000".to_string(),
			is_error: true,
			failure: Some("render failed: boom".to_string()),
			notify: NotifyStatus::Sent,
			files_removed: 2,
		};
		assert_eq!(
			describe_report(&report),
			"daily_20250101-060000: ERROR (render failed: boom), notification Sent, 2 old file(s) removed"
		);
	}

	#[test]
	fn standalone_name_is_file_stem() {
		assert_eq!(
			standalone_job_name(Path::new("/tmp/weekly-kpis.ipynb")).unwrap(),
			"weekly-kpis"
		);
		assert!(standalone_job_name(Path::new("/")).is_err());
	}
}
