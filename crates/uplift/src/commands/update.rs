//! Update command and the background update check

use anyhow::{bail, Context, Result};
use dialoguer::Confirm;
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uplift_update::{
    can_reexec, reexec, CheckOutcome, InstallReport, SkipReason, Updater, UpdaterOptions,
    EXIT_CODE_RERUN_REQUIRED,
};

use crate::cli::{
    Cli, RollbackArgs, SetChannelArgs, UpdateArgs, UpdateChannelsArgs, UpdateCommands,
    UpdateStatusArgs,
};
use crate::output;
use crate::version::BuildInfo;

const APP_NAME: &str = "uplift";

/// Settings shared by every updater invocation of one CLI run
#[derive(Debug, Clone)]
pub struct UpdateContext {
    pub repository: String,
    pub token: Option<String>,
    pub cancel: CancellationToken,
}

impl UpdateContext {
    /// Context from the global CLI flags
    pub fn from_cli(cli: &Cli, cancel: CancellationToken) -> Self {
        Self {
            repository: cli.repository.clone(),
            token: cli.github_token.clone(),
            cancel,
        }
    }

    /// Updater options for the running binary
    pub fn options(&self) -> UpdaterOptions {
        let build = BuildInfo::current();
        UpdaterOptions::new(&self.repository, APP_NAME, build.tag)
            .with_commit(build.commit.unwrap_or_default())
            .with_token(self.token.clone())
    }

    fn updater(&self, options: UpdaterOptions) -> Result<Updater> {
        let updater = Updater::new(options).context("Failed to initialize updater")?;
        Ok(updater.with_cancellation(self.cancel.clone()))
    }
}

/// Check for updates before running a command
///
/// Only install failures are returned; everything else is logged and the
/// command runs on the current version. After a successful install the
/// process is replaced by the new binary and this does not return.
pub async fn background_check(ctx: &UpdateContext) -> Result<()> {
    let updater = match ctx.updater(ctx.options()) {
        Ok(updater) => updater,
        Err(e) => {
            debug!("Updater unavailable: {:#}", e);
            return Ok(());
        }
    };

    match updater.check().await {
        Ok(CheckOutcome::Installed(report)) => restart(&report),
        Ok(outcome) => {
            debug!("Update check finished: {:?}", outcome);
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e).context("Automatic update failed"),
        Err(e) => {
            warn!("Update check failed: {}", e);
            Ok(())
        }
    }
}

/// Hand over to the freshly installed binary
fn restart(report: &InstallReport) -> ! {
    output::success(&format!(
        "Updated {} from {} to {}",
        APP_NAME, report.previous, report.installed
    ));

    if can_reexec() {
        let err = reexec(&report.executable);
        output::error(&format!("Failed to restart {}: {}", APP_NAME, err));
    }

    output::info("Run the command again to use the new version");
    std::process::exit(EXIT_CODE_RERUN_REQUIRED);
}

pub async fn run(args: UpdateArgs, ctx: &UpdateContext) -> Result<()> {
    match args.command {
        Some(UpdateCommands::Status(status_args)) => status(status_args, ctx),
        Some(UpdateCommands::Channels(channel_args)) => channels(channel_args, ctx).await,
        Some(UpdateCommands::SetChannel(set_args)) => set_channel(set_args, ctx).await,
        Some(UpdateCommands::Rollback(rollback_args)) => rollback(rollback_args, ctx).await,
        None => update(args, ctx).await,
    }
}

/// Normalize a requested version to a tag (add `v` to bare numbers)
fn normalize_tag(version: &str) -> String {
    if version.starts_with(|c: char| c.is_ascii_digit()) {
        format!("v{}", version)
    } else {
        version.to_string()
    }
}

fn describe_skip(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Disabled => "The updater is disabled for this build".to_string(),
        SkipReason::ContinuousIntegration(var) => {
            format!("Running under CI ({} is set), not updating", var)
        }
        SkipReason::NotInteractive => "Not running in a terminal, not updating".to_string(),
        SkipReason::LocalBuild => "This is a local build, the updater is disabled".to_string(),
        SkipReason::NotDue => "The next update check is not due yet".to_string(),
    }
}

/// Force a check and install the result
async fn update(args: UpdateArgs, ctx: &UpdateContext) -> Result<()> {
    let mut options = ctx
        .options()
        .with_force_check(true)
        .with_skip_major_version_prompt(args.yes);
    if let Some(channel) = args.channel {
        options = options.with_channel(channel);
    }
    if let Some(version) = &args.target_version {
        options = options.with_pinned_version(normalize_tag(version));
    }

    let updater = ctx.updater(options)?;
    output::info(&format!("Current version: {}", updater.options().current_version));

    match updater.check().await.context("Update failed")? {
        CheckOutcome::Skipped(reason) => output::warning(&describe_skip(&reason)),
        CheckOutcome::NoUpdate { current, latest } => {
            output::success(&format!(
                "Already on the latest version ({}, newest is {})",
                current, latest
            ));
        }
        CheckOutcome::Declined { candidate, .. } => {
            output::info(&format!("Update to {} declined", candidate));
        }
        CheckOutcome::Installed(report) => {
            output::success(&format!(
                "Updated from {} to {}",
                report.previous, report.installed
            ));
            if !report.notes.trim().is_empty() {
                let preview: String = report.notes.lines().take(10).collect::<Vec<_>>().join("\n");
                println!("\nChangelog:\n{}\n", preview);
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    repository: String,
    current_version: String,
    channel: String,
    check_interval_secs: u64,
    last_checked: Option<chrono::DateTime<chrono::Utc>>,
    last_version: Option<String>,
    state_path: Option<PathBuf>,
}

fn status(args: UpdateStatusArgs, ctx: &UpdateContext) -> Result<()> {
    let status = ctx.updater(ctx.options())?.status();

    if args.json {
        let report = StatusReport {
            repository: status.repository,
            current_version: status.current_version,
            channel: status.channel,
            check_interval_secs: status.check_interval.as_secs(),
            last_checked: status.last_checked,
            last_version: status.last_version,
            state_path: status.state_path,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::header("Updater status");
    output::kv("Repository", &status.repository);
    output::kv("Current version", &status.current_version);
    output::kv("Channel", &status.channel);
    output::kv("Check interval", &output::duration(status.check_interval));
    output::kv(
        "Last checked",
        &status
            .last_checked
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string()),
    );
    output::kv(
        "Rollback version",
        status.last_version.as_deref().unwrap_or("none"),
    );
    if let Some(path) = &status.state_path {
        output::kv("State file", &path.display().to_string());
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ChannelReport {
    name: String,
    latest: String,
    mutable: bool,
}

async fn channels(args: UpdateChannelsArgs, ctx: &UpdateContext) -> Result<()> {
    let updater = ctx.updater(ctx.options())?;
    let current = updater.status().channel;

    let spinner = output::spinner("Listing release channels...");
    let channels = updater.list_channels().await;
    spinner.finish_and_clear();
    let channels = channels.context("Failed to list channels")?;

    if args.json {
        let report: Vec<ChannelReport> = channels
            .into_iter()
            .map(|c| ChannelReport {
                name: c.name,
                latest: c.latest,
                mutable: c.mutable,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if channels.is_empty() {
        output::warning(&format!("No releases found in {}", ctx.repository));
        return Ok(());
    }

    output::header("Release channels");
    for channel in channels {
        let marker = if channel.name == current { " (current)" } else { "" };
        let mutable = if channel.mutable { " [mutable]" } else { "" };
        println!("  {:<12} {}{}{}", channel.name, channel.latest, mutable, marker);
    }

    Ok(())
}

async fn set_channel(args: SetChannelArgs, ctx: &UpdateContext) -> Result<()> {
    let updater = ctx.updater(ctx.options())?;

    let spinner = output::spinner(&format!("Validating channel {}...", args.channel));
    let result = updater.set_channel(&args.channel).await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to set channel {}", args.channel))?;

    output::success(&format!(
        "Following channel {} for {}",
        args.channel, ctx.repository
    ));
    Ok(())
}

async fn rollback(args: RollbackArgs, ctx: &UpdateContext) -> Result<()> {
    let updater = ctx.updater(ctx.options().with_skip_major_version_prompt(true))?;

    let Some(previous) = updater.status().last_version else {
        bail!("No previous version recorded for {}", ctx.repository);
    };

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Roll back to {}?", previous))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            output::info("Rollback cancelled");
            return Ok(());
        }
    }

    let report = updater.rollback().await.context("Rollback failed")?;
    output::success(&format!(
        "Rolled back from {} to {}",
        report.previous, report.installed
    ));
    Ok(())
}
