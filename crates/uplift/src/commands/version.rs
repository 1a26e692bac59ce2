//! Version command

use anyhow::Result;
use serde::Serialize;

use crate::cli::VersionArgs;
use crate::output;
use crate::version::{BuildInfo, UpdateEligibility};

#[derive(Debug, Serialize)]
struct VersionReport {
    version: String,
    channel: Option<String>,
    commit: Option<String>,
    updates: UpdateEligibility,
    build_date: Option<String>,
    target: Option<String>,
}

impl From<&BuildInfo> for VersionReport {
    fn from(info: &BuildInfo) -> Self {
        Self {
            version: info.tag.clone(),
            channel: info.channel(),
            commit: info.commit.clone(),
            updates: info.eligibility(),
            build_date: info.build_date.clone(),
            target: info.target.clone(),
        }
    }
}

fn describe(eligibility: &UpdateEligibility) -> &'static str {
    match eligibility {
        UpdateEligibility::Eligible => "automatic",
        UpdateEligibility::LocalBuild => "off (local build)",
        UpdateEligibility::Unversioned => "off (unversioned build)",
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    let info = BuildInfo::current();
    let report = VersionReport::from(&info);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match info.short_commit() {
        Some(sha) => println!("uplift {} ({})", report.version, sha),
        None => println!("uplift {}", report.version),
    }
    output::kv("Channel", report.channel.as_deref().unwrap_or("none"));
    output::kv("Updates", describe(&report.updates));
    if let Some(date) = &report.build_date {
        output::kv("Built", date);
    }
    if let Some(target) = &report.target {
        output::kv("Target", target);
    }

    Ok(())
}
