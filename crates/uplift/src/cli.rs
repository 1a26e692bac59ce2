//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Repository releases are resolved from unless overridden
pub const DEFAULT_REPOSITORY: &str = "https://github.com/uplift-rs/uplift";

/// Uplift - self-updating command-line binaries
#[derive(Parser, Debug)]
#[command(name = "uplift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Do not check for updates before running the command
    #[arg(long, global = true, env = "UPLIFT_SKIP_UPDATE")]
    pub skip_update: bool,

    /// Repository releases are fetched from
    #[arg(long, global = true, env = "UPLIFT_REPOSITORY", default_value = DEFAULT_REPOSITORY)]
    pub repository: String,

    /// Token for private repositories and API rate limits
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether the background update check runs before the command
    pub fn runs_update_check(&self) -> bool {
        !self.skip_update && !matches!(self.command, Commands::Update(_) | Commands::Completions(_))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Check for and install updates, or manage the updater
    Update(UpdateArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Update command
// `--version` selects a release here, so clap's own flag is turned off.
#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true, disable_version_flag = true)]
pub struct UpdateArgs {
    #[command(subcommand)]
    pub command: Option<UpdateCommands>,

    /// Channel to resolve against (overrides the persisted channel)
    #[arg(long)]
    pub channel: Option<String>,

    /// Install a specific version instead of the newest one
    #[arg(long = "version", value_name = "TAG")]
    pub target_version: Option<String>,

    /// Install major updates without asking
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum UpdateCommands {
    /// Show the effective updater settings and last check
    Status(UpdateStatusArgs),

    /// List release channels and their newest version
    Channels(UpdateChannelsArgs),

    /// Persist the channel to follow for this repository
    SetChannel(SetChannelArgs),

    /// Reinstall the version replaced by the last update
    Rollback(RollbackArgs),
}

#[derive(Args, Debug)]
pub struct UpdateStatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateChannelsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetChannelArgs {
    /// Channel name (e.g. stable, rc, unstable)
    pub channel: String,
}

#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

// Completions command
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_flags() {
        let cli = Cli::parse_from(["uplift", "update", "--channel", "rc", "--version", "v1.2.0", "-y"]);
        let Commands::Update(args) = cli.command else {
            panic!("expected update command");
        };
        assert!(args.command.is_none());
        assert_eq!(args.channel.as_deref(), Some("rc"));
        assert_eq!(args.target_version.as_deref(), Some("v1.2.0"));
        assert!(args.yes);
    }

    #[test]
    fn test_update_subcommands() {
        let cli = Cli::parse_from(["uplift", "update", "set-channel", "unstable"]);
        match cli.command {
            Commands::Update(UpdateArgs {
                command: Some(UpdateCommands::SetChannel(args)),
                ..
            }) => assert_eq!(args.channel, "unstable"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_update_check_runs_only_for_other_commands() {
        let cli = Cli::parse_from(["uplift", "version"]);
        assert!(cli.runs_update_check());

        let cli = Cli::parse_from(["uplift", "--skip-update", "version"]);
        assert!(!cli.runs_update_check());

        let cli = Cli::parse_from(["uplift", "update", "status"]);
        assert!(!cli.runs_update_check());

        let cli = Cli::parse_from(["uplift", "completions", "bash"]);
        assert!(!cli.runs_update_check());
    }
}
