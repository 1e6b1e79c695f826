//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use qtigate_core::domain::RootTag;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "qtigate",
    bin_name = "qtigate",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Validate QTI 3.0 assessment XML before it is published",
    long_about = "qtigate runs generated QTI items, tests and stimuli through \
                  structural, placement, math and SVG checks, then verifies \
                  images and asks the content service for a ground-truth verdict.",
    after_help = "EXAMPLES:\n\
        \x20 qtigate validate item.xml\n\
        \x20 qtigate validate --offline items/*.xml\n\
        \x20 qtigate validate passage.xml --root-tag stimulus --output-format json\n\
        \x20 qtigate completions bash > /usr/share/bash-completion/completions/qtigate",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate one or more QTI documents.
    #[command(
        visible_alias = "v",
        about = "Validate QTI documents",
        after_help = "EXAMPLES:\n\
            \x20 qtigate validate item.xml\n\
            \x20 qtigate validate item.xml --id tmp-item-42 --title \"Adding fractions\"\n\
            \x20 qtigate validate --offline a.xml b.xml"
    )]
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 qtigate completions bash > ~/.local/share/bash-completion/completions/qtigate\n\
            \x20 qtigate completions zsh  > ~/.zfunc/_qtigate\n\
            \x20 qtigate completions fish > ~/.config/fish/completions/qtigate.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect and initialise the qtigate configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 qtigate config get service.base_url\n\
            \x20 qtigate config list\n\
            \x20 qtigate config init --force"
    )]
    Config(ConfigCommands),
}

// ── validate ──────────────────────────────────────────────────────────────────

/// Arguments for `qtigate validate`.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Documents to validate.
    #[arg(value_name = "FILE", required = true, help = "QTI XML file(s) to validate")]
    pub files: Vec<PathBuf>,

    /// Root element kind; detected from the document when omitted.
    #[arg(
        short = 'r',
        long = "root-tag",
        value_name = "KIND",
        value_enum,
        help = "Root element kind (item, test, stimulus)"
    )]
    pub root_tag: Option<RootTagArg>,

    /// Temporary record identifier used by the ground-truth round trip.
    #[arg(
        long = "id",
        value_name = "ID",
        help = "Record identifier (default: a fresh temporary id per file)"
    )]
    pub id: Option<String>,

    /// Document title; read from the root `title` attribute when omitted.
    #[arg(long = "title", value_name = "TITLE", help = "Document title")]
    pub title: Option<String>,

    /// Run only the synchronous content rules.
    #[arg(long = "offline", help = "Skip image reachability and ground-truth checks")]
    pub offline: bool,
}

/// Root element kind as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RootTagArg {
    Item,
    Test,
    Stimulus,
}

impl From<RootTagArg> for RootTag {
    fn from(arg: RootTagArg) -> Self {
        match arg {
            RootTagArg::Item => RootTag::Item,
            RootTagArg::Test => RootTag::Test,
            RootTagArg::Stimulus => RootTag::Stimulus,
        }
    }
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `qtigate completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `qtigate config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `service.base_url`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the active configuration file.
    Path,
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing config file.
        #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
        force: bool,
    },
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_validate_command() {
        let cli = Cli::parse_from([
            "qtigate",
            "validate",
            "a.xml",
            "b.xml",
            "--root-tag",
            "stimulus",
            "--offline",
        ]);
        let Commands::Validate(args) = cli.command else {
            panic!("expected Validate command");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.root_tag.map(RootTag::from), Some(RootTag::Stimulus));
        assert!(args.offline);
    }

    #[test]
    fn validate_requires_a_file() {
        assert!(Cli::try_parse_from(["qtigate", "validate"]).is_err());
    }

    #[test]
    fn validate_alias() {
        let cli = Cli::parse_from(["qtigate", "v", "item.xml"]);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn parse_config_init_force() {
        let cli = Cli::parse_from(["qtigate", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init { force: true })
        ));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["qtigate", "--quiet", "--verbose", "config", "list"]);
        assert!(result.is_err());
    }
}
