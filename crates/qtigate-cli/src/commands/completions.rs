//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::{generate, shells};

use crate::cli::{Cli, CompletionsArgs, Shell};

pub fn execute(args: CompletionsArgs) -> crate::error::CliResult<()> {
    let mut cmd = Cli::command();
    let mut out = std::io::stdout();

    match args.shell {
        Shell::Bash => generate(shells::Bash, &mut cmd, "qtigate", &mut out),
        Shell::Zsh => generate(shells::Zsh, &mut cmd, "qtigate", &mut out),
        Shell::Fish => generate(shells::Fish, &mut cmd, "qtigate", &mut out),
        Shell::PowerShell => generate(shells::PowerShell, &mut cmd, "qtigate", &mut out),
        Shell::Elvish => generate(shells::Elvish, &mut cmd, "qtigate", &mut out),
    };

    Ok(())
}
