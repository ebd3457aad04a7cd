//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output for `push` and `status`

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

/// regsync - Publish component registries to GitHub
#[derive(Parser, Debug)]
#[command(name = "regsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long = "interactive", global = true, conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    /// Emit JSON instead of text where supported
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if:
    /// - `--interactive` was explicitly set, OR
    /// - None of `--no-interactive`, `--quiet`, `--json` was set AND stdin is a TTY
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else if self.no_interactive || self.quiet || self.json {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store or inspect the GitHub token
    #[command(
        name = "auth",
        long_about = "Store or inspect the GitHub personal access token.\n\n\
            The token needs permission to create repositories, write contents and \
            manage Pages. It is kept in the configured secret store. When the \
            GITHUB_TOKEN environment variable is set it takes precedence.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Prompt for a token (input is hidden)
    regsync auth

    # Non-interactive
    regsync auth --token ghp_xxxx

    # Check whether a token is stored
    regsync auth --status

    # Remove the stored token
    regsync auth --logout"
    )]
    Auth {
        /// Token to store (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Show current authentication status
        #[arg(long)]
        status: bool,

        /// Remove stored authentication
        #[arg(long)]
        logout: bool,
    },

    /// Create a repository for a registry and publish it
    #[command(
        name = "export",
        long_about = "Create a GitHub repository for a registry and publish it.\n\n\
            Creates the repository, enables Pages with a workflow build, and pushes \
            the generated layout: registry index, item sources, build configuration, \
            publish workflow and README. Each registry is exported once; later \
            changes are published with 'regsync push'.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Export under your account
    regsync export registry.json --name acme-ui

    # Export a private repository under an organization
    regsync export registry.json --name acme-ui --org acme --private"
    )]
    Export {
        /// Registry JSON export
        registry: PathBuf,

        /// Repository name
        #[arg(long)]
        name: String,

        /// Organization to create the repository under
        #[arg(long)]
        org: Option<String>,

        /// Create a private repository
        #[arg(long, conflicts_with = "public")]
        private: bool,

        /// Create a public repository
        #[arg(long)]
        public: bool,

        /// Repository description (defaults to the registry description)
        #[arg(long)]
        description: Option<String>,
    },

    /// Publish registry changes to its repository
    #[command(
        name = "push",
        long_about = "Publish the current state of a registry to its repository.\n\n\
            Only files whose content changed since the last push are uploaded. If \
            someone else changed the branch since then, push refuses and exits with \
            status 2; rerun with --force to overwrite those changes.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish changes
    regsync push registry.json

    # Overwrite changes made on GitHub
    regsync push registry.json --force

EXIT STATUS:
    0  pushed, or nothing to push
    1  error
    2  the remote branch changed since the last push"
    )]
    Push {
        /// Registry JSON export
        registry: PathBuf,

        /// Overwrite remote changes made since the last push
        #[arg(long)]
        force: bool,

        /// Allow removing every published file
        #[arg(long)]
        allow_empty: bool,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Compare the last push with the remote branch
    #[command(
        name = "status",
        long_about = "Compare what was last pushed with the remote branch.\n\n\
            Reads only. Without an id, every exported registry is listed."
    )]
    Status {
        /// Registry id (all exported registries when omitted)
        registry_id: Option<String>,
    },

    /// Show what a push would change
    #[command(name = "diff")]
    Diff {
        /// Registry JSON export
        registry: PathBuf,
    },

    /// Refresh the published site URL
    #[command(name = "hosting")]
    Hosting {
        /// Registry id
        registry_id: String,
    },

    /// Forget the repository binding of a registry
    #[command(
        name = "unlink",
        long_about = "Forget the repository binding of a registry.\n\n\
            The GitHub repository is not touched. A later export creates a new \
            repository."
    )]
    Unlink {
        /// Registry id
        registry_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Get, set or list configuration values
    #[command(
        name = "config",
        after_help = "\
WORKFLOW EXAMPLES:
    # List all configuration values
    regsync config list

    # Get a specific value
    regsync config get default_branch

    # Set a value
    regsync config set max_concurrent_blobs 16"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    regsync completion bash >> ~/.bashrc

    # Zsh
    regsync completion zsh > ~/.zfunc/_regsync"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
