use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gemrelay_common::{RelayConfigPatch, split_keywords};

#[derive(Parser)]
#[command(name = "gemrelay", version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) config: ConfigArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Overrides for the relay config. Unset flags fall back to the
/// environment, then to defaults.
#[derive(Args)]
pub(crate) struct ConfigArgs {
    #[arg(long, global = true)]
    pub(crate) auto_disable: Option<bool>,
    #[arg(long, global = true)]
    pub(crate) auto_enable: Option<bool>,
    /// Comma separated.
    #[arg(long, global = true)]
    pub(crate) disable_keywords: Option<String>,
    #[arg(long, global = true)]
    pub(crate) debug_body: Option<bool>,
}

impl ConfigArgs {
    pub(crate) fn to_patch(&self) -> RelayConfigPatch {
        RelayConfigPatch {
            automatic_disable_enabled: self.auto_disable,
            automatic_enable_enabled: self.auto_enable,
            disable_keywords: self.disable_keywords.as_deref().map(split_keywords),
            debug_body: self.debug_body,
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a captured upstream body through a translator; the client bytes go
    /// to stdout and the usage record to stderr.
    Replay(ReplayArgs),
    /// Evaluate a classified upstream failure against the channel policy.
    Classify(ClassifyArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ReplayMode {
    Generate,
    Stream,
    Embed,
}

#[derive(Args)]
pub(crate) struct ReplayArgs {
    #[arg(long, value_enum)]
    pub(crate) mode: ReplayMode,
    pub(crate) file: PathBuf,
    #[arg(long, default_value = "gemini-2.5-flash")]
    pub(crate) model: String,
    #[arg(long, default_value_t = 0)]
    pub(crate) prompt_tokens: u32,
    /// Embedding body came from `batchEmbedContents`.
    #[arg(long)]
    pub(crate) batch: bool,
    #[arg(long, default_value_t = 200)]
    pub(crate) status: u16,
    /// Bytes per simulated network read in stream mode.
    #[arg(long, default_value_t = 512)]
    pub(crate) chunk_size: usize,
}

#[derive(Args)]
pub(crate) struct ClassifyArgs {
    /// JSON file with `channelType`, `channel`, `status` and optional `error`.
    pub(crate) file: PathBuf,
}
