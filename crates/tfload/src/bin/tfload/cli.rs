//! tfload cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfload ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the module tree of a configuration directory
    #[command(alias = "mod")]
    Modules(ModulesCommand),

    /// Load variable values files in precedence order
    Values(ValuesCommand),
}

#[derive(Parser, Debug)]
pub struct ModulesCommand {
    #[clap(flatten)]
    pub output: OutputArgs,

    /// How far to descend into module calls
    #[arg(short = 'w', long = "walk", value_enum, default_value_t)]
    pub walk: WalkArg,

    /// Configuration directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ValuesCommand {
    #[clap(flatten)]
    pub output: OutputArgs,

    /// Explicit values file, highest precedence
    ///
    /// Can be specified multiple times; later files take precedence.
    /// Paths are relative to the work directory.
    #[arg(short = 'f', long = "var-file")]
    pub files: Vec<PathBuf>,

    /// Configuration directory
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum WalkArg {
    /// Descend into every module call
    #[default]
    All,
    /// Descend only into local path calls
    Local,
    /// Never descend
    None,
}

impl std::fmt::Display for WalkArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WalkArg::All => f.write_str("all"),
            WalkArg::Local => f.write_str("local"),
            WalkArg::None => f.write_str("none"),
        }
    }
}

impl From<WalkArg> for tfload::module::ModuleWalkMode {
    fn from(value: WalkArg) -> Self {
        match value {
            WalkArg::All => Self::All,
            WalkArg::Local => Self::Local,
            WalkArg::None => Self::None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}
