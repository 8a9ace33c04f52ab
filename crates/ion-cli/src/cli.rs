//! CLI argument definitions for the ION exporter.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "ion-export",
    version,
    about = "ION content exporter - serialize pages and build tar archives",
    long_about = "Serialize CMS page content into the ION JSON format and\n\
                  package pages with their referenced files into streamed\n\
                  POSIX tar archives."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a tar archive from a content manifest.
    Archive(ArchiveArgs),

    /// Print the serialized JSON of one page.
    Inspect(InspectArgs),
}

#[derive(Parser)]
pub struct CommonArgs {
    /// Path to the content manifest (JSON).
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Root directory of the file storage referenced by the manifest.
    #[arg(long = "storage-root", value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Base URL prepended to relative file and page URLs.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Content variation to request.
    #[arg(long = "variation", default_value = "default")]
    pub variation: String,

    /// Degrade missing files to placeholder values instead of failing.
    #[arg(long = "allow-missing-files")]
    pub allow_missing_files: bool,
}

#[derive(Parser)]
pub struct ArchiveArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output tar file (default: <MANIFEST stem>.tar).
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Build the archive of a single page instead of the collection.
    #[arg(long = "page", value_name = "SLUG")]
    pub page: Option<String>,

    /// Slugs to ship with content in a collection archive (default: all).
    #[arg(long = "updated", value_name = "SLUG")]
    pub updated: Vec<String>,
}

#[derive(Parser)]
pub struct InspectArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Slug of the page to serialize.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Pretty-print the JSON output.
    #[arg(long = "pretty")]
    pub pretty: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
