//! CLI argument parsing for the workbox helper.
//!
//! The CLI is a thin harness around the core pipelines: it loads a page
//! fixture, runs enrichment or a workflow advancement against the configured
//! endpoint, and prints the structured result a presentation layer would
//! render.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "wbx",
    version,
    about = "Path enrichment and bulk workflow advancement for a CMS workbox",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Helper config JSON; stock defaults when omitted
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Enrich(EnrichArgs),
    Advance(AdvanceArgs),
    Cache(CacheArgs),
    /// Print the configured workflow catalog in order
    States,
    Seal(SealArgs),
    /// Print a config stub with stock defaults, ready to edit
    ConfigStub,
}

/// Enrich command inputs.
#[derive(Parser, Debug)]
#[command(about = "Annotate workbox items in a page fixture with their paths")]
pub struct EnrichArgs {
    /// Page fixture JSON (top document plus optional frame document)
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Origin of the hosting page, e.g. https://cms.example.com
    #[arg(long, value_name = "URL")]
    pub origin: String,

    /// Environment settings JSON with sealed API keys
    #[arg(long, value_name = "FILE")]
    pub settings: PathBuf,

    /// Where to write the annotated page; defaults to rewriting --page
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Cache store file; defaults to the platform cache directory
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,
}

/// Advance command inputs.
#[derive(Parser, Debug)]
#[command(about = "Advance selected items one step through the workflow")]
pub struct AdvanceArgs {
    /// Page fixture JSON; selected items are read from its checkboxes
    #[arg(long, value_name = "FILE", conflicts_with = "ids")]
    pub page: Option<PathBuf>,

    /// Comma-separated item ids, bypassing the page selection
    #[arg(long, value_name = "ID,ID,...")]
    pub ids: Option<String>,

    /// Origin of the hosting page, e.g. https://cms.example.com
    #[arg(long, value_name = "URL")]
    pub origin: String,

    /// Environment settings JSON with sealed API keys
    #[arg(long, value_name = "FILE")]
    pub settings: PathBuf,

    /// Where to write the page with its selection cleared
    #[arg(long, value_name = "FILE", requires = "page")]
    pub out: Option<PathBuf>,
}

/// Cache command inputs.
#[derive(Parser, Debug)]
#[command(about = "Inspect or drop the on-disk path cache")]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,

    /// Cache store file; defaults to the platform cache directory
    #[arg(long, global = true, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the current snapshot
    Show,
    /// Remove the snapshot entirely
    Clear,
}

/// Seal command inputs.
#[derive(Parser, Debug)]
#[command(about = "Seal an API key for use in a settings file")]
pub struct SealArgs {
    /// The plain API key
    pub key: String,
}
