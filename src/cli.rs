//! CLI argument parsing for renderstats

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable per-window summary (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "renderstats")]
#[command(version)]
#[command(about = "Frame-timing and input-latency metrics from browser traces", long_about = None)]
pub struct Cli {
    /// Chrome trace-event JSON file
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Action marker name bounding one window (repeat, in trace order)
    #[arg(short = 'a', long = "action", value_name = "NAME")]
    pub actions: Vec<String>,

    /// Renderer process id (default: process named "Renderer")
    #[arg(long = "renderer-pid", value_name = "PID")]
    pub renderer_pid: Option<u64>,

    /// Browser process id (default: process named "Browser")
    #[arg(long = "browser-pid", value_name = "PID")]
    pub browser_pid: Option<u64>,

    /// Display compositor process id (default: process named "SurfaceFlinger")
    #[arg(long = "display-pid", value_name = "PID")]
    pub display_pid: Option<u64>,

    /// Fail when a window has no frames
    #[arg(long = "strict")]
    pub strict: bool,

    /// Also collect input latency recorded by the renderer process
    #[arg(long = "renderer-input-latency")]
    pub renderer_input_latency: bool,

    /// TOML file with aggregation options
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
