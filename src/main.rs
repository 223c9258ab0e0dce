use anyhow::{Context, Result};
use clap::Parser;
use renderstats::cli::{Cli, OutputFormat};
use renderstats::config::{EmptyWindowPolicy, StatsConfig};
use renderstats::rendering_stats::RenderingStats;
use renderstats::report;
use renderstats::timeline::{Process, TimeWindow, Timeline};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Resolve a process by explicit pid, falling back to its conventional name
fn resolve_process<'a>(
    timeline: &'a Timeline,
    pid: Option<u64>,
    name: &str,
) -> Result<Option<&'a Process>> {
    match pid {
        Some(pid) => timeline
            .process(pid)
            .map(Some)
            .with_context(|| format!("No process with pid {} in trace", pid)),
        None => Ok(timeline.find_process_by_name(name)),
    }
}

/// Windows from the requested action markers, or one window over the renderer
fn resolve_windows(
    timeline: &Timeline,
    actions: &[String],
    renderer: &Process,
) -> Result<Vec<TimeWindow>> {
    if actions.is_empty() {
        let (start, end) = renderer
            .threads()
            .flat_map(|thread| thread.slices())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), slice| {
                (lo.min(slice.start), hi.max(slice.end()))
            });
        if start > end {
            return Ok(Vec::new());
        }
        // Padded so a frame on the final timestamp still falls inside.
        return Ok(vec![TimeWindow::new(start, end + 1.0)]);
    }

    let names: Vec<&str> = actions.iter().map(String::as_str).collect();
    let markers = timeline
        .find_timeline_markers(&names)
        .context("Failed to resolve action markers")?;
    Ok(markers.iter().map(TimeWindow::from_marker).collect())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => StatsConfig::from_toml(path)?,
        None => StatsConfig::default(),
    };
    if args.strict {
        config.empty_window_policy = EmptyWindowPolicy::Strict;
    }
    if args.renderer_input_latency {
        config.scan_renderer_for_input_latency = true;
    }

    let timeline = Timeline::from_file(&args.trace)
        .with_context(|| format!("Failed to import trace: {}", args.trace.display()))?;

    let Some(renderer) = resolve_process(&timeline, args.renderer_pid, "Renderer")? else {
        anyhow::bail!("No renderer process found. Name one with --renderer-pid PID");
    };
    let browser = resolve_process(&timeline, args.browser_pid, "Browser")?;
    let display_compositor = resolve_process(&timeline, args.display_pid, "SurfaceFlinger")?;

    let windows = resolve_windows(&timeline, &args.actions, renderer)?;
    let stats = RenderingStats::new(renderer, browser, display_compositor, &windows, &config)?;

    match args.format {
        OutputFormat::Json => println!("{}", report::to_json(&stats)?),
        OutputFormat::Text => print!("{}", report::to_text(&stats, &args.actions)),
    }

    Ok(())
}
