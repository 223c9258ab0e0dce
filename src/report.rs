//! Text and JSON rendering of [`RenderingStats`]

use crate::numeric::mean;
use crate::rendering_stats::RenderingStats;

/// Serialize the full result as pretty-printed JSON
pub fn to_json(stats: &RenderingStats) -> serde_json::Result<String> {
    serde_json::to_string_pretty(stats)
}

fn format_mean(values: &[f64]) -> String {
    mean(values)
        .map(|value| format!("{:.2} ms", value))
        .unwrap_or_else(|| "-".to_string())
}

/// Human-readable per-window summary
pub fn to_text(stats: &RenderingStats, labels: &[String]) -> String {
    let mut report = format!("Frame source: {:?}\n", stats.frame_source());
    if let Some(period) = stats.refresh_period() {
        report.push_str(&format!("Refresh period: {:.4} ms\n", period));
    }

    for (index, window) in stats.windows().iter().enumerate() {
        let label = labels.get(index).map(String::as_str).unwrap_or("window");
        report.push_str(&format!(
            "\n[{}] {} [{:.3}, {:.3})\n",
            index, label, window.start, window.end
        ));
        report.push_str(&format!(
            "  frames: {:<6} mean frame time: {}\n",
            stats.frame_timestamps()[index].len(),
            format_mean(&stats.frame_times()[index])
        ));
        let approximated = &stats.approximated_pixel_percentages()[index];
        if let Some(percentage) = mean(approximated) {
            report.push_str(&format!("  approximated pixels: mean {:.3}%\n", percentage));
        }
        report.push_str(&format!(
            "  input events: {:<6} mean latency: {}\n",
            stats.input_event_latency()[index].len(),
            format_mean(&stats.input_event_latency()[index])
        ));
        report.push_str(&format!(
            "  scroll updates: {:<4} gesture scroll updates: {}\n",
            stats.scroll_update_latency()[index].len(),
            stats.gesture_scroll_update_latency()[index].len()
        ));
    }

    if !stats.diagnostics().is_empty() {
        report.push_str(&format!("\nDiagnostics ({}):\n", stats.diagnostics().len()));
        for diagnostic in stats.diagnostics() {
            report.push_str(&format!("  - {}\n", diagnostic));
        }
    }

    report
}
