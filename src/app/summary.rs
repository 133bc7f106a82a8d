use crate::args::OutputFormat;
use crate::metrics::{RunReport, StatusClass};

pub(crate) const SEPARATOR: &str = "============================================================";

/// Run details that are not part of the report itself.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'run> {
    pub name: &'run str,
    pub target_requests: u64,
    pub concurrency: usize,
}

/// Renders a completed report. Pure: the same report always renders the
/// same text.
#[must_use]
pub fn render_report(
    report: &RunReport,
    context: &ReportContext<'_>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => render_text(report, context),
        OutputFormat::Compact => render_compact(report, context),
    }
}

fn render_text(report: &RunReport, context: &ReportContext<'_>) -> String {
    let histogram = &report.histogram;
    let mut lines = Vec::new();
    lines.push(SEPARATOR.to_owned());
    lines.push(format!("Test: {:>21}", context.name));
    lines.push(format!("Run ID: {:>18}", report.run_id));
    lines.push(format!("Requests target: {:>7}", context.target_requests));
    lines.push(format!("Concurrency level: {:>2}", context.concurrency));
    lines.push(String::new());
    lines.push(format!("Requests sent: {}", report.total_attempted));
    lines.push("Response codes received:".to_owned());
    let buckets: Vec<String> = StatusClass::ALL
        .iter()
        .map(|class| format!("{}: {}", class.label(), histogram.count(*class)))
        .collect();
    lines.push(format!("  {}", buckets.join(" | ")));
    if !report.errors.is_empty() {
        lines.push("Error count:".to_owned());
        for (reason, count) in &report.errors {
            lines.push(format!("  + {}: \"{}\"", count, reason));
        }
    }
    lines.push(SEPARATOR.to_owned());
    lines.push(String::new());
    lines.join("\n")
}

fn render_compact(report: &RunReport, context: &ReportContext<'_>) -> String {
    format!(
        "test {},{},{},{}\n{}, {}\n",
        context.name,
        report.run_id,
        context.target_requests,
        context.concurrency,
        report.total_attempted,
        report.histogram.count(StatusClass::Unclassified)
    )
}
