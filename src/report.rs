//! Report emitter — renders a `FunnelReport` as text tables or JSON.

use std::io::Write;

use comfy_table::{Table, presets::UTF8_FULL};

use crate::config::ReportFormat;
use crate::error::ReportError;
use crate::pipeline::types::FunnelReport;

/// Write `report` to `writer` in the requested format.
pub fn emit<W: Write>(
    report: &FunnelReport,
    format: ReportFormat,
    writer: &mut W,
) -> Result<(), ReportError> {
    match format {
        ReportFormat::Text => write!(writer, "{}", render_text(report))?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Human-readable report: summary lines followed by the two tables.
pub fn render_text(report: &FunnelReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Number of unclassified emails: {:.2}%\n",
        report.unclassified_ratio * 100.0
    ));
    out.push_str(&format!(
        "\nNumber of companies interviewed with: {}\n",
        report.companies_interviewed
    ));
    if report.skipped_meetings > 0 {
        out.push_str(&format!(
            "Meetings skipped (malformed sender): {}\n",
            report.skipped_meetings
        ));
    }
    out.push('\n');

    out.push_str(&funnel_table(report).to_string());
    out.push_str("\n\n");
    out.push_str(&interview_stage_table(report).to_string());
    out.push('\n');

    out
}

fn funnel_table(report: &FunnelReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["stage", "emails"]);
    for row in &report.funnel {
        table.add_row([row.stage.clone(), row.emails.to_string()]);
    }
    table
}

fn interview_stage_table(report: &FunnelReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["interview_stage", "no_interviews_per_stage"]);
    for row in &report.interview_stages {
        table.add_row([
            row.interview_stage.to_string(),
            row.no_interviews_per_stage.to_string(),
        ]);
    }
    table
}
