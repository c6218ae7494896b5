/// Output formatting: terminal table and JSON.
use rankfuse_core::SummarySnapshot;
use serde::Serialize;

/// What one `fuse` invocation did.
#[derive(Debug, Serialize)]
pub struct FuseReport {
    pub algorithms: Vec<String>,
    pub normalisations: Vec<String>,
    /// Distinct folds seen across all normalisations.
    pub folds: usize,
    /// Run files read, summed over normalisations.
    pub runs: usize,
    #[serde(flatten)]
    pub jobs: SummarySnapshot,
    pub elapsed_secs: f64,
}

pub fn format_table(report: &FuseReport) -> String {
    let rows = [
        ("Scheduled", report.jobs.scheduled),
        ("Computed", report.jobs.computed),
        ("Already done", report.jobs.already_done),
        ("In progress", report.jobs.in_progress),
        ("Failed", report.jobs.failed),
    ];

    let mut out = String::new();
    out.push_str(&format!(
        "Algorithms: {} | Normalisations: {}\n",
        report.algorithms.join(", "),
        report.normalisations.join(", "),
    ));
    out.push_str(&format!("{} runs across {} folds\n\n", report.runs, report.folds));
    out.push_str(" Jobs         |  Count\n");
    out.push_str("--------------|-------\n");
    for (label, count) in rows {
        out.push_str(&format!(" {label:<12} | {count:>6}\n"));
    }
    out.push_str(&format!("\nFinished in {:.1}s\n", report.elapsed_secs));
    out
}

/// Print results as a formatted terminal table.
pub fn print_table(report: &FuseReport) {
    print!("{}", format_table(report));
}

/// Print results as JSON.
pub fn print_json(report: &FuseReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
