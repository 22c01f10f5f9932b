//! Terminal rendering of suite reports

use colored::Colorize;

use hubprobe::{CheckResult, RunSummary, Suite, SuiteReport, Verdict};

pub fn banner(suite: Suite, base_url: &str) {
    println!();
    println!("{} {}", "==".dimmed(), suite.title().bold());
    println!("   {} {}", "target:".dimmed(), base_url.dimmed());
}

pub fn report(report: &SuiteReport) {
    for check in &report.checks {
        render_check(check);
    }

    if !report.findings.is_empty() {
        println!("\n  {}", "Findings:".bold());
        for finding in &report.findings {
            println!("    {}", finding);
        }
    }

    let rate = format_rate(report.success_rate());
    println!(
        "\n  {} {}/{} passed ({}) in {} ms",
        report.suite.cyan(),
        report.passed(),
        report.total(),
        rate,
        report.elapsed_ms
    );
}

fn render_check(check: &CheckResult) {
    let badge = match check.verdict {
        Verdict::Passed => "PASS".green().bold(),
        Verdict::Failed => "FAIL".red().bold(),
        Verdict::Skipped => "SKIP".yellow().bold(),
    };
    println!("  {} {}", badge, check.name);

    for note in &check.notes {
        println!("       {}", note.dimmed());
    }
    for error in &check.errors {
        println!("       {} {}", "!".red(), error);
    }
    if let Some(diagnosis) = &check.diagnosis {
        // unknown ids are an expected answer, not worth a diagnosis line
        if diagnosis.is_defect() || !check.passed() {
            println!("       {} {}", "diagnosis:".yellow(), diagnosis.summary());
            for hint in diagnosis.hints() {
                println!("         - {}", hint);
            }
        }
    }
}

pub fn summary(summary: &RunSummary) {
    println!();
    println!("{}", "Summary".bold());
    println!("  Total Tests: {}", summary.total());
    println!("  Passed: {}", summary.passed().to_string().green());
    println!("  Failed: {}", summary.failed().to_string().red());
    println!("  Success Rate: {}", format_rate(summary.success_rate()));

    let errors = summary.errors();
    if !errors.is_empty() {
        println!("\n{}", "Errors:".red().bold());
        for (i, error) in errors.iter().enumerate() {
            println!("  {}. {}", i + 1, error);
        }
    }

    println!();
    if summary.exit_code() == 0 {
        println!("{} Probe run passed", "✓".green());
    } else {
        println!(
            "{} Probe run failed ({} of {} checks did not pass)",
            "✗".red(),
            summary.failed(),
            summary.total()
        );
    }
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.1}%", rate),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(Some(66.666)), "66.7%");
        assert_eq!(format_rate(Some(100.0)), "100.0%");
        assert_eq!(format_rate(None), "n/a");
    }
}
