//! Text, JSON and CSV renderings of a finished run.

use mixprime_core::{Candidate, GenerationResult};

pub const CSV_HEADER: &str =
    "Constant,Value,BitDistribution,AvalancheScore,EntropyScore,HammingWeight";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Text,
        }
    }
}

pub fn render_text(result: &GenerationResult, verbose: bool) -> String {
    let mut lines = vec![
        format!("Generation completed in {} ms", result.duration_ms),
        String::new(),
        "Selected Constants:".to_string(),
        format!("P: {:#010X}", result.selected_p.value),
        format!("Q: {:#010X}", result.selected_q.value),
    ];
    if result.fallback_used {
        lines.push("  (Q chosen by second-best fallback; pair is not sufficiently different)".into());
    }

    if verbose {
        lines.push(String::new());
        lines.push("Detailed Analysis:".to_string());
        lines.push("P Constant:".to_string());
        constant_analysis(&result.selected_p, &mut lines);
        lines.push(String::new());
        lines.push("Q Constant:".to_string());
        constant_analysis(&result.selected_q, &mut lines);
    }

    lines.push(String::new());
    lines.push("Pair Diagnostics:".to_string());
    lines.push(format!("  Hamming Distance: {}", result.pair.hamming_distance));
    lines.push(format!("  Bit Correlation: {:.4}", result.pair.bit_correlation));
    lines.push(format!(
        "  Combined Avalanche: {:.4}",
        result.pair.combined_avalanche
    ));

    lines.push(String::new());
    lines.push("Overall Statistical Analysis:".to_string());
    lines.push(format!(
        "Total Candidates Accepted: {} of {} attempts ({} rejected, {} failed)",
        result.total_candidates, result.attempts, result.rejected, result.failed_attempts
    ));
    lines.push(format!("Generation Time: {} ms", result.duration_ms));
    lines.push(format!(
        "P Constant Overall Score: {:.4}",
        result.selected_p.overall_score()
    ));
    lines.push(format!(
        "Q Constant Overall Score: {:.4}",
        result.selected_q.overall_score()
    ));
    lines.join("\n")
}

fn constant_analysis(c: &Candidate, lines: &mut Vec<String>) {
    lines.push(format!("  Value: {:#010X}", c.value));
    lines.push(format!("  Bit Distribution: {:.4}", c.bit_distribution));
    lines.push(format!("  Avalanche Score: {:.4}", c.avalanche_score));
    lines.push(format!("  Entropy Score: {:.4}", c.entropy_score));
    lines.push(format!("  Hamming Weight: {}", c.hamming_weight));

    if !c.test_results.statistical.is_empty() {
        lines.push("  Statistical Tests:".to_string());
        for test in &c.test_results.statistical {
            let verdict = if test.passed { "pass" } else { "FAIL" };
            lines.push(format!("    {}: {:.4} ({verdict})", test.name, test.score));
            if !test.details.is_empty() {
                lines.push(format!("      {}", test.details));
            }
        }
    }
}

pub fn render_json(result: &GenerationResult) -> serde_json::Result<String> {
    result.to_json_pretty()
}

pub fn render_csv(result: &GenerationResult) -> String {
    let row = |label: &str, c: &Candidate| {
        format!(
            "{label},{:#010X},{:.4},{:.4},{:.4},{}",
            c.value, c.bit_distribution, c.avalanche_score, c.entropy_score, c.hamming_weight
        )
    };
    [
        CSV_HEADER.to_string(),
        row("P", &result.selected_p),
        row("Q", &result.selected_q),
    ]
    .join("\n")
        + "\n"
}

/// Side-by-side view of a new run against a previously saved one.
pub fn render_comparison(new: &GenerationResult, existing: &GenerationResult) -> String {
    [
        "Comparing with existing constants:".to_string(),
        String::new(),
        "Existing Constants:".to_string(),
        format!("P: {:#010X}", existing.selected_p.value),
        format!("Q: {:#010X}", existing.selected_q.value),
        String::new(),
        "Statistical Comparison:".to_string(),
        "                      New     Existing".to_string(),
        format!(
            "P Avalanche Score: {:.4}  vs  {:.4}",
            new.selected_p.avalanche_score, existing.selected_p.avalanche_score
        ),
        format!(
            "Q Avalanche Score: {:.4}  vs  {:.4}",
            new.selected_q.avalanche_score, existing.selected_q.avalanche_score
        ),
        format!(
            "Pair Distance:     {:>6}  vs  {:>6}",
            new.pair.hamming_distance, existing.pair.hamming_distance
        ),
    ]
    .join("\n")
}
