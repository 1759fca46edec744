use mixprime_core::{Candidate, Config, ThresholdValidator, Validator};

pub struct InspectCommandConfig<'a> {
    pub value: &'a str,
    pub config_path: Option<&'a str>,
    pub cases: usize,
    pub json: bool,
}

pub fn run(cfg: InspectCommandConfig<'_>) {
    let value = match super::parse_value(cfg.value) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let mut config = super::load_config(cfg.config_path);
    config.avalanche_test_cases = cfg.cases.max(1);
    config.statistical_analysis = true;

    let candidate = Candidate::measure(value, &config);

    if cfg.json {
        match serde_json::to_string_pretty(&candidate) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing candidate: {e}");
                std::process::exit(1);
            }
        }
        return;
    }
    println!("{}", report(&candidate, &config).join("\n"));
}

/// Human-readable breakdown of one constant against `config`'s gates.
pub fn report(c: &Candidate, config: &Config) -> Vec<String> {
    let mark = |ok: bool| if ok { "pass" } else { "FAIL" };
    let results = &c.test_results;

    let mut lines = vec![
        format!("Constant {:#010X} ({})", c.value, c.value),
        String::new(),
        format!("  Prime:            {}", mark(results.primality_passed())),
        format!("  Hamming Weight:   {}", c.hamming_weight),
        format!("  Bit Distribution: {:.4}", c.bit_distribution),
        format!("  Entropy Score:    {:.4}", c.entropy_score),
        format!(
            "  Avalanche Score:  {:.4} ({} trials)",
            c.avalanche_score, config.avalanche_test_cases
        ),
        String::new(),
        "Weak-Key Tests:".to_string(),
    ];
    for t in &results.weak_key {
        lines.push(format!("  {}: {} ({})", t.pattern, mark(t.passed), t.details));
    }

    // Serial run keeps the listing in battery order.
    let battery = mixprime_tests::run_all_tests_serial(c.value);
    lines.push(String::new());
    lines.push("Statistical Tests:".to_string());
    for t in &battery {
        let p = t
            .p_value
            .map(|p| format!(", p={p:.4}"))
            .unwrap_or_default();
        lines.push(format!("  {}: {:.4} ({}{p})", t.name, t.score, mark(t.passed)));
        lines.push(format!("    {}", t.details));
    }
    lines.push(format!(
        "  Aggregate: {:.4}, {:.0}% passed",
        mixprime_tests::aggregate_score(&battery),
        mixprime_tests::pass_ratio(&battery) * 100.0
    ));

    lines.push(String::new());
    let verdict = if !results.primality_passed() {
        "REJECTED: not prime".to_string()
    } else {
        match ThresholdValidator::from_config(config).check(c) {
            Ok(()) => "ACCEPTED".to_string(),
            Err(reason) => format!("REJECTED: {reason}"),
        }
    };
    lines.push(format!("Verdict: {verdict}"));
    lines.push(format!("Overall Score: {:.4}", c.overall_score()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            avalanche_test_cases: 200,
            diffusion_seed: Some(5),
            ..Config::default()
        }
    }

    #[test]
    fn test_report_accepts_clean_prime() {
        let config = config();
        let c = Candidate::measure(0x2749_959B, &config);
        let text = report(&c, &config).join("\n");
        assert!(text.contains("Constant 0x2749959B"));
        assert!(text.contains("Prime:            pass"));
        assert!(text.contains("Linear Complexity Test"));
        assert!(text.contains("Verdict: ACCEPTED"));
    }

    #[test]
    fn test_report_rejects_composite() {
        let config = config();
        let c = Candidate::measure(0x2749_959C, &config);
        let text = report(&c, &config).join("\n");
        assert!(text.contains("Verdict: REJECTED: not prime"));
    }

    #[test]
    fn test_report_names_failed_gate() {
        let config = config();
        let c = Candidate::measure(0x0000_0101, &config);
        let text = report(&c, &config).join("\n");
        assert!(text.contains("REJECTED"));
    }
}
