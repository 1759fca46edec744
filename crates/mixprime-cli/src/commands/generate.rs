use std::sync::Arc;

use mixprime_core::{Config, GenerationResult, Generator, SeededRandom};

use super::output::{self, OutputFormat};

pub struct GenerateCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub format: &'a str,
    pub output_path: Option<&'a str>,
    pub quick: bool,
    pub verbose: bool,
    pub workers: Option<usize>,
    pub candidates: Option<usize>,
    pub seed: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub fallback: Option<&'a str>,
    pub compare_path: Option<&'a str>,
}

/// Apply command-line overrides on top of a loaded config.
pub fn build_config(base: Config, cfg: &GenerateCommandConfig<'_>) -> Config {
    let mut config = if cfg.quick { base.quick() } else { base };
    if let Some(workers) = cfg.workers {
        config.worker_count = workers;
    }
    if let Some(candidates) = cfg.candidates {
        config.candidate_count = candidates;
    }
    if let Some(secs) = cfg.timeout_secs {
        config.timeout_secs = secs;
    }
    if let Some(name) = cfg.fallback {
        config.selection_fallback = super::parse_fallback(name);
    }
    if config.diffusion_seed.is_none() {
        config.diffusion_seed = cfg.seed;
    }
    config
}

pub fn run(cfg: GenerateCommandConfig<'_>) {
    let config = build_config(super::load_config(cfg.config_path), &cfg);
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    let format = OutputFormat::parse(cfg.format);

    if cfg.quick {
        log::info!("Running in quick mode with reduced parameters");
    }

    let mut generator = Generator::new(config);
    if let Some(seed) = cfg.seed {
        generator = generator.with_source(Arc::new(SeededRandom::new(seed)));
    }

    let token = generator.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        log::warn!("Could not install Ctrl+C handler: {e}");
    }

    if format == OutputFormat::Text {
        println!("Starting constant generation and analysis...");
    }
    let result = match generator.generate() {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error generating constants: {e}");
            std::process::exit(1);
        }
    };

    emit(&result, format, &cfg);

    if let Some(path) = cfg.compare_path {
        match load_result(path) {
            Ok(existing) => println!("\n{}", output::render_comparison(&result, &existing)),
            Err(e) => eprintln!("Error reading comparison file {path}: {e}"),
        }
    }
}

fn emit(result: &GenerationResult, format: OutputFormat, cfg: &GenerateCommandConfig<'_>) {
    let rendered = match format {
        OutputFormat::Text => {
            println!("\n{}", output::render_text(result, cfg.verbose));
            // Text goes to the terminal; a file, if requested, gets the full JSON.
            match output::render_json(result) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error generating JSON output: {e}");
                    return;
                }
            }
        }
        OutputFormat::Json => match output::render_json(result) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error generating JSON output: {e}");
                std::process::exit(1);
            }
        },
        OutputFormat::Csv => output::render_csv(result),
    };

    match cfg.output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &rendered) {
                eprintln!("Error writing to output file {path}: {e}");
                std::process::exit(1);
            }
            if format == OutputFormat::Text {
                println!("\nDetailed results saved to: {path}");
            }
        }
        None if format != OutputFormat::Text => print!("{rendered}"),
        None => {}
    }
}

fn load_result(path: &str) -> Result<GenerationResult, String> {
    let data = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    GenerationResult::from_json(&data).map_err(|e| e.to_string())
}
