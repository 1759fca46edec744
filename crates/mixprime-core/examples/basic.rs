//! Quick constant search.
//!
//! Runs a reduced search with OS randomness and prints the chosen pair.
//!
//! Run: `cargo run --example basic`

use mixprime_core::{Config, Generator};

fn main() {
    let generator = Generator::new(Config::default().quick());

    match generator.generate() {
        Ok(result) => {
            println!("P = {:#010X}", result.selected_p.value);
            println!("Q = {:#010X}", result.selected_q.value);
            println!(
                "{} of {} attempts accepted in {} ms",
                result.total_candidates, result.attempts, result.duration_ms
            );
        }
        Err(e) => eprintln!("generation failed: {e}"),
    }
}
