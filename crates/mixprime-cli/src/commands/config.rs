use mixprime_core::Config;

pub fn run() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing configuration: {e}");
            std::process::exit(1);
        }
    }
}
