// Module declarations
mod batch;
mod card;
mod cli;
mod config;
mod config_file;
mod gemini;
mod identify;
mod prompt;
mod reference;
mod report;
mod scan;
mod util;

// Re-export module items at crate root so cross-module references stay short.
#[allow(unused_imports)]
pub(crate) use batch::*;
#[allow(unused_imports)]
pub(crate) use card::*;
#[allow(unused_imports)]
pub(crate) use cli::*;
#[allow(unused_imports)]
pub(crate) use config::*;
#[allow(unused_imports)]
pub(crate) use config_file::*;
#[allow(unused_imports)]
pub(crate) use gemini::*;
#[allow(unused_imports)]
pub(crate) use identify::*;
#[allow(unused_imports)]
pub(crate) use prompt::*;
#[allow(unused_imports)]
pub(crate) use reference::*;
#[allow(unused_imports)]
pub(crate) use report::*;
#[allow(unused_imports)]
pub(crate) use scan::*;
#[allow(unused_imports)]
pub(crate) use util::*;

use std::path::Path;
use std::thread;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARDSCAN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("cardscan=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_settings(cli: &Cli) -> RunSettings {
    let file = load_file_config(&config_file_path(cli.config.as_deref()));
    match RunSettings::resolve(&cli.command.overrides(), &file, env_optional) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(2);
        }
    }
}

fn api_key_or_exit() -> String {
    match require_api_key(env_optional) {
        Ok(key) => key,
        Err(err) => {
            eprintln!("Configuration error: {err}. Set {API_KEY_VAR} in the environment.");
            std::process::exit(2);
        }
    }
}

fn load_examples(dir: &Path) -> Vec<ExamplePair> {
    let scan = load_example_pairs(dir);
    if scan.is_missing() {
        tracing::warn!(dir = %dir.display(), "examples directory not found; continuing without reference examples");
    }
    scan.into_vec()
}

fn print_retry(prefix: &str, notice: RetryNotice) {
    eprintln!(
        "{prefix} retry {}/{} in {}s",
        notice.attempt,
        notice.max_retries,
        notice.delay.as_secs()
    );
}

fn run_scan(settings: &RunSettings, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let client = GeminiClient::new(settings.gemini_settings(api_key_or_exit()));
    let examples = load_examples(&settings.examples_dir);

    let discovered = discover_images(&settings.input_dir);
    if discovered.items().is_empty() {
        let note = if discovered.is_missing() {
            " (directory not found)"
        } else {
            ""
        };
        println!(
            "No card images found in {}{note}",
            settings.input_dir.display()
        );
        return Ok(());
    }
    let images = discovered.into_vec();
    let total = images.len();
    tracing::info!(
        images = total,
        examples = examples.len(),
        model = %settings.model,
        "starting batch"
    );

    let identifier = Identifier::new(&client, &examples);
    let results = run_batch(&images, settings.pacing, thread::sleep, |index, path| {
        let prefix = format!("[{}/{}] {}", index + 1, total, file_name_of(path));
        eprintln!("{prefix}");
        let mut notify = |notice: RetryNotice| print_retry(&prefix, notice);
        Ok(identifier.identify_detailed(path, settings.max_retries, Some(&mut notify)))
    });

    let summary = summarize(&results);
    tracing::info!(
        identified = summary.identified,
        failed = summary.failed,
        "batch finished"
    );
    if json {
        let source = settings.input_dir.display().to_string();
        println!("{}", serde_json::to_string_pretty(&json_report(&source, &results))?);
    } else {
        println!("{}", summary_line(&summary));
        println!("{}", render_table(&results));
    }
    Ok(())
}

fn run_identify(
    settings: &RunSettings,
    image: &Path,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let client = GeminiClient::new(settings.gemini_settings(api_key_or_exit()));
    let examples = load_examples(&settings.examples_dir);
    let identifier = Identifier::new(&client, &examples);

    let file_name = file_name_of(image);
    let mut notify = |notice: RetryNotice| print_retry(&file_name, notice);
    let result = identifier
        .identify_detailed(image, settings.max_retries, Some(&mut notify))
        .into_result(file_name.clone());
    let identified = result.outcome.card().is_some();
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_table(std::slice::from_ref(&result)));
    }
    Ok(identified)
}

fn run_examples(settings: &RunSettings, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scan = load_example_pairs(&settings.examples_dir);
    if scan.is_missing() {
        println!(
            "Examples directory not found: {}",
            settings.examples_dir.display()
        );
        return Ok(());
    }
    let pairs = scan.into_vec();
    if json {
        let listing: Vec<serde_json::Value> = pairs
            .iter()
            .map(|pair| {
                serde_json::json!({
                    "name": pair.name,
                    "image": pair.image_path.display().to_string(),
                    "card": pair.card,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }
    println!(
        "{} example(s) in {}",
        pairs.len(),
        settings.examples_dir.display()
    );
    for pair in &pairs {
        println!(
            "  {} -> {} ({}, {})",
            file_name_of(&pair.image_path),
            pair.card.card_name,
            pair.card.set_code,
            pair.card.rarity
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let settings = resolve_settings(&cli);

    match &cli.command {
        Command::Scan { json, .. } => run_scan(&settings, *json),
        Command::Identify { image, json, .. } => {
            if !run_identify(&settings, image, *json)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Examples { json, .. } => run_examples(&settings, *json),
    }
}
