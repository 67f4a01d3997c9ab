use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use foxvm_cli::{link_application, load_graph};
use foxvm_config::{init_tracing, TranslatorConfig};

#[derive(Parser)]
#[command(
    name = "foxvm-translator",
    version,
    about = "Pre-resolve JVM classes ahead of translation"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Runtime library class directory or jar (repeatable, appended to the configured ones)
    #[arg(long = "runtime-classpath", value_name = "PATH")]
    runtime_classpath: Vec<PathBuf>,
    /// Application class directory or jar (repeatable, appended to the configured ones)
    #[arg(long = "classpath", value_name = "PATH")]
    classpath: Vec<PathBuf>,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => TranslatorConfig::load_from_path(path)?,
        None => TranslatorConfig::default(),
    };
    config.classpath.runtime.extend(cli.runtime_classpath);
    config.classpath.application.extend(cli.classpath);
    init_tracing(&config.logging);

    let mut graph = load_graph(&config.classpath).context("failed to load classpath")?;
    let summaries = match link_application(&mut graph, &config.link) {
        Ok(summaries) => summaries,
        Err(err) => {
            tracing::error!(target = "foxvm.cli", class = err.class(), "linkage failed");
            eprintln!("linkage error: {err}");
            return Ok(1);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{summary}");
        }
    }
    Ok(0)
}
