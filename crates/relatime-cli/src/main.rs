mod config;

use std::thread;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use relatime::{Formatter, Ticker, Timestamp};
use tracing_subscriber::EnvFilter;

use crate::config::{CliArgs, CliConfig};

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = CliArgs::parse();
    let CliConfig {
        config,
        inputs,
        watch,
    } = CliConfig::try_from(args)?;
    let formatter = Formatter::new(config);
    log_startup_info(inputs.len(), watch, &formatter);

    // Unparseable inputs are reported and skipped, never fatal on their own.
    let mut rendered: Vec<(String, Timestamp)> = Vec::with_capacity(inputs.len());
    for input in inputs {
        match formatter.parse(&input) {
            Ok(then) => rendered.push((input, then)),
            Err(err) => tracing::warn!("skipping input: {err}"),
        }
    }
    if rendered.is_empty() {
        bail!("none of the inputs could be parsed");
    }

    let mut render_all = {
        let formatter = formatter.clone();
        move || {
            if let [(_, then)] = rendered.as_slice() {
                println!("{}", formatter.format(*then));
            } else {
                for (input, then) in &rendered {
                    println!("{input}  {}", formatter.format(*then));
                }
            }
        }
    };

    render_all();
    if watch {
        let every = Duration::from_millis(formatter.config().refresh_millis);
        let _ticker = Ticker::spawn(every, render_all);
        loop {
            thread::park();
        }
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn log_startup_info(inputs: usize, watch: bool, formatter: &Formatter) {
    if cfg!(debug_assertions) {
        tracing::debug!(
            "Rendering {inputs} input(s) with full config: {:#?}",
            formatter.config()
        );
    } else {
        tracing::debug!("Rendering {inputs} input(s), watch = {watch}");
    }
}
