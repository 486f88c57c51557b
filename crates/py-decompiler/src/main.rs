// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::*;
use colored::Colorize;
use config::{BatchConfig, FileConfig, Settings, ShowConfig};
use tracing::{debug, Level};

mod batch;
mod config;

#[derive(Parser)]
#[clap(
    name = env!("CARGO_BIN_NAME"),
    about = "Decompiles bytecode listings back to source. Directory inputs are searched for *.pyasm listings; each input is written as <name>_dis.py, <name>_dis_unverified.py or <name>_dis_failed.py",
    rename_all = "kebab-case",
    author,
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Args {
    /// Listing files or directories of listings
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,

    /// TOML file with defaults for the options below
    #[clap(long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Log reductions and rejections
    #[clap(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Batch options
    #[clap(flatten)]
    pub batch_config: BatchConfig,

    /// Output options
    #[clap(flatten)]
    pub show_config: ShowConfig,
}

async fn execute(args: Args) -> anyhow::Result<()> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(args.batch_config, args.show_config, file);
    let inputs = batch::collect_inputs(&args.inputs, settings.recurse)?;
    if inputs.is_empty() {
        anyhow::bail!("no listings found");
    }
    let summary = batch::run(inputs, settings).await?;
    println!("{}", summary);
    Ok(())
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).unwrap();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    debug!("py-decompiler version: {}", env!("CARGO_PKG_VERSION"));

    match execute(args).await {
        Ok(_) => (),
        Err(err) => {
            let err = format!("{:?}", err);
            println!("{}", err.bold().red());
            std::process::exit(1);
        }
    }
}
