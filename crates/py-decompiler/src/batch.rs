// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Fan-out over many listings. Each input is decompiled on a blocking task and
//! written next to its source (or under `--output`) with a suffix naming the
//! outcome.

use crate::config::Settings;
use anyhow::{anyhow, Context};
use futures::{stream, StreamExt};
use py_control_flow::{Decompiler, Program, Version, VersionTables, SUPPORTED};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, error, info, warn};

pub const LISTING_EXTENSION: &str = "pyasm";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Okay,
    VerifyFailed,
    Failed,
}

impl Outcome {
    pub fn suffix(self) -> &'static str {
        match self {
            Outcome::Okay => "_dis",
            Outcome::VerifyFailed => "_dis_unverified",
            Outcome::Failed => "_dis_failed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub okay: usize,
    pub failed: usize,
    pub verify_failed: usize,
}

impl Summary {
    fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Okay => self.okay += 1,
            Outcome::VerifyFailed => self.verify_failed += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# decompiled {} files: {} okay, {} failed, {} verify failed",
            self.total, self.okay, self.failed, self.verify_failed
        )
    }
}

/// Version tables built once per batch and shared read-only by every task.
pub struct TableCache {
    tables: BTreeMap<Version, VersionTables>,
}

impl TableCache {
    pub fn new() -> anyhow::Result<Self> {
        let tables = SUPPORTED
            .iter()
            .map(|version| Ok((*version, VersionTables::for_version(*version)?)))
            .collect::<anyhow::Result<_>>()?;
        Ok(Self { tables })
    }

    pub fn get(&self, version: Version) -> anyhow::Result<&VersionTables> {
        self.tables
            .get(&version)
            .ok_or_else(|| anyhow!("unsupported version {}", version))
    }
}

/// Expands directory inputs into the listings they hold.
pub fn collect_inputs(paths: &[PathBuf], recurse: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = vec![];
    for path in paths {
        if path.is_dir() {
            walk(path, recurse, &mut inputs)?;
        } else {
            inputs.push(path.clone());
        }
    }
    Ok(inputs)
}

fn walk(dir: &Path, recurse: bool, inputs: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("reading directory {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            if recurse {
                walk(&path, recurse, inputs)?;
            }
        } else if path.extension().map_or(false, |ext| ext == LISTING_EXTENSION) {
            inputs.push(path);
        }
    }
    Ok(())
}

/// Where the output for `input` goes.
pub fn output_path(input: &Path, output: Option<&Path>, outcome: Outcome) -> PathBuf {
    let stem = input.file_stem().map_or_else(|| "out".into(), |stem| stem.to_string_lossy());
    let name = format!("{}{}.py", stem, outcome.suffix());
    match output {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Decompiles one listing into the text to write and the outcome it earned.
pub fn decompile_text(listing: &str, settings: &Settings, tables: &TableCache) -> (String, Outcome) {
    let mut out = String::new();
    if settings.timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        out.push_str(&format!("# py-decompiler {} at unix time {}\n", env!("CARGO_PKG_VERSION"), secs));
    }

    let program = match Program::parse(listing) {
        Ok(program) => program,
        Err(err) => {
            out.push_str(&format!("# {}\n", err));
            return (out, Outcome::Failed);
        }
    };
    let version = settings.target_version.unwrap_or(program.version);
    let tables = match tables.get(version) {
        Ok(tables) => tables,
        Err(err) => {
            out.push_str(&format!("# {}\n", err));
            return (out, Outcome::Failed);
        }
    };
    out.push_str(&format!("# listing version {}, decompiled with {} tables\n", program.version, version));
    if settings.grammar {
        out.push_str(&format!(
            "# grammar: {} rules over {} nonterminals\n",
            tables.grammar.len(),
            tables.grammar.nonterminals().len()
        ));
        comment(&mut out, &tables.grammar.to_string());
    }
    if settings.asm {
        comment(&mut out, &program.to_string());
    }

    let decompiler = Decompiler::new(tables);
    let decompiled = match decompiler.decompile(&program) {
        Ok(decompiled) => decompiled,
        Err(err) => {
            out.push_str(&format!("# {}\n", err));
            return (out, Outcome::Failed);
        }
    };
    if settings.tree {
        for (id, tree) in &decompiled.trees {
            out.push_str(&format!("# tree for code @{}\n", id));
            comment(&mut out, &tree.to_string());
        }
    }

    let mut outcome = Outcome::Okay;
    if settings.verify {
        let failures = decompiler.verify(&program, &decompiled.trees);
        for failure in &failures {
            out.push_str(&format!("# verify: {}\n", failure));
        }
        if !failures.is_empty() {
            outcome = Outcome::VerifyFailed;
        }
    }
    out.push_str(&decompiled.source);
    (out, outcome)
}

fn comment(out: &mut String, text: &str) {
    for line in text.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
}

fn process(input: &Path, settings: &Settings, tables: &TableCache) -> anyhow::Result<Outcome> {
    let listing = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let (text, outcome) = decompile_text(&listing, settings, tables);
    let path = output_path(input, settings.output.as_deref(), outcome);
    fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    debug!("{} -> {}", input.display(), path.display());
    Ok(outcome)
}

/// Decompiles every input, at most `settings.processes` at a time. Ctrl-C stops
/// dispatch and returns the counts gathered so far.
pub async fn run(inputs: Vec<PathBuf>, settings: Settings) -> anyhow::Result<Summary> {
    if let Some(dir) = &settings.output {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tables = Arc::new(TableCache::new()?);
    let settings = Arc::new(settings);
    info!("decompiling {} inputs with {} workers", inputs.len(), settings.processes);

    let mut jobs = stream::iter(inputs)
        .map(|input| {
            let tables = tables.clone();
            let settings = settings.clone();
            async move {
                let joined = tokio::task::spawn_blocking({
                    let input = input.clone();
                    move || process(&input, &settings, &tables)
                })
                .await;
                (input, joined)
            }
        })
        .buffer_unordered(settings.processes);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let mut summary = Summary::default();
    loop {
        tokio::select! {
            next = jobs.next() => {
                let Some((input, joined)) = next else { break };
                let outcome = match joined {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(err)) => {
                        error!("{}: {:#}", input.display(), err);
                        Outcome::Failed
                    }
                    Err(err) => {
                        error!("{}: task failed: {}", input.display(), err);
                        Outcome::Failed
                    }
                };
                if outcome != Outcome::Okay {
                    warn!("{}: {:?}", input.display(), outcome);
                }
                summary.record(outcome);
            }
            _ = &mut interrupt => {
                warn!("interrupted, {} inputs finished", summary.total);
                break;
            }
        }
    }
    Ok(summary)
}
