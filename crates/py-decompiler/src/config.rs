// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::Args;
use py_control_flow::Version;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Batch options
#[derive(Args, Default, Debug, Clone)]
#[clap(next_help_heading = "Batch Options")]
pub struct BatchConfig {
    /// Directory for decompiled files. Defaults to the directory of each input.
    #[clap(name = "output", long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Number of inputs decompiled in parallel (default: available cores)
    #[clap(name = "processes", long, short = 'p')]
    pub processes: Option<usize>,

    /// Descend into subdirectories of directory inputs
    #[clap(name = "recurse", long, short = 'r')]
    pub recurse: bool,

    /// Re-run every reduction check over the decompiled trees
    #[clap(name = "verify", long)]
    pub verify: bool,

    /// Decompile with the tables of this version instead of each listing's own
    #[clap(name = "target-version", long)]
    pub target_version: Option<Version>,
}

/// Output options
#[derive(Args, Default, Debug, Clone)]
#[clap(next_help_heading = "Output Options")]
pub struct ShowConfig {
    /// Include the normalized token listing in the output
    #[clap(name = "asm", long, short = 'a')]
    pub asm: bool,

    /// Include the parse tree of every code object in the output
    #[clap(name = "tree", long, short = 't')]
    pub tree: bool,

    /// Include the grammar the input was parsed with in the output
    #[clap(name = "grammar", long, short = 'g')]
    pub grammar: bool,

    /// Stamp the output header with the decompilation time
    #[clap(name = "timestamp", long, short = 'd')]
    pub timestamp: bool,
}

/// Values read from a `--config` file. Flags given on the command line win.
#[derive(Deserialize, Default, Debug, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub output: Option<PathBuf>,
    pub processes: Option<usize>,
    pub recurse: Option<bool>,
    pub verify: Option<bool>,
    pub target_version: Option<Version>,
    pub asm: Option<bool>,
    pub tree: Option<bool>,
    pub grammar: Option<bool>,
    pub timestamp: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output: Option<PathBuf>,
    pub processes: usize,
    pub recurse: bool,
    pub verify: bool,
    pub target_version: Option<Version>,
    pub asm: bool,
    pub tree: bool,
    pub grammar: bool,
    pub timestamp: bool,
}

impl Settings {
    pub fn resolve(batch: BatchConfig, show: ShowConfig, file: FileConfig) -> Self {
        let processes = batch
            .processes
            .or(file.processes)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from))
            .max(1);
        Self {
            output: batch.output.or(file.output),
            processes,
            recurse: batch.recurse || file.recurse.unwrap_or(false),
            verify: batch.verify || file.verify.unwrap_or(false),
            target_version: batch.target_version.or(file.target_version),
            asm: show.asm || file.asm.unwrap_or(false),
            tree: show.tree || file.tree.unwrap_or(false),
            grammar: show.grammar || file.grammar.unwrap_or(false),
            timestamp: show.timestamp || file.timestamp.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_config_file() {
        let file: FileConfig = toml::from_str(
            r#"
            output = "out"
            processes = 3
            verify = true
            target-version = "3.7"
            tree = true
            "#,
        )
        .unwrap();
        assert_eq!(file.target_version, Some(Version::new(3, 7)));

        let batch = BatchConfig {
            processes: Some(8),
            target_version: Some(Version::new(3, 8)),
            ..Default::default()
        };
        let settings = Settings::resolve(batch, ShowConfig::default(), file);
        assert_eq!(settings.output, Some(PathBuf::from("out")));
        assert_eq!(settings.processes, 8);
        assert!(settings.verify);
        assert!(settings.tree);
        assert!(!settings.asm);
        assert_eq!(settings.target_version, Some(Version::new(3, 8)));
    }

    #[test]
    fn unknown_keys_are_refused() {
        assert!(toml::from_str::<FileConfig>("recursive = true").is_err());
    }

    #[test]
    fn zero_processes_still_runs() {
        let batch = BatchConfig {
            processes: Some(0),
            ..Default::default()
        };
        assert_eq!(Settings::resolve(batch, ShowConfig::default(), FileConfig::default()).processes, 1);
    }
}
