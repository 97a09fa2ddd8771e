// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-driven plugin descriptors.
//!
//! A plugin is pure data: a container image, an argv template, and the
//! file names it reads and writes inside its working directory. There is
//! no runtime code loading — the worker registers the built-in table at
//! startup, and the coordinator consults only the output-name contract
//! when naming task output artifacts.

use crate::shard::SHARD_INDEX_WIDTH;
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};

/// One token of an argv template.
///
/// Templates are parsed from strings: `{param:NAME}` substitutes a job
/// parameter, `{input:NAME}` / `{output:NAME}` substitute working-directory
/// file paths, and `{inputs}` expands to every task input path in order
/// (used by reduce plugins that consume N inputs). Anything else is a
/// literal, including malformed placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgvToken {
    Literal(String),
    Param(String),
    Input(String),
    Output(String),
    AllInputs,
}

impl ArgvToken {
    pub fn parse(token: &str) -> Self {
        if token == "{inputs}" {
            return ArgvToken::AllInputs;
        }
        if let Some(body) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
            if let Some((tag, name)) = body.split_once(':') {
                if !name.is_empty() {
                    match tag {
                        "param" => return ArgvToken::Param(name.to_string()),
                        "input" => return ArgvToken::Input(name.to_string()),
                        "output" => return ArgvToken::Output(name.to_string()),
                        _ => {}
                    }
                }
            }
        }
        ArgvToken::Literal(token.to_string())
    }
}

/// Invocation contract for one plugin kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Key matching task `plugin_kind`.
    pub kind: String,
    /// Container image reference.
    pub image: String,
    pub argv: Vec<ArgvToken>,
    /// File names the plugin reads, staged positionally from the task's
    /// input artifacts. Empty means variadic: inputs keep their artifact
    /// names and `{inputs}` expands them all.
    pub expected_inputs: Vec<String>,
    /// File names the plugin writes on success.
    pub expected_outputs: Vec<String>,
}

impl PluginDescriptor {
    pub fn new(
        kind: &str,
        image: &str,
        argv: &[&str],
        expected_inputs: &[&str],
        expected_outputs: &[&str],
    ) -> Self {
        Self {
            kind: kind.to_string(),
            image: image.to_string(),
            argv: argv.iter().map(|t| ArgvToken::parse(t)).collect(),
            expected_inputs: expected_inputs.iter().map(|s| s.to_string()).collect(),
            expected_outputs: expected_outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Variadic plugins take all task inputs under their artifact names.
    pub fn is_variadic(&self) -> bool {
        self.expected_inputs.is_empty()
    }
}

/// The built-in plugin table.
pub fn builtin_descriptors() -> Vec<PluginDescriptor> {
    vec![
        PluginDescriptor::new(
            "hashcat",
            "crowd-hashcat-cpu:latest",
            &[
                "hashcat",
                "-m",
                "{param:hash_mode}",
                "-a",
                "0",
                "--potfile-disable",
                "--outfile",
                "{output:result.txt}",
                "{param:target_hash}",
                "{input:wordlist.txt}",
            ],
            &["wordlist.txt"],
            &["result.txt"],
        ),
        PluginDescriptor::new(
            "sort_map",
            "crowd-sort:latest",
            &["sort", "-o", "{output:sorted.txt}", "{input:shard.txt}"],
            &["shard.txt"],
            &["sorted.txt"],
        ),
        PluginDescriptor::new(
            "sort_reduce",
            "crowd-sort:latest",
            &["sort", "-m", "-o", "{output:final.txt}", "{inputs}"],
            &[],
            &["final.txt"],
        ),
    ]
}

fn descriptor_outputs(plugin_kind: &str) -> Vec<String> {
    builtin_descriptors()
        .into_iter()
        .find(|d| d.kind == plugin_kind)
        .map(|d| d.expected_outputs)
        // Unknown kinds are accepted at submit; their tasks fail at the
        // workers with PluginUnknown before any output exists.
        .unwrap_or_else(|| vec!["output".to_string()])
}

/// Output artifact names the coordinator assigns to a task.
///
/// Single and reduce tasks use the plugin's output names verbatim, so a
/// job's final output keeps its client-visible name (`result.txt`,
/// `final.txt`). Map task outputs are prefixed with the zero-padded shard
/// index (`map-0003-sorted.txt`) so the N fan-out outputs are distinct
/// artifacts that order naturally by shard.
pub fn output_names(plugin_kind: &str, kind: TaskKind, shard_index: Option<u32>) -> Vec<String> {
    let outputs = descriptor_outputs(plugin_kind);
    match (kind, shard_index) {
        (TaskKind::Map, Some(idx)) => outputs
            .into_iter()
            .map(|name| format!("map-{:0width$}-{}", idx, name, width = SHARD_INDEX_WIDTH))
            .collect(),
        _ => outputs,
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
