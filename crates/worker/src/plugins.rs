// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side plugin registry and argv rendering.
//!
//! The registry is a static table built once at startup from the shared
//! descriptor data. Rendering substitutes `{param:}`/`{input:}`/
//! `{output:}`/`{inputs}` placeholders with plain file names relative to
//! the container working directory.

use std::collections::{BTreeMap, HashMap};

use cc_core::{builtin_descriptors, ArgvToken, PluginDescriptor};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("argv template references undefined parameter {0:?}")]
    MissingParam(String),

    #[error("argv template references undeclared input {0:?}")]
    UnknownInput(String),

    #[error("task carries {got} inputs but the plugin declares {expected}")]
    InputArity { expected: usize, got: usize },
}

/// Plugin kind → descriptor, registered at startup.
pub struct PluginRegistry {
    table: HashMap<String, PluginDescriptor>,
}

impl PluginRegistry {
    /// The built-in table: hashcat, sort_map, sort_reduce.
    pub fn builtin() -> Self {
        Self::from_descriptors(builtin_descriptors())
    }

    pub fn from_descriptors(descriptors: Vec<PluginDescriptor>) -> Self {
        let table = descriptors.into_iter().map(|d| (d.kind.clone(), d)).collect();
        Self { table }
    }

    pub fn get(&self, kind: &str) -> Option<&PluginDescriptor> {
        self.table.get(kind)
    }
}

/// File names to stage the task's input artifacts under, positionally.
///
/// A fixed-arity plugin reads its declared names; a variadic plugin
/// (empty `expected_inputs`) keeps the artifact names.
pub fn staged_input_names(
    descriptor: &PluginDescriptor,
    task_inputs: &[String],
) -> Result<Vec<String>, InvocationError> {
    if descriptor.is_variadic() {
        return Ok(task_inputs.to_vec());
    }
    if descriptor.expected_inputs.len() != task_inputs.len() {
        return Err(InvocationError::InputArity {
            expected: descriptor.expected_inputs.len(),
            got: task_inputs.len(),
        });
    }
    Ok(descriptor.expected_inputs.clone())
}

/// Render the argv template against the staged inputs and job params.
pub fn render_argv(
    descriptor: &PluginDescriptor,
    staged_inputs: &[String],
    params: &BTreeMap<String, String>,
) -> Result<Vec<String>, InvocationError> {
    let mut argv = Vec::with_capacity(descriptor.argv.len());
    for token in &descriptor.argv {
        match token {
            ArgvToken::Literal(s) => argv.push(s.clone()),
            ArgvToken::Param(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| InvocationError::MissingParam(name.clone()))?;
                argv.push(value.clone());
            }
            ArgvToken::Input(name) => {
                if !staged_inputs.iter().any(|i| i == name) {
                    return Err(InvocationError::UnknownInput(name.clone()));
                }
                argv.push(name.clone());
            }
            ArgvToken::Output(name) => argv.push(name.clone()),
            ArgvToken::AllInputs => argv.extend(staged_inputs.iter().cloned()),
        }
    }
    Ok(argv)
}

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
