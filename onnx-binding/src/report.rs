//! Console reporting of raw output tensors

use std::fmt::Display;
use std::io::{self, Write};

/// Element class of an output tensor
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTensor {
    Float(Vec<f32>),
    /// Any signed or unsigned integer width, widened to i64
    Int(Vec<i64>),
    Bool(Vec<bool>),
    /// Anything else; holds a description of the actual type
    Unsupported(String),
}

/// One named output of a session run; `value` is `None` when the runtime
/// produced nothing for the name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedOutput {
    pub name: String,
    pub value: Option<OutputTensor>,
}

impl NamedOutput {
    pub fn new(name: &str, value: Option<OutputTensor>) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    pub fn floats(&self) -> Option<&[f32]> {
        match &self.value {
            Some(OutputTensor::Float(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn ints(&self) -> Option<&[i64]> {
        match &self.value {
            Some(OutputTensor::Int(v)) => Some(v.as_slice()),
            _ => None,
        }
    }
}

fn first<T: Display>(name: &str, values: &[T]) -> String {
    match values.first() {
        Some(v) => format!("{}: {}", name, v),
        None => format!("{} returned a null value.", name),
    }
}

/// Report line for one output
pub fn describe(output: &NamedOutput) -> String {
    let name = output.name.as_str();
    match &output.value {
        None => format!("{} returned a null value.", name),
        Some(OutputTensor::Float(v)) => first(name, v),
        Some(OutputTensor::Int(v)) => first(name, v),
        Some(OutputTensor::Bool(v)) => first(name, v),
        Some(OutputTensor::Unsupported(_)) => {
            format!("{} has an unexpected type or structure.", name)
        }
    }
}

/// Print one line per output; a missing value never stops the report
pub fn report_outputs<W: Write>(outputs: &[NamedOutput], out: &mut W) -> io::Result<()> {
    for output in outputs {
        if let Some(OutputTensor::Unsupported(actual)) = &output.value {
            tracing::debug!(output = %output.name, actual = %actual, "unsupported output type");
        }
        writeln!(out, "{}", describe(output))?;
    }
    Ok(())
}
