//! Input tensors, declared slots and the record feeding plan

use crate::core::unified_error::{errors, UnifiedResult};
use ml_wine_clustering::{FeatureAssembler, WineRecord};
use std::collections::HashMap;

/// Element class shared by slot signatures and extracted outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementClass {
    Float,
    Int,
    Bool,
    Other(String),
}

/// A named input or output as declared by a loaded graph
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSlot {
    pub name: String,
    pub element: ElementClass,
    /// `None` marks a symbolic dimension
    pub dims: Vec<Option<i64>>,
    /// Symbol name per dimension; symbolic dims sharing a name must agree
    /// across all feeds
    pub symbols: Vec<Option<String>>,
}

/// `[N, 1]` style rendering of declared dims
pub fn format_dims(dims: &[Option<i64>]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|d| match d {
            Some(v) => v.to_string(),
            None => "N".to_string(),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

fn format_shape(shape: &[usize]) -> String {
    let parts: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl TensorSlot {
    /// Slot with no named symbolic dimensions
    pub fn new(name: &str, element: ElementClass, dims: Vec<Option<i64>>) -> Self {
        Self {
            name: name.to_string(),
            element,
            symbols: vec![None; dims.len()],
            dims,
        }
    }

    /// Name symbolic dimensions, in dim order
    pub fn with_symbols(mut self, symbols: Vec<Option<String>>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn describe(&self) -> String {
        format!("float32 {}", format_dims(&self.dims))
    }

    /// Check a tensor against this slot's declared element type and shape
    pub fn check(&self, tensor: &InputTensor) -> UnifiedResult<()> {
        if self.element != ElementClass::Float {
            return Err(errors::shape_mismatch(
                &self.name,
                &format!("{:?} elements", self.element),
                "float32 elements",
            ));
        }

        let rank_matches = self.dims.len() == tensor.shape.len();
        let dims_match = rank_matches
            && self
                .dims
                .iter()
                .zip(&tensor.shape)
                .all(|(declared, &actual)| declared.map_or(true, |d| d == actual as i64));

        if !dims_match {
            return Err(errors::shape_mismatch(
                &self.name,
                &self.describe(),
                &format!("float32 {}", format_shape(&tensor.shape)),
            ));
        }

        let expected_len: usize = tensor.shape.iter().product();
        if expected_len != tensor.data.len() {
            return Err(errors::shape_mismatch(
                &self.name,
                &format!("{} values for shape {}", expected_len, format_shape(&tensor.shape)),
                &format!("{} values", tensor.data.len()),
            ));
        }

        Ok(())
    }
}

/// A named dense `f32` tensor to feed to a session
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl InputTensor {
    pub fn new(name: &str, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            shape,
            data,
        }
    }

    /// `[1, 1]` tensor holding one value
    pub fn scalar(name: &str, value: f32) -> Self {
        Self::new(name, vec![1, 1], vec![value])
    }
}

/// Validate a full set of feeds against declared input slots
///
/// Every slot must be fed exactly once and every feed must name a slot.
/// A named symbolic dimension is bound by the first feed that uses it.
pub fn check_feeds(slots: &[TensorSlot], feeds: &[InputTensor]) -> UnifiedResult<()> {
    let mut bound: HashMap<&str, (usize, &str)> = HashMap::new();

    for (i, feed) in feeds.iter().enumerate() {
        let slot = slots
            .iter()
            .find(|s| s.name == feed.name)
            .ok_or_else(|| errors::shape_mismatch(&feed.name, "a declared graph input", "unknown input name"))?;

        if feeds[..i].iter().any(|f| f.name == feed.name) {
            return Err(errors::shape_mismatch(&feed.name, "one tensor", "duplicate tensors"));
        }

        slot.check(feed)?;

        for (symbol, &actual) in slot.symbols.iter().zip(&feed.shape) {
            let Some(symbol) = symbol.as_deref() else {
                continue;
            };
            match bound.get(symbol) {
                Some(&(value, source)) if value != actual => {
                    return Err(errors::shape_mismatch(
                        &feed.name,
                        &format!("{} = {} (bound by '{}')", symbol, value, source),
                        &format!("{} = {}", symbol, actual),
                    ));
                }
                Some(_) => {}
                None => {
                    bound.insert(symbol, (actual, feed.name.as_str()));
                }
            }
        }
    }

    for slot in slots {
        if !feeds.iter().any(|f| f.name == slot.name) {
            return Err(errors::shape_mismatch(&slot.name, &slot.describe(), "no tensor"));
        }
    }

    Ok(())
}

/// How a record is turned into session inputs
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPlan {
    /// One `[1, 1]` tensor per graph input, each named after a record column;
    /// holds (input name, record column index) in graph order
    PerColumn(Vec<(String, usize)>),
    /// A single `[1, D]` tensor with the assembled feature vector
    Concatenated { name: String, width: usize },
}

impl FeedPlan {
    /// Pick a plan from the graph's declared inputs
    pub fn resolve(slots: &[TensorSlot], assembler: &FeatureAssembler) -> UnifiedResult<Self> {
        if let [slot] = slots {
            if slot.name == assembler.output_column() {
                let width = assembler.dimension();
                let accepts_width = slot.dims.len() == 2
                    && slot.dims[1].map_or(true, |d| d == width as i64);
                if !accepts_width {
                    return Err(errors::shape_mismatch(
                        &slot.name,
                        &format_dims(&[None, Some(width as i64)]),
                        &format_dims(&slot.dims),
                    ));
                }
                return Ok(FeedPlan::Concatenated {
                    name: slot.name.clone(),
                    width,
                });
            }
        }

        let mut columns = Vec::with_capacity(slots.len());
        for slot in slots {
            let index = WineRecord::column_index(&slot.name).ok_or_else(|| {
                errors::shape_mismatch(
                    &slot.name,
                    &format!(
                        "one input per record column or a single '{}' input",
                        assembler.output_column()
                    ),
                    "an input that is not a record column",
                )
            })?;

            let scalar_column = slot.dims.len() == 2 && slot.dims[1].map_or(true, |d| d == 1);
            if !scalar_column {
                return Err(errors::shape_mismatch(
                    &slot.name,
                    "[N, 1]",
                    &format_dims(&slot.dims),
                ));
            }
            columns.push((slot.name.clone(), index));
        }

        if columns.is_empty() {
            return Err(errors::shape_mismatch("<graph>", "at least one input", "no inputs"));
        }

        Ok(FeedPlan::PerColumn(columns))
    }

    /// Build the input tensors for one record
    pub fn feeds(&self, record: &WineRecord, assembler: &FeatureAssembler) -> Vec<InputTensor> {
        match self {
            FeedPlan::PerColumn(columns) => {
                let values = record.values();
                columns
                    .iter()
                    .map(|(name, index)| InputTensor::scalar(name, values[*index]))
                    .collect()
            }
            FeedPlan::Concatenated { name, width } => {
                vec![InputTensor::new(name, vec![1, *width], assembler.assemble(record))]
            }
        }
    }
}
