//! Node kinds, kind-specific parameters and the per-kind rule table
//!
//! A node is a tagged variant: [`NodeKind`] is the opcode used for matching,
//! [`NodeParams`] carries the kind-specific payload. The rule table returned by
//! [`NodeKind::rules`] drives validation and parameter setting.

use std::fmt;

use crate::error::{GraphError, GraphResult};

use super::maps::{TensorId, TensorList};

/// Operator type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// Pass-through copy
    Identity,
    /// Device memory copy
    Memcpy,
    /// Broadcast to a larger shape
    Expand,
    /// Concatenate along an axis
    Concat,
    /// Split along an axis
    Split,
    /// Element type conversion
    Cast,
    /// Shape change without data movement
    Reshape,
    /// Axis permutation
    Transpose,
    /// Rectified linear unit
    Relu,
    /// Element-wise addition
    Add,
    /// Element-wise multiplication
    Mul,
    /// Convolution
    Conv,
}

impl NodeKind {
    /// All kinds, in declaration order
    pub const ALL: [NodeKind; 12] = [
        NodeKind::Identity,
        NodeKind::Memcpy,
        NodeKind::Expand,
        NodeKind::Concat,
        NodeKind::Split,
        NodeKind::Cast,
        NodeKind::Reshape,
        NodeKind::Transpose,
        NodeKind::Relu,
        NodeKind::Add,
        NodeKind::Mul,
        NodeKind::Conv,
    ];

    /// Canonical opcode string
    pub fn as_str(self) -> &'static str {
        self.rules().name
    }

    /// Rule table entry for this kind
    pub fn rules(self) -> &'static KindRules {
        match self {
            NodeKind::Identity => &IDENTITY,
            NodeKind::Memcpy => &MEMCPY,
            NodeKind::Expand => &EXPAND,
            NodeKind::Concat => &CONCAT,
            NodeKind::Split => &SPLIT,
            NodeKind::Cast => &CAST,
            NodeKind::Reshape => &RESHAPE,
            NodeKind::Transpose => &TRANSPOSE,
            NodeKind::Relu => &RELU,
            NodeKind::Add => &ADD,
            NodeKind::Mul => &MUL,
            NodeKind::Conv => &CONV,
        }
    }

    /// Whether a node of this kind forwards its single input unchanged
    pub fn is_pass_through(self) -> bool {
        matches!(self, NodeKind::Identity | NodeKind::Memcpy)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit float
    F32,
    /// 16-bit float
    F16,
    /// bfloat16
    BF16,
    /// 32-bit signed integer
    I32,
    /// 8-bit signed integer
    I8,
    /// 8-bit unsigned integer
    U8,
}

/// Kind-specific parameter payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeParams {
    /// Kind takes no parameters
    #[default]
    None,
    /// Axis for Concat/Split
    Axis(i32),
    /// Target shape for Expand/Reshape
    Shape(Vec<i64>),
    /// Target element type for Cast
    Cast(DataType),
    /// Axis permutation for Transpose
    Permutation(Vec<usize>),
}

/// Closed interval annotation attached to nodes and tensors
///
/// Used by quantization passes; rewrites migrate it onto surviving tensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl NumericRange {
    /// Create a range
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether bounds are ordered and finite
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Operand count constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum count
    pub min: usize,
    /// Maximum count, unbounded when `None`
    pub max: Option<usize>,
}

impl Arity {
    const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    const fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Whether `n` operands satisfy the constraint
    pub fn admits(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

/// Per-kind rules: operand arity and accepted parameter payloads
pub struct KindRules {
    /// Opcode string
    pub name: &'static str,
    /// Input arity
    pub inputs: Arity,
    /// Output arity
    pub outputs: Arity,
    /// Whether the payload is acceptable for this kind
    pub accepts: fn(&NodeParams) -> bool,
}

impl fmt::Debug for KindRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRules")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

fn no_params(p: &NodeParams) -> bool {
    matches!(p, NodeParams::None)
}

fn axis_params(p: &NodeParams) -> bool {
    matches!(p, NodeParams::None | NodeParams::Axis(_))
}

fn shape_params(p: &NodeParams) -> bool {
    match p {
        NodeParams::None => true,
        NodeParams::Shape(dims) => dims.iter().all(|d| *d >= -1),
        _ => false,
    }
}

fn cast_params(p: &NodeParams) -> bool {
    matches!(p, NodeParams::None | NodeParams::Cast(_))
}

fn permutation_params(p: &NodeParams) -> bool {
    match p {
        NodeParams::None => true,
        NodeParams::Permutation(perm) => {
            let mut seen = vec![false; perm.len()];
            perm.iter()
                .all(|&axis| axis < seen.len() && !std::mem::replace(&mut seen[axis], true))
        }
        _ => false,
    }
}

static IDENTITY: KindRules = KindRules {
    name: "identity",
    inputs: Arity::exactly(1),
    outputs: Arity::exactly(1),
    accepts: no_params,
};
static MEMCPY: KindRules = KindRules {
    name: "memcpy",
    inputs: Arity::exactly(1),
    outputs: Arity::exactly(1),
    accepts: no_params,
};
static EXPAND: KindRules = KindRules {
    name: "expand",
    inputs: Arity::between(1, 2),
    outputs: Arity::exactly(1),
    accepts: shape_params,
};
static CONCAT: KindRules = KindRules {
    name: "concat",
    inputs: Arity::at_least(1),
    outputs: Arity::exactly(1),
    accepts: axis_params,
};
static SPLIT: KindRules = KindRules {
    name: "split",
    inputs: Arity::exactly(1),
    outputs: Arity::at_least(1),
    accepts: axis_params,
};
static CAST: KindRules = KindRules {
    name: "cast",
    inputs: Arity::exactly(1),
    outputs: Arity::exactly(1),
    accepts: cast_params,
};
static RESHAPE: KindRules = KindRules {
    name: "reshape",
    inputs: Arity::between(1, 2),
    outputs: Arity::exactly(1),
    accepts: shape_params,
};
static TRANSPOSE: KindRules = KindRules {
    name: "transpose",
    inputs: Arity::exactly(1),
    outputs: Arity::exactly(1),
    accepts: permutation_params,
};
static RELU: KindRules = KindRules {
    name: "relu",
    inputs: Arity::exactly(1),
    outputs: Arity::exactly(1),
    accepts: no_params,
};
static ADD: KindRules = KindRules {
    name: "add",
    inputs: Arity::exactly(2),
    outputs: Arity::exactly(1),
    accepts: no_params,
};
static MUL: KindRules = KindRules {
    name: "mul",
    inputs: Arity::exactly(2),
    outputs: Arity::exactly(1),
    accepts: no_params,
};
static CONV: KindRules = KindRules {
    name: "conv",
    inputs: Arity::between(2, 3),
    outputs: Arity::exactly(1),
    accepts: no_params,
};

/// Operator node
///
/// A `Node` value has no identity of its own; it gets a [`NodeId`](super::NodeId)
/// when added to a graph. Adding a clone produces a new identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name, informational
    pub name: String,
    /// Opcode
    pub kind: NodeKind,
    /// Kind-specific payload
    pub params: NodeParams,
    /// Ordered input operands
    pub inputs: TensorList,
    /// Ordered output operands
    pub outputs: TensorList,
    /// Node-level range annotation
    pub range: Option<NumericRange>,
}

impl Node {
    /// Create a node without operands
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            params: NodeParams::None,
            inputs: TensorList::new(),
            outputs: TensorList::new(),
            range: None,
        }
    }

    /// Set inputs
    pub fn with_inputs(mut self, inputs: TensorList) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set outputs
    pub fn with_outputs(mut self, outputs: TensorList) -> Self {
        self.outputs = outputs;
        self
    }

    /// Set the parameter payload without validation
    pub fn with_params(mut self, params: NodeParams) -> Self {
        self.params = params;
        self
    }

    /// Set the range annotation
    pub fn with_range(mut self, range: NumericRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Check arity and payload against the kind's rules
    pub fn validate(&self) -> GraphResult<()> {
        let rules = self.kind.rules();
        if !rules.inputs.admits(self.inputs.len()) {
            return Err(GraphError::InvalidNode(format!(
                "{} '{}' has {} inputs",
                rules.name,
                self.name,
                self.inputs.len()
            )));
        }
        if !rules.outputs.admits(self.outputs.len()) {
            return Err(GraphError::InvalidNode(format!(
                "{} '{}' has {} outputs",
                rules.name,
                self.name,
                self.outputs.len()
            )));
        }
        if !(rules.accepts)(&self.params) {
            return Err(GraphError::InvalidNode(format!(
                "{} '{}' rejects params {:?}",
                rules.name, self.name, self.params
            )));
        }
        Ok(())
    }

    /// Replace the payload, rejecting one the kind does not accept
    ///
    /// The node is left untouched on error.
    pub fn set_params(&mut self, params: NodeParams) -> GraphResult<()> {
        if !(self.kind.rules().accepts)(&params) {
            return Err(GraphError::InvalidNode(format!(
                "{} '{}' rejects params {:?}",
                self.kind, self.name, params
            )));
        }
        self.params = params;
        Ok(())
    }

    /// Copy this node under a new name
    pub fn clone_as(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Position of `tensor` among the inputs
    pub fn input_index(&self, tensor: TensorId) -> Option<usize> {
        self.inputs.iter().position(|t| *t == tensor)
    }

    /// Position of `tensor` among the outputs
    pub fn output_index(&self, tensor: TensorId) -> Option<usize> {
        self.outputs.iter().position(|t| *t == tensor)
    }

    /// Whether `tensor` appears in any operand slot
    pub fn has_operand(&self, tensor: TensorId) -> bool {
        self.inputs.contains(&tensor) || self.outputs.contains(&tensor)
    }

    /// Rewrite every slot holding `old` to `new`, keeping positions
    ///
    /// Returns the number of rewritten slots.
    pub fn replace_operand(&mut self, old: TensorId, new: TensorId) -> usize {
        let mut replaced = 0;
        for slot in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            if *slot == old {
                *slot = new;
                replaced += 1;
            }
        }
        replaced
    }
}
