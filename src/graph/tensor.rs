//! Tensor edges
//!
//! Producer and consumer links are owned by the graph's maps, not the tensor.

use super::node::NumericRange;

/// Tensor edge between nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Tensor name, informational
    pub name: String,
    /// Externally visible; must keep a producer across rewrites
    pub persistent: bool,
    /// Range annotation
    pub range: Option<NumericRange>,
}

impl Tensor {
    /// Create an intermediate tensor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persistent: false,
            range: None,
        }
    }

    /// Create a persistent tensor
    pub fn persistent(name: impl Into<String>) -> Self {
        Self {
            persistent: true,
            ..Self::new(name)
        }
    }

    /// Set the range annotation
    pub fn with_range(mut self, range: NumericRange) -> Self {
        self.range = Some(range);
        self
    }
}
