//! Model constructor seam.
//!
//! The registry only records each dataset's network name and input/output
//! geometry. Callers plug their architecture in through [`ModelBuilder`].

/// Geometry of the capsule network paired with a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub in_channels: usize,
    pub image_size: usize,
    pub num_classes: usize,
}

impl ModelSpec {
    /// `[channels, height, width]` of one input sample.
    pub fn input_shape(&self) -> [usize; 3] {
        [self.in_channels, self.image_size, self.image_size]
    }

    /// Hand this geometry to `builder`.
    pub fn build<B: ModelBuilder>(&self, builder: &B) -> B::Model {
        builder.build(self)
    }
}

/// Constructs a model for a given geometry.
pub trait ModelBuilder {
    type Model;

    fn build(&self, spec: &ModelSpec) -> Self::Model;
}
