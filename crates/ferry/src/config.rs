/// Knobs for one projection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    /// Maximum nesting depth, counting the root as depth 1 (default: 64).
    /// Deeper values fail with `Error::DepthExceeded` instead of recursing.
    pub max_depth: usize,
    /// Whether buffers that cannot be viewed in place may be copied into
    /// engine memory (default: true). When false they fail with
    /// `Error::CopyRequired`.
    pub allow_copy: bool,
    /// Whether tensor shapes are checked against schema dims (default: true).
    pub check_shapes: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            allow_copy: true,
            check_shapes: true,
        }
    }
}

impl ProjectionConfig {
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn allow_copy(mut self, allow: bool) -> Self {
        self.allow_copy = allow;
        self
    }

    pub fn check_shapes(mut self, check: bool) -> Self {
        self.check_shapes = check;
        self
    }
}
