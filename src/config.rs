/// Default bound on nested evaluations before aborting with a fatal error.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Environment variable overriding [`InterpreterConfig::max_depth`].
pub const MAX_DEPTH_ENV_VAR: &str = "SCHEMER_MAX_DEPTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Maximum nesting of `eval` calls. Unbounded recursion in user code
    /// fails with `Error::RecursionLimit` once this is exceeded.
    pub max_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads overrides from the process environment, falling back to the
    /// defaults for missing or unparsable values.
    pub fn from_env() -> Self {
        let config = InterpreterConfig::default();
        match std::env::var(MAX_DEPTH_ENV_VAR) {
            Ok(value) => config.with_max_depth_str(&value),
            Err(_) => config,
        }
    }

    fn with_max_depth_str(self, value: &str) -> Self {
        match value.trim().parse::<usize>() {
            Ok(max_depth) if max_depth > 0 => self.with_max_depth(max_depth),
            _ => {
                tracing::warn!(
                    value,
                    default = self.max_depth,
                    "ignoring invalid {}",
                    MAX_DEPTH_ENV_VAR
                );
                self
            }
        }
    }
}
