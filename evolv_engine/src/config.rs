use std::env;

pub const ENV_VAR_MAX_DEPTH: &str = "EVOLV_MAX_DEPTH";

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_UNIT_ARRAY_LEN: usize = 1 << 20;

/// Bounds applied while planning and decoding. Nesting depth is attacker-controlled for
/// untrusted input, as is the element count of a unit array (which costs no bytes per element).
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DecodeLimits {
    pub max_depth: usize,
    pub max_unit_array_len: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_unit_array_len: DEFAULT_MAX_UNIT_ARRAY_LEN,
        }
    }
}

impl DecodeLimits {
    /// Defaults, with the depth limit overridable through [`ENV_VAR_MAX_DEPTH`].
    pub fn from_env() -> Self {
        let max_depth = env::var(ENV_VAR_MAX_DEPTH)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_DEPTH);
        Self {
            max_depth,
            ..Self::default()
        }
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self { max_depth, ..self }
    }
}
