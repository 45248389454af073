// ABOUTME: Configuration and constants for the interpreter

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default evaluation stack depth limit; host-tunable through
/// `Cheax::set_max_stack_depth` or the `set-max-stack-depth` feature.
pub const DEFAULT_MAX_STACK_DEPTH: u32 = 4096;

/// Feature groups that can be enabled on a handle. `file-io` and `gc`
/// are recognised names but unavailable in this build.
pub const FEATURES: &[&str] = &["stdio", "stdout", "stderr", "exit", "set-max-stack-depth"];

#[derive(Debug, Clone)]
pub struct Config {
    pub max_stack_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}
