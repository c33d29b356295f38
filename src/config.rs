//! JIT configuration.
//!
//! Defaults work out of the box. A TOML file can override them:
//!
//! ```toml
//! [jit]
//! code_capacity = 8192
//! check_arithmetic = true
//! trace_jit = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::JitError;

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "exprjit.toml";

/// Configuration for the JIT compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// Initial code buffer size in bytes. Grown when a tree needs more.
    pub code_capacity: usize,
    /// Refuse to compile trees whose evaluation fails (division by zero,
    /// division overflow).
    pub check_arithmetic: bool,
    /// Log compilation events.
    pub trace_jit: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            code_capacity: 4096,
            check_arithmetic: true,
            trace_jit: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    jit: JitConfig,
}

impl JitConfig {
    /// Parse a config file's contents.
    pub fn from_toml(content: &str) -> Result<Self, JitError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| JitError::Config(format!("failed to parse config: {}", e)))?;
        Ok(file.jit)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, JitError> {
        let content = fs::read_to_string(path).map_err(|e| {
            JitError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load `exprjit.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, JitError> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String, JitError> {
        let file = ConfigFile { jit: self.clone() };
        toml::to_string_pretty(&file)
            .map_err(|e| JitError::Config(format!("failed to serialize config: {}", e)))
    }
}
