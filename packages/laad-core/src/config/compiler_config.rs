//! Compiler configuration (YAML schema v1)
//!
//! ```yaml
//! version: 1
//! inference:
//!   parallel: true
//!   min_parallel_components: 8
//!   default_integer: i32
//!   default_float: f32
//! emit:
//!   pretty: false
//!   include_spans: true
//! reachability:
//!   enabled: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::shared::models::{Primitive, Type};

const SUPPORTED_VERSIONS: [u32; 1] = [1];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub version: u32,
    pub inference: InferenceConfig,
    pub emit: EmitConfig,
    pub reachability: ReachabilityConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            inference: InferenceConfig::default(),
            emit: EmitConfig::default(),
            reachability: ReachabilityConfig::default(),
        }
    }
}

impl CompilerConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: CompilerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }
        self.inference.validate()
    }
}

/// Type inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// Solve independent components on the rayon pool
    pub parallel: bool,

    /// Below this many components the solver stays on the calling thread
    pub min_parallel_components: usize,

    /// Type of integer literals nothing else constrains
    pub default_integer: Primitive,

    /// Type of fractional literals nothing else constrains
    pub default_float: Primitive,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_components: 8,
            default_integer: Primitive::I32,
            default_float: Primitive::F32,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_parallel_components == 0 || self.min_parallel_components > 65536 {
            return Err(ConfigError::range_with_hint(
                "min_parallel_components",
                self.min_parallel_components,
                1,
                65536,
                "At least one component is needed to split work",
            ));
        }
        if !self.default_integer.is_integral() {
            return Err(ConfigError::Validation(format!(
                "default_integer must be an integral type, got {}",
                self.default_integer
            )));
        }
        if !self.default_float.is_fractional() {
            return Err(ConfigError::Validation(format!(
                "default_float must be a fractional type, got {}",
                self.default_float
            )));
        }
        Ok(())
    }

    pub fn integer_type(&self) -> Type {
        Type::Primitive(self.default_integer)
    }

    pub fn float_type(&self) -> Type {
        Type::Primitive(self.default_float)
    }
}

/// LNJ output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmitConfig {
    pub pretty: bool,
    /// Attach source spans to emitted vertices
    pub include_spans: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            include_spans: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReachabilityConfig {
    /// Disable to keep unreachable vertices (binding checks still run)
    pub enabled: bool,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
