//! Bridge configuration.
//!
//! One [`BridgeConfig`] describes everything a backend needs at startup. It is
//! built once by the composing application, then handed to `launch()`.
//!
//! ```ignore
//! let config = BridgeConfig::new(48_000.0)
//!     .with_layout(MemoryLayout::compact())
//!     .with_init_timeout(Duration::from_secs(2));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::instrument;
use crate::layout::MemoryLayout;
use crate::parameter::{ClampPolicy, ParameterDescriptor};
use crate::runtime::RuntimeKind;

/// How long `initialize` waits for the render side to report ready.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Slots in each direction of the control queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Startup configuration shared by both backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Backend override. `None` defers to the environment and build default.
    pub runtime: Option<RuntimeKind>,

    /// Host sample rate passed to the module's init entry.
    pub sample_rate: f32,

    /// Arena layout the module was compiled against.
    pub layout: MemoryLayout,

    /// Bound on the ready wait.
    #[serde(with = "duration_ms")]
    pub init_timeout: Duration,

    /// Control queue capacity.
    pub queue_capacity: usize,

    /// Clamp policy override. `None` picks the backend's default.
    pub clamp_policy: Option<ClampPolicy>,

    /// Parameters the instrument exposes.
    pub parameters: Vec<ParameterDescriptor>,
}

impl BridgeConfig {
    /// Defaults at `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            runtime: None,
            sample_rate,
            layout: MemoryLayout::DEFAULT,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clamp_policy: None,
            parameters: instrument::default_parameters(),
        }
    }

    /// Force a backend.
    pub fn with_runtime(mut self, runtime: RuntimeKind) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_layout(mut self, layout: MemoryLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_clamp_policy(mut self, policy: ClampPolicy) -> Self {
        self.clamp_policy = Some(policy);
        self
    }

    /// Replace the parameter set.
    pub fn with_parameters(mut self, parameters: Vec<ParameterDescriptor>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Policy for a backend: the override if set, else clamp for the
    /// sandboxed store and pass-through for the embedded one.
    pub fn clamp_policy_for(&self, kind: RuntimeKind) -> ClampPolicy {
        self.clamp_policy.unwrap_or(match kind {
            RuntimeKind::Sandboxed => ClampPolicy::Clamp,
            RuntimeKind::Embedded => ClampPolicy::PassThrough,
        })
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::Config(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(BridgeError::Config(format!(
                "sample rate {} must be positive",
                self.sample_rate
            )));
        }
        if self.queue_capacity == 0 {
            return Err(BridgeError::Config("queue capacity must be non-zero".into()));
        }
        self.layout.validate()?;
        for parameter in &self.parameters {
            parameter.validate()?;
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(48_000.0)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
