//! Parameter descriptors and the cached parameter store.
//!
//! The store keeps one scaled value per parameter in an `AtomicU64` (f64
//! bits), so reads are lock-free from any thread. The normalized view is
//! always computed from the scaled value and never stored, which keeps the
//! two views from drifting apart.
//!
//! Writes go three places, in order: the cache, the backend (through a
//! [`ParameterSink`]), and the subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// Descriptor
// =============================================================================

/// Static description of one parameter.
///
/// Serializes to the `{ start, end, name, label, interval, skew?, numSteps? }`
/// shape UI code binds against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Stable identifier (e.g. `"grainLength"`).
    pub id: String,
    /// Lower bound of the scaled range.
    pub start: f64,
    /// Upper bound of the scaled range. Must be greater than `start`.
    pub end: f64,
    /// Display name.
    pub name: String,
    /// Unit label (e.g. `"ms"`, `"%"`).
    pub label: String,
    /// UI step hint. 0 = continuous.
    pub interval: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skew: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<u32>,
    /// Initial scaled value.
    #[serde(default)]
    pub default_value: f64,
}

impl ParameterDescriptor {
    /// Create a continuous parameter defaulting to `start`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            name: name.into(),
            label: String::new(),
            interval: 0.0,
            skew: None,
            num_steps: None,
            default_value: start,
        }
    }

    /// Set the unit label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the UI step interval.
    pub fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Set the UI skew factor.
    pub fn with_skew(mut self, skew: f64) -> Self {
        self.skew = Some(skew);
        self
    }

    /// Set the number of discrete steps (1 = toggle).
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.num_steps = Some(steps);
        self
    }

    /// Set the initial scaled value.
    pub fn with_default(mut self, value: f64) -> Self {
        self.default_value = value;
        self
    }

    /// A 0/1 toggle.
    pub fn toggle(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, 0.0, 1.0).with_interval(1.0).with_steps(1)
    }

    /// Reject empty ranges and defaults outside the range.
    pub fn validate(&self) -> BridgeResult<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.end <= self.start {
            return Err(BridgeError::Config(format!(
                "parameter '{}': range [{}, {}] is empty",
                self.id, self.start, self.end
            )));
        }
        if !(self.start..=self.end).contains(&self.default_value) {
            return Err(BridgeError::Config(format!(
                "parameter '{}': default {} outside [{}, {}]",
                self.id, self.default_value, self.start, self.end
            )));
        }
        Ok(())
    }

    /// Scaled → normalized, clamped to [0, 1].
    #[inline]
    pub fn normalize(&self, scaled: f64) -> f64 {
        ((scaled - self.start) / (self.end - self.start)).clamp(0.0, 1.0)
    }

    /// Normalized → scaled. The input is clamped to [0, 1] first.
    #[inline]
    pub fn denormalize(&self, normalised: f64) -> f64 {
        self.start + normalised.clamp(0.0, 1.0) * (self.end - self.start)
    }

    /// Clamp a scaled value into the range.
    #[inline]
    pub fn clamp(&self, scaled: f64) -> f64 {
        scaled.clamp(self.start, self.end)
    }
}

// =============================================================================
// Store
// =============================================================================

/// What the store does with scaled values outside `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClampPolicy {
    /// Clamp before caching and forwarding.
    #[default]
    Clamp,
    /// Cache and forward unchanged; the backend decides.
    PassThrough,
}

/// Backend end of a parameter write.
pub trait ParameterSink: Send + Sync {
    /// Deliver a new scaled value to the backend.
    fn forward(&self, id: &str, scaled: f64);
}

/// Sink that drops every write. Useful for a cache with no backend behind it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSink;

impl ParameterSink for DetachedSink {
    fn forward(&self, _id: &str, _scaled: f64) {}
}

/// Value passed to change callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChange {
    pub normalised: f64,
    pub scaled: f64,
}

/// Change callback.
pub type ValueCallback = Arc<dyn Fn(ValueChange) + Send + Sync>;

struct ParameterEntry {
    descriptor: ParameterDescriptor,
    /// Scaled value as f64 bits.
    value: AtomicU64,
    subscribers: Mutex<Vec<(u64, ValueCallback)>>,
    next_key: AtomicU64,
}

impl ParameterEntry {
    #[inline]
    fn scaled(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, scaled: f64) {
        self.value.store(scaled.to_bits(), Ordering::Relaxed);
    }

    fn notify(&self) {
        let scaled = self.scaled();
        let change = ValueChange {
            normalised: self.descriptor.normalize(scaled),
            scaled,
        };
        // Snapshot so callbacks may subscribe or unsubscribe without deadlocking.
        let callbacks: Vec<ValueCallback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in callbacks {
            cb(change);
        }
    }
}

/// Cached parameter values plus subscriber lists.
pub struct ParameterStore {
    entries: Vec<Arc<ParameterEntry>>,
    index: HashMap<String, usize>,
    policy: ClampPolicy,
    sink: Arc<dyn ParameterSink>,
}

impl ParameterStore {
    /// Build a store from descriptors. Every descriptor must validate and ids
    /// must be unique.
    pub fn new(
        descriptors: impl IntoIterator<Item = ParameterDescriptor>,
        policy: ClampPolicy,
        sink: Arc<dyn ParameterSink>,
    ) -> BridgeResult<Self> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            if index.insert(descriptor.id.clone(), entries.len()).is_some() {
                return Err(BridgeError::Config(format!(
                    "duplicate parameter id '{}'",
                    descriptor.id
                )));
            }
            entries.push(Arc::new(ParameterEntry {
                value: AtomicU64::new(descriptor.default_value.to_bits()),
                descriptor,
                subscribers: Mutex::new(Vec::new()),
                next_key: AtomicU64::new(0),
            }));
        }
        Ok(Self {
            entries,
            index,
            policy,
            sink,
        })
    }

    /// Clamp policy in effect.
    pub fn policy(&self) -> ClampPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn entry(&self, id: &str) -> Option<&Arc<ParameterEntry>> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Handle for one parameter.
    pub fn get(&self, id: &str) -> Option<ParameterHandle<'_>> {
        self.entry(id).map(|entry| ParameterHandle { store: self, entry })
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Current scaled value.
    pub fn scaled(&self, id: &str) -> Option<f64> {
        self.entry(id).map(|e| e.scaled())
    }

    /// Current normalized value.
    pub fn normalised(&self, id: &str) -> Option<f64> {
        self.entry(id).map(|e| e.descriptor.normalize(e.scaled()))
    }

    /// Write a scaled value, forward it to the backend, notify subscribers.
    ///
    /// Returns `false` for an unknown id.
    pub fn set_scaled(&self, id: &str, value: f64) -> bool {
        let Some(entry) = self.entry(id) else {
            log::warn!("set on unknown parameter '{id}'");
            return false;
        };
        let value = match self.policy {
            ClampPolicy::Clamp => entry.descriptor.clamp(value),
            ClampPolicy::PassThrough => value,
        };
        entry.store(value);
        self.sink.forward(id, value);
        entry.notify();
        true
    }

    /// Write a normalized value (clamped to [0, 1]).
    pub fn set_normalised(&self, id: &str, normalised: f64) -> bool {
        match self.entry(id) {
            Some(entry) => self.set_scaled(id, entry.descriptor.denormalize(normalised)),
            None => false,
        }
    }

    /// Record a value the backend reported. Subscribers are notified but
    /// nothing is forwarded back.
    pub fn update_from_host(&self, id: &str, value: f64) -> bool {
        let Some(entry) = self.entry(id) else {
            return false;
        };
        entry.store(value);
        entry.notify();
        true
    }

    /// Register a change callback.
    pub fn subscribe(
        &self,
        id: &str,
        callback: impl Fn(ValueChange) + Send + Sync + 'static,
    ) -> Option<Subscription> {
        self.entry(id).map(|entry| subscribe_entry(entry, Arc::new(callback)))
    }

    /// Subscriber count for one parameter.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.entry(id).map(|e| e.subscribers.lock().len()).unwrap_or(0)
    }

    /// JSON array of descriptors with their current values, for seeding a UI.
    pub fn to_init_json(&self) -> serde_json::Value {
        let items = self
            .entries
            .iter()
            .map(|entry| {
                let scaled = entry.scaled();
                let mut item = serde_json::to_value(&entry.descriptor)
                    .unwrap_or(serde_json::Value::Null);
                if let Some(obj) = item.as_object_mut() {
                    obj.insert("value".into(), scaled.into());
                    obj.insert("normalised".into(), entry.descriptor.normalize(scaled).into());
                }
                item
            })
            .collect();
        serde_json::Value::Array(items)
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("parameters", &self.entries.len())
            .field("policy", &self.policy)
            .finish()
    }
}

fn subscribe_entry(entry: &Arc<ParameterEntry>, callback: ValueCallback) -> Subscription {
    let key = entry.next_key.fetch_add(1, Ordering::Relaxed);
    entry.subscribers.lock().push((key, callback));
    Subscription {
        entry: Arc::downgrade(entry),
        key,
    }
}

// =============================================================================
// Handle and subscription
// =============================================================================

/// Borrowed view of one parameter.
#[derive(Clone, Copy)]
pub struct ParameterHandle<'a> {
    store: &'a ParameterStore,
    entry: &'a Arc<ParameterEntry>,
}

impl<'a> ParameterHandle<'a> {
    pub fn id(&self) -> &'a str {
        &self.entry.descriptor.id
    }

    /// The descriptor.
    pub fn properties(&self) -> &'a ParameterDescriptor {
        &self.entry.descriptor
    }

    pub fn get_normalised_value(&self) -> f64 {
        self.entry.descriptor.normalize(self.entry.scaled())
    }

    pub fn set_normalised_value(&self, normalised: f64) {
        self.store.set_normalised(self.id(), normalised);
    }

    pub fn get_scaled_value(&self) -> f64 {
        self.entry.scaled()
    }

    pub fn set_scaled_value(&self, value: f64) {
        self.store.set_scaled(self.id(), value);
    }

    /// Register a change callback. Dropping the returned guard unsubscribes.
    pub fn on_value_changed(
        &self,
        callback: impl Fn(ValueChange) + Send + Sync + 'static,
    ) -> Subscription {
        subscribe_entry(self.entry, Arc::new(callback))
    }
}

/// Active change subscription. Unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    entry: Weak<ParameterEntry>,
    key: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.upgrade() {
            entry.subscribers.lock().retain(|(key, _)| *key != self.key);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}
