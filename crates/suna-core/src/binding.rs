//! Per-widget parameter binding.
//!
//! A widget owns one [`ParameterBinding`] and calls [`bind`](ParameterBinding::bind)
//! whenever the runtime becomes available. Rebinding replaces the previous
//! subscription instead of adding a second one.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::parameter::{ParameterDescriptor, Subscription, ValueChange};
use crate::runtime::RuntimeAdapter;

/// Widget-side view of one parameter.
///
/// Holds the last value pushed by the store, so a widget can read it
/// without touching the runtime. Values stay at zero until the first
/// successful [`bind`](Self::bind).
pub struct ParameterBinding {
    id: String,
    value: Arc<Mutex<ValueChange>>,
    properties: Option<ParameterDescriptor>,
    subscription: Option<Subscription>,
}

impl ParameterBinding {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Arc::new(Mutex::new(ValueChange {
                normalised: 0.0,
                scaled: 0.0,
            })),
            properties: None,
            subscription: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the current value and subscribe to changes.
    ///
    /// Returns `false` if the runtime has no such parameter; any previous
    /// subscription is dropped either way.
    pub fn bind(&mut self, runtime: &dyn RuntimeAdapter) -> bool {
        self.subscription = None;
        let Some(handle) = runtime.get_parameter(&self.id) else {
            self.properties = None;
            return false;
        };

        *self.value.lock() = ValueChange {
            normalised: handle.get_normalised_value(),
            scaled: handle.get_scaled_value(),
        };
        self.properties = Some(handle.properties().clone());

        let value = Arc::clone(&self.value);
        self.subscription = Some(handle.on_value_changed(move |change| {
            *value.lock() = change;
        }));
        true
    }

    /// Drop the subscription.
    pub fn unbind(&mut self) {
        self.subscription = None;
    }

    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn properties(&self) -> Option<&ParameterDescriptor> {
        self.properties.as_ref()
    }

    pub fn normalised(&self) -> f64 {
        self.value.lock().normalised
    }

    pub fn scaled(&self) -> f64 {
        self.value.lock().scaled
    }

    /// Write from the widget side.
    pub fn set_normalised(&self, runtime: &dyn RuntimeAdapter, normalised: f64) {
        if let Some(handle) = runtime.get_parameter(&self.id) {
            handle.set_normalised_value(normalised);
        }
    }

    /// Rounded scaled value for a label. `"0"` until bound.
    pub fn display_value(&self) -> String {
        if self.properties.is_none() {
            return "0".to_string();
        }
        format!("{}", self.scaled().round())
    }
}

impl std::fmt::Debug for ParameterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("id", &self.id)
            .field("bound", &self.is_bound())
            .finish()
    }
}
