//! Lock-free transport between the control thread and the render thread.
//!
//! Three SPSC rings:
//!
//! - control → render: [`ControlMessage`]s, drained once per render quantum
//! - render → control: [`BridgeEvent`] acknowledgments
//! - render → control: handled messages, so sample buffers are freed off the
//!   audio thread
//!
//! The control-side producer sits behind a mutex because both the runtime and
//! the parameter store write to it. The render side never locks.

use std::sync::Arc;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use suna_core::{BridgeError, BridgeEvent, BridgeResult, ControlMessage, ParameterSink};

/// Acknowledgment ring capacity.
pub const EVENT_QUEUE_SIZE: usize = 256;

/// Create the rings. `capacity` applies to the message and recycle rings.
pub fn channel(capacity: usize) -> (ControlEnd, RenderEnd) {
    let (command_producer, command_consumer) = RingBuffer::new(capacity);
    let (event_producer, event_consumer) = RingBuffer::new(EVENT_QUEUE_SIZE);
    let (recycle_producer, recycle_consumer) = RingBuffer::new(capacity);

    let control = ControlEnd {
        sender: ControlSender {
            producer: Arc::new(Mutex::new(command_producer)),
        },
        events: event_consumer,
        recycled: recycle_consumer,
    };
    let render = RenderEnd {
        commands: command_consumer,
        events: event_producer,
        recycled: recycle_producer,
    };
    (control, render)
}

// ============================================================================
// CONTROL SIDE
// ============================================================================

/// Cloneable message sender.
#[derive(Clone)]
pub struct ControlSender {
    producer: Arc<Mutex<Producer<ControlMessage>>>,
}

impl ControlSender {
    /// Queue a message. Fails with [`BridgeError::QueueFull`] without blocking.
    pub fn send(&self, message: ControlMessage) -> BridgeResult<()> {
        match self.producer.lock().push(message) {
            Ok(()) => Ok(()),
            Err(rtrb::PushError::Full(message)) => {
                log::warn!("control queue full, dropping {}", message.kind());
                Err(BridgeError::QueueFull)
            }
        }
    }

    /// Free slots in the message ring.
    pub fn available(&self) -> usize {
        self.producer.lock().slots()
    }
}

impl ParameterSink for ControlSender {
    fn forward(&self, id: &str, scaled: f64) {
        let _ = self.send(ControlMessage::for_parameter(id, scaled));
    }
}

impl std::fmt::Debug for ControlSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSender").finish_non_exhaustive()
    }
}

/// Control-thread end of the transport.
pub struct ControlEnd {
    sender: ControlSender,
    events: Consumer<BridgeEvent>,
    recycled: Consumer<ControlMessage>,
}

impl ControlEnd {
    pub fn sender(&self) -> &ControlSender {
        &self.sender
    }

    /// Next acknowledgment, if any.
    pub fn pop_event(&mut self) -> Option<BridgeEvent> {
        self.events.pop().ok()
    }

    /// Drop messages the render side has finished with. Returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while self.recycled.pop().is_ok() {
            freed += 1;
        }
        freed
    }
}

// ============================================================================
// RENDER SIDE
// ============================================================================

/// Render-thread end of the transport.
pub struct RenderEnd {
    commands: Consumer<ControlMessage>,
    events: Producer<BridgeEvent>,
    recycled: Producer<ControlMessage>,
}

impl RenderEnd {
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<ControlMessage> {
        self.commands.pop().ok()
    }

    /// Returns `false` if the event ring is full.
    #[inline]
    pub(crate) fn emit(&mut self, event: BridgeEvent) -> bool {
        self.events.push(event).is_ok()
    }

    /// Hand a message back for deallocation. Returns `false` if the ring was
    /// full and the message was freed here instead.
    #[inline]
    pub(crate) fn recycle(&mut self, message: ControlMessage) -> bool {
        self.recycled.push(message).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let (mut control, mut render) = channel(4);
        control.sender().send(ControlMessage::PlayAll).unwrap();
        control.sender().send(ControlMessage::ClearSlot { slot: 1 }).unwrap();

        assert_eq!(render.pop(), Some(ControlMessage::PlayAll));
        assert_eq!(render.pop(), Some(ControlMessage::ClearSlot { slot: 1 }));
        assert_eq!(render.pop(), None);

        assert!(render.emit(BridgeEvent::Ready { generation: 1 }));
        assert_eq!(control.pop_event(), Some(BridgeEvent::Ready { generation: 1 }));
        assert_eq!(control.pop_event(), None);

        assert!(render.recycle(ControlMessage::StopAll));
        assert_eq!(control.collect_garbage(), 1);
    }

    #[test]
    fn test_full_queue() {
        let (control, _render) = channel(2);
        let sender = control.sender().clone();
        sender.send(ControlMessage::PlayAll).unwrap();
        sender.send(ControlMessage::PlayAll).unwrap();
        assert_eq!(sender.available(), 0);
        assert_eq!(sender.send(ControlMessage::StopAll), Err(BridgeError::QueueFull));
    }

    #[test]
    fn test_parameter_sink_maps_messages() {
        let (control, mut render) = channel(4);
        control.sender().forward("grainLength", 512.2);
        control.sender().forward("mix", 40.0);
        assert_eq!(render.pop(), Some(ControlMessage::SetGrainLength { length: 512 }));
        assert_eq!(
            render.pop(),
            Some(ControlMessage::SetParam {
                name: "mix".into(),
                value: 40.0
            })
        );
    }
}
