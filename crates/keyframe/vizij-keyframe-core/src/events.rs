//! Notifications emitted by the interpolator.
//!
//! Delivery is synchronous and in order, on the thread that evaluates or ticks.

use serde::{Deserialize, Serialize};

/// Discrete signals emitted during evaluation and playback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum InterpolatorEvent {
    /// The target was moved to the pose at `time`.
    Interpolated { time: f64 },
    /// Playback crossed a path end (and stopped unless looping).
    EndReached { time: f64, looped: bool },
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

type Callback = Box<dyn FnMut(&InterpolatorEvent)>;

#[derive(Default)]
pub(crate) struct EventListeners {
    next_id: u32,
    listeners: Vec<(ListenerId, Callback)>,
}

impl EventListeners {
    pub(crate) fn subscribe(&mut self, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, callback));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub(crate) fn emit(&mut self, event: InterpolatorEvent) {
        for (_, cb) in self.listeners.iter_mut() {
            cb(&event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
