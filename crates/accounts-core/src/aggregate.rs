//! Aggregate root abstraction and the replay engine.

use crate::event::{DomainEvent, StreamVersion};

/// Trait for aggregate state that is reconstituted from event history.
///
/// `Default` is the empty state before the first event.
pub trait AggregateRoot: Default + Send + Sync {
    /// The event type this aggregate consumes.
    type Event: DomainEvent;

    /// Returns the stream version of the last applied event (0 if none).
    fn version(&self) -> StreamVersion;

    /// Apply an event to mutate internal state. Implementations must record
    /// the event's stream version as the new current version.
    fn apply(&mut self, event: &Self::Event);
}

/// Folds an ordered event stream into the current aggregate state.
///
/// Pure: no I/O, no hidden state. The same stream always yields the same
/// state.
#[must_use]
pub fn replay<A: AggregateRoot>(stream: &[A::Event]) -> A {
    stream.iter().fold(A::default(), |mut state, event| {
        state.apply(event);
        state
    })
}
