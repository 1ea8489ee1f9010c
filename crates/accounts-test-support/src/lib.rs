//! Shared test doubles for the customer accounts service.

mod clock;
mod event_store;
mod rng;

pub use clock::FixedClock;
pub use event_store::{
    ConflictingEventStore, FailingEventStore, InMemoryEventStore, InterleavingEventStore,
};
pub use rng::SequenceRng;
