//! Domain events and the pub/sub plumbing used to hand them to collaborators
//! (notification senders, search indexers, the deadline sweeper) after a
//! write has been committed.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
