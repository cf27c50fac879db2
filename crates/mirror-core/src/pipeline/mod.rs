//! Concurrency primitives the session pipeline is assembled from.
//!
//! - **`frame_channel`** – Single-slot, latest-wins hand-off of decoded
//!   frames from the transport worker to the automation consumer.
//! - **`event_bus`** – Typed observer registry.  Transport connections use it
//!   for lifecycle and frame events; the session controller uses it toward
//!   the presentation layer.
//! - **`sequence`** – Lock-free counter that stamps frames with their
//!   arrival order.

pub mod event_bus;
pub mod frame_channel;
pub mod sequence;

pub use event_bus::{EventBus, SubscriptionId};
pub use frame_channel::FrameChannel;
pub use sequence::SequenceCounter;
