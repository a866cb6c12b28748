//! Core identifiers and event types shared across the engine

mod event;
mod ids;

pub use event::{Event, PacketKind};
pub use ids::{ContentId, FlowId, NodeId};
