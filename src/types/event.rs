//! Scheduled events and packet kinds.

use serde::{Deserialize, Serialize};

use super::{ContentId, FlowId, NodeId};

/// The kind of packet an event carries.
///
/// `Request` and `Data` traverse links; `GetContent` and `PutContent` are
/// internal cache-service packets that never leave their node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    Request,
    Data,
    GetContent,
    PutContent,
}

impl PacketKind {
    /// Wire/collector name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            PacketKind::Request => "Request",
            PacketKind::Data => "Data",
            PacketKind::GetContent => "get_content",
            PacketKind::PutContent => "put_content",
        }
    }

    /// Whether this kind represents a cache-service phase rather than a
    /// link traversal.
    pub fn is_cache_op(self) -> bool {
        matches!(self, PacketKind::GetContent | PacketKind::PutContent)
    }
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled packet arrival or cache-service completion.
///
/// `node` is the current hop. `time` is the dispatch time; the scheduler
/// guarantees it is monotone nondecreasing across dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    pub receiver: NodeId,
    pub content: ContentId,
    pub node: NodeId,
    pub flow: FlowId,
    pub pkt_type: PacketKind,
    pub log: bool,
}

impl Event {
    pub fn new(
        time: f64,
        receiver: NodeId,
        content: ContentId,
        node: NodeId,
        flow: FlowId,
        pkt_type: PacketKind,
        log: bool,
    ) -> Self {
        Self {
            time,
            receiver,
            content,
            node,
            flow,
            pkt_type,
            log,
        }
    }

    /// A `Request` arriving at `node`.
    pub fn request(
        time: f64,
        receiver: NodeId,
        content: ContentId,
        node: NodeId,
        flow: FlowId,
        log: bool,
    ) -> Self {
        Self::new(time, receiver, content, node, flow, PacketKind::Request, log)
    }

    /// A `Data` packet arriving at `node`.
    pub fn data(
        time: f64,
        receiver: NodeId,
        content: ContentId,
        node: NodeId,
        flow: FlowId,
        log: bool,
    ) -> Self {
        Self::new(time, receiver, content, node, flow, PacketKind::Data, log)
    }

    /// A cache read completing at `node`.
    pub fn get_content(
        time: f64,
        receiver: NodeId,
        content: ContentId,
        node: NodeId,
        flow: FlowId,
        log: bool,
    ) -> Self {
        Self::new(
            time,
            receiver,
            content,
            node,
            flow,
            PacketKind::GetContent,
            log,
        )
    }

    /// A cache write completing at `node`.
    pub fn put_content(
        time: f64,
        receiver: NodeId,
        content: ContentId,
        node: NodeId,
        flow: FlowId,
        log: bool,
    ) -> Self {
        Self::new(
            time,
            receiver,
            content,
            node,
            flow,
            PacketKind::PutContent,
            log,
        )
    }
}
