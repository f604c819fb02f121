// LCR (Le Lann, Chang and Roberts) leader election.
//
// Unidirectional ring, O(n) messages. Each node sends its identifier to its
// successor. A received identifier larger than the node's own is forwarded
// (and proves the node cannot lead); a smaller one is discarded; the node's
// own identifier coming back around means it survived every comparison and
// is the leader.

use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;

use crate::rl_driver::{self, ElectionNode};
use crate::rl_interface::{Event, EventSink, NoOpSink, NodeId, Round, Status};
use crate::rl_link::{link, LinkRx, LinkTx};

/// A unidirectional ring of LCR nodes.
pub struct Ring {
    nodes: Vec<Node>,
}

impl Ring {
    /// Build a ring of `count` nodes with consecutive identifiers.
    /// A count of zero produces an empty ring that elects nobody.
    pub fn new(count: usize) -> Self {
        Self::new_with_sink(count, Arc::new(NoOpSink))
    }

    /// Build a ring whose nodes report events to the given sink.
    pub fn new_with_sink(count: usize, sink: Arc<dyn EventSink>) -> Self {
        if count == 0 {
            return Ring { nodes: Vec::new() };
        }

        // link i carries node i -> node i+1, so node i owns the sender of
        // link i and the receiver of link i-1
        let (txs, rxs): (Vec<_>, Vec<_>) = (0..count).map(|_| link::<NodeId>()).unzip();
        let mut rxs = rxs;
        rxs.rotate_right(1);

        let nodes = txs
            .into_iter()
            .zip(rxs)
            .enumerate()
            .map(|(i, (tx, rx))| Node::new(i as NodeId, tx, rx, Arc::clone(&sink)))
            .collect();

        Ring { nodes }
    }

    /// Run the election to completion and return the elected identifier.
    ///
    /// Single-use: the run closes every link, so the ring cannot be
    /// re-elected afterwards. Node statuses stay inspectable.
    pub fn elect_leader(&mut self) -> Option<NodeId> {
        rl_driver::run(&mut self.nodes)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// A single LCR participant.
pub struct Node {
    id: NodeId,
    // identifier to advocate this round; empty once the node has learned
    // it cannot lead and has nothing to forward
    send_id: Option<NodeId>,
    status: Status,
    round: Round,
    tx: LinkTx<NodeId>,
    rx: LinkRx<NodeId>,
    sink: Arc<dyn EventSink>,
}

impl Node {
    fn new(id: NodeId, tx: LinkTx<NodeId>, rx: LinkRx<NodeId>, sink: Arc<dyn EventSink>) -> Self {
        Node {
            id,
            send_id: Some(id),
            status: Status::Unknown,
            round: 0,
            tx,
            rx,
            sink,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_leader(&self) -> bool {
        self.status == Status::Leader
    }

    /// One round: send the pending identifier, then receive and judge one.
    pub fn round_trip(&mut self) {
        self.round += 1;

        if let Some(candidate) = self.send_id {
            if self.tx.send(candidate) {
                self.sink
                    .log(self.round, self.id, Event::IdSent { candidate });
            }
        }

        let Some(incoming) = self.rx.recv() else {
            // closed link: the run was cancelled, nothing to judge
            return;
        };

        self.send_id = None;
        match incoming.cmp(&self.id) {
            // own advocacy survived a full trip around the ring
            Ordering::Equal => self.transition(Status::Leader),
            Ordering::Greater => {
                // a larger identifier proves this node cannot lead;
                // keep the stronger candidate moving
                self.transition(Status::NonLeader);
                self.send_id = Some(incoming);
            }
            // weaker candidate dies here
            Ordering::Less => {}
        }
    }

    fn transition(&mut self, to: Status) {
        if self.status != Status::Unknown {
            return;
        }
        debug!("lcr node {}: {:?} -> {:?}", self.id, self.status, to);
        self.sink.log(
            self.round,
            self.id,
            Event::StatusChanged {
                from: self.status,
                to,
            },
        );
        self.status = to;
    }
}

impl ElectionNode for Node {
    fn id(&self) -> NodeId {
        self.id
    }

    fn is_leader(&self) -> bool {
        Node::is_leader(self)
    }

    fn round_trip(&mut self) {
        Node::round_trip(self);
    }

    fn shutdown(&mut self) {
        self.tx.close();
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_interface::CountingSink;

    #[test]
    fn test_elect_leader() {
        for i in 0..=11 {
            let count = 1usize << i;
            let mut ring = Ring::new(count);
            let elected = ring.elect_leader();

            let expected = (count - 1) as NodeId;
            assert_eq!(elected, Some(expected), "ring of {} nodes", count);

            for node in &ring.nodes()[..count - 1] {
                assert_eq!(
                    node.status(),
                    Status::NonLeader,
                    "node {} should not remain {:?}",
                    node.id(),
                    node.status()
                );
            }
        }
    }

    #[test]
    #[ignore] // spawns up to 2^15 OS threads; run manually
    fn test_elect_leader_large_rings() {
        for i in 12..=15 {
            let count = 1usize << i;
            let mut ring = Ring::new(count);
            assert_eq!(ring.elect_leader(), Some((count - 1) as NodeId));
        }
    }

    #[test]
    fn test_empty_ring_elects_nobody() {
        let mut ring = Ring::new(0);
        assert_eq!(ring.elect_leader(), None);
        assert!(ring.nodes().is_empty());
    }

    #[test]
    fn test_single_node_leads_immediately() {
        let mut ring = Ring::new(1);
        assert_eq!(ring.elect_leader(), Some(0));
        assert!(ring.nodes()[0].is_leader());
    }

    #[test]
    fn test_two_nodes() {
        let mut ring = Ring::new(2);
        assert_eq!(ring.elect_leader(), Some(1));
        assert_eq!(ring.nodes()[0].status(), Status::NonLeader);
        assert_eq!(ring.nodes()[1].status(), Status::Leader);
    }

    #[test]
    fn test_message_count_is_exact() {
        // with consecutive identifiers every loser's advocacy dies at its
        // first hop (n - 1 messages) and only the maximum completes the
        // full trip (n messages)
        for count in [1usize, 2, 8, 32] {
            let sink = Arc::new(CountingSink::new());
            let mut ring = Ring::new_with_sink(count, sink.clone());
            assert_eq!(ring.elect_leader(), Some((count - 1) as NodeId));
            assert_eq!(
                sink.messages(),
                (2 * count - 1) as u64,
                "ring of {} nodes",
                count
            );
        }
    }
}
