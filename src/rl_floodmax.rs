// FloodMax leader election.
//
// Works on any strongly connected topology, not just rings. Every node
// tracks the largest identifier it has seen, floods it to all neighbors
// each round, and folds in whatever the neighbors flooded back. After
// exactly `diameter` rounds the global maximum has reached everyone, so
// the node holding it elects itself and the rest settle as non-leaders.
//
// The network here is a circulant graph: node i links to the nodes at a
// fixed set of offsets, the same set for everyone, so the link count is
// balanced by construction. The builder derives the diameter from the
// graph it wired - the guarantee is meaningless with an undershot value,
// and only the builder knows the real structure.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashSet;
use log::debug;

use crate::rl_driver::{self, ElectionNode};
use crate::rl_interface::{Event, EventSink, NoOpSink, NodeId, Round, Status};
use crate::rl_link::{link, recv_each, send_each, LinkRx, LinkTx};

/// Outgoing links per node, matching the original three-neighbor fan-out.
pub const DEFAULT_DEGREE: usize = 3;

/// A fixed-degree network of FloodMax nodes.
pub struct Network {
    nodes: Vec<Node>,
    diameter: usize,
}

impl Network {
    /// Build a network of `count` nodes with the default degree.
    /// A count of zero produces an empty network that elects nobody.
    pub fn new(count: usize) -> Self {
        Self::new_with_sink(count, DEFAULT_DEGREE, Arc::new(NoOpSink))
    }

    /// Build a network where every node has (up to) `degree` outgoing
    /// links; the degree is capped at `count - 1` distinct neighbors.
    pub fn with_degree(count: usize, degree: usize) -> Self {
        Self::new_with_sink(count, degree, Arc::new(NoOpSink))
    }

    /// Build a network whose nodes report events to the given sink.
    pub fn new_with_sink(count: usize, degree: usize, sink: Arc<dyn EventSink>) -> Self {
        if count == 0 {
            return Network {
                nodes: Vec::new(),
                diameter: 0,
            };
        }

        let offsets = chord_offsets(count, degree);
        let diameter = graph_diameter(count, &offsets);
        debug!(
            "floodmax network: {} nodes, degree {}, diameter {}",
            count,
            offsets.len(),
            diameter
        );

        let mut txs: Vec<Vec<LinkTx<NodeId>>> = (0..count).map(|_| Vec::new()).collect();
        let mut rxs: Vec<Vec<LinkRx<NodeId>>> = (0..count).map(|_| Vec::new()).collect();
        for i in 0..count {
            for &offset in &offsets {
                let (tx, rx) = link::<NodeId>();
                txs[i].push(tx);
                rxs[(i + offset) % count].push(rx);
            }
        }

        let nodes = txs
            .into_iter()
            .zip(rxs)
            .enumerate()
            .map(|(i, (txs, rxs))| Node::new(i as NodeId, diameter, txs, rxs, Arc::clone(&sink)))
            .collect();

        Network { nodes, diameter }
    }

    /// Longest shortest path between any two nodes; how many rounds each
    /// node runs before deciding.
    pub fn diameter(&self) -> usize {
        self.diameter
    }

    /// Run the election to completion and return the elected identifier.
    ///
    /// Single-use: the run closes every link, so the network cannot be
    /// re-elected afterwards. Node statuses stay inspectable.
    pub fn elect_leader(&mut self) -> Option<NodeId> {
        rl_driver::run(&mut self.nodes)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Neighbor offsets for a circulant graph: alternating +1, -1, +2, -2, ...
/// deduplicated mod `count` and clamped to [1, count - 1] distinct
/// neighbors so every multi-node graph stays connected.
fn chord_offsets(count: usize, degree: usize) -> Vec<usize> {
    let want = degree.max(1).min(count.saturating_sub(1));
    let mut offsets = Vec::with_capacity(want);
    let mut seen = HashSet::new();
    let mut step = 1usize;
    while offsets.len() < want {
        let forward = step % count;
        for offset in [forward, (count - forward) % count] {
            if offset != 0 && seen.insert(offset) && offsets.len() < want {
                offsets.push(offset);
            }
        }
        step += 1;
    }
    offsets
}

/// All-source BFS over the directed circulant.
fn graph_diameter(count: usize, offsets: &[usize]) -> usize {
    let mut diameter = 0;
    for src in 0..count {
        let mut dist = vec![usize::MAX; count];
        let mut queue = VecDeque::new();
        dist[src] = 0;
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            for &offset in offsets {
                let v = (u + offset) % count;
                if dist[v] == usize::MAX {
                    dist[v] = dist[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        let eccentricity = dist.into_iter().max().unwrap_or(0);
        diameter = diameter.max(eccentricity);
    }
    diameter
}

/// A single FloodMax participant.
pub struct Node {
    id: NodeId,
    // largest identifier seen so far
    max: NodeId,
    rounds_completed: usize,
    diameter: usize,
    status: Status,
    txs: Vec<LinkTx<NodeId>>,
    rxs: Vec<LinkRx<NodeId>>,
    sink: Arc<dyn EventSink>,
}

impl Node {
    fn new(
        id: NodeId,
        diameter: usize,
        txs: Vec<LinkTx<NodeId>>,
        rxs: Vec<LinkRx<NodeId>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Node {
            id,
            max: id,
            rounds_completed: 0,
            diameter,
            status: Status::Unknown,
            txs,
            rxs,
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

    /// One round: flood the current maximum everywhere, gather one value
    /// per incoming link, fold, and decide once `diameter` rounds are done.
    pub fn round_trip(&mut self) {
        if self.diameter == 0 {
            // single-node network: nothing to exchange, decide immediately
            self.finalize();
            return;
        }

        let round = self.rounds_completed as Round + 1;
        let delivered = send_each(&self.txs, self.max);
        if delivered > 0 {
            self.sink.log(
                round,
                self.id,
                Event::Flooded {
                    candidate: self.max,
                    links: delivered,
                },
            );
        }

        // a closed link contributes no value; the fold must not wait on it
        for incoming in recv_each(&self.rxs).into_iter().flatten() {
            if incoming > self.max {
                self.max = incoming;
            }
        }

        self.rounds_completed += 1;
        if self.rounds_completed == self.diameter {
            self.finalize();
        }
    }

    fn finalize(&mut self) {
        let to = if self.max == self.id {
            Status::Leader
        } else {
            Status::NonLeader
        };
        debug!("floodmax node {}: {:?} after {} rounds", self.id, to, self.rounds_completed);
        self.sink.log(
            self.rounds_completed as Round,
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

    fn is_finished(&self) -> bool {
        // a settled non-leader has sent its full schedule of floods and
        // may exit without waiting for cancellation
        self.status == Status::NonLeader
    }

    fn round_trip(&mut self) {
        Node::round_trip(self);
    }

    fn shutdown(&mut self) {
        for tx in &mut self.txs {
            tx.close();
        }
        for rx in &mut self.rxs {
            rx.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_interface::CountingSink;
    use std::sync::Mutex;

    struct RecordingSink {
        events: Mutex<Vec<(Round, NodeId, Event)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl EventSink for RecordingSink {
        fn log(&self, round: Round, node: NodeId, event: Event) {
            self.events.lock().unwrap().push((round, node, event));
        }
    }

    #[test]
    fn test_elect_leader() {
        for i in 0..=8 {
            let count = 1usize << i;
            let mut network = Network::new(count);
            let elected = network.elect_leader();

            let expected = (count - 1) as NodeId;
            assert_eq!(elected, Some(expected), "network of {} nodes", count);

            for node in &network.nodes()[..count - 1] {
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
    fn test_empty_network_elects_nobody() {
        let mut network = Network::new(0);
        assert_eq!(network.elect_leader(), None);
    }

    #[test]
    fn test_single_node_decides_without_messages() {
        let sink = Arc::new(CountingSink::new());
        let mut network = Network::new_with_sink(1, DEFAULT_DEGREE, sink.clone());
        assert_eq!(network.diameter(), 0);
        assert_eq!(network.elect_leader(), Some(0));
        assert_eq!(sink.messages(), 0);
    }

    #[test]
    fn test_chord_offsets() {
        // nearest neighbors first, both directions, no duplicates
        assert_eq!(chord_offsets(8, 3), vec![1, 7, 2]);
        assert_eq!(chord_offsets(2, 3), vec![1]);
        assert_eq!(chord_offsets(1, 3), Vec::<usize>::new());
        assert_eq!(chord_offsets(5, 4), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_diameter_of_known_graphs() {
        // directed cycle: the far node is count - 1 hops away
        assert_eq!(graph_diameter(6, &[1]), 5);
        // both directions: half way around
        assert_eq!(graph_diameter(6, &[1, 5]), 3);
        // degree-3 circulant on 8 nodes
        assert_eq!(graph_diameter(8, &[1, 7, 2]), 3);
        // single node
        assert_eq!(graph_diameter(1, &[]), 0);
    }

    #[test]
    fn test_decisions_land_exactly_at_diameter() {
        let sink = Arc::new(RecordingSink::new());
        let mut network = Network::new_with_sink(8, DEFAULT_DEGREE, sink.clone());
        let diameter = network.diameter() as Round;
        assert_eq!(network.elect_leader(), Some(7));

        let events = sink.events.lock().unwrap();
        let decisions: Vec<_> = events
            .iter()
            .filter(|(_, _, event)| matches!(event, Event::StatusChanged { .. }))
            .collect();

        assert_eq!(decisions.len(), 8, "every node decides exactly once");
        for decision in &decisions {
            assert_eq!(
                decision.0, diameter,
                "node {} decided off-schedule",
                decision.1
            );
        }
    }

    #[test]
    fn test_message_count_is_exact() {
        // every node floods every link for exactly diameter rounds
        let sink = Arc::new(CountingSink::new());
        let mut network = Network::new_with_sink(8, DEFAULT_DEGREE, sink.clone());
        let expected = 8 * 3 * network.diameter() as u64;
        assert_eq!(network.elect_leader(), Some(7));
        assert_eq!(sink.messages(), expected);
    }

    #[test]
    fn test_higher_degree_shrinks_the_diameter() {
        let sparse = Network::with_degree(64, 2);
        let dense = Network::with_degree(64, 8);
        assert!(dense.diameter() < sparse.diameter());

        let mut dense = dense;
        assert_eq!(dense.elect_leader(), Some(63));
    }
}
