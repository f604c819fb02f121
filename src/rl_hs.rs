// HS (Hirschberg and Sinclair) leader election.
//
// Bidirectional ring, O(n log n) messages. Each still-active node probes in
// phases: in phase l it sends tokens carrying its identifier a distance of
// 2^l in both directions. A probe is discarded by any node with a larger
// identifier, turns around when its hop budget runs out, and travels back
// to its origin. A node whose probes return from both sides advances to the
// next phase with a doubled budget; a node that receives its own probe
// still outbound has gone all the way around the ring and is the leader.
//
// Every live node emits exactly one frame per outgoing link per round - an
// empty frame when it has no token for that side. The single-slot links
// then pace the whole ring in lockstep, which is what makes "both probes
// returned in the same round" a meaningful condition and keeps a quiet
// neighbor from wedging the receive step.

use std::sync::Arc;

use log::debug;

use crate::rl_driver::{self, ElectionNode};
use crate::rl_interface::{Direction, Event, EventSink, NoOpSink, NodeId, Round, Status, Token};
use crate::rl_link::{link, recv_both, LinkRx, LinkTx};

/// What travels on an HS link each round: a probe token or nothing.
pub type Frame = Option<Token>;

/// Which neighbor a token came from or goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A bidirectional ring of HS nodes.
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

        // two opposite lanes per ring edge: cw[i] carries i -> i+1,
        // ccw[i] carries i+1 -> i
        let (cw_txs, cw_rxs): (Vec<_>, Vec<_>) = (0..count).map(|_| link::<Frame>()).unzip();
        let (ccw_txs, ccw_rxs): (Vec<_>, Vec<_>) = (0..count).map(|_| link::<Frame>()).unzip();

        // node j sends right on cw[j] and left on ccw[j-1], receives from
        // the left on cw[j-1] and from the right on ccw[j]
        let mut cw_rxs = cw_rxs;
        cw_rxs.rotate_right(1);
        let mut ccw_txs = ccw_txs;
        ccw_txs.rotate_right(1);

        let nodes = cw_txs
            .into_iter()
            .zip(ccw_txs)
            .zip(cw_rxs.into_iter().zip(ccw_rxs))
            .enumerate()
            .map(|(j, ((tx_right, tx_left), (rx_left, rx_right)))| {
                Node::new(j as NodeId, tx_left, tx_right, rx_left, rx_right, Arc::clone(&sink))
            })
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

/// A single HS participant.
pub struct Node {
    id: NodeId,
    phase: u32,
    round: Round,
    status: Status,
    pending_left: Option<Token>,
    pending_right: Option<Token>,
    tx_left: LinkTx<Frame>,
    tx_right: LinkTx<Frame>,
    rx_left: LinkRx<Frame>,
    rx_right: LinkRx<Frame>,
    sink: Arc<dyn EventSink>,
}

impl Node {
    fn new(
        id: NodeId,
        tx_left: LinkTx<Frame>,
        tx_right: LinkTx<Frame>,
        rx_left: LinkRx<Frame>,
        rx_right: LinkRx<Frame>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let probe = Token {
            origin: id,
            hops: 1,
            direction: Direction::Outbound,
        };
        Node {
            id,
            phase: 0,
            round: 0,
            status: Status::Unknown,
            pending_left: Some(probe),
            pending_right: Some(probe),
            tx_left,
            tx_right,
            rx_left,
            rx_right,
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

    /// Highest probing phase this node reached.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// One round: emit this round's frames, then receive and judge both
    /// neighbors' frames.
    pub fn round_trip(&mut self) {
        self.round += 1;
        self.generate();
        self.transition();
    }

    fn generate(&mut self) {
        let left = self.pending_left.take();
        let right = self.pending_right.take();
        self.emit(Side::Left, left);
        self.emit(Side::Right, right);
    }

    fn emit(&self, side: Side, frame: Frame) {
        let tx = match side {
            Side::Left => &self.tx_left,
            Side::Right => &self.tx_right,
        };
        if tx.send(frame) {
            if let Some(tok) = frame {
                self.sink.log(
                    self.round,
                    self.id,
                    Event::TokenSent {
                        origin: tok.origin,
                        hops: tok.hops,
                        direction: tok.direction,
                    },
                );
            }
        }
    }

    fn transition(&mut self) {
        let (left, right) = recv_both(&self.rx_left, &self.rx_right);
        // a closed link and an empty frame both mean "no token from this
        // side"; closure only happens once the run is being cancelled
        let left = left.flatten();
        let right = right.flatten();

        if let Some(tok) = left {
            self.judge(tok, Side::Left);
        }
        if let Some(tok) = right {
            self.judge(tok, Side::Right);
        }

        if self.is_own_reflection(left) && self.is_own_reflection(right) {
            // both probes of the current phase made it home in the same
            // round: probe twice as far in the next one
            self.phase += 1;
            let probe = Token {
                origin: self.id,
                hops: 1u64 << self.phase,
                direction: Direction::Outbound,
            };
            self.pending_left = Some(probe);
            self.pending_right = Some(probe);
            self.sink
                .log(self.round, self.id, Event::PhaseAdvanced { phase: self.phase });
            debug!("hs node {}: phase {}", self.id, self.phase);
        }
    }

    fn judge(&mut self, tok: Token, from: Side) {
        match tok.direction {
            Direction::Outbound => {
                if tok.origin > self.id {
                    // a larger identifier passing through proves this node
                    // cannot lead
                    self.transition_status(Status::NonLeader);
                    if tok.hops > 1 {
                        self.set_pending(
                            from.opposite(),
                            Token {
                                hops: tok.hops - 1,
                                ..tok
                            },
                        );
                    } else {
                        // budget exhausted: reflect it back the way it came
                        self.set_pending(
                            from,
                            Token {
                                origin: tok.origin,
                                hops: 1,
                                direction: Direction::Inbound,
                            },
                        );
                    }
                } else if tok.origin == self.id {
                    // own probe came all the way around still outbound
                    self.transition_status(Status::Leader);
                }
                // smaller origin: the probe dies here
            }
            Direction::Inbound => {
                if tok.origin != self.id && tok.hops == 1 {
                    // reflected token still on its way home
                    self.set_pending(from.opposite(), tok);
                }
                // own reflection: consumed, the phase check sees it
            }
        }
    }

    fn set_pending(&mut self, side: Side, tok: Token) {
        match side {
            Side::Left => self.pending_left = Some(tok),
            Side::Right => self.pending_right = Some(tok),
        }
    }

    fn is_own_reflection(&self, frame: Frame) -> bool {
        matches!(
            frame,
            Some(tok) if tok.origin == self.id && tok.direction == Direction::Inbound
        )
    }

    fn transition_status(&mut self, to: Status) {
        if self.status != Status::Unknown {
            return;
        }
        debug!("hs node {}: {:?} -> {:?}", self.id, self.status, to);
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
        self.tx_left.close();
        self.tx_right.close();
        self.rx_left.close();
        self.rx_right.close();
    }
}
