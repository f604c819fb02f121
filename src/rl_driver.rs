// Election driver: one actor thread per node.
//
// The driver owns the run lifecycle. It spawns a scoped thread per node,
// lets each one execute rounds until a local decision rule yields Leader,
// collects the winning identifier through a single-use report channel, and
// then raises a stop signal so every remaining actor winds down and closes
// its links. Scoped threads keep the nodes borrowed rather than consumed,
// so callers can inspect final statuses after the election returns.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::debug;

use crate::rl_interface::NodeId;

/// A node that can take part in a driven election.
///
/// Implementations run their entire protocol inside `round_trip`; the
/// driver only sequences rounds and watches for the terminal states.
pub trait ElectionNode: Send {
    fn id(&self) -> NodeId;

    /// True once the node has elected itself.
    fn is_leader(&self) -> bool;

    /// True once the node has nothing further to do and may exit quietly
    /// without waiting for cancellation. Most protocols never finish on
    /// their own - losing nodes keep relaying until stopped.
    fn is_finished(&self) -> bool {
        false
    }

    /// Execute one send/receive round.
    fn round_trip(&mut self);

    /// Close the node's link endpoints so blocked peers observe closure.
    fn shutdown(&mut self);
}

/// Cooperative cancellation signal, checked between rounds.
///
/// The driver never sends on the underlying channel; hanging it up is the
/// broadcast. Keeping the signal separate from the data links means a
/// closed link and a cancelled run stay distinguishable.
#[derive(Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    pub fn is_raised(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// Run an election over the given nodes, returning the elected identifier.
///
/// An empty topology yields `None` without spawning anything. Blocks until
/// a leader emerges and every actor has been joined.
pub fn run<N: ElectionNode>(nodes: &mut [N]) -> Option<NodeId> {
    if nodes.is_empty() {
        return None;
    }

    let (stop_tx, stop_rx) = bounded::<()>(0);
    let (report_tx, report_rx) = bounded::<NodeId>(1);

    debug!("spawning {} node actors", nodes.len());

    thread::scope(|scope| {
        for node in nodes.iter_mut() {
            let stop = StopSignal {
                rx: stop_rx.clone(),
            };
            let report = report_tx.clone();
            scope.spawn(move || actor(node, stop, report));
        }
        drop(report_tx);

        let elected = report_rx.recv().ok();

        // hanging up the stop channel is the cancellation broadcast
        drop(stop_tx);

        if let Some(id) = elected {
            debug!("leader elected: {}", id);
        }
        elected
    })
}

fn actor<N: ElectionNode>(node: &mut N, stop: StopSignal, report: Sender<NodeId>) {
    loop {
        if stop.is_raised() {
            break;
        }
        if node.is_leader() {
            // single-use rendezvous: the first leader wins, a second
            // report (impossible in a well-formed run) is dropped rather
            // than blocking the join
            let _ = report.try_send(node.id());
            break;
        }
        if node.is_finished() {
            break;
        }
        node.round_trip();
    }
    node.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_floodmax::Network;
    use crate::rl_hs;
    use crate::rl_lcr;

    // Node that leads (or quietly finishes) after a fixed number of rounds,
    // without any links - rounds are pure state ticks.
    struct MockNode {
        id: NodeId,
        rounds: u64,
        leads_after: Option<u64>,
        finishes_after: Option<u64>,
    }

    impl MockNode {
        fn new(id: NodeId) -> Self {
            Self {
                id,
                rounds: 0,
                leads_after: None,
                finishes_after: None,
            }
        }

        fn leads_after(mut self, rounds: u64) -> Self {
            self.leads_after = Some(rounds);
            self
        }

        fn finishes_after(mut self, rounds: u64) -> Self {
            self.finishes_after = Some(rounds);
            self
        }
    }

    impl ElectionNode for MockNode {
        fn id(&self) -> NodeId {
            self.id
        }

        fn is_leader(&self) -> bool {
            self.leads_after.is_some_and(|n| self.rounds >= n)
        }

        fn is_finished(&self) -> bool {
            self.finishes_after.is_some_and(|n| self.rounds >= n)
        }

        fn round_trip(&mut self) {
            self.rounds += 1;
        }

        fn shutdown(&mut self) {}
    }

    #[test]
    fn test_empty_topology_elects_nobody() {
        let mut nodes: Vec<MockNode> = Vec::new();
        assert_eq!(run(&mut nodes), None);
    }

    #[test]
    fn test_first_leader_is_reported() {
        let mut nodes = vec![
            MockNode::new(0),
            MockNode::new(1).leads_after(3),
            MockNode::new(2),
        ];
        assert_eq!(run(&mut nodes), Some(1));
    }

    #[test]
    fn test_all_finished_without_leader_yields_none() {
        let mut nodes = vec![
            MockNode::new(0).finishes_after(1),
            MockNode::new(1).finishes_after(2),
        ];
        assert_eq!(run(&mut nodes), None);
    }

    #[test]
    fn test_agreement_across_protocols() {
        let n = 64;
        let lcr = rl_lcr::Ring::new(n).elect_leader();
        let hs = rl_hs::Ring::new(n).elect_leader();
        let floodmax = Network::new(n).elect_leader();

        assert_eq!(lcr, Some(63));
        assert_eq!(hs, lcr);
        assert_eq!(floodmax, lcr);
    }

    #[test]
    fn test_repeated_runs_are_deterministic() {
        for _ in 0..5 {
            assert_eq!(rl_lcr::Ring::new(32).elect_leader(), Some(31));
            assert_eq!(rl_hs::Ring::new(32).elect_leader(), Some(31));
            assert_eq!(Network::new(32).elect_leader(), Some(31));
        }
    }
}
