// Single-slot directed links between nodes.
//
// A link is the only way two nodes interact: a directed conduit holding at
// most one in-flight message. Sending blocks until the receiver has drained
// the previous message, which paces the whole topology without a global
// barrier - no node can run more than one message ahead of a neighbor.
//
// Closing is part of the protocol, not an error: a closed link tells the
// receiver that no further messages will ever arrive, and every engine
// treats that as a benign end-of-round condition.

use crossbeam_channel::{bounded, Receiver, Select, Sender};

/// Create a connected link, returning the sending and receiving halves.
pub fn link<M>() -> (LinkTx<M>, LinkRx<M>) {
    let (tx, rx) = bounded(1);
    (LinkTx { tx: Some(tx) }, LinkRx { rx: Some(rx) })
}

/// Sending half of a link.
pub struct LinkTx<M> {
    tx: Option<Sender<M>>,
}

impl<M> LinkTx<M> {
    /// Deliver one message, blocking while the slot is occupied.
    ///
    /// Returns `false` if this half was closed or the receiving half is
    /// gone - the message is dropped in that case.
    pub fn send(&self, msg: M) -> bool {
        match &self.tx {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Hang up. The receiver drains any buffered message first, then
    /// observes the closure.
    pub fn close(&mut self) {
        self.tx = None;
    }

    fn sender(&self) -> Option<&Sender<M>> {
        self.tx.as_ref()
    }
}

/// Receiving half of a link.
pub struct LinkRx<M> {
    rx: Option<Receiver<M>>,
}

impl<M> LinkRx<M> {
    /// Wait for the next message; `None` means the link is closed.
    pub fn recv(&self) -> Option<M> {
        self.rx.as_ref().and_then(|rx| rx.recv().ok())
    }

    /// Drop the receiving half so a peer blocked on `send` is released.
    pub fn close(&mut self) {
        self.rx = None;
    }

    fn receiver(&self) -> Option<&Receiver<M>> {
        self.rx.as_ref()
    }
}

// ============================================================================
// Round-level fan-out / fan-in
// ============================================================================
//
// A round must issue all of a node's link operations at once and settle only
// when every one of them has: waiting on the links one by one could wedge on
// a quiet link while a closed one sits ready. `Select` waits on the whole
// set; a closed link settles immediately as "no value".

/// Send the same message on every link, waiting until each send has either
/// delivered or failed on a closed link. Returns how many were delivered.
pub fn send_each<M: Copy>(txs: &[LinkTx<M>], msg: M) -> usize {
    let mut sel = Select::new();
    let mut senders = Vec::with_capacity(txs.len());
    for tx in txs {
        if let Some(sender) = tx.sender() {
            sel.send(sender);
            senders.push(sender);
        }
    }

    let mut delivered = 0;
    let mut remaining = senders.len();
    while remaining > 0 {
        let oper = sel.select();
        let idx = oper.index();
        if oper.send(senders[idx], msg).is_ok() {
            delivered += 1;
        }
        sel.remove(idx);
        remaining -= 1;
    }
    delivered
}

/// Receive one message from every link. The result is index-aligned with
/// the input; a closed link contributes `None`.
pub fn recv_each<M>(rxs: &[LinkRx<M>]) -> Vec<Option<M>> {
    let mut out: Vec<Option<M>> = rxs.iter().map(|_| None).collect();
    let mut sel = Select::new();
    let mut receivers = Vec::with_capacity(rxs.len());
    for (pos, rx) in rxs.iter().enumerate() {
        if let Some(receiver) = rx.receiver() {
            sel.recv(receiver);
            receivers.push((receiver, pos));
        }
    }

    let mut remaining = receivers.len();
    while remaining > 0 {
        let oper = sel.select();
        let idx = oper.index();
        let (receiver, pos) = receivers[idx];
        out[pos] = oper.recv(receiver).ok();
        sel.remove(idx);
        remaining -= 1;
    }
    out
}

/// Receive one message from each of two links, whichever is ready first.
pub fn recv_both<M>(left: &LinkRx<M>, right: &LinkRx<M>) -> (Option<M>, Option<M>) {
    let mut sel = Select::new();
    let mut receivers = Vec::with_capacity(2);
    if let Some(rx) = left.receiver() {
        sel.recv(rx);
        receivers.push((rx, true));
    }
    if let Some(rx) = right.receiver() {
        sel.recv(rx);
        receivers.push((rx, false));
    }

    let mut out = (None, None);
    let mut remaining = receivers.len();
    while remaining > 0 {
        let oper = sel.select();
        let idx = oper.index();
        let (receiver, is_left) = receivers[idx];
        let got = oper.recv(receiver).ok();
        if is_left {
            out.0 = got;
        } else {
            out.1 = got;
        }
        sel.remove(idx);
        remaining -= 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_link_roundtrip() {
        let (tx, rx) = link();
        assert!(tx.send(42u64));
        assert_eq!(rx.recv(), Some(42));
    }

    #[test]
    fn test_closed_tx_yields_none() {
        let (mut tx, rx) = link::<u64>();
        assert!(tx.send(1));
        tx.close();
        // the buffered message survives the hang-up, then closure shows
        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), None);
    }

    #[test]
    fn test_send_to_closed_rx_fails() {
        let (tx, mut rx) = link::<u64>();
        rx.close();
        assert!(!tx.send(1));
    }

    #[test]
    fn test_single_slot_blocks_until_drained() {
        let (tx, rx) = link::<u64>();
        assert!(tx.send(1));

        let handle = thread::spawn(move || {
            // blocks on the occupied slot until the receiver drains it
            assert!(tx.send(2));
        });

        assert_eq!(rx.recv(), Some(1));
        assert_eq!(rx.recv(), Some(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_recv_each_tolerates_closed_sources() {
        let (tx_a, rx_a) = link::<u64>();
        let (mut tx_b, rx_b) = link::<u64>();
        let (tx_c, rx_c) = link::<u64>();

        assert!(tx_a.send(10));
        tx_b.close();
        assert!(tx_c.send(30));

        let got = recv_each(&[rx_a, rx_b, rx_c]);
        assert_eq!(got, vec![Some(10), None, Some(30)]);
    }

    #[test]
    fn test_send_each_counts_deliveries() {
        let (tx_a, rx_a) = link::<u64>();
        let (tx_b, mut rx_b) = link::<u64>();
        rx_b.close();

        let delivered = send_each(&[tx_a, tx_b], 5);
        assert_eq!(delivered, 1);
        assert_eq!(rx_a.recv(), Some(5));
    }

    #[test]
    fn test_recv_both_is_order_independent() {
        let (tx_l, rx_l) = link::<u64>();
        let (tx_r, rx_r) = link::<u64>();

        // only the right side has anything buffered yet; the left side
        // arrives from another thread while we wait on both
        assert!(tx_r.send(2));
        let handle = thread::spawn(move || {
            assert!(tx_l.send(1));
        });

        let (left, right) = recv_both(&rx_l, &rx_r);
        assert_eq!(left, Some(1));
        assert_eq!(right, Some(2));
        handle.join().unwrap();
    }
}
