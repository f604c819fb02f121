//! # rl_rust - Ring Leader Election
//!
//! A Rust implementation of three classic distributed leader-election
//! protocols, simulated over an in-process message-passing network. Each
//! node runs as its own actor thread and talks to its neighbors only
//! through single-slot links - no shared state, no global coordinator.
//!
//! ## Core Components
//!
//! - **LCR** (`rl_lcr`): unidirectional ring, O(n) messages
//! - **HS** (`rl_hs`): bidirectional ring with phase-doubling probes,
//!   O(n log n) messages
//! - **FloodMax** (`rl_floodmax`): fixed-degree network, floods the known
//!   maximum for `diameter` rounds
//! - **Driver** (`rl_driver`): spawns one actor per node, collects the
//!   first leader report and cancels the rest
//! - **Links** (`rl_link`): blocking single-slot conduits with close
//!   semantics, plus round-level fan-out/fan-in helpers
//!
//! Identifiers are consecutive integers assigned at construction, and the
//! node holding the largest one always wins - which is exactly what the
//! tests lean on.
//!
//! ## Usage
//!
//! ```no_run
//! use rl_rust::rl_lcr::Ring;
//!
//! let mut ring = Ring::new(32);
//! match ring.elect_leader() {
//!     Some(id) => println!("elected leader: {}", id),
//!     None => println!("empty ring, nobody to elect"),
//! }
//! ```
//!
//! ## Observability
//!
//! Every topology builder has a `new_with_sink` variant taking an
//! [`EventSink`]; sinks see every message put on the wire and every status
//! transition, which is how the scenario runner and the complexity tests
//! count traffic without touching the protocol logic.

// Election engines
pub mod rl_driver;
pub mod rl_floodmax;
pub mod rl_hs;
pub mod rl_lcr;

// Shared plumbing
pub mod rl_interface;
pub mod rl_link;

// Re-export commonly used types
pub use rl_driver::{ElectionNode, StopSignal};
pub use rl_interface::{
    CountingSink, Direction, Event, EventSink, NoOpSink, NodeId, Round, Status, Token,
};
