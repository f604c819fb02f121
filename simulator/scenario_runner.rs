// Scenario Runner - Load and execute election scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/basic.yaml
//   cargo run --bin scenario_runner scenarios/a.yaml scenarios/b.yaml

use std::env;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use log::info;
use simple_logger::SimpleLogger;

use rl_rust::rl_floodmax::{Network, DEFAULT_DEGREE};
use rl_rust::rl_hs;
use rl_rust::rl_lcr;
use rl_rust::{Event, EventSink, NodeId, Round};

/// Scenario file format
#[derive(Debug, serde::Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    /// Elections to run, in order
    elections: Vec<ElectionConfig>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ElectionConfig {
    protocol: Protocol,
    nodes: usize,

    /// FloodMax only: outgoing links per node
    #[serde(default)]
    degree: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum Protocol {
    Lcr,
    Hs,
    Floodmax,
}

/// Per-node message tally, shared across the node actors of one election.
#[derive(Default)]
struct TallySink {
    per_node: Mutex<HashMap<NodeId, u64>>,
}

impl TallySink {
    fn total(&self) -> u64 {
        self.per_node.lock().unwrap().values().sum()
    }

    fn busiest(&self) -> Option<(NodeId, u64)> {
        self.per_node
            .lock()
            .unwrap()
            .iter()
            .map(|(node, sent)| (*node, *sent))
            .max_by_key(|&(node, sent)| (sent, node))
    }
}

impl EventSink for TallySink {
    fn log(&self, _round: Round, node: NodeId, event: Event) {
        let sent = match event {
            Event::IdSent { .. } | Event::TokenSent { .. } => 1,
            Event::Flooded { links, .. } => links as u64,
            _ => return,
        };
        *self.per_node.lock().unwrap().entry(node).or_insert(0) += sent;
    }
}

fn main() {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = env::args().collect();
    // TODO accept a directory and run every .yaml inside it
    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml> [more.yaml ...]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/basic.yaml", args[0]);
        process::exit(1);
    }

    let mut failures = 0;
    for path in &args[1..] {
        failures += run_scenario_file(Path::new(path));
    }

    if failures > 0 {
        eprintln!("{} election(s) failed", failures);
        process::exit(1);
    }
}

/// Run every election in one scenario file, returning the failure count.
fn run_scenario_file(path: &Path) -> usize {
    let contents = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        process::exit(1);
    });

    let scenario: ScenarioFile = serde_yaml::from_str(&contents).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        process::exit(1);
    });

    let name = scenario
        .meta
        .name
        .unwrap_or_else(|| path.display().to_string());
    info!("scenario: {}", name);
    if let Some(description) = &scenario.meta.description {
        info!("  {}", description);
    }

    let mut failures = 0;
    for config in &scenario.elections {
        let sink = Arc::new(TallySink::default());
        let elected = run_election(config, sink.clone());

        let expected = config.nodes.checked_sub(1).map(|id| id as NodeId);
        let ok = elected == expected;
        if !ok {
            failures += 1;
        }

        println!(
            "{:>9} nodes:{:<6} leader:{:<6} messages:{:<8} {}",
            format!("{:?}", config.protocol).to_lowercase(),
            config.nodes,
            elected.map_or_else(|| "-".to_string(), |id| id.to_string()),
            sink.total(),
            if ok { "ok" } else { "MISMATCH" },
        );
        if let Some((node, sent)) = sink.busiest() {
            info!("  busiest node: {} with {} messages", node, sent);
        }
    }
    failures
}

fn run_election(config: &ElectionConfig, sink: Arc<TallySink>) -> Option<NodeId> {
    match config.protocol {
        Protocol::Lcr => rl_lcr::Ring::new_with_sink(config.nodes, sink).elect_leader(),
        Protocol::Hs => rl_hs::Ring::new_with_sink(config.nodes, sink).elect_leader(),
        Protocol::Floodmax => {
            let degree = config.degree.unwrap_or(DEFAULT_DEGREE);
            Network::new_with_sink(config.nodes, degree, sink).elect_leader()
        }
    }
}
