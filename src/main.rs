use std::env;
use std::process;

use log::info;
use simple_logger::SimpleLogger;

use rl_rust::rl_floodmax::Network;
use rl_rust::rl_hs;
use rl_rust::rl_lcr;

fn usage(program: &str) {
    eprintln!("Usage: {} [lcr|hs|floodmax] [--nodes N]", program);
    eprintln!("\nRuns a leader election and prints the elected identifier.");
    eprintln!("Defaults: lcr over 32 nodes.");
}

fn main() {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = env::args().collect();
    let mut protocol = String::from("lcr");
    let mut nodes: usize = 32;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--nodes" | "-n" => {
                i += 1;
                nodes = match args.get(i).and_then(|v| v.parse().ok()) {
                    Some(n) => n,
                    None => {
                        eprintln!("--nodes expects a number");
                        process::exit(1);
                    }
                };
            }
            "--help" | "-h" => {
                usage(&args[0]);
                process::exit(0);
            }
            flag if flag.starts_with('-') => {
                eprintln!("Unknown flag: {}", flag);
                usage(&args[0]);
                process::exit(1);
            }
            name => protocol = name.to_string(),
        }
        i += 1;
    }

    info!("running {} over {} nodes", protocol, nodes);

    let elected = match protocol.as_str() {
        "lcr" => rl_lcr::Ring::new(nodes).elect_leader(),
        "hs" => rl_hs::Ring::new(nodes).elect_leader(),
        "floodmax" => Network::new(nodes).elect_leader(),
        other => {
            eprintln!("Unknown protocol: {} (expected lcr, hs or floodmax)", other);
            process::exit(1);
        }
    };

    match elected {
        Some(id) => println!("Elected leader: {}", id),
        None => println!("No nodes, no leader"),
    }
}
