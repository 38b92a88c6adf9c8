//! Accept sender connections on 127.0.0.1:13269 and print each frame pair.
//!
//! Usage: cargo run --example receiver

use kineticscan::{protocol, FrameReceiver};
use std::net::{Shutdown, TcpListener};
use std::time::Instant;

fn main() {
    env_logger::init();

    let addr = protocol::default_endpoint();
    let listener = match TcpListener::bind(addr) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    println!("Waiting for sender on {}", addr);

    for conn in listener.incoming() {
        let socket = match conn {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Accept failed: {}", e);
                continue;
            }
        };
        let peer = socket.peer_addr().ok();
        println!("Sender connected from {:?}", peer);

        let reader = match socket.try_clone() {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Failed to clone socket: {}", e);
                continue;
            }
        };
        let start = Instant::now();
        let mut frames = FrameReceiver::new(reader);
        for pair in frames.by_ref() {
            match pair {
                Ok(pair) => println!(
                    "color {}x{}  depth {}x{}",
                    pair.color.width(),
                    pair.color.height(),
                    pair.depth.width(),
                    pair.depth.height()
                ),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        println!(
            "Sender {:?} gone: {} pairs in {:.1}s ({:.1} Hz)",
            peer,
            frames.pairs_received(),
            elapsed,
            frames.pairs_received() as f64 / elapsed.max(f64::EPSILON)
        );
        socket.shutdown(Shutdown::Both).ok();
    }
}
