// main.rs
use std::env;
use std::process;

use adaptive_signals::{ControllerConfig, TrafficManager};
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let scenario = args.first().map(String::as_str).unwrap_or("normal");
    let speed = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1.0);
    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(30);

    let config = match args.get(3) {
        Some(path) => match ControllerConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => ControllerConfig::default(),
    };

    let manager = TrafficManager::new(config);
    manager.start();

    if let Err(e) = manager.start_simulation(scenario, speed).await {
        eprintln!("{}", e);
        manager.stop().await;
        process::exit(1);
    }

    for _ in 0..seconds {
        sleep(Duration::from_secs(1)).await;
        match serde_json::to_string(&manager.get_traffic_state()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("failed to serialize traffic state: {}", e),
        }
    }

    manager.stop().await;
}
