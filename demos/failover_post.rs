//! Posts a small JSON document through a failover client and prints the
//! status.
//!
//! ```text
//! RUST_LOG=failnet=debug cargo run --example failover_post -- https://example.com/api
//! ```

use clap::Parser;
use failnet::Client;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "POST with address failover")]
struct Args {
    /// Request target; `https://` is assumed when no scheme is given
    #[arg(default_value = "https://github.com")]
    target: String,

    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// Only resolve the target and print its addresses
    #[arg(long)]
    lookup_only: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut client = Client::new();
    client.set_connection_timeout(Duration::from_secs(args.timeout));

    if args.lookup_only {
        return match client.lookup_for_request(&args.target).await {
            Ok(addrs) => {
                for addr in addrs {
                    println!("{addr}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("lookup failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let body = serde_json::json!({ "id": 1, "name": "failnet" }).to_string();
    match client.failover_post(&args.target, "application/json", body).await {
        Ok(resp) => {
            let status = resp.status();
            match resp.remote_ip() {
                Some(ip) => println!("{} via {ip}", status.as_u16()),
                None => println!("{}", status.as_u16()),
            }
            if status.as_u16() >= 400 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("request failed ({}): {e}", e.as_i32());
            ExitCode::FAILURE
        }
    }
}
