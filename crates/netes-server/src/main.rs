//! Standalone netes server binary.

use clap::Parser;
use netes_server::cli::{ServerArgs, run};

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
