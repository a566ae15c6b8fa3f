#[tokio::main]
async fn main() {
    if let Err(e) = node_conformance::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
