use clap::Parser;

use relaycheck::stub;

/// A deterministic stub JSON-RPC backend used as a routing target in harness
/// runs. Multiple instances run concurrently, one per port.
#[derive(Parser, Debug)]
#[command(name = "stub_rpc_server")]
#[command(author, version, about = "Stub JSON-RPC backend for proxy harness runs", long_about = None)]
struct Args {
    /// TCP port to listen on
    #[arg(default_value_t = stub::DEFAULT_PORT)]
    port: u16,

    /// Verbose mode (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(match args.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        })
        .init();

    stub::serve(args.port).await;
}
