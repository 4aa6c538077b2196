use anyhow::Result;
use clap::Parser;
use front_router::backend::UdpBackendExchange;
use front_router::session::Session;
use front_router::transport::TcpClientTransport;
use log::{error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Front-end router: TCP towards clients, UDP towards the backend services.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct RouterArgs {
    /// TCP port for client sessions
    #[arg(long, default_value_t = 42010)]
    listen_port: u16,

    /// Address of the credential service
    #[arg(long, default_value = "127.0.0.1:42001")]
    credential_addr: SocketAddr,

    /// Address of the ledger service
    #[arg(long, default_value = "127.0.0.1:42002")]
    ledger_addr: SocketAddr,

    /// Address of the quote service
    #[arg(long, default_value = "127.0.0.1:42003")]
    quote_addr: SocketAddr,

    /// Seconds to wait for a backend reply before failing the command
    #[arg(long, default_value_t = 5)]
    backend_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = RouterArgs::parse();

    let listener = TcpListener::bind(("0.0.0.0", args.listen_port)).await?;
    info!("Booting up using TCP on port {}.", args.listen_port);

    let timeout = Duration::from_secs(args.backend_timeout_secs);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                info!("accepted session from {}", peer);

                let credential_addr = args.credential_addr;
                let quote_addr = args.quote_addr;
                let ledger_addr = args.ledger_addr;
                tokio::spawn(async move {
                    // One UDP socket per session keeps backend replies from
                    // interleaving across sessions.
                    let backend = match UdpBackendExchange::connect(
                        credential_addr,
                        quote_addr,
                        ledger_addr,
                        timeout,
                    )
                    .await
                    {
                        Ok(backend) => backend,
                        Err(e) => {
                            error!("session {} failed to bind backend socket: {}", peer, e);
                            return;
                        }
                    };
                    let session = Session::new(TcpClientTransport::new(stream), backend);
                    if let Err(e) = session.run().await {
                        error!("session {} ended with error: {}", peer, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("caught interrupt, shutting down");
                break;
            }
        }
    }
    Ok(())
}
