mod book;

use anyhow::Result;
use book::QuoteBook;
use clap::Parser;
use exchange_core::comms::MAX_MESSAGE;
use exchange_core::protocol::BackendRequest;
use log::{debug, info, warn};
use std::path::PathBuf;
use tokio::net::UdpSocket;

/// Quote service: answers QUOTE and ADVANCE requests from the router.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP port to listen on
    #[arg(long, default_value_t = 42003)]
    port: u16,

    /// Quotes file (`<symbol> <p0> .. <p9>` per line)
    #[arg(long, default_value = "data/quotes.txt")]
    quotes_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut book = QuoteBook::load(&args.quotes_file)?;
    info!(
        "loaded {} stock quotes from {}",
        book.len(),
        args.quotes_file.display()
    );

    let socket = UdpSocket::bind(("0.0.0.0", args.port)).await?;
    info!("Booting up using UDP on port {}.", args.port);

    // The quote table is mutated only inside this loop, one request at a
    // time; router sessions are serialized by arrival order here.
    let mut buf = vec![0u8; MAX_MESSAGE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        warn!("recv failed: {}", e);
                        continue;
                    }
                };
                let request = String::from_utf8_lossy(&buf[..len]).into_owned();
                debug!("received from {}: {}", peer, request);

                let reply = match BackendRequest::parse(&request) {
                    Ok(BackendRequest::Quote { symbol: None }) => book.listing(),
                    Ok(BackendRequest::Quote { symbol: Some(symbol) }) => book.quote(&symbol),
                    Ok(BackendRequest::Advance { symbol }) => book.advance(&symbol),
                    Ok(_) => {
                        warn!("dropping request for another service: {}", request);
                        continue;
                    }
                    Err(e) => {
                        warn!("dropping unparseable request: {}", e);
                        continue;
                    }
                };
                if let Err(e) = socket.send_to(reply.as_bytes(), peer).await {
                    warn!("reply to {} failed: {}", peer, e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("caught interrupt, shutting down");
                break;
            }
        }
    }
    Ok(())
}
