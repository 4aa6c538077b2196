mod book;

use anyhow::Result;
use book::LedgerBook;
use clap::Parser;
use exchange_core::comms::MAX_MESSAGE;
use exchange_core::protocol::BackendRequest;
use log::{debug, info, warn};
use std::path::PathBuf;
use tokio::net::UdpSocket;

/// Ledger service: answers BUY, SELL, CHECK, and PORTFOLIO requests.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP port to listen on
    #[arg(long, default_value_t = 42002)]
    port: u16,

    /// Portfolios file (username lines followed by holding lines)
    #[arg(long, default_value = "data/portfolios.txt")]
    portfolios_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut book = LedgerBook::load(&args.portfolios_file)?;
    info!(
        "loaded {} user portfolios from {}",
        book.user_count(),
        args.portfolios_file.display()
    );

    let socket = UdpSocket::bind(("0.0.0.0", args.port)).await?;
    info!("Booting up using UDP on port {}.", args.port);

    // All ledger mutation happens inside this loop, one request at a time.
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
                    Ok(BackendRequest::Buy { username, symbol, shares, price }) => {
                        book.buy(&username, &symbol, shares, price)
                    }
                    Ok(BackendRequest::Sell { username, symbol, shares, price }) => {
                        book.sell(&username, &symbol, shares, price)
                    }
                    Ok(BackendRequest::Check { username, symbol, shares }) => {
                        book.check(&username, &symbol, shares)
                    }
                    Ok(BackendRequest::Portfolio { username }) => book.snapshot(&username),
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
