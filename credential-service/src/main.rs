mod store;

use anyhow::Result;
use clap::Parser;
use exchange_core::comms::MAX_MESSAGE;
use exchange_core::protocol::BackendRequest;
use log::{debug, info, warn};
use std::path::PathBuf;
use store::CredentialStore;
use tokio::net::UdpSocket;

/// Credential service: answers AUTH requests from the router.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// UDP port to listen on
    #[arg(long, default_value_t = 42001)]
    port: u16,

    /// Members file (`<username> <password>` per line)
    #[arg(long, default_value = "data/members.txt")]
    members_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = CredentialStore::load(&args.members_file)?;
    info!(
        "loaded {} user credentials from {}",
        store.len(),
        args.members_file.display()
    );

    let socket = UdpSocket::bind(("0.0.0.0", args.port)).await?;
    info!("Booting up using UDP on port {}.", args.port);

    // One request, one reply, strictly in sequence. This loop being the only
    // reader of the table is the service's whole synchronization story.
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
                    Ok(BackendRequest::Auth { username, obfuscated }) => {
                        if store.verify(&username, &obfuscated) {
                            info!("member {} has been authenticated", username);
                            "AUTH_SUCCESS"
                        } else {
                            info!("the username or password for {} is incorrect", username);
                            "AUTH_FAILED"
                        }
                    }
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
