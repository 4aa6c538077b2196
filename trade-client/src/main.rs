//! Interactive client. State-free beyond "am I authenticated": it sends one
//! command frame, prints one reply frame, and for buy/sell relays the single
//! confirmation answer the router is waiting on.

use anyhow::{bail, Result};
use clap::Parser;
use exchange_core::comms::framing::{read_frame, write_frame};
use log::debug;
use std::io::Write as _;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address of the front router
    #[arg(long, default_value = "127.0.0.1:42010")]
    router_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(args.router_addr).await?;
    let local = stream.local_addr()?;
    println!("Connected to the trading server using TCP on port {}.", local.port());

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = write_half;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    if !authenticate(&mut reader, &mut writer, &mut stdin).await? {
        return Ok(());
    }

    println!("Available commands:");
    println!("  quote                 - show all stock prices");
    println!("  quote <stock>         - show one stock price");
    println!("  buy <stock> <shares>  - buy shares of a stock");
    println!("  sell <stock> <shares> - sell shares of a stock");
    println!("  position              - view your current portfolio");
    println!("  exit                  - logout and exit");
    println!();

    loop {
        prompt("> ")?;
        let Some(command) = stdin.next_line().await? else {
            break;
        };
        let command = command.trim().to_string();
        if command.is_empty() {
            continue;
        }
        if command == "exit" {
            println!("Exiting...");
            break;
        }
        if !run_command(&command, &mut reader, &mut writer, &mut stdin).await? {
            break;
        }
    }
    Ok(())
}

async fn authenticate(
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    stdin: &mut Lines<BufReader<Stdin>>,
) -> Result<bool> {
    prompt("Enter username: ")?;
    let Some(username) = stdin.next_line().await? else {
        return Ok(false);
    };
    prompt("Enter password: ")?;
    let Some(password) = stdin.next_line().await? else {
        return Ok(false);
    };

    write_frame(writer, &format!("AUTH {} {}", username.trim(), password.trim())).await?;
    let Some(reply) = read_frame(reader).await? else {
        bail!("server closed the connection during authentication");
    };
    debug!("auth reply: {}", reply);

    if reply == "AUTH_SUCCESS" {
        println!("You have been granted access.");
        Ok(true)
    } else {
        println!("The credentials are incorrect. Please try again.");
        Ok(false)
    }
}

/// Sends one command and prints its reply; for a trade, relays the one
/// confirmation line the router blocks on. Returns `false` once the server
/// has closed the connection.
async fn run_command(
    command: &str,
    reader: &mut BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    stdin: &mut Lines<BufReader<Stdin>>,
) -> Result<bool> {
    write_frame(writer, command).await?;
    let Some(reply) = read_frame(reader).await? else {
        println!("Server closed the connection.");
        return Ok(false);
    };
    println!("{}", reply);

    let keyword = command.split_whitespace().next().unwrap_or_default();
    let is_confirm_prompt =
        reply.starts_with("BUY CONFIRM:") || reply.starts_with("SELL CONFIRM:");
    if (keyword == "buy" || keyword == "sell") && is_confirm_prompt {
        prompt(&format!("Confirm {}? (yes/no): ", keyword))?;
        let answer = stdin.next_line().await?.unwrap_or_default();
        write_frame(writer, answer.trim()).await?;
        let Some(result) = read_frame(reader).await? else {
            println!("Server closed the connection.");
            return Ok(false);
        };
        println!("{}", result);
    }
    Ok(true)
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(())
}
