//! Minimal TCP echo client: sends a line, prints whatever comes back.

use socketcore::prelude::*;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let host = env::args().nth(1).unwrap_or_else(|| "127.0.0.1".to_string());
    let message = env::args().nth(2).unwrap_or_else(|| "hello\n".to_string());

    let client = TcpSocket::connect(&host, 7000, InternetProtocolVersion::Any)?;
    let (ok, sent) = client.send(message.as_bytes(), 0);
    if !ok {
        eprintln!("send failed");
        return Ok(());
    }
    println!("sent {sent} bytes");

    if client.ready(2_000_000) {
        let reply = client.receive_amount(message.len(), 0);
        println!("echoed back: {:?}", String::from_utf8_lossy(&reply));
    } else {
        println!("no reply within timeout");
    }
    Ok(())
}
