//! Minimal TCP echo server: accepts one connection at a time and echoes
//! back whatever it reads until the peer closes.

use socketcore::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let server = TcpServerSocket::bind(None, 7000, 16, InternetProtocolVersion::Any)?;
    println!("listening on port {}", server.port());

    loop {
        let peer = match server.accept(0) {
            Ok(peer) => peer,
            Err(e) => {
                eprintln!("accept failed: {e}");
                continue;
            }
        };
        println!("accepted connection from {:?}", peer.remote_address());

        loop {
            if !peer.ready(1_000_000) {
                break;
            }
            let chunk = peer.receive_amount(512, 0);
            if chunk.is_empty() {
                break;
            }
            let (ok, _) = peer.send(&chunk, 0);
            if !ok {
                break;
            }
        }
        println!("connection closed");
    }
}
