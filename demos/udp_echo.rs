//! Minimal UDP echo: binds a socket and echoes every datagram it receives
//! back to whichever peer sent it.

use socketcore::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let mut socket = UdpSocket::new();
    let (_, addr) = socket.bind(None, 7001, InternetProtocolVersion::Any, None)?;
    println!("bound to {addr}");

    loop {
        let (data, meta) = socket.receive_from(1024, 0);
        let (Some(text), Some((_, peer))) = (data, meta) else {
            continue;
        };
        println!("{peer} -> {text:?}");
        let (ok, _) = socket.send_to(text.as_bytes(), peer, 0);
        if !ok {
            eprintln!("reply to {peer} failed");
        }
    }
}
