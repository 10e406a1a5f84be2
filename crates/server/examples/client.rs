//! Minimal blocking client for poking a running redka server.
//!
//! ```text
//! cargo run -p server --example client -- '{name:"Alice"}'
//! cargo run -p server --example client -- '<uuid-from-create>'
//! cargo run -p server --example client -- '{@<uuid> address@2:"Wonderland"}'
//! ```
//!
//! Sends one frame to `127.0.0.1:8080` (override with `REDKA_PORT`) and
//! prints the raw response.

use std::io::{Read, Write};
use std::net::TcpStream;

fn main() -> std::io::Result<()> {
    let frame = std::env::args()
        .nth(1)
        .unwrap_or_else(|| r#"{name:"Alice"}"#.to_string());
    let port: u16 = std::env::var("REDKA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    stream.write_all(frame.as_bytes())?;
    println!("sent:     {frame}");

    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf)?;
    println!("received: {}", String::from_utf8_lossy(&buf[..n]));
    Ok(())
}
