//! Helpers shared by the unit tests: a one-shot http responder and gzip.

use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
};

use flate2::{write::GzEncoder, Compression};

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Answer exactly one http request with `status` and `body`.  Return the base
/// url of the server, e.g. `http://127.0.0.1:40211/data.csv`.
pub fn serve_once(status: u16, body: Vec<u8>) -> String {
    serve_once_at(status, body, "data.csv")
}

pub fn serve_once_at(status: u16, body: Vec<u8>, path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    });
    format!("http://127.0.0.1:{}/{}", port, path)
}

/// A loopback port nobody is listening on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
