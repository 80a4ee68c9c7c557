//! # Utility module

use anyhow::{anyhow, Result};
use log::*;
use std::io::Read;
use std::net::{TcpListener, TcpStream};

/// Open a file, standard input, or a TCP input stream.
pub fn open_input(input: &str) -> Result<Box<dyn Read + Send>> {
    if input == "-" {
        return Ok(Box::new(std::io::stdin()));
    }

    if let Some(input) = input.strip_prefix("tcp://") {
        let (addr, port) = input
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid format, expected tcp://host:port"))?;
        let port: u16 = str::parse(port)?;

        let stream = if addr == "@" {
            let listener = TcpListener::bind(("0.0.0.0", port))?;
            info!("Waiting for a sensor stream on port {port}");
            let (sock, addr) = listener.accept()?;
            info!("Accepted sensor stream from {addr}");
            sock
        } else {
            info!("Connecting to {input}");
            TcpStream::connect((addr, port))?
        };

        Ok(Box::new(stream))
    } else {
        std::fs::File::open(input)
            .map(|i| Box::new(i) as _)
            .map_err(|e| anyhow!("failed to open {input}: {e}"))
    }
}
