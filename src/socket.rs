//! # Summary
//!
//! This module abstracts over TCP connections between nodes, the router and
//! the operator.
//!
//! Uses `tokio_util`'s `LinesCodec` over a split `tokio` TCP stream, so each
//! frame is one newline-terminated line of text. Every protocol message fits
//! on one line, which keeps the wire readable with `nc` during experiments.

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::error::Error;

/// Longest accepted line, in bytes.
pub const MAX_LINE: usize = 64 * 1024;

/// Receiving half of a line-framed connection.
pub struct Rx(FramedRead<OwnedReadHalf, LinesCodec>);

/// Transmitting half of a line-framed connection.
pub struct Tx(FramedWrite<OwnedWriteHalf, LinesCodec>);

/// Split a `tokio::net::TcpStream` into a pair of receiving and transmitting
/// channels capable of reading and writing lines.
pub fn split(stream: TcpStream) -> (Rx, Tx) {
    let (rx, tx) = stream.into_split();
    let rx = FramedRead::new(rx, LinesCodec::new_with_max_length(MAX_LINE));
    let tx = FramedWrite::new(tx, LinesCodec::new_with_max_length(MAX_LINE));
    (Rx(rx), Tx(tx))
}

impl Rx {
    /// Next line, or `None` once the peer closed the connection.
    pub async fn recv(&mut self) -> Option<Result<String, Error>> {
        self.0.next()
            .await
            .map(|line| line.map_err(Error::from))
    }
}

impl Tx {
    pub async fn send(&mut self, line: String) -> Result<(), Error> {
        self.0.send(line).await?;
        Ok(())
    }
}

/// Opens a connection to `addr`, writes a single line and closes it.
pub async fn send_line(addr: &str, line: String) -> Result<(), Error> {
    let stream = TcpStream::connect(addr).await?;
    let (_, mut tx) = split(stream);
    tx.send(line).await
}

/// Accepts connections forever, feeding every received line to `handler`.
/// Lines from one connection are handled in order; connections run
/// concurrently on their own tasks.
pub async fn serve<F, T>(listener: TcpListener, handler: F) -> Result<(), Error>
    where F: Fn(String) -> T + Clone + Send + Sync + 'static,
          T: Future<Output = ()> + Send + 'static,
{
    loop {
        let (stream, addr) = listener.accept().await?;
        trace!("accepted connection from {}", addr);
        let handler = handler.clone();
        tokio::spawn(async move {
            let (mut rx, _tx) = split(stream);
            while let Some(line) = rx.recv().await {
                match line {
                | Ok(line) => handler(line).await,
                | Err(error) => {
                    warn!("dropping connection from {}: {}", addr, error);
                    break
                }
                }
            }
        });
    }
}
