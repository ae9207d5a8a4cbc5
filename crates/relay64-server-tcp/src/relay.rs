//! Bidirectional byte relay

use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

/// Which copy loop ended the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToDestination,
    DestinationToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToDestination => write!(f, "client -> destination"),
            Direction::DestinationToClient => write!(f, "destination -> client"),
        }
    }
}

/// How a relay ended
#[derive(Debug)]
pub struct RelayOutcome {
    /// The direction that finished first
    pub finished: Direction,
    /// Bytes copied by that direction, or the error that stopped it
    pub result: std::io::Result<u64>,
}

/// Copy bytes between `client` and `destination` until either side is done
///
/// Each direction runs as its own task. As soon as one of them reaches
/// end-of-stream or fails, the other is aborted and both streams are dropped,
/// which closes them exactly once. Data is streamed through the copy buffer;
/// nothing is stored beyond it.
pub async fn relay<C, D>(client: C, destination: D) -> RelayOutcome
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    D: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut destination_read, mut destination_write) = tokio::io::split(destination);

    let mut client_to_destination = tokio::spawn(async move {
        tokio::io::copy(&mut client_read, &mut destination_write).await
    });
    let mut destination_to_client = tokio::spawn(async move {
        tokio::io::copy(&mut destination_read, &mut client_write).await
    });

    let (finished, joined) = tokio::select! {
        joined = &mut client_to_destination => {
            destination_to_client.abort();
            let _ = destination_to_client.await;
            (Direction::ClientToDestination, joined)
        }
        joined = &mut destination_to_client => {
            client_to_destination.abort();
            let _ = client_to_destination.await;
            (Direction::DestinationToClient, joined)
        }
    };

    let result = joined.unwrap_or_else(|e| Err(std::io::Error::other(e)));
    match &result {
        Ok(bytes) => debug!("Relay finished ({}): {} bytes", finished, bytes),
        Err(e) => debug!("Relay stopped ({}): {}", finished, e),
    }

    RelayOutcome { finished, result }
}
