//! Async echo with a cancellable read on a tokio runtime.
//!
//! Run with:
//!   cargo run --example async-echo-pair

use std::time::Duration;

use memduplex::stream::{pair_with_config, CancellationToken, PairConfig, StreamError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PairConfig::default().with_labels("client", "server");
    let (mut client, server) = pair_with_config(&config);

    let server_task = tokio::spawn(async move {
        let mut server = server;
        let mut buf = [0u8; 64];
        loop {
            // The inherent `read` is the blocking one; go through the trait.
            let n = AsyncReadExt::read(&mut server, &mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(());
            }
            server.write_all(&buf[..n]).await?;
        }
    });

    client.write_all(b"ping").await?;
    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).await?;
    eprintln!("[client] got {:?}", String::from_utf8_lossy(&buf));

    // Nothing else is coming; give up waiting after a short deadline.
    let token = CancellationToken::new();
    let deadline = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };
    match client.read_async(&mut buf, Some(&token)).await {
        Err(StreamError::Cancelled) => eprintln!("[client] read cancelled"),
        other => eprintln!("[client] unexpected: {other:?}"),
    }
    deadline.await?;

    client.shutdown().await?;
    server_task.await??;
    Ok(())
}
