//! Line-oriented echo between two threads over an in-memory pair.
//!
//! Run with:
//!   cargo run --example echo-pair

use std::io::{BufRead, BufReader, Write};
use std::thread;

use memduplex::stream::pair;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut client, server) = pair();

    // Echo each line back upper-cased until the client closes.
    let echo = thread::spawn(move || -> std::io::Result<()> {
        let mut lines = BufReader::new(&server);
        let mut line = String::new();
        while lines.read_line(&mut line)? > 0 {
            (&server).write_all(line.to_uppercase().as_bytes())?;
            line.clear();
        }
        Ok(())
    });

    for word in ["hello", "duplex", "world"] {
        writeln!(client, "{word}")?;
    }

    let mut replies = BufReader::new(&client);
    for _ in 0..3 {
        let mut reply = String::new();
        replies.read_line(&mut reply)?;
        eprint!("[client] {reply}");
    }
    drop(replies);

    client.dispose();
    echo.join().map_err(|_| "echo thread panicked")??;
    Ok(())
}
