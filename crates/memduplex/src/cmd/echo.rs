use std::time::{Duration, Instant};

use memduplex_stream::{pair_with_config, Endpoint, PairConfig, StreamError};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::EchoArgs;
use crate::exit::{io_error, mismatch, stream_error, worker_panicked, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

#[derive(Serialize)]
struct EchoReport {
    kind: &'static str,
    rounds: u32,
    payload: u32,
    echoed_bytes: u64,
    mean_us: f64,
    min_us: f64,
    max_us: f64,
}

impl Report for EchoReport {
    fn title(&self) -> &'static str {
        self.kind
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rounds", self.rounds.to_string()),
            ("payload", self.payload.to_string()),
            ("echoed_bytes", self.echoed_bytes.to_string()),
            ("mean_us", format!("{:.2}", self.mean_us)),
            ("min_us", format!("{:.2}", self.min_us)),
            ("max_us", format!("{:.2}", self.max_us)),
        ]
    }
}

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = PairConfig::default().with_labels("echo-client", "echo-server");
    let (client, server) = pair_with_config(&config);
    let payload_len = args.payload as usize;

    info!(rounds = args.rounds, payload = payload_len, "starting echo");

    let server_thread = std::thread::Builder::new()
        .name("echo-server".to_string())
        .spawn(move || serve(&server, payload_len))
        .map_err(|err| io_error("failed to spawn echo server", err))?;

    let latencies = bounce(&client, args.rounds, payload_len);
    // Always close so the server thread can exit, even after a failure.
    client.dispose();

    let echoed_bytes = server_thread
        .join()
        .map_err(|_| worker_panicked("echo-server"))?
        .map_err(|err| stream_error("echo server failed", err))?;
    let latencies = latencies?;

    let micros: Vec<f64> = latencies
        .iter()
        .map(|d| d.as_secs_f64() * 1_000_000.0)
        .collect();
    let mean_us = micros.iter().sum::<f64>() / micros.len().max(1) as f64;

    let report = EchoReport {
        kind: "echo",
        rounds: args.rounds,
        payload: args.payload,
        echoed_bytes,
        mean_us,
        min_us: micros.iter().copied().fold(f64::INFINITY, f64::min),
        max_us: micros.iter().copied().fold(0.0, f64::max),
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

/// Echo everything read back to the sender until the client closes.
/// Returns the number of bytes echoed.
fn serve(endpoint: &Endpoint, buf_len: usize) -> Result<u64, StreamError> {
    let mut buf = vec![0u8; buf_len];
    let mut echoed = 0u64;
    loop {
        let n = endpoint.read(&mut buf)?;
        if n == 0 {
            debug!(echoed, "client closed");
            return Ok(echoed);
        }
        endpoint.write(&buf[..n])?;
        echoed += n as u64;
    }
}

fn bounce(endpoint: &Endpoint, rounds: u32, payload_len: usize) -> CliResult<Vec<Duration>> {
    let mut latencies = Vec::with_capacity(rounds as usize);
    let mut payload = vec![0u8; payload_len];
    let mut reply = vec![0u8; payload_len];

    for round in 0..rounds {
        payload.fill((round % 256) as u8);

        let start = Instant::now();
        endpoint
            .write(&payload)
            .map_err(|err| stream_error("echo write failed", err))?;

        let mut received = 0;
        while received < payload_len {
            let n = endpoint
                .read(&mut reply[received..])
                .map_err(|err| stream_error("echo read failed", err))?;
            if n == 0 {
                return Err(mismatch(
                    "echo failed",
                    format!("server closed during round {round}"),
                ));
            }
            received += n;
        }
        latencies.push(start.elapsed());

        if reply != payload {
            return Err(mismatch(
                "echo verification failed",
                format!("round {round} returned different bytes"),
            ));
        }
    }

    Ok(latencies)
}
