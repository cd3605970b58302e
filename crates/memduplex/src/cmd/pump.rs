use std::time::Instant;

use memduplex_stream::{pair_with_config, Endpoint, PairConfig, StreamError};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::PumpArgs;
use crate::exit::{
    io_error, mismatch, stream_error, worker_panicked, CliError, CliResult, SUCCESS,
};
use crate::output::{human_bytes, print_report, throughput, OutputFormat, Report};

#[derive(Serialize)]
struct PumpReport {
    kind: &'static str,
    mode: &'static str,
    bytes: u64,
    writes: u64,
    reads: u64,
    short_reads: u64,
    elapsed_ms: f64,
    bytes_per_sec: f64,
}

impl Report for PumpReport {
    fn title(&self) -> &'static str {
        self.kind
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", self.mode.to_string()),
            ("bytes", self.bytes.to_string()),
            ("writes", self.writes.to_string()),
            ("reads", self.reads.to_string()),
            ("short_reads", self.short_reads.to_string()),
            ("elapsed_ms", format!("{:.3}", self.elapsed_ms)),
            ("throughput", format!("{}/s", human_bytes(self.bytes_per_sec))),
        ]
    }
}

/// Running totals on the reader side. Checks every byte against the
/// writer's pattern as it arrives.
#[derive(Default)]
struct Tally {
    bytes: u64,
    reads: u64,
    short_reads: u64,
}

impl Tally {
    fn record(&mut self, data: &[u8], requested: usize) -> CliResult<()> {
        for (i, &byte) in data.iter().enumerate() {
            let offset = self.bytes + i as u64;
            let expected = pattern_byte(offset);
            if byte != expected {
                return Err(mismatch(
                    "pump verification failed",
                    format!("byte {offset} is {byte:#04x}, expected {expected:#04x}"),
                ));
            }
        }
        self.bytes += data.len() as u64;
        self.reads += 1;
        if data.len() < requested {
            self.short_reads += 1;
        }
        Ok(())
    }
}

pub fn run(args: PumpArgs, format: OutputFormat) -> CliResult<i32> {
    let config = PairConfig::default().with_labels("pump-writer", "pump-reader");
    let (writer, reader) = pair_with_config(&config);
    let total = args.bytes;
    let chunk = args.chunk as usize;

    info!(bytes = total, chunk, read_buf = args.read_buf, "starting pump");
    let start = Instant::now();

    let writer_thread = std::thread::Builder::new()
        .name("pump-writer".to_string())
        .spawn(move || write_pattern(&writer, total, chunk))
        .map_err(|err| io_error("failed to spawn writer", err))?;

    let mut buf = vec![0u8; args.read_buf as usize];
    let tally = if args.r#async {
        read_async(&reader, &mut buf)?
    } else {
        read_blocking(&reader, &mut buf)?
    };

    let writes = writer_thread
        .join()
        .map_err(|_| worker_panicked("pump-writer"))?
        .map_err(|err| stream_error("write failed", err))?;
    let elapsed = start.elapsed();

    if tally.bytes != total {
        return Err(mismatch(
            "pump verification failed",
            format!("received {} of {total} bytes", tally.bytes),
        ));
    }

    let report = PumpReport {
        kind: "pump",
        mode: if args.r#async { "async" } else { "blocking" },
        bytes: tally.bytes,
        writes,
        reads: tally.reads,
        short_reads: tally.short_reads,
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        bytes_per_sec: throughput(tally.bytes, elapsed),
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

fn pattern_byte(offset: u64) -> u8 {
    (offset % 251) as u8
}

/// Write `total` pattern bytes in `chunk`-sized writes, then close.
/// Returns the number of write calls.
fn write_pattern(endpoint: &Endpoint, total: u64, chunk: usize) -> Result<u64, StreamError> {
    let mut buf = vec![0u8; chunk];
    let mut sent = 0u64;
    let mut writes = 0u64;

    while sent < total {
        let n = (total - sent).min(chunk as u64) as usize;
        for (i, byte) in buf[..n].iter_mut().enumerate() {
            *byte = pattern_byte(sent + i as u64);
        }
        endpoint.write(&buf[..n])?;
        sent += n as u64;
        writes += 1;
    }

    endpoint.dispose();
    debug!(writes, bytes = sent, "writer finished");
    Ok(writes)
}

fn read_blocking(endpoint: &Endpoint, buf: &mut [u8]) -> CliResult<Tally> {
    let mut tally = Tally::default();
    loop {
        let n = endpoint
            .read(buf)
            .map_err(|err| stream_error("read failed", err))?;
        if n == 0 {
            return Ok(tally);
        }
        tally.record(&buf[..n], buf.len())?;
    }
}

fn read_async(endpoint: &Endpoint, buf: &mut [u8]) -> CliResult<Tally> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    runtime.block_on(async {
        let mut tally = Tally::default();
        loop {
            let n = endpoint
                .read_async(buf, None)
                .await
                .map_err(|err| stream_error("async read failed", err))?;
            if n == 0 {
                return Ok::<_, CliError>(tally);
            }
            tally.record(&buf[..n], buf.len())?;
        }
    })
}
