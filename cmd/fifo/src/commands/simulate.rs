//! Bursty producer / steady consumer simulation.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use giztoy_fifo::{BackingStore, Fifo, FifoConfig, FifoStats, FileStore};

use super::{StoreArgs, TuningArgs, pattern_byte};
use crate::Cli;

/// Stream a byte pattern through the FIFO.
#[derive(Args)]
pub struct SimulateCommand {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    tuning: TuningArgs,

    /// Total bytes to stream
    #[arg(long, default_value_t = 4 * 1024 * 1024)]
    total: usize,

    /// Bytes the producer writes per burst
    #[arg(long, default_value_t = 16 * 1024)]
    burst: usize,

    /// Pause between producer bursts in milliseconds
    #[arg(long, default_value_t = 20)]
    producer_interval_ms: u64,

    /// Bytes the consumer reads per frame
    #[arg(long, default_value_t = 1152)]
    frame: usize,

    /// Pause between consumer frames in milliseconds
    #[arg(long, default_value_t = 1)]
    consumer_interval_ms: u64,
}

/// Final simulation report.
#[derive(Debug, Serialize)]
struct Report {
    store: String,
    bytes: usize,
    elapsed_ms: u128,
    mismatches: usize,
    stats: FifoStats,
}

impl SimulateCommand {
    pub(crate) fn config(&self) -> FifoConfig {
        self.tuning.config(self.store.capacity)
    }

    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        if self.burst == 0 || self.frame == 0 {
            anyhow::bail!("burst and frame sizes must be greater than 0");
        }

        let config = self.config();
        let report = match &self.store.file {
            Some(path) => {
                let store = FileStore::new(path, config.capacity);
                let fifo = Fifo::with_store(store, config)
                    .with_context(|| format!("failed to open fifo at {}", path.display()))?;
                self.simulate(fifo)?
            }
            None => self.simulate(Fifo::new(config).context("failed to create fifo")?)?,
        };

        if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if report.mismatches > 0 {
            anyhow::bail!("{} bytes arrived out of order", report.mismatches);
        }
        Ok(())
    }

    fn simulate<S: BackingStore + 'static>(&self, fifo: Fifo<S>) -> anyhow::Result<Report> {
        let total = self.total;
        let started = Instant::now();

        let producer = fifo.clone();
        let burst = self.burst;
        let interval = Duration::from_millis(self.producer_interval_ms);
        let handle = thread::spawn(move || -> giztoy_fifo::Result<()> {
            let mut sent = 0;
            let mut chunk = Vec::with_capacity(burst);
            while sent < total {
                let n = burst.min(total - sent);
                chunk.clear();
                chunk.extend((sent..sent + n).map(pattern_byte));
                if let Err(e) = producer.write(&chunk) {
                    producer.close();
                    return Err(e);
                }
                sent += n;
                if !interval.is_zero() {
                    thread::sleep(interval);
                }
            }
            debug!("producer finished after {} bytes", sent);
            Ok(())
        });

        let consumed = self.consume(&fifo);
        if consumed.is_err() {
            fifo.close();
        }

        handle
            .join()
            .map_err(|_| anyhow!("producer thread panicked"))?
            .context("producer failed")?;
        let mismatches = consumed.context("consumer failed")?;

        Ok(Report {
            store: self.store.describe(),
            bytes: total,
            elapsed_ms: started.elapsed().as_millis(),
            mismatches,
            stats: fifo.stats(),
        })
    }

    /// Reads frames at a steady pace and counts bytes that break the pattern.
    fn consume<S: BackingStore>(&self, fifo: &Fifo<S>) -> giztoy_fifo::Result<usize> {
        let interval = Duration::from_millis(self.consumer_interval_ms);
        let progress_step = (self.total / 10).max(1);
        let mut frame = vec![0u8; self.frame];
        let mut received = 0;
        let mut next_progress = progress_step;
        let mut mismatches = 0;

        while received < self.total {
            let n = frame.len().min(self.total - received);
            fifo.read(&mut frame[..n])?;
            mismatches += frame[..n]
                .iter()
                .enumerate()
                .filter(|&(i, &b)| b != pattern_byte(received + i))
                .count();
            received += n;

            if received >= next_progress {
                let stats = fifo.stats();
                info!(
                    "{}% streamed: fill={} overruns={} underruns={} read_waits={}",
                    received * 100 / self.total,
                    stats.fill,
                    stats.overruns,
                    stats.underruns,
                    stats.read_waits
                );
                next_progress += progress_step;
            }

            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }

        Ok(mismatches)
    }
}

fn print_report(report: &Report) {
    let stats = &report.stats;
    println!("store:          {}", report.store);
    println!("bytes:          {}", report.bytes);
    println!("elapsed:        {} ms", report.elapsed_ms);
    println!("mismatches:     {}", report.mismatches);
    println!("capacity:       {}", stats.capacity);
    println!("low watermark:  {}", stats.low_watermark);
    println!("chunk size:     {}", stats.chunk_size);
    println!("overruns:       {} ({} writer waits)", stats.overruns, stats.write_waits);
    println!("underruns:      {} ({} reader waits)", stats.underruns, stats.read_waits);
}
