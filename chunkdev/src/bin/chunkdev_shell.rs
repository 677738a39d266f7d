//! Chunk device shell
//!
//! Drives one in-process device from stdin, one command per line:
//!
//! ```text
//! open <index> <pid>      open an access point, prints the handle id
//! write <handle> <text>   write one chunk
//! read <handle> <max>     read up to <max> bytes
//! close <handle>          release a handle
//! flush <pid>             drop a caller's queued chunks
//! sessions                list callers with a session
//! ```
//!
//! Run with `--help` for the device options.
//! Set `RUST_LOG=debug` to see device events.

use chunkdev::{
    CallerId, ChunkDevice, DeviceConfig, DeviceError, MemRegistrar, OverflowPolicy,
    RemainderPolicy, SessionHandle, Variant,
};
use clap::Parser;
use std::collections::HashMap;
use std::io::{self, BufRead};
use tracing_subscriber::EnvFilter;

/// Drive an in-process chunk device from stdin
#[derive(Parser, Debug)]
#[command(name = "chunkdev_shell", version, about)]
struct Args {
    /// One shared read-write access point instead of three per-caller ones
    #[arg(long)]
    single: bool,

    /// Keep the unread tail of a short read instead of dropping it
    #[arg(long)]
    requeue: bool,

    /// Largest chunk a single write may produce
    #[arg(long, value_name = "BYTES", default_value_t = chunkdev::DEFAULT_MAX_CHUNK_SIZE)]
    chunk_size: usize,

    /// Maximum queued chunks per queue; writes beyond it are rejected
    #[arg(long, value_name = "CHUNKS")]
    capacity: Option<usize>,
}

impl Args {
    fn device_config(&self) -> DeviceConfig {
        let mut config = DeviceConfig::default().with_max_chunk_size(self.chunk_size);
        if self.single {
            config = config.with_variant(Variant::Single);
        }
        if self.requeue {
            config = config.with_remainder(RemainderPolicy::Requeue);
        }
        if let Some(capacity) = self.capacity {
            config = config.with_capacity(capacity, OverflowPolicy::Reject);
        }
        config
    }
}

fn report(err: &DeviceError) {
    println!("error: {err} (errno {})", err.errno());
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Args::parse().device_config();
    let mut registrar = MemRegistrar::new();
    let device = ChunkDevice::register(config, &mut registrar)?;
    let mut handles: HashMap<u64, SessionHandle> = HashMap::new();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.splitn(3, ' ');
        let command = words.next().unwrap_or_default();
        let arg1 = words.next().unwrap_or_default();
        let arg2 = words.next().unwrap_or_default();

        match command {
            "" => continue,
            "quit" => break,
            "open" => {
                let (Ok(index), Ok(pid)) = (arg1.parse::<u32>(), arg2.parse::<u32>()) else {
                    println!("usage: open <index> <pid>");
                    continue;
                };
                match device.open(index, CallerId::new(pid)) {
                    Ok(handle) => {
                        println!("h{} {} {}", handle.id(), handle.mode(), handle.caller());
                        handles.insert(handle.id().id(), handle);
                    }
                    Err(e) => report(&e),
                }
            }
            "write" | "read" | "close" => {
                let Some(id) = arg1.trim_start_matches('h').parse::<u64>().ok() else {
                    println!("usage: {command} <handle> ...");
                    continue;
                };
                if command == "close" {
                    match handles.remove(&id) {
                        Some(handle) => device.release(handle),
                        None => println!("no handle h{id}"),
                    }
                    continue;
                }
                let Some(handle) = handles.get(&id) else {
                    println!("no handle h{id}");
                    continue;
                };
                if command == "write" {
                    match device.write(handle, arg2.as_bytes(), arg2.len()) {
                        Ok(n) => println!("{n}"),
                        Err(e) => report(&e),
                    }
                } else {
                    let max_len = arg2.parse().unwrap_or(device.config().max_chunk_size);
                    match device.read_vec(handle, max_len) {
                        Ok(data) => println!("{} {:?}", data.len(), String::from_utf8_lossy(&data)),
                        Err(e) => report(&e),
                    }
                }
            }
            "flush" => match arg1.parse::<u32>() {
                Ok(pid) => println!("{}", device.flush(CallerId::new(pid))),
                Err(_) => println!("usage: flush <pid>"),
            },
            "sessions" => {
                for caller in device.callers() {
                    println!("{caller}");
                }
            }
            other => println!("unknown command: {other}"),
        }
    }

    drop(handles);
    device.unregister(&mut registrar);
    Ok(())
}
