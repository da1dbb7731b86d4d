#![cfg(feature = "metrics")]

use once_cell::sync::Lazy;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

/* ───────────── raw latencies ────────────────────────── */

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Call at the end of a wrapped operation: `record("parse", Instant::now())`.
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    TIMES.lock().unwrap().push((name, dur));
}

/* ───────────── parser counters ──────────────────────── */

pub static CONTAINERS_PARSED: AtomicUsize = AtomicUsize::new(0);
pub static KERNELS_SEEN: AtomicUsize = AtomicUsize::new(0);
pub static BYTES_SCANNED: AtomicUsize = AtomicUsize::new(0);

/* ───────────── summary printout ─────────────────────── */

/// Call once at the end of the program, e.g. in `main()`.
pub fn summary() {
    let mut map: HashMap<&str, Vec<u128>> = HashMap::new();
    {
        let mut times = TIMES.lock().unwrap();
        for (name, us) in times.drain(..) {
            map.entry(name).or_default().push(us);
        }
    }

    println!("── metrics summary ──");
    for (name, mut v) in map {
        v.sort_unstable();
        let mean = v.iter().sum::<u128>() / v.len() as u128;
        let p95 = v[((v.len() * 95) / 100).saturating_sub(1)];
        println!("{:<18} mean={:>5} µs   p95={:>5} µs", name, mean, p95);
    }

    println!(
        "containers parsed: {}   kernels seen: {}   bytes scanned: {}",
        CONTAINERS_PARSED.load(Ordering::Relaxed),
        KERNELS_SEEN.load(Ordering::Relaxed),
        BYTES_SCANNED.load(Ordering::Relaxed),
    );
}
