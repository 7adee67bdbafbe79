//! Graph instance sampling.
//!
//! Each edge block is a `len_x * len_y` grid of independent Bernoulli(p)
//! trials. Instead of rolling a coin per cell, the gaps between successive
//! successes are drawn from a geometric distribution (L. Devroye,
//! "Non-Uniform Random Variate Generation", Springer 1986, p. 498ff), so
//! sampling cost is proportional to the number of emitted edges rather than
//! to the grid area.
//!
//! Edge types are processed one after another; the blocks of a type are
//! split into contiguous ranges across worker threads that append to the
//! shared edge file through a mutex-guarded writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::model::{EdgeTypeRecord, Model};

/// Per-worker output buffer size in bytes.
const MAX_BUFFER_SIZE: usize = 100_000;
/// The buffer is flushed once it grows to within this margin of its limit.
const BUFFER_SAFETY_MARGIN: usize = 500;
/// Below this many blocks the threading overhead is not worth paying.
const MIN_BLOCKS_FOR_THREADING: usize = 100;

/// An edge block with its discrete id bounds recovered and its probability
/// forced into `[0, 1]`.
struct GridBlock {
    x_start: u64,
    x_end: u64,
    y_start: u64,
    y_end: u64,
    p: f64,
}

/// Recover the discrete grids of one edge type record.
///
/// Blocks whose id range rounds to nothing (possible after downscaling) and
/// blocks with `p <= 0` are dropped; `p > 1` is clamped here, at the last
/// consumer, so stored models keep their raw computed probabilities.
fn discretize(record: &EdgeTypeRecord) -> Vec<GridBlock> {
    let mut grids = Vec::with_capacity(record.blocks.len());
    for block in &record.blocks {
        let x_start = block.x_start as u64 + 1;
        let x_end = block.x_end as u64;
        let y_start = block.y_start as u64 + 1;
        let y_end = block.y_end as u64;
        if x_end < x_start || y_end < y_start {
            continue;
        }
        if !(block.p > 0.0) {
            continue;
        }
        grids.push(GridBlock {
            x_start,
            x_end,
            y_start,
            y_end,
            p: block.p.min(1.0),
        });
    }
    grids
}

/// Sample every block in `blocks` with one PRNG stream, appending edge lines
/// to the shared sink whenever the local buffer runs close to full.
fn sample_block_range<W: Write>(
    blocks: &[GridBlock],
    seed: u64,
    edge_type: &str,
    sink: &Mutex<W>,
    bytes_written: &AtomicU64,
) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buffer: Vec<u8> = Vec::with_capacity(MAX_BUFFER_SIZE);
    // Two 20-digit ids, two tabs, a newline, and the type must always fit
    // behind the flush threshold.
    let margin = BUFFER_SAFETY_MARGIN.max(edge_type.len() + 2 * 20 + 3);
    let flush_at = MAX_BUFFER_SIZE.saturating_sub(margin);

    for block in blocks {
        // ln(1 - p) is constant per block; hoist its reciprocal. For p = 1
        // this is -0.0 and every gap below computes to 1.
        let inv_ln_q = 1.0 / (1.0 - block.p).ln();
        let len_x = block.x_end - block.x_start + 1;

        // Walk the grid in row-major order, starting one cell before
        // (x_start, y_start) so the first unit gap lands on the first cell.
        let mut offset_x = len_x - 1;
        let mut row = block.y_start - 1;
        loop {
            let u: f64 = 1.0 - rng.random::<f64>();
            let gap = ((u.ln() * inv_ln_q).ceil() as u64).max(1);
            let step = offset_x.saturating_add(gap);
            offset_x = step % len_x;
            row = row.saturating_add(step / len_x);
            if row > block.y_end {
                break;
            }
            writeln!(buffer, "{}\t{}\t{}", block.x_start + offset_x, row, edge_type)?;
            if buffer.len() >= flush_at {
                let mut out = sink.lock().expect("failed to lock the edge file");
                out.write_all(&buffer)?;
                drop(out);
                bytes_written.fetch_add(buffer.len() as u64, Ordering::Relaxed);
                buffer.clear();
            }
        }
    }

    if !buffer.is_empty() {
        let mut out = sink.lock().expect("failed to lock the edge file");
        out.write_all(&buffer)?;
        drop(out);
        bytes_written.fetch_add(buffer.len() as u64, Ordering::Relaxed);
    }
    Ok(())
}

/// Split `0..len` into at most `parts` contiguous, near-even ranges.
fn partition_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, len.max(1));
    let base = len / parts;
    let extra = len % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for index in 0..parts {
        let size = base + usize::from(index < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Write one node line per discrete id, block by block in model order, so
/// ids come out in ascending order.
fn write_node_file(model: &Model, node_path: &str) -> anyhow::Result<()> {
    let file = File::create(node_path)
        .with_context(|| format!("could not open output file: {node_path}"))?;
    let mut out = BufWriter::new(file);
    let mut bytes: u64 = 0;
    for block in &model.nodes {
        for id in block.first_id()..=block.last_id() {
            let line = format!("{}\t{}\n", id, block.node_type);
            out.write_all(line.as_bytes())?;
            bytes += line.len() as u64;
        }
    }
    out.flush()?;
    info!("wrote {} bytes into the node file '{}'", bytes, node_path);
    Ok(())
}

/// Sample one graph instance from `model` into a node file and an edge file.
///
/// The node file is deterministic given the model. The edge file is
/// reproducible for a fixed seed *and* a fixed worker count: every worker
/// owns a PRNG stream seeded from a parent PRNG, so changing the number of
/// workers changes which bits are drawn where (the sampled distribution is
/// unaffected). Workers serialize only on buffer flushes to the shared
/// edge file; line order across workers is unspecified, but all edges of
/// one type precede all edges of the next.
pub fn generate(model: &Model, node_path: &str, edge_path: &str, seed: u64) -> anyhow::Result<()> {
    write_node_file(model, node_path)?;

    let file = File::create(edge_path)
        .with_context(|| format!("could not open output file: {edge_path}"))?;
    let sink = Mutex::new(BufWriter::new(file));
    let bytes_written = AtomicU64::new(0);
    let mut seeds = StdRng::seed_from_u64(seed);
    let workers = num_cpus::get().saturating_sub(1).max(1);
    let started = Instant::now();

    for record in &model.edges {
        let grids = discretize(record);
        if grids.is_empty() {
            debug!("no sampleable blocks for edge type '{}'", record.edge_type);
            continue;
        }

        if grids.len() < MIN_BLOCKS_FOR_THREADING {
            sample_block_range(
                &grids,
                seeds.random(),
                &record.edge_type,
                &sink,
                &bytes_written,
            )?;
            continue;
        }

        // Seeds are drawn in range order from the parent PRNG before any
        // worker runs, so scheduling cannot perturb the streams.
        let jobs: Vec<(Range<usize>, u64)> = partition_ranges(grids.len(), workers)
            .into_iter()
            .map(|range| (range, seeds.random()))
            .collect();
        jobs.into_par_iter().try_for_each(|(range, worker_seed)| {
            sample_block_range(
                &grids[range],
                worker_seed,
                &record.edge_type,
                &sink,
                &bytes_written,
            )
        })?;
    }

    sink.lock()
        .expect("failed to lock the edge file")
        .flush()?;

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        "wrote {} bytes into the edge file '{}' in {:.3} s",
        bytes_written.load(Ordering::Relaxed),
        edge_path,
        elapsed
    );
    Ok(())
}
