// ============================================================
// Layer 4 — Batch Prefetcher
// ============================================================
// Loads batches of samples on a pool of worker threads while the
// primary thread trains on the previous batch.
//
//   job queue (unbounded, filled up front)
//       │   one job = the dataset indices of one batch
//       ▼
//   worker threads  ── dataset.get(i) for each index
//       │
//       ▼
//   result queue (bounded)  → primary thread
//
// Workers block on a full result queue, so at most
// `capacity + num_workers` batches are ever held in memory.
// Dropping the Prefetcher disconnects the queue and the workers
// exit on their next send. Batches arrive in completion order;
// with one worker that is the order of `order`.

use std::sync::Arc;
use std::thread;

use burn::data::dataset::Dataset;
use crossbeam_channel::{bounded, unbounded, Receiver};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::batcher::{check_stackable, IndexedSample};
use crate::data::dataset::FloorplanSample;
use crate::domain::error::{OrchestratorError, OrchestratorResult};

pub type SampleBatch = Vec<IndexedSample>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchConfig {
    pub batch_size:  usize,
    pub num_workers: usize,
    pub capacity:    usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { batch_size: 1, num_workers: 1, capacity: 2 }
    }
}

/// Dataset indices for one pass. Shuffled with a seed derived
/// from `seed` and `epoch` so each epoch differs but runs repeat.
pub fn epoch_order(len: usize, shuffle: Option<u64>, epoch: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    if let Some(seed) = shuffle {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
        order.shuffle(&mut rng);
    }
    order
}

pub struct Prefetcher {
    rx:        Receiver<OrchestratorResult<SampleBatch>>,
    remaining: usize,
}

impl Prefetcher {
    pub fn spawn(
        dataset: Arc<dyn Dataset<FloorplanSample>>,
        order:   Vec<usize>,
        config:  PrefetchConfig,
    ) -> Self {
        let batch_size = config.batch_size.max(1);

        let (job_tx, job_rx) = unbounded::<Vec<usize>>();
        let mut remaining = 0;
        for job in order.chunks(batch_size) {
            // receiver is alive, send cannot fail
            let _ = job_tx.send(job.to_vec());
            remaining += 1;
        }
        drop(job_tx);

        let (tx, rx) = bounded(config.capacity.max(1));
        for _ in 0..config.num_workers.max(1) {
            let job_rx  = job_rx.clone();
            let tx      = tx.clone();
            let dataset = Arc::clone(&dataset);
            thread::spawn(move || {
                for job in job_rx.iter() {
                    let batch  = load_batch(dataset.as_ref(), &job);
                    let failed = batch.is_err();
                    if tx.send(batch).is_err() || failed {
                        break;
                    }
                }
            });
        }

        Self { rx, remaining }
    }

    /// Batches not yet handed out.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

fn load_batch(dataset: &dyn Dataset<FloorplanSample>, indices: &[usize]) -> OrchestratorResult<SampleBatch> {
    let batch = indices
        .iter()
        .map(|&index| {
            dataset
                .get(index)
                .map(|sample| IndexedSample { index, sample })
                .ok_or_else(|| OrchestratorError::DataLoad {
                    index,
                    reason: "dataset returned no sample".to_string(),
                })
        })
        .collect::<OrchestratorResult<SampleBatch>>()?;
    check_stackable(&batch)?;
    Ok(batch)
}

impl Iterator for Prefetcher {
    type Item = OrchestratorResult<SampleBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.rx.recv() {
            Ok(batch) => {
                self.remaining -= 1;
                Some(batch)
            }
            Err(_) => {
                let missing = self.remaining;
                self.remaining = 0;
                Some(Err(OrchestratorError::DataLoad {
                    index: usize::MAX,
                    reason: format!("loader workers exited with {missing} batches outstanding"),
                }))
            }
        }
    }
}
