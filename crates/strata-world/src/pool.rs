//! Fixed-size worker pool running chunk generation and mesh rebuilds.
//!
//! Jobs go in through a bounded channel and finished work comes back on an
//! unbounded one, drained once per frame by the owner. Jobs are never
//! cancelled; the owner discards results it no longer wants.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use strata_mesh::ChunkMesh;
use strata_voxel::{BlockRegistry, ChunkCoord, ChunkError, VoxelChunk};

use crate::error::WorldError;
use crate::generation::{Generator, generate_chunk};
use crate::locking::mesh_with_neighbors;
use crate::store::ChunkStore;

/// Work a pool thread can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    /// Build the chunk at a coordinate from the generator.
    Generate(ChunkCoord),
    /// Rebuild the mesh of a stored chunk.
    Mesh {
        /// Chunk to mesh.
        coord: ChunkCoord,
        /// Data version the rebuild was requested for.
        version: u64,
    },
}

/// A finished job.
#[derive(Debug)]
pub enum JobResult {
    /// Output of [`Job::Generate`].
    Generated {
        /// Generated coordinate.
        coord: ChunkCoord,
        /// The new chunk.
        chunk: Result<VoxelChunk, ChunkError>,
    },
    /// Output of [`Job::Mesh`].
    Meshed {
        /// Meshed coordinate.
        coord: ChunkCoord,
        /// Version from the job.
        version: u64,
        /// The mesh, or `None` if the chunk was gone by the time the job ran.
        mesh: Option<ChunkMesh>,
    },
}

/// Everything a worker needs, shared by all of them.
pub struct JobContext {
    /// Live chunks.
    pub store: Arc<ChunkStore>,
    /// Block textures used while meshing.
    pub registry: Arc<BlockRegistry>,
    /// Terrain source for new chunks.
    pub generator: Arc<dyn Generator>,
    /// Voxels along each chunk edge.
    pub edge: usize,
}

impl JobContext {
    /// Runs one job to completion on the calling thread.
    pub fn run(&self, job: Job) -> JobResult {
        match job {
            Job::Generate(coord) => JobResult::Generated {
                coord,
                chunk: generate_chunk(self.generator.as_ref(), coord, self.edge),
            },
            Job::Mesh { coord, version } => JobResult::Meshed {
                coord,
                version,
                mesh: mesh_with_neighbors(&self.store, coord, &self.registry),
            },
        }
    }
}

/// Worker threads plus their job and result channels.
pub struct WorkerPool {
    job_sender: Option<Sender<Job>>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawns `threads` workers sharing `context`, with room for
    /// `queue_capacity` waiting jobs.
    pub fn new(
        threads: usize,
        queue_capacity: usize,
        context: Arc<JobContext>,
    ) -> Result<Self, WorldError> {
        let (job_sender, job_receiver) = bounded::<Job>(queue_capacity);
        let (result_sender, result_receiver) = unbounded::<JobResult>();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let jobs = job_receiver.clone();
            let results = result_sender.clone();
            let context = Arc::clone(&context);
            let in_flight = Arc::clone(&in_flight);

            let handle = std::thread::Builder::new()
                .name(format!("strata-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = jobs.recv() {
                        let result = context.run(job);
                        let _ = results.send(result);
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                })
                .map_err(WorldError::Spawn)?;
            workers.push(handle);
        }
        tracing::debug!(threads, queue_capacity, "worker pool started");

        Ok(Self {
            job_sender: Some(job_sender),
            result_receiver,
            workers,
            in_flight,
        })
    }

    /// Queues a job.
    ///
    /// Returns `Err(job)` if the queue is full or the pool is shut down.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        let Some(sender) = &self.job_sender else {
            return Err(job);
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        sender.try_send(job).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            match e {
                TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
            }
        })
    }

    /// Drain all finished results. Call once per frame.
    pub fn drain_results(&self) -> Vec<JobResult> {
        self.result_receiver.try_iter().collect()
    }

    /// Jobs queued or running.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns `true` if no job is queued or running and every result has
    /// been drained.
    pub fn is_idle(&self) -> bool {
        self.in_flight_count() == 0 && self.result_receiver.is_empty()
    }

    /// Number of worker threads still attached.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the job queue and joins every worker. Running jobs finish first.
    pub fn shutdown(&mut self) {
        self.job_sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
