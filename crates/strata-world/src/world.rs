//! The world context: chunk store, neighbor graph, mesh arena and worker
//! pool, owned together and driven once per frame by [`World::update`].
//!
//! Every chunk carries a data version. Edits and neighbor changes bump it;
//! a mesh result is kept only if it was requested for a newer version than
//! the last kept one, so a late, superseded rebuild never overwrites a
//! fresher mesh.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::{FxHashMap, FxHashSet};
use strata_arena::{ArenaError, ArenaSnapshot, BufferArena, DrawIndirectCommand, VecStore};
use strata_config::Config;
use strata_mesh::{ChunkMeshState, MeshInvalidator, QuadInstance};
use strata_voxel::{BlockId, BlockRegistry, ChunkCoord, MAX_CHUNK_EDGE, VoxelChunk};

use crate::error::WorldError;
use crate::generation::Generator;
use crate::locking::lock_chunk;
use crate::pool::{Job, JobContext, JobResult, WorkerPool};
use crate::store::ChunkStore;

/// The mesh arena, keyed by chunk coordinate.
pub type MeshArena = BufferArena<ChunkCoord, VecStore>;

/// Knobs the world reads from [`Config`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorldSettings {
    /// Voxels along each chunk edge.
    pub chunk_edge: usize,
    /// Worker thread count (already resolved, never 0).
    pub worker_threads: usize,
    /// Bounded job queue length.
    pub job_queue_capacity: usize,
    /// Arena uploads applied per [`World::update`].
    pub uploads_per_frame: usize,
    /// Initial arena capacity in bytes.
    pub arena_capacity: usize,
    /// Hard arena growth limit in bytes.
    pub arena_max_capacity: Option<usize>,
    /// Fragmentation ratio that triggers [`BufferArena::defragment`].
    pub defragment_threshold: f32,
}

impl WorldSettings {
    /// Extracts and validates the world settings of `config`.
    pub fn from_config(config: &Config) -> Result<Self, WorldError> {
        let world = &config.world;
        let arena = &config.arena;

        if !(1..=MAX_CHUNK_EDGE).contains(&world.chunk_edge) {
            return Err(WorldError::InvalidConfig(format!(
                "chunk_edge must be within 1..={MAX_CHUNK_EDGE}, got {}",
                world.chunk_edge
            )));
        }
        if world.job_queue_capacity == 0 {
            return Err(WorldError::InvalidConfig(
                "job_queue_capacity must be at least 1".to_string(),
            ));
        }
        if world.uploads_per_frame == 0 {
            return Err(WorldError::InvalidConfig(
                "uploads_per_frame must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&arena.defragment_threshold) {
            return Err(WorldError::InvalidConfig(format!(
                "defragment_threshold must be within 0..=1, got {}",
                arena.defragment_threshold
            )));
        }

        let worker_threads = match world.worker_threads {
            0 => num_cpus::get().max(1),
            n => n,
        };

        Ok(Self {
            chunk_edge: world.chunk_edge,
            worker_threads,
            job_queue_capacity: world.job_queue_capacity,
            uploads_per_frame: world.uploads_per_frame,
            arena_capacity: arena.initial_capacity_bytes,
            arena_max_capacity: arena.max_capacity_bytes,
            defragment_threshold: arena.defragment_threshold,
        })
    }
}

/// Per-chunk bookkeeping on the owning thread.
#[derive(Clone, Debug)]
struct Tracked {
    data_version: u64,
    mesh: ChunkMeshState,
}

/// What one [`World::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Generated chunks inserted.
    pub chunks_inserted: usize,
    /// Mesh results accepted for upload.
    pub meshes_accepted: usize,
    /// Results thrown away because they were stale or their chunk is gone.
    pub results_discarded: usize,
    /// Arena uploads (including frees for empty meshes) applied.
    pub uploads_applied: usize,
    /// Whether the arena was defragmented.
    pub defragmented: bool,
}

/// Chunks requested and unloaded by [`World::stream_around`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamDelta {
    /// Newly requested coordinates.
    pub requested: usize,
    /// Coordinates unloaded for being out of range.
    pub unloaded: usize,
}

/// A point-in-time summary of the world.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorldStats {
    /// Chunks stored.
    pub loaded_chunks: usize,
    /// Chunks requested but not yet generated.
    pub pending_generation: usize,
    /// Finished meshes waiting for their arena upload.
    pub pending_uploads: usize,
    /// Jobs waiting for queue space.
    pub backlog: usize,
    /// Jobs queued or running on workers.
    pub in_flight_jobs: usize,
    /// Chunks with a payload in the arena.
    pub meshed_chunks: usize,
    /// Arena capacity in bytes.
    pub arena_capacity: usize,
    /// Bytes of live mesh data.
    pub arena_live_bytes: usize,
    /// Arena fragmentation ratio.
    pub arena_fragmentation: f32,
}

/// Explicitly owned voxel world.
pub struct World {
    settings: WorldSettings,
    store: Arc<ChunkStore>,
    arena: Arc<Mutex<MeshArena>>,
    pool: WorkerPool,
    tracked: FxHashMap<ChunkCoord, Tracked>,
    version_clock: u64,
    pending_generation: FxHashSet<ChunkCoord>,
    backlog: VecDeque<Job>,
    upload_order: VecDeque<ChunkCoord>,
    uploads: FxHashMap<ChunkCoord, Vec<u8>>,
}

impl World {
    /// Builds a world with the default block set.
    pub fn new(config: &Config, generator: Arc<dyn Generator>) -> Result<Self, WorldError> {
        Self::with_registry(config, generator, BlockRegistry::with_defaults())
    }

    /// Builds a world meshing with `registry`.
    pub fn with_registry(
        config: &Config,
        generator: Arc<dyn Generator>,
        registry: BlockRegistry,
    ) -> Result<Self, WorldError> {
        let settings = WorldSettings::from_config(config)?;
        let store = Arc::new(ChunkStore::new());

        let context = Arc::new(JobContext {
            store: Arc::clone(&store),
            registry: Arc::new(registry),
            generator,
            edge: settings.chunk_edge,
        });
        let pool = WorkerPool::new(settings.worker_threads, settings.job_queue_capacity, context)?;

        let backing = match settings.arena_max_capacity {
            Some(limit) => VecStore::with_limit(settings.arena_capacity, limit),
            None => VecStore::new(settings.arena_capacity),
        };

        tracing::info!(
            edge = settings.chunk_edge,
            workers = settings.worker_threads,
            arena_bytes = settings.arena_capacity,
            "world created"
        );

        Ok(Self {
            settings,
            store,
            arena: Arc::new(Mutex::new(BufferArena::new(backing))),
            pool,
            tracked: FxHashMap::default(),
            version_clock: 0,
            pending_generation: FxHashSet::default(),
            backlog: VecDeque::new(),
            upload_order: VecDeque::new(),
            uploads: FxHashMap::default(),
        })
    }

    /// The validated settings.
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Voxels along each chunk edge.
    pub fn chunk_edge(&self) -> usize {
        self.settings.chunk_edge
    }

    /// Shared chunk storage.
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Shared handle to the mesh arena, for a renderer on another thread.
    pub fn arena(&self) -> Arc<Mutex<MeshArena>> {
        Arc::clone(&self.arena)
    }

    /// Returns `true` if the chunk at `coord` is stored.
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.store.contains(coord)
    }

    /// Queues generation of the chunk at `coord`.
    ///
    /// Returns `false` if it is already loaded or pending.
    pub fn request_chunk(&mut self, coord: ChunkCoord) -> bool {
        if self.store.contains(coord) || !self.pending_generation.insert(coord) {
            return false;
        }
        self.dispatch(Job::Generate(coord));
        true
    }

    /// Stores a ready-made chunk, links it, and schedules meshes for it and
    /// every neighbor whose boundary it now covers.
    pub fn insert_chunk(&mut self, coord: ChunkCoord, chunk: VoxelChunk) -> Result<(), WorldError> {
        if chunk.edge() != self.settings.chunk_edge {
            return Err(WorldError::EdgeMismatch {
                expected: self.settings.chunk_edge,
                found: chunk.edge(),
            });
        }
        self.pending_generation.remove(&coord);

        let linked = self.store.insert(coord, chunk);
        tracing::trace!(%coord, neighbors = linked.len(), "chunk inserted");

        let floor = self.version_clock;
        self.tracked.entry(coord).or_insert_with(|| Tracked {
            data_version: floor,
            mesh: ChunkMeshState::starting_at(floor),
        });
        self.invalidate(coord);
        for neighbor in linked {
            self.invalidate(neighbor);
        }
        Ok(())
    }

    /// Drops the chunk at `coord`, frees its arena slot and schedules
    /// meshes for its former neighbors.
    ///
    /// Returns `false` if nothing was loaded or pending there.
    pub fn unload_chunk(&mut self, coord: ChunkCoord) -> Result<bool, WorldError> {
        let was_pending = self.pending_generation.remove(&coord);
        self.tracked.remove(&coord);
        if self.uploads.remove(&coord).is_some() {
            self.upload_order.retain(|&c| c != coord);
        }

        let Some((_, former)) = self.store.remove(coord) else {
            return Ok(was_pending);
        };

        {
            let mut arena = self.lock_arena();
            if arena.contains(coord) {
                arena.remove_data(coord)?;
            }
        }

        for neighbor in former {
            self.invalidate(neighbor);
        }
        tracing::trace!(%coord, "chunk unloaded");
        Ok(true)
    }

    /// Requests every chunk within `radius` (per axis) of `center`,
    /// nearest first, and unloads loaded chunks outside it.
    pub fn stream_around(
        &mut self,
        center: ChunkCoord,
        radius: i32,
    ) -> Result<StreamDelta, WorldError> {
        let radius = radius.max(0);
        let in_range = |c: ChunkCoord| {
            (c.x - center.x).abs() <= radius
                && (c.y - center.y).abs() <= radius
                && (c.z - center.z).abs() <= radius
        };

        let mut delta = StreamDelta::default();
        let mut stale: Vec<ChunkCoord> = self
            .store
            .coords()
            .into_iter()
            .chain(self.pending_generation.iter().copied())
            .filter(|&c| !in_range(c))
            .collect();
        stale.sort_unstable();
        stale.dedup();
        for coord in stale {
            if self.unload_chunk(coord)? {
                delta.unloaded += 1;
            }
        }

        let mut wanted = Vec::new();
        for dz in -radius..=radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    wanted.push(center.offset(dx, dy, dz));
                }
            }
        }
        wanted.sort_by_key(|&c| (c.distance_squared(center), c));
        for coord in wanted {
            if self.request_chunk(coord) {
                delta.requested += 1;
            }
        }

        tracing::debug!(
            %center,
            radius,
            requested = delta.requested,
            unloaded = delta.unloaded,
            "streamed"
        );
        Ok(delta)
    }

    /// Block at world voxel `(x, y, z)`.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<BlockId, WorldError> {
        let edge = self.settings.chunk_edge;
        let coord = ChunkCoord::from_world(x, y, z, edge);
        let chunk = self.store.get(coord).ok_or(WorldError::NotLoaded(coord))?;
        let (lx, ly, lz) = ChunkCoord::local_of(x, y, z, edge);
        let block = lock_chunk(&chunk).get_block(lx, ly, lz)?;
        Ok(block)
    }

    /// Writes the block at world voxel `(x, y, z)` and schedules remeshing
    /// of the chunk and of any neighbor sharing the edited boundary.
    pub fn set_block(&mut self, x: i32, y: i32, z: i32, id: BlockId) -> Result<(), WorldError> {
        let edge = self.settings.chunk_edge;
        let coord = ChunkCoord::from_world(x, y, z, edge);
        let chunk = self.store.get(coord).ok_or(WorldError::NotLoaded(coord))?;
        let (lx, ly, lz) = ChunkCoord::local_of(x, y, z, edge);

        {
            let mut guard = lock_chunk(&chunk);
            if guard.get_block(lx, ly, lz)? == id {
                return Ok(());
            }
            guard.set_block(lx, ly, lz, id)?;
        }

        for dirty in MeshInvalidator::invalidate(coord, (lx, ly, lz), edge) {
            if self.store.contains(dirty) {
                self.invalidate(dirty);
            }
        }
        Ok(())
    }

    /// Runs one frame of bookkeeping: resubmits backlogged jobs, applies
    /// finished work, uploads at most `uploads_per_frame` meshes and
    /// defragments the arena when it is too fragmented.
    ///
    /// # Errors
    ///
    /// Arena growth failures are returned as [`WorldError::Arena`].
    pub fn update(&mut self) -> Result<FrameReport, WorldError> {
        let mut report = FrameReport::default();
        self.flush_backlog();

        for result in self.pool.drain_results() {
            match result {
                JobResult::Generated { coord, chunk } => {
                    if !self.pending_generation.contains(&coord) {
                        report.results_discarded += 1;
                        continue;
                    }
                    match chunk {
                        Ok(chunk) => {
                            self.insert_chunk(coord, chunk)?;
                            report.chunks_inserted += 1;
                        }
                        Err(err) => {
                            self.pending_generation.remove(&coord);
                            tracing::warn!(%coord, %err, "chunk generation failed");
                        }
                    }
                }
                JobResult::Meshed {
                    coord,
                    version,
                    mesh,
                } => {
                    if self.accept_mesh(coord, version, mesh.map(|m| m.to_bytes())) {
                        report.meshes_accepted += 1;
                    } else {
                        report.results_discarded += 1;
                    }
                }
            }
        }

        report.uploads_applied = self.apply_uploads()?;
        report.defragmented = self.maybe_defragment();
        Ok(report)
    }

    /// Returns `true` when no job is queued, running, backlogged or
    /// waiting for upload.
    pub fn is_idle(&self) -> bool {
        self.backlog.is_empty() && self.upload_order.is_empty() && self.pool.is_idle()
    }

    /// Offset-ordered placements of every uploaded mesh.
    pub fn arena_snapshot(&self) -> ArenaSnapshot<ChunkCoord> {
        self.lock_arena().snapshot()
    }

    /// One indirect draw per uploaded mesh, in arena order.
    pub fn draw_commands(&self) -> Vec<DrawIndirectCommand> {
        self.arena_snapshot().draw_commands(QuadInstance::STRIDE)
    }

    /// A point-in-time summary.
    pub fn stats(&self) -> WorldStats {
        let arena = self.lock_arena();
        WorldStats {
            loaded_chunks: self.store.len(),
            pending_generation: self.pending_generation.len(),
            pending_uploads: self.upload_order.len(),
            backlog: self.backlog.len(),
            in_flight_jobs: self.pool.in_flight_count(),
            meshed_chunks: arena.len(),
            arena_capacity: arena.capacity(),
            arena_live_bytes: arena.live_bytes(),
            arena_fragmentation: arena.fragmentation(),
        }
    }

    /// Stops the worker pool. In-flight jobs finish; their results are dropped.
    pub fn shutdown(&mut self) {
        self.backlog.clear();
        self.pool.shutdown();
        tracing::info!(chunks = self.store.len(), "world shut down");
    }

    fn lock_arena(&self) -> std::sync::MutexGuard<'_, MeshArena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `coord`'s data as changed and schedules a rebuild if none is
    /// pending.
    ///
    /// Versions come from one world-wide clock so a result from before an
    /// unload and reload can never pass for a current one.
    fn invalidate(&mut self, coord: ChunkCoord) {
        if let Some(tracked) = self.tracked.get_mut(&coord) {
            self.version_clock += 1;
            tracked.data_version = self.version_clock;
        }
        self.schedule_mesh(coord);
    }

    fn schedule_mesh(&mut self, coord: ChunkCoord) {
        let Some(tracked) = self.tracked.get_mut(&coord) else {
            return;
        };
        if !tracked.mesh.begin_remesh(tracked.data_version) {
            return;
        }
        let job = Job::Mesh {
            coord,
            version: tracked.data_version,
        };
        self.dispatch(job);
    }

    /// Records a finished rebuild and queues its payload if it is the newest.
    fn accept_mesh(&mut self, coord: ChunkCoord, version: u64, payload: Option<Vec<u8>>) -> bool {
        let Some(tracked) = self.tracked.get_mut(&coord) else {
            return false;
        };
        let accepted = match payload {
            Some(bytes) => {
                let newer = tracked.mesh.finish_remesh(version);
                if newer && self.uploads.insert(coord, bytes).is_none() {
                    self.upload_order.push_back(coord);
                }
                newer
            }
            None => {
                tracked.mesh.abandon_remesh(version);
                false
            }
        };

        self.schedule_mesh(coord);
        accepted
    }

    fn apply_uploads(&mut self) -> Result<usize, WorldError> {
        let mut applied = 0;
        let mut arena = self.arena.lock().unwrap_or_else(PoisonError::into_inner);
        while applied < self.settings.uploads_per_frame {
            let Some(coord) = self.upload_order.pop_front() else {
                break;
            };
            let Some(bytes) = self.uploads.remove(&coord) else {
                continue;
            };
            upload(&mut arena, coord, &bytes)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn maybe_defragment(&self) -> bool {
        let mut arena = self.lock_arena();
        if arena.fragmentation() <= self.settings.defragment_threshold {
            return false;
        }
        arena.defragment();
        true
    }

    fn dispatch(&mut self, job: Job) {
        if !self.backlog.is_empty() {
            self.backlog.push_back(job);
            return;
        }
        if let Err(job) = self.pool.submit(job) {
            self.backlog.push_back(job);
        }
    }

    fn flush_backlog(&mut self) {
        while let Some(job) = self.backlog.pop_front() {
            if let Err(job) = self.pool.submit(job) {
                self.backlog.push_front(job);
                break;
            }
        }
    }
}

/// Places `bytes` as `coord`'s payload, reusing its slot when it fits.
/// An empty payload frees the slot.
fn upload(arena: &mut MeshArena, coord: ChunkCoord, bytes: &[u8]) -> Result<(), ArenaError> {
    if bytes.is_empty() {
        if arena.contains(coord) {
            arena.remove_data(coord)?;
        }
        return Ok(());
    }
    if arena.contains(coord) {
        match arena.update_data(coord, bytes) {
            Ok(()) => return Ok(()),
            Err(ArenaError::AllocationTooSmall { .. }) => {
                arena.remove_data(coord)?;
            }
            Err(err) => return Err(err),
        }
    }
    arena.add_data(coord, bytes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
