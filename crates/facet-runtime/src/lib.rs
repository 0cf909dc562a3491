//! Mesh worker pool. Each worker owns one scratch arena for its whole life.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use facet_geom::SectionCoord;
use facet_mesh::{ChunkMesh, MeshBuilder, MeshContext, ScratchArena, TessellationBatch};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Shared flag a submitter flips to abandon a queued or running job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug)]
pub struct BuildJob {
    pub coord: SectionCoord,
    pub pass: u32,
    pub dimension: Option<i32>,
    pub job_id: u64,
    pub batches: Vec<TessellationBatch>,
    pub cancel: CancelToken,
}

impl BuildJob {
    pub fn new(coord: SectionCoord, pass: u32, batches: Vec<TessellationBatch>) -> Self {
        Self {
            coord,
            pass,
            dimension: None,
            job_id: 0,
            batches,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_dimension(mut self, dimension: i32) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

/// Returned by `submit`; lets the caller abandon the job.
#[derive(Clone, Debug)]
pub struct JobHandle {
    job_id: u64,
    token: CancelToken,
}

impl JobHandle {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: SectionCoord,
    pub pass: u32,
    pub job_id: u64,
    pub mesh: Option<ChunkMesh>,
    pub cancelled: bool,
    pub t_mesh_ms: u32,
}

fn process_build_job(
    job: BuildJob,
    arena: &mut ScratchArena,
    ctx: &MeshContext,
    tx: &Sender<JobOut>,
) {
    let BuildJob {
        coord,
        pass,
        dimension,
        job_id,
        batches,
        cancel,
    } = job;

    let t0 = Instant::now();
    let mesh = if cancel.is_cancelled() {
        None
    } else {
        let mut builder = MeshBuilder::begin(coord, pass, arena, ctx);
        if let Some(dimension) = dimension {
            builder = builder.with_dimension(dimension);
        }
        for batch in &batches {
            if cancel.is_cancelled() {
                break;
            }
            builder.ingest(batch);
        }
        if cancel.is_cancelled() {
            builder.cancel();
            None
        } else {
            Some(builder.finish())
        }
    };
    let t_mesh_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

    let cancelled = mesh.is_none();
    if cancelled {
        log::debug!(
            target: "runtime",
            "job {job_id} for ({}, {}, {}) pass {pass} cancelled",
            coord.x,
            coord.y,
            coord.z
        );
    }
    let _ = tx.send(JobOut {
        coord,
        pass,
        job_id,
        mesh,
        cancelled,
        t_mesh_ms,
    });
}

pub struct Runtime {
    job_tx: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    ctx: Arc<MeshContext>,
    next_job_id: AtomicU64,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    pub workers: usize,
}

impl Runtime {
    /// Starts `workers` mesh workers; `None` uses the available parallelism.
    pub fn new(
        ctx: Arc<MeshContext>,
        workers: Option<usize>,
    ) -> Result<Self, ThreadPoolBuildError> {
        let (job_tx, job_rx) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();

        let workers = workers
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
            .max(1);
        let queued_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_ctr = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("facet-mesh-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let ctx = Arc::clone(&ctx);
            let queued = Arc::clone(&queued_ctr);
            let inflight = Arc::clone(&inflight_ctr);
            pool.spawn(move || {
                let mut arena = ScratchArena::new();
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_build_job(job, &mut arena, ctx.as_ref(), &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
                if arena.stale_resets() > 0 {
                    log::warn!(
                        target: "runtime",
                        "worker exiting after {} stale scratch resets",
                        arena.stale_resets()
                    );
                }
            });
        }
        log::info!(target: "runtime", "started {workers} mesh workers");

        Ok(Self {
            job_tx,
            res_rx,
            _pool: pool,
            ctx,
            next_job_id: AtomicU64::new(1),
            queued: queued_ctr,
            inflight: inflight_ctr,
            workers,
        })
    }

    pub fn context(&self) -> &Arc<MeshContext> {
        &self.ctx
    }

    /// Queues a mesh build for `coord` at `pass`.
    pub fn submit(
        &self,
        coord: SectionCoord,
        pass: u32,
        batches: Vec<TessellationBatch>,
    ) -> JobHandle {
        self.submit_job(BuildJob::new(coord, pass, batches))
    }

    /// Queues a prepared job, assigning its id. The job's own cancel token is kept.
    pub fn submit_job(&self, mut job: BuildJob) -> JobHandle {
        job.job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let handle = JobHandle {
            job_id: job.job_id,
            token: job.cancel.clone(),
        };
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
        handle
    }

    pub fn try_recv(&self) -> Option<JobOut> {
        self.res_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobOut> {
        match self.res_rx.recv_timeout(timeout) {
            Ok(out) => Some(out),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// (queued, in flight)
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}
