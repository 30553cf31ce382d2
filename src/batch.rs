//! Directory tree processing.
//!
//! Every supported document under the source root is an independent task on
//! a bounded worker pool. Outcomes come back over a channel; a failing or
//! panicking document is recorded and the rest of the batch carries on.

use std::collections::HashSet;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BatchReport, DocumentFailure, DocumentOutcome, FailureKind};
use crate::pipeline::Pipeline;

/// Options for processing a directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Number of documents processed concurrently
    pub jobs: usize,

    /// Copy files without a supported extension into the destination
    pub copy_unsupported: bool,

    /// Analyze only; write nothing
    pub dry_run: bool,
}

impl BatchOptions {
    /// Create new batch options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent documents (0 = available parallelism).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = if jobs == 0 { default_jobs() } else { jobs };
        self
    }

    /// Enable or disable copying of unsupported files.
    pub fn with_copy_unsupported(mut self, copy: bool) -> Self {
        self.copy_unsupported = copy;
        self
    }

    /// Analyze without writing.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Check option values.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(Error::InvalidOption("jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            copy_unsupported: true,
            dry_run: false,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Files found under a source root, relative to it, in sorted order.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    /// Source root
    pub root: PathBuf,
    /// Documents to collapse
    pub documents: Vec<PathBuf>,
    /// Other files
    pub others: Vec<PathBuf>,
}

impl BatchPlan {
    /// Walk `root` and classify every regular file.
    ///
    /// `exclude` (typically a destination nested in the source) is skipped.
    pub fn scan(root: &Path, pipeline: &Pipeline, exclude: Option<&Path>) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::SourceNotFound(root.to_path_buf()));
        }
        let exclude = exclude.and_then(|p| p.canonicalize().ok());

        let mut plan = BatchPlan {
            root: root.to_path_buf(),
            ..Default::default()
        };
        let mut visited = HashSet::new();
        visited.insert(root.canonicalize()?);
        let mut walker = Walker {
            root,
            pipeline,
            exclude: exclude.as_deref(),
            visited,
        };
        walker.walk(root, &mut plan)?;
        Ok(plan)
    }

    /// Total number of files found.
    pub fn len(&self) -> usize {
        self.documents.len() + self.others.len()
    }

    /// Check if the tree holds no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recursive directory walk.
///
/// Directories are entered at most once by canonical path, so symlink
/// cycles end instead of recursing forever.
struct Walker<'a> {
    root: &'a Path,
    pipeline: &'a Pipeline,
    exclude: Option<&'a Path>,
    visited: HashSet<PathBuf>,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, plan: &mut BatchPlan) -> Result<()> {
        let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
                let Ok(canonical) = path.canonicalize() else {
                    log::warn!("Skipping unresolvable directory {}", path.display());
                    continue;
                };
                if self.exclude == Some(canonical.as_path()) {
                    log::debug!("Skipping destination directory {}", path.display());
                    continue;
                }
                if !self.visited.insert(canonical) {
                    log::warn!("Skipping already visited directory {}", path.display());
                    continue;
                }
                self.walk(&path, plan)?;
                continue;
            }
            if !path.is_file() {
                continue;
            }

            let Ok(relative) = path.strip_prefix(self.root) else {
                continue;
            };
            if self.pipeline.supports(&path) {
                plan.documents.push(relative.to_path_buf());
            } else {
                plan.others.push(relative.to_path_buf());
            }
        }
        Ok(())
    }
}

/// Processes a directory tree with a shared [`Pipeline`].
pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    options: BatchOptions,
}

impl BatchRunner {
    /// Create a runner.
    pub fn new(pipeline: Arc<Pipeline>, options: BatchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { pipeline, options })
    }

    /// Pipeline used for each document.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Find the work under `src`, excluding `dst` when nested inside it.
    ///
    /// Fails when `dst` is `src` itself, since every output would overwrite
    /// its own source.
    pub fn plan(&self, src: &Path, dst: &Path) -> Result<BatchPlan> {
        check_distinct(src, dst)?;
        BatchPlan::scan(src, &self.pipeline, Some(dst))
    }

    /// Process every document under `src` into the mirrored path under `dst`.
    pub fn run(&self, src: &Path, dst: &Path) -> Result<BatchReport> {
        let plan = self.plan(src, dst)?;
        self.run_plan(&plan, dst, |_| {})
    }

    /// Process a scanned plan, calling `on_outcome` as each document finishes.
    pub fn run_plan<F>(&self, plan: &BatchPlan, dst: &Path, mut on_outcome: F) -> Result<BatchReport>
    where
        F: FnMut(&DocumentOutcome),
    {
        check_distinct(&plan.root, dst)?;
        let started_at = Utc::now();
        log::info!(
            "Processing {} documents from {} with {} workers",
            plan.documents.len(),
            plan.root.display(),
            self.options.jobs
        );

        if !self.options.dry_run {
            fs::create_dir_all(dst).map_err(|e| Error::write(dst, e))?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .thread_name(|i| format!("unbuild-worker-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to start worker pool: {}", e)))?;

        let (tx, rx) = unbounded::<DocumentOutcome>();
        for relative in &plan.documents {
            let tx = tx.clone();
            let pipeline = Arc::clone(&self.pipeline);
            let src_path = plan.root.join(relative);
            let dst_path = dst.join(relative);
            let dry_run = self.options.dry_run;

            pool.spawn(move || {
                let outcome = process_document(&pipeline, &src_path, &dst_path, dry_run);
                // The receiver outlives every task; a send error means the batch was dropped.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let (copied, copy_failures) = if self.options.copy_unsupported && !self.options.dry_run {
            copy_others(plan, dst)
        } else {
            (Vec::new(), Vec::new())
        };

        let mut outcomes = Vec::with_capacity(plan.documents.len());
        for outcome in rx.iter() {
            on_outcome(&outcome);
            outcomes.push(outcome);
        }
        outcomes.sort_by(|a, b| a.source().cmp(&b.source()));

        let report = BatchReport {
            source_root: plan.root.clone(),
            destination_root: dst.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
            copied,
            copy_failures,
        };
        log::info!(
            "Batch finished: {} succeeded, {} failed, {} pages removed",
            report.succeeded().count(),
            report.failed().count(),
            report.total_removed()
        );
        Ok(report)
    }
}

fn check_distinct(src: &Path, dst: &Path) -> Result<()> {
    let (Ok(src), Ok(dst)) = (src.canonicalize(), dst.canonicalize()) else {
        // A destination that does not exist yet cannot be the source.
        return Ok(());
    };
    if src == dst {
        return Err(Error::InvalidOption(format!(
            "destination {} is the source directory",
            dst.display()
        )));
    }
    Ok(())
}

fn process_document(pipeline: &Pipeline, src: &Path, dst: &Path, dry_run: bool) -> DocumentOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| {
        if dry_run {
            pipeline
                .analyze_path(src)
                .map(|analysis| analysis.into_report(Some(src.to_path_buf()), None))
        } else {
            pipeline.process_path(src, dst)
        }
    }));

    match result {
        Ok(Ok(report)) => DocumentOutcome::Processed(report),
        Ok(Err(e)) => {
            log::warn!("{}: {}", src.display(), e);
            DocumentOutcome::Failed(DocumentFailure::from_error(src, &e))
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("{}: processing panicked: {}", src.display(), message);
            DocumentOutcome::Failed(DocumentFailure {
                source: src.to_path_buf(),
                kind: FailureKind::Unreadable,
                message: format!("processing panicked: {}", message),
            })
        }
    }
}

fn copy_others(plan: &BatchPlan, dst: &Path) -> (Vec<PathBuf>, Vec<DocumentFailure>) {
    let mut copied = Vec::new();
    let mut failures = Vec::new();

    for relative in &plan.others {
        let from = plan.root.join(relative);
        let to = dst.join(relative);
        let result = to
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(&from, &to));

        match result {
            Ok(_) => copied.push(from),
            Err(e) => {
                log::warn!("Could not copy {}: {}", from.display(), e);
                failures.push(DocumentFailure::from_error(&from, &Error::write(&to, e)));
            }
        }
    }
    (copied, failures)
}
