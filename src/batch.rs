//! Batch runs: one pipeline over every image under a directory.
//!
//! ```text
//! photos/                    out/
//! ├── a.jpg          →       ├── a-edited.png
//! ├── notes.txt              └── trip/
//! └── trip/                      └── b-edited.png
//!     └── b.png
//! ```
//!
//! Inputs are collected with `walkdir` (supported extensions only, sorted) and
//! each image is a decode → [`execute`] → encode job on a dedicated rayon pool
//! sized by `[processing] max_processes`. The directory structure under the
//! input root is mirrored under the output directory.
//!
//! ## Progress and cancellation
//!
//! Every job reports [`BatchEvent`]s over an optional `mpsc` channel; the CLI
//! drains it on a printer thread. The `cancel` flag is checked before each job
//! starts: jobs already running finish, jobs not yet started are reported as
//! skipped. A failing image never aborts the run; failures are counted in the
//! [`BatchSummary`].

use crate::codec::{CodecError, ImageCodec, is_supported_input};
use crate::editing::{ExecutionError, Pipeline, execute};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("input is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single image failed.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Output extension; selects the encoder.
    pub format: String,
    pub suffix: String,
    pub overwrite: bool,
    /// Worker threads for this run.
    pub threads: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            format: "png".to_string(),
            suffix: "edited".to_string(),
            overwrite: false,
            threads: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    OutputExists,
    Cancelled,
}

/// Progress of one image, in the order each job observes it.
///
/// `index` is the 1-based position in the sorted input list.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
        source: PathBuf,
    },
    Finished {
        index: usize,
        source: PathBuf,
        output: PathBuf,
        dimensions: (u32, u32),
        elapsed_ms: u64,
    },
    Failed {
        index: usize,
        source: PathBuf,
        error: String,
    },
    Skipped {
        index: usize,
        source: PathBuf,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    /// Outputs that already existed.
    pub skipped: usize,
    /// Jobs not started because the run was cancelled.
    pub cancelled: usize,
    /// Failed sources with their error, in input order.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

enum Outcome {
    Processed,
    Skipped,
    Cancelled,
    Failed(PathBuf, String),
}

/// Every supported image under `root`, sorted by path.
///
/// `exclude` (typically the output directory) is not descended into, so
/// re-running with the output nested inside the input does not pick up
/// previous results. Directories are compared by canonical path, so
/// `./edited`, `edited` and `sub/../edited` all name the same exclusion.
pub fn collect_inputs(root: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::NotADirectory(root.to_path_buf()));
    }
    // A missing exclude directory cannot hide anything yet.
    let exclude = exclude.and_then(|ex| std::fs::canonicalize(ex).ok());
    let mut inputs = Vec::new();
    let walker = walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| match &exclude {
            Some(ex) if e.file_type().is_dir() => {
                std::fs::canonicalize(e.path()).map_or(true, |dir| dir != *ex)
            }
            _ => true,
        });
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            inputs.push(entry.into_path());
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// `<output_dir>/<relative dir>/<stem>-<suffix>.<format>`.
pub fn output_path_for(
    source: &Path,
    input_root: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> PathBuf {
    let relative_dir = source
        .strip_prefix(input_root)
        .ok()
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if options.suffix.is_empty() {
        format!("{stem}.{}", options.format)
    } else {
        format!("{stem}-{}.{}", options.suffix, options.format)
    };
    output_dir.join(relative_dir).join(name)
}

/// Decode, execute and encode one image. Returns the output dimensions.
pub fn process_one(
    codec: &impl ImageCodec,
    source: &Path,
    output: &Path,
    pipeline: &Pipeline,
) -> Result<(u32, u32), JobError> {
    let input = codec.decode(source)?;
    let edited = execute(&input, pipeline)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    codec.encode(&edited, output)?;
    Ok(edited.dimensions())
}

/// Run `pipeline` over every supported image under `input_root`.
pub fn run(
    codec: &impl ImageCodec,
    input_root: &Path,
    output_dir: &Path,
    pipeline: &Pipeline,
    options: &BatchOptions,
    events: Option<Sender<BatchEvent>>,
    cancel: &AtomicBool,
) -> Result<BatchSummary, BatchError> {
    let inputs = collect_inputs(input_root, Some(output_dir))?;
    let total = inputs.len();
    tracing::info!(
        total,
        input = %input_root.display(),
        output = %output_dir.display(),
        steps = pipeline.len(),
        "starting batch"
    );
    std::fs::create_dir_all(output_dir)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.max(1))
        .build()?;

    let emit = |event: BatchEvent| {
        if let Some(tx) = &events {
            // The receiver going away only silences progress.
            tx.send(event).ok();
        }
    };

    let outcomes: Vec<Outcome> = pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map(|(i, source)| {
                let index = i + 1;
                if cancel.load(Ordering::SeqCst) {
                    emit(BatchEvent::Skipped {
                        index,
                        source: source.clone(),
                        reason: SkipReason::Cancelled,
                    });
                    return Outcome::Cancelled;
                }

                let output = output_path_for(source, input_root, output_dir, options);
                if !options.overwrite && output.exists() {
                    tracing::warn!(source = %source.display(), output = %output.display(), "output exists, skipping");
                    emit(BatchEvent::Skipped {
                        index,
                        source: source.clone(),
                        reason: SkipReason::OutputExists,
                    });
                    return Outcome::Skipped;
                }

                emit(BatchEvent::Started {
                    index,
                    total,
                    source: source.clone(),
                });
                let start = Instant::now();
                match process_one(codec, source, &output, pipeline) {
                    Ok(dimensions) => {
                        let elapsed_ms = start.elapsed().as_millis() as u64;
                        tracing::info!(
                            source = %source.display(),
                            output = %output.display(),
                            width = dimensions.0,
                            height = dimensions.1,
                            elapsed_ms,
                            "image processed"
                        );
                        emit(BatchEvent::Finished {
                            index,
                            source: source.clone(),
                            output,
                            dimensions,
                            elapsed_ms,
                        });
                        Outcome::Processed
                    }
                    Err(e) => {
                        let error = e.to_string();
                        tracing::warn!(source = %source.display(), %error, "image failed");
                        emit(BatchEvent::Failed {
                            index,
                            source: source.clone(),
                            error: error.clone(),
                        });
                        Outcome::Failed(source.clone(), error)
                    }
                }
            })
            .collect()
    });

    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Processed => summary.processed += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Cancelled => summary.cancelled += 1,
            Outcome::Failed(source, error) => summary.failures.push((source, error)),
        }
    }
    tracing::info!(
        processed = summary.processed,
        failed = summary.failed(),
        skipped = summary.skipped,
        cancelled = summary.cancelled,
        "batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{MockCodec, RecordedOp};
    use crate::editing::Operation;
    use crate::test_helpers::{gradient_rgb8, write_files};
    use serde_json::json;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn halve() -> Pipeline {
        Pipeline::new(vec![
            Operation::parse("resize", &json!({"w": 2, "h": 2})).unwrap(),
        ])
    }

    fn options() -> BatchOptions {
        BatchOptions {
            threads: 2,
            ..Default::default()
        }
    }

    #[test]
    fn collect_inputs_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &["b.jpg", "a.PNG", "notes.txt", "sub/c.webp", "sub/d.gif", "out/old.png"],
        );

        let found = collect_inputs(tmp.path(), Some(&tmp.path().join("out"))).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpg", "sub/c.webp"]);
    }

    #[test]
    fn collect_inputs_excludes_output_however_it_is_spelled() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &["a.png", "edited/a-edited.png", "sub/b.png"]);

        let spellings = [
            (tmp.path().join("sub/.."), tmp.path().join("edited")),
            (tmp.path().to_path_buf(), tmp.path().join("sub/../edited")),
            (tmp.path().join("."), tmp.path().join("./edited/")),
        ];
        for (root, exclude) in spellings {
            let found = collect_inputs(&root, Some(&exclude)).unwrap();
            let names: Vec<_> = found
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            assert_eq!(names, vec!["a.png", "b.png"], "{root:?} excluding {exclude:?}");
        }
    }

    #[test]
    fn collect_inputs_ignores_missing_exclude() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &["a.png"]);
        let found = collect_inputs(tmp.path(), Some(&tmp.path().join("not-yet"))).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn collect_inputs_rejects_file_root() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &["a.png"]);
        let err = collect_inputs(&tmp.path().join("a.png"), None).unwrap_err();
        assert!(matches!(err, BatchError::NotADirectory(_)));
    }

    #[test]
    fn output_path_mirrors_subdirectories() {
        let opts = BatchOptions {
            format: "jpg".into(),
            ..Default::default()
        };
        let out = output_path_for(
            Path::new("/in/trip/b.png"),
            Path::new("/in"),
            Path::new("/out"),
            &opts,
        );
        assert_eq!(out, PathBuf::from("/out/trip/b-edited.jpg"));

        let bare = BatchOptions {
            suffix: String::new(),
            ..Default::default()
        };
        let out = output_path_for(Path::new("/in/a.jpg"), Path::new("/in"), Path::new("/o"), &bare);
        assert_eq!(out, PathBuf::from("/o/a.png"));
    }

    #[test]
    fn run_processes_every_input() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_files(&input, &["a.jpg", "b.png", "sub/c.tif"]);

        let codec = MockCodec::new();
        let summary = run(
            &codec,
            &input,
            &output,
            &halve(),
            &options(),
            None,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed(), 0);
        let encoded = codec.encoded_paths();
        assert_eq!(
            encoded,
            vec![
                output.join("a-edited.png").to_string_lossy().into_owned(),
                output.join("b-edited.png").to_string_lossy().into_owned(),
                output.join("sub/c-edited.png").to_string_lossy().into_owned(),
            ]
        );
        assert!(codec.get_operations().iter().all(|op| match op {
            RecordedOp::Encode { width, height, .. } => (*width, *height) == (2, 2),
            RecordedOp::Decode(_) => true,
        }));
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_files(&input, &["a.jpg", "bad.jpg", "c.jpg"]);

        let codec = MockCodec::new().with_corrupt(input.join("bad.jpg"));
        let summary = run(
            &codec,
            &input,
            &tmp.path().join("out"),
            &halve(),
            &options(),
            None,
            &AtomicBool::new(false),
        )
        .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures[0].0, input.join("bad.jpg"));
        assert!(summary.failures[0].1.contains("mock corrupt file"));
    }

    #[test]
    fn execution_errors_name_the_stage() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_files(&input, &["a.png"]);
        let pipeline = Pipeline::new(vec![
            Operation::parse("crop", &json!({"x": 2, "y": 2, "w": 8, "h": 8})).unwrap(),
        ]);

        let summary = run(
            &MockCodec::new(),
            &input,
            &tmp.path().join("out"),
            &pipeline,
            &options(),
            None,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert!(summary.failures[0].1.starts_with("stage 0 (crop)"), "{}", summary.failures[0].1);
    }

    #[test]
    fn existing_outputs_are_skipped_unless_overwrite() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_files(&input, &["a.jpg", "b.jpg"]);
        write_files(&output, &["a-edited.png"]);

        let codec = MockCodec::new();
        let summary = run(
            &codec,
            &input,
            &output,
            &halve(),
            &options(),
            None,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!((summary.processed, summary.skipped), (1, 1));

        let codec = MockCodec::new();
        let overwrite = BatchOptions {
            overwrite: true,
            ..options()
        };
        let summary = run(
            &codec,
            &input,
            &output,
            &halve(),
            &overwrite,
            None,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!((summary.processed, summary.skipped), (2, 0));
    }

    #[test]
    fn cancelled_run_starts_no_jobs() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_files(&input, &["a.jpg", "b.jpg"]);

        let codec = MockCodec::new();
        let (tx, rx) = mpsc::channel();
        let summary = run(
            &codec,
            &input,
            &tmp.path().join("out"),
            &halve(),
            &options(),
            Some(tx),
            &AtomicBool::new(true),
        )
        .unwrap();

        assert_eq!(summary.cancelled, 2);
        assert!(codec.get_operations().is_empty());
        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(
            e,
            BatchEvent::Skipped {
                reason: SkipReason::Cancelled,
                ..
            }
        )));
    }

    #[test]
    fn events_report_start_and_finish() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        write_files(&input, &["only.png"]);
        let codec = MockCodec::new().with_source(input.join("only.png"), gradient_rgb8(6, 4));

        let (tx, rx) = mpsc::channel();
        run(
            &codec,
            &input,
            &tmp.path().join("out"),
            &Pipeline::default(),
            &options(),
            Some(tx),
            &AtomicBool::new(false),
        )
        .unwrap();

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert!(matches!(&events[0], BatchEvent::Started { index: 1, total: 1, .. }));
        assert!(matches!(
            &events[1],
            BatchEvent::Finished {
                dimensions: (6, 4),
                ..
            }
        ));
    }
}
