//! Upload handler.
//!
//! Queues the given files, runs the manager until the queue drains and
//! prints the summary lines whenever they change.

use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ferry_core::{
    ChannelEmitter, ItemId, ProgressTexts, TransferMechanism, UploadEvent, UploadManagerConfig,
};
use ferry_upload::{
    DirectorySink, FileMechanism, SimulatedMechanism, SimulationProfile, UploadManager,
    UploadManagerDeps, build_upload_manager,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::commands::UploadArgs;
use crate::error::CliError;

/// Outcome of one `ferry upload` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Files accepted into the queue.
    pub queued: usize,
    /// Paths skipped before queueing (missing, not a file, rejected).
    pub skipped: usize,
    /// Files uploaded.
    pub completed: u64,
    /// Files that ended in the failed set.
    pub failed: usize,
}

/// Execute the upload command.
///
/// Fails with [`CliError::UploadsFailed`] if any queued file failed.
pub async fn execute(args: &UploadArgs) -> Result<()> {
    let report = run(args).await?;
    if report.failed > 0 {
        return Err(CliError::UploadsFailed {
            failed: report.failed,
            queued: report.queued,
        }
        .into());
    }
    Ok(())
}

/// Upload every path in `args` and report what happened.
pub async fn run(args: &UploadArgs) -> Result<UploadReport> {
    let mechanisms = build_mechanisms(args).await?;
    let (emitter, events) = ChannelEmitter::new();
    let manager = build_upload_manager(UploadManagerDeps {
        mechanisms,
        event_emitter: Arc::new(emitter),
        config: build_config(args),
    })
    .map_err(CliError::from)?;

    let (names, skipped) = queue_paths(&manager, &args.paths).await;
    if names.is_empty() {
        return Err(CliError::Arguments("nothing to upload".to_string()).into());
    }
    tracing::debug!(
        queued = names.len(),
        skipped,
        workers = manager.worker_count(),
        "Files queued"
    );

    manager.start();
    let watched = watch(&manager, events, &names).await;
    manager.shutdown().await;
    watched?;

    let stats = manager.stats();
    Ok(UploadReport {
        queued: names.len(),
        skipped,
        completed: stats.items_completed_total,
        failed: stats.failed,
    })
}

fn build_config(args: &UploadArgs) -> UploadManagerConfig {
    UploadManagerConfig::default()
        .with_chunk_size(args.chunk_size)
        .with_max_item_size(args.max_size)
        .with_max_pending(args.max_pending)
        .with_item_noun(args.noun.clone())
}

async fn build_mechanisms(args: &UploadArgs) -> Result<Vec<Box<dyn TransferMechanism>>, CliError> {
    if args.workers == 0 {
        return Err(CliError::Arguments(
            "--workers must be at least 1".to_string(),
        ));
    }

    let failures = [
        ("--fail-start", args.fail_start),
        ("--fail-chunk", args.fail_chunk),
    ];
    for (flag, p) in failures {
        if !(0.0..=1.0).contains(&p) {
            return Err(CliError::Arguments(format!(
                "{flag} must be between 0 and 1, got {p}"
            )));
        }
        if p > 0.0 && !args.simulate {
            return Err(CliError::Arguments(format!("{flag} requires --simulate")));
        }
    }

    if args.simulate {
        let profile = SimulationProfile::default()
            .with_chunk_delay(Duration::from_millis(args.chunk_delay_ms))
            .with_start_failure(args.fail_start)
            .with_chunk_failure(args.fail_chunk);
        // Each worker gets its own seed so their failures don't line up
        return Ok((0_u64..)
            .take(args.workers)
            .map(|i| {
                let profile = profile
                    .clone()
                    .with_seed(args.seed.map(|seed| seed.wrapping_add(i)));
                Box::new(SimulatedMechanism::simulated(profile)) as Box<dyn TransferMechanism>
            })
            .collect());
    }

    let Some(dest) = &args.dest else {
        return Err(CliError::Arguments(
            "either --dest or --simulate is required".to_string(),
        ));
    };
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| CliError::Io(format!("{}: {e}", dest.display())))?;

    Ok((0..args.workers)
        .map(|_| {
            Box::new(FileMechanism::new(DirectorySink::new(dest.clone())))
                as Box<dyn TransferMechanism>
        })
        .collect())
}

/// Stat and queue each path. Returns the queued names and the skip count.
async fn queue_paths(
    manager: &UploadManager,
    paths: &[PathBuf],
) -> (HashMap<ItemId, String>, usize) {
    let mut names = HashMap::new();
    let mut skipped = 0;

    for path in paths {
        let name = path.to_string_lossy().into_owned();
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                eprintln!("Skipping {name} because it is not a file.");
                skipped += 1;
                continue;
            }
            Err(e) => {
                eprintln!("Skipping {name}: {e}");
                skipped += 1;
                continue;
            }
        };

        match manager.add_item(name.clone(), size) {
            Ok(id) => {
                names.insert(id, name);
            }
            Err(e) => {
                eprintln!("{}", e.user_message());
                skipped += 1;
            }
        }
    }

    (names, skipped)
}

/// Print events until the queue drains or the user hits Ctrl-C.
async fn watch(
    manager: &UploadManager,
    mut events: UnboundedReceiver<UploadEvent>,
    names: &HashMap<ItemId, String>,
) -> Result<(), CliError> {
    let mut printer = SummaryPrinter::default();
    printer.show(manager.progress_texts());

    let mut interrupted = pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(());
                };
                if handle_event(manager, names, &mut printer, event) == Flow::Drained {
                    return Ok(());
                }
            }
            _ = &mut interrupted => {
                return Err(CliError::Interrupted);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Drained,
}

fn handle_event(
    manager: &UploadManager,
    names: &HashMap<ItemId, String>,
    printer: &mut SummaryPrinter,
    event: UploadEvent,
) -> Flow {
    let name_of = |id: ItemId| names.get(&id).map_or("?", String::as_str);
    match event {
        // Workers emit outside the queue lock, so texts can arrive out of
        // order; the event only says something changed.
        UploadEvent::ProgressTexts { .. } => printer.show(manager.progress_texts()),
        UploadEvent::ItemCompleted { id } => {
            tracing::info!(item = %id, "Uploaded {}", name_of(id));
        }
        UploadEvent::ItemFailed { id, error } => {
            eprintln!("{}: {error}", name_of(id));
        }
        UploadEvent::QueueDrained { .. } => {
            printer.show(manager.progress_texts());
            return Flow::Drained;
        }
        _ => {}
    }
    Flow::Continue
}

/// Prints each summary line when it differs from the last one printed.
#[derive(Default)]
struct SummaryPrinter {
    last: ProgressTexts,
}

impl SummaryPrinter {
    fn show(&mut self, texts: ProgressTexts) {
        if texts.pending != self.last.pending {
            println!("{}", texts.pending);
        }
        if texts.completed != self.last.completed {
            println!("{}", texts.completed);
        }
        self.last = texts;
    }
}
