//! Single-clip downloads and the download-all batch.
//!
//! A batch fetches the visible clips one at a time on a worker thread and
//! packs them into an in-memory zip. A failed fetch is logged and skipped.
//! Progress counts attempts, so a finished batch always reports `(n, n)`.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::catalog::ClipFetcher;
use crate::error::AppError;
use crate::model::{ClipRef, MediaKind};
use crate::naming::{clip_file_name, sanitize_stem};
use crate::task::BackgroundTask;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    pub completed: usize,
    pub total: usize,
}

impl DownloadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f32 / self.total as f32
    }

    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}

/// A file ready to be written wherever the user picks.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct BatchOutcome {
    /// None when the batch was cancelled.
    pub archive: Option<Vec<u8>>,
    pub entries: usize,
    pub failed: Vec<String>,
}

pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    options: SimpleFileOptions,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Adds `{title}.{ext}`; a repeated title gets a ` (n)` suffix.
    pub fn add(&mut self, title: &str, kind: MediaKind, bytes: &[u8]) -> Result<String, AppError> {
        let stem = sanitize_stem(title);
        let mut name = format!("{stem}.{}", kind.extension());
        let mut n = 2;
        while self.names.contains(&name) {
            name = format!("{stem} ({n}).{}", kind.extension());
            n += 1;
        }
        self.writer.start_file(name.clone(), self.options)?;
        self.writer.write_all(bytes)?;
        self.names.insert(name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Fetches `items` strictly in order. `cancel` is checked before each fetch.
pub fn run_batch<F>(
    fetcher: &dyn ClipFetcher,
    items: &[ClipRef],
    cancel: &AtomicBool,
    mut on_progress: F,
) -> Result<BatchOutcome, AppError>
where
    F: FnMut(DownloadProgress),
{
    let total = items.len();
    let mut archive = ArchiveBuilder::new();
    let mut failed = Vec::new();

    for (idx, clip) in items.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Download cancelled after {idx} of {total}");
            return Ok(BatchOutcome {
                archive: None,
                entries: archive.len(),
                failed,
            });
        }
        match fetcher.fetch(clip, MediaKind::Uncompressed) {
            Ok(bytes) => {
                archive.add(&clip.title, MediaKind::Uncompressed, &bytes)?;
            }
            Err(err) => {
                log::error!("Failed to download {}: {err}", clip.title);
                failed.push(clip.title.clone());
            }
        }
        on_progress(DownloadProgress {
            completed: idx + 1,
            total,
        });
    }

    let entries = archive.len();
    let bytes = archive.finish()?;
    log::info!(
        "Archive ready: {entries} of {total} clips, {} bytes",
        bytes.len()
    );
    Ok(BatchOutcome {
        archive: Some(bytes),
        entries,
        failed,
    })
}

/// Fetches one uncompressed clip, bypassing the archive.
pub fn download_one(fetcher: &dyn ClipFetcher, clip: &ClipRef) -> Result<SavedFile, AppError> {
    let bytes = fetcher.fetch(clip, MediaKind::Uncompressed)?;
    Ok(SavedFile {
        file_name: clip_file_name(&clip.title, MediaKind::Uncompressed),
        bytes,
    })
}

/// A running download-all batch.
pub struct DownloadJob {
    archive_name: String,
    progress: Arc<Mutex<DownloadProgress>>,
    cancel: Arc<AtomicBool>,
    task: BackgroundTask<BatchOutcome>,
}

impl DownloadJob {
    pub fn spawn(fetcher: Arc<dyn ClipFetcher>, items: Vec<ClipRef>, archive_name: String) -> Self {
        let progress = Arc::new(Mutex::new(DownloadProgress {
            completed: 0,
            total: items.len(),
        }));
        let cancel = Arc::new(AtomicBool::new(false));
        let shared = progress.clone();
        let flag = cancel.clone();
        log::info!("Downloading {} clips into {archive_name}", items.len());
        let task = BackgroundTask::spawn(move || {
            run_batch(fetcher.as_ref(), &items, &flag, |update| {
                *shared.lock() = update;
            })
        });
        Self {
            archive_name,
            progress,
            cancel,
            task,
        }
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn progress(&self) -> DownloadProgress {
        *self.progress.lock()
    }

    /// The fetch in flight still completes; nothing after it starts.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn try_finish(&mut self) -> Option<Result<BatchOutcome, AppError>> {
        self.task.try_take()
    }
}

pub enum DownloadEvent {
    ArchiveReady {
        file: SavedFile,
        entries: usize,
        failed: Vec<String>,
    },
    Cancelled,
    Failed(AppError),
}

struct PendingBatch {
    fetcher: Arc<dyn ClipFetcher>,
    items: Vec<ClipRef>,
    archive_name: String,
}

/// Confirmation gate plus the lifetime of at most one batch.
#[derive(Default)]
pub struct DownloadController {
    pending: Option<PendingBatch>,
    job: Option<DownloadJob>,
}

impl DownloadController {
    /// Stages a batch; nothing is fetched until `confirm`.
    pub fn request_all(
        &mut self,
        fetcher: Arc<dyn ClipFetcher>,
        items: Vec<ClipRef>,
        archive_name: String,
    ) {
        if self.job.is_some() {
            log::warn!("A download is already running");
            return;
        }
        self.pending = Some(PendingBatch {
            fetcher,
            items,
            archive_name,
        });
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.pending.is_some()
    }

    pub fn confirm(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.job = Some(DownloadJob::spawn(
                pending.fetcher,
                pending.items,
                pending.archive_name,
            ));
        }
    }

    pub fn decline(&mut self) {
        self.pending = None;
    }

    pub fn job(&self) -> Option<&DownloadJob> {
        self.job.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn cancel(&self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }

    /// Once the batch settles the job is dropped, whatever the outcome, so
    /// the progress overlay always goes away.
    pub fn poll(&mut self) -> Option<DownloadEvent> {
        let result = self.job.as_mut()?.try_finish()?;
        let job = self.job.take()?;
        let event = match result {
            Ok(BatchOutcome {
                archive: Some(bytes),
                entries,
                failed,
            }) => DownloadEvent::ArchiveReady {
                file: SavedFile {
                    file_name: job.archive_name,
                    bytes,
                },
                entries,
                failed,
            },
            Ok(BatchOutcome { archive: None, .. }) => DownloadEvent::Cancelled,
            Err(err) => {
                log::error!("Download failed: {err}");
                DownloadEvent::Failed(err)
            }
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    struct FakeStore {
        missing: HashSet<String>,
        calls: AtomicUsize,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl FakeStore {
        fn new(missing: &[&str]) -> Self {
            Self {
                missing: missing.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                cancel_after: None,
            }
        }
    }

    impl ClipFetcher for FakeStore {
        fn fetch(&self, clip: &ClipRef, kind: MediaKind) -> Result<Vec<u8>, AppError> {
            assert_eq!(kind, MediaKind::Uncompressed);
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, flag)) = &self.cancel_after {
                if call == *after {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            if self.missing.contains(&clip.file_name) {
                return Err(AppError::Network(format!("HTTP 404 {}", clip.file_name)));
            }
            Ok(format!("RIFF{}", clip.file_name).into_bytes())
        }
    }

    fn items(n: usize) -> Vec<ClipRef> {
        (1..=n)
            .map(|i| ClipRef::new(format!("v{i}"), format!("Clip {i}")))
            .collect()
    }

    fn settle(controller: &mut DownloadController) -> DownloadEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = controller.poll() {
                return event;
            }
            assert!(Instant::now() < deadline, "batch never finished");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn failed_fetches_are_skipped_and_progress_reaches_total() {
        let store = FakeStore::new(&["v2", "v4"]);
        let cancel = AtomicBool::new(false);
        let mut updates = Vec::new();
        let outcome = run_batch(&store, &items(5), &cancel, |p| updates.push(p)).unwrap();

        assert_eq!(outcome.entries, 3);
        assert_eq!(outcome.failed, ["Clip 2", "Clip 4"]);
        let names = entry_names(&outcome.archive.unwrap());
        assert_eq!(names, ["Clip 1.wav", "Clip 3.wav", "Clip 5.wav"]);

        let completed: Vec<_> = updates.iter().map(|p| p.completed).collect();
        assert_eq!(completed, [1, 2, 3, 4, 5]);
        assert!(updates.iter().all(|p| p.total == 5));
        assert_eq!(updates.last().unwrap().fraction(), 1.0);
    }

    #[test]
    fn every_fetch_failing_still_finalizes_an_empty_archive() {
        let store = FakeStore::new(&["v1", "v2"]);
        let cancel = AtomicBool::new(false);
        let outcome = run_batch(&store, &items(2), &cancel, |_| {}).unwrap();
        assert_eq!(outcome.entries, 0);
        assert!(entry_names(&outcome.archive.unwrap()).is_empty());
    }

    #[test]
    fn fetches_are_issued_in_list_order() {
        struct Recorder(Mutex<Vec<String>>);
        impl ClipFetcher for Recorder {
            fn fetch(&self, clip: &ClipRef, _: MediaKind) -> Result<Vec<u8>, AppError> {
                self.0.lock().push(clip.file_name.clone());
                Ok(Vec::new())
            }
        }
        let recorder = Recorder(Mutex::new(Vec::new()));
        let cancel = AtomicBool::new(false);
        run_batch(&recorder, &items(4), &cancel, |_| {}).unwrap();
        assert_eq!(*recorder.0.lock(), ["v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn cancellation_is_checked_before_each_fetch() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut store = FakeStore::new(&[]);
        store.cancel_after = Some((2, cancel.clone()));
        let outcome = run_batch(&store, &items(5), &cancel, |_| {}).unwrap();
        assert!(outcome.archive.is_none());
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn duplicate_titles_get_distinct_entries() {
        let store = FakeStore::new(&[]);
        let cancel = AtomicBool::new(false);
        let clips = vec![
            ClipRef::new("a", "Same"),
            ClipRef::new("b", "Same"),
            ClipRef::new("c", "Same"),
        ];
        let outcome = run_batch(&store, &clips, &cancel, |_| {}).unwrap();
        assert_eq!(
            entry_names(&outcome.archive.unwrap()),
            ["Same (2).wav", "Same (3).wav", "Same.wav"]
        );
    }

    #[test]
    fn single_download_uses_the_title() {
        let store = FakeStore::new(&[]);
        let file = download_one(&store, &ClipRef::new("v9", "Battle: Win")).unwrap();
        assert_eq!(file.file_name, "Battle_ Win.wav");
        assert_eq!(file.bytes, b"RIFFv9");
        assert!(download_one(&FakeStore::new(&["v9"]), &ClipRef::new("v9", "x")).is_err());
    }

    #[test]
    fn declining_confirmation_fetches_nothing() {
        let store = Arc::new(FakeStore::new(&[]));
        let mut controller = DownloadController::default();
        controller.request_all(store.clone(), items(3), "voice_abc_happy.zip".into());
        assert!(controller.awaiting_confirmation());

        controller.decline();
        assert!(!controller.awaiting_confirmation());
        assert!(!controller.is_busy());
        assert!(controller.poll().is_none());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn confirmed_batch_produces_named_archive_and_clears_job() {
        let store = Arc::new(FakeStore::new(&["v2"]));
        let mut controller = DownloadController::default();
        controller.request_all(store.clone(), items(3), "voice_abc_happy_A,B.zip".into());
        controller.confirm();
        assert!(controller.is_busy());

        let event = settle(&mut controller);
        assert!(!controller.is_busy());
        match event {
            DownloadEvent::ArchiveReady {
                file,
                entries,
                failed,
            } => {
                assert_eq!(file.file_name, "voice_abc_happy_A,B.zip");
                assert_eq!(entries, 2);
                assert_eq!(failed, ["Clip 2"]);
            }
            _ => panic!("expected an archive"),
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn crashed_batch_reports_failure_and_clears_job() {
        struct Crashing;
        impl ClipFetcher for Crashing {
            fn fetch(&self, _: &ClipRef, _: MediaKind) -> Result<Vec<u8>, AppError> {
                panic!("fetch worker died");
            }
        }
        let mut controller = DownloadController::default();
        controller.request_all(Arc::new(Crashing), items(2), "voice_abc_happy.zip".into());
        controller.confirm();
        assert!(controller.job().is_some());

        let event = settle(&mut controller);
        assert!(matches!(event, DownloadEvent::Failed(_)));
        assert!(!controller.is_busy());
        assert!(controller.job().is_none());
        assert!(controller.poll().is_none());
    }

    #[test]
    fn progress_fraction_handles_empty_totals() {
        assert_eq!(DownloadProgress::default().fraction(), 0.0);
        let half = DownloadProgress {
            completed: 1,
            total: 2,
        };
        assert_eq!(half.percent(), 50);
    }
}
