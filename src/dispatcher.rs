use crate::fetcher::{DownloadOutcome, Fetcher};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

/// Default number of concurrent download workers
pub const DEFAULT_WORKERS: usize = 3;

/// Aggregate result of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Per-worker outcome counts, merged once every worker has finished
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    downloaded: usize,
    skipped: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded => self.downloaded += 1,
            DownloadOutcome::Skipped => self.skipped += 1,
            DownloadOutcome::Failed => self.failed += 1,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Fans unique URLs out to a fixed pool of download workers
pub struct Dispatcher {
    fetcher: Arc<Fetcher>,
    workers: usize,
    show_progress: bool,
}

impl Dispatcher {
    /// Create a dispatcher running `workers` concurrent downloads (at least one)
    pub fn new(fetcher: Fetcher, workers: usize) -> Self {
        Dispatcher {
            fetcher: Arc::new(fetcher),
            workers: workers.max(1),
            show_progress: true,
        }
    }

    /// Toggle the terminal progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Download every URL into `dir` and return the counts once all workers are done
    pub async fn run(&self, urls: Vec<String>, dir: &Path) -> Summary {
        let total = urls.len();
        if total == 0 {
            return Summary::default();
        }

        let (tally, reported) = self.dispatch(urls, dir).await;
        debug_assert_eq!(reported, tally.downloaded);
        debug!(reported, "progress reporter finished");

        let summary = Summary {
            total,
            downloaded: tally.downloaded,
            skipped: tally.skipped,
            failed: tally.failed,
        };
        info!(
            total = summary.total,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "download run finished"
        );
        summary
    }

    /// Fan `urls` out to the workers. Returns the merged worker tally and the
    /// number of downloads the progress reporter saw.
    async fn dispatch(&self, urls: Vec<String>, dir: &Path) -> (Tally, usize) {
        let total = urls.len();

        // Sized to hold every URL so enqueueing never waits on the workers
        let (task_tx, task_rx) = mpsc::channel::<String>(total.max(1));
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (progress_tx, progress_rx) = mpsc::unbounded_channel::<String>();

        let reporter = tokio::spawn(report_progress(
            progress_rx,
            total,
            self.progress_bar(total),
        ));

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let worker = DownloadWorker {
                id: worker_id,
                fetcher: self.fetcher.clone(),
                dir: dir.to_path_buf(),
                rx: task_rx.clone(),
                progress: progress_tx.clone(),
            };

            handles.push(tokio::spawn(async move { worker.run().await }));
        }
        // Workers hold the only remaining senders, so the reporter stops once they all exit
        drop(progress_tx);

        for url in urls {
            if task_tx.send(url).await.is_err() {
                error!("all download workers exited early");
                break;
            }
        }
        // Closing the queue tells workers no more work is coming
        drop(task_tx);

        let mut tally = Tally::default();
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(worker_tally) => tally += worker_tally,
                Err(e) => error!("download worker panicked: {:?}", e),
            }
        }

        let reported = match reporter.await {
            Ok(reported) => reported,
            Err(e) => {
                error!("progress reporter panicked: {:?}", e);
                tally.downloaded
            }
        };

        (tally, reported)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} downloaded")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Prints a line per downloaded file until every worker has dropped its sender.
/// Returns the number of downloads reported.
async fn report_progress(
    mut rx: mpsc::UnboundedReceiver<String>,
    total: usize,
    pb: ProgressBar,
) -> usize {
    let mut downloaded = 0;
    while let Some(url) = rx.recv().await {
        downloaded += 1;
        pb.inc(1);
        pb.println(format!(
            "{} {}/{}: {}",
            "Downloaded".green(),
            downloaded,
            total,
            url
        ));
    }
    pb.finish_and_clear();
    downloaded
}

/// Individual download worker
struct DownloadWorker {
    id: usize,
    fetcher: Arc<Fetcher>,
    dir: PathBuf,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    progress: mpsc::UnboundedSender<String>,
}

impl DownloadWorker {
    async fn run(self) -> Tally {
        let mut tally = Tally::default();
        loop {
            // Hold the lock only while waiting for the next URL
            let task = {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            };

            let url = match task {
                Some(url) => url,
                None => break,
            };

            debug!(worker = self.id, url = %url, "fetching");
            let outcome = self.fetcher.fetch(&url, &self.dir).await;
            tally.record(outcome);

            if outcome == DownloadOutcome::Downloaded {
                // The reporter only goes away after every worker has, so this cannot fail
                let _ = self.progress.send(url);
            }
        }
        tally
    }
}
