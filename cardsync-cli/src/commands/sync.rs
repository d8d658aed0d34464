//! Sync command - link open items to the project and fill their fields

use std::io::Write;

use anyhow::Context;
use cardsync_core::{BoardGateway, Config, SyncReporter, Synchronizer, TrackedItem};

/// Prints a repository header and one dot per synced item
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SyncReporter for ConsoleReporter<W> {
    fn repository_started(&mut self, index: usize, total: usize, repository: &str, items: usize) {
        // Progress output is best effort.
        let _ = write!(
            self.out,
            "\n[{}/{}] {} processing: {} ",
            index, total, repository, items
        );
        let _ = self.out.flush();
    }

    fn item_synced(&mut self, _item: &TrackedItem) {
        let _ = write!(self.out, ".");
        let _ = self.out.flush();
    }
}

/// Execute the sync command
pub async fn execute(gateway: &dyn BoardGateway, config: &Config) -> anyhow::Result<()> {
    let board = gateway
        .fetch_board(&config.project)
        .await
        .context("failed to load github project")?;

    let mut reporter = ConsoleReporter::new(std::io::stdout());
    let summary = Synchronizer::new(gateway, &board)
        .sync_repositories(&config.repositories, &mut reporter)
        .await
        .context("sync failed")?;

    println!();
    println!(
        "Synced {} item(s) across {} repositor{}: {} field(s) written, {} skipped",
        summary.items,
        summary.repositories,
        if summary.repositories == 1 { "y" } else { "ies" },
        summary.fields_written,
        summary.fields_skipped
    );

    Ok(())
}
