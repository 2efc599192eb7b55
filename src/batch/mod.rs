// Batch module - runs the compositor over a selection of images
mod error;
mod ticket;
mod types;

pub use error::{BatchError, ItemError};
pub use ticket::{BatchGeneration, BatchTicket};
pub use types::*;

use crate::compositor::{Compositor, RenderOptions, RenderedOutput};
use crate::decode::decode;
use crate::fields::WatermarkFields;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct BatchRunner {
    compositor: Arc<Compositor>,
    concurrency: usize,
}

impl BatchRunner {
    /// `concurrency` is the number of images rendered at once; 1 processes
    /// the selection strictly one after another.
    pub fn new(compositor: Arc<Compositor>, concurrency: usize) -> Self {
        Self {
            compositor,
            concurrency: concurrency.max(1),
        }
    }

    /// Render every item. Failed items are recorded and skipped; outputs come
    /// back in input order whatever order the renders finish in.
    ///
    /// `progress` is called once per finished item with `current` counting
    /// up from 1 to the number of items.
    pub async fn process_all<F>(
        &self,
        items: Vec<BatchItem>,
        fields: &WatermarkFields,
        options: &RenderOptions,
        ticket: &BatchTicket,
        mut progress: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: FnMut(BatchProgress) + Send,
    {
        let total = items.len();
        info!(
            "Processing batch {} with {} images (concurrency {})",
            ticket.generation(),
            total,
            self.concurrency
        );

        if ticket.is_cancelled() {
            return Err(BatchError::Cancelled);
        }

        // Load shared assets once, before any item needs them
        self.compositor.assets().await;

        let names: Vec<_> = items
            .iter()
            .map(|item| (item.id, item.name.clone()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let compositor = Arc::clone(&self.compositor);
            let semaphore = Arc::clone(&semaphore);
            let cancel = ticket.cancellation_token();
            let fields = fields.clone();
            let options = *options;
            let tx = tx.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok(),
                    _ = cancel.cancelled() => None,
                };
                if permit.is_none() {
                    return;
                }

                let result = process_item(&compositor, item, &fields, &options).await;
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut results: Vec<Option<Result<RenderedOutput, ItemError>>> =
            (0..total).map(|_| None).collect();
        let mut completed = 0;
        let cancel = ticket.cancellation_token();

        while completed < total {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    warn!("Batch {} cancelled after {} of {} images", ticket.generation(), completed, total);
                    return Err(BatchError::Cancelled);
                }
                message = rx.recv() => message,
            };

            let Some((index, result)) = message else {
                break;
            };
            results[index] = Some(result);
            completed += 1;
            progress(BatchProgress {
                current: completed,
                total,
            });
        }

        // Workers that died without reporting still count as finished items
        for slot in results.iter_mut().filter(|slot| slot.is_none()) {
            *slot = Some(Err(ItemError::TaskError(
                "worker stopped without a result".to_string(),
            )));
            completed += 1;
            progress(BatchProgress {
                current: completed,
                total,
            });
        }

        if !ticket.is_current() {
            info!(
                "Batch {} finished but is no longer current, discarding results",
                ticket.generation()
            );
            return Err(BatchError::Superseded);
        }

        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };
        for ((id, name), result) in names.into_iter().zip(results) {
            match result {
                Some(Ok(output)) => report.outputs.push(output),
                Some(Err(error)) => {
                    warn!("Failed to process {}: {}", name, error);
                    report.failures.push(ItemFailure { id, name, error });
                }
                None => {}
            }
        }

        info!(
            "Batch {} done: {} succeeded, {} failed",
            ticket.generation(),
            report.outputs.len(),
            report.failures.len()
        );

        Ok(report)
    }
}

async fn process_item(
    compositor: &Compositor,
    item: BatchItem,
    fields: &WatermarkFields,
    options: &RenderOptions,
) -> Result<RenderedOutput, ItemError> {
    let image = match item.source {
        ImageSource::Decoded(image) => image,
        ImageSource::Encoded(bytes) => {
            debug!("Decoding {} ({} bytes)", item.name, bytes.len());
            tokio::task::spawn_blocking(move || decode(&bytes))
                .await
                .map_err(|e| ItemError::TaskError(e.to_string()))??
        }
    };

    let output = compositor
        .render_output(item.id, &item.name, &image, fields, options)
        .await?;
    Ok(output)
}
