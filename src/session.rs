//! The working set of one watermarking session: selected images with their
//! previews, the current field values and the outputs of the last batch.

use crate::Config;
use crate::batch::{BatchError, BatchGeneration, BatchItem, BatchProgress, BatchReport, BatchRunner};
use crate::compositor::{Compositor, RenderOptions, RenderedOutput};
use crate::decode::{DecodedImage, PreviewHandle, PreviewStore, decode};
use crate::export::{self, ArchiveError, ExportError};
use crate::fields::WatermarkFields;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct SelectedImage {
    pub id: Uuid,
    pub name: String,
    pub image: DecodedImage,
    pub preview: PreviewHandle,
}

/// What the caller needs to show for one selected image.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEntry {
    pub id: Uuid,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub is_landscape: bool,
    pub preview_key: Uuid,
}

impl From<&SelectedImage> for SelectionEntry {
    fn from(selected: &SelectedImage) -> Self {
        Self {
            id: selected.id,
            name: selected.name.clone(),
            width: selected.image.width(),
            height: selected.image.height(),
            is_landscape: selected.image.is_landscape(),
            preview_key: selected.preview.key(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSummary {
    pub selected: Vec<SelectionEntry>,
    /// Files that could not be decoded.
    pub skipped: Vec<String>,
    /// Files beyond the selection limit, never looked at.
    pub dropped: usize,
}

#[derive(Default)]
struct SessionState {
    selection: Vec<SelectedImage>,
    fields: WatermarkFields,
    outputs: Vec<RenderedOutput>,
}

pub struct Session {
    runner: BatchRunner,
    generation: Arc<BatchGeneration>,
    previews: PreviewStore,
    state: RwLock<SessionState>,
    max_files: usize,
    options: RenderOptions,
}

impl Session {
    pub fn new(runner: BatchRunner, max_files: usize, options: RenderOptions) -> Self {
        Self {
            runner,
            generation: BatchGeneration::new(),
            previews: PreviewStore::new(),
            state: RwLock::new(SessionState {
                fields: WatermarkFields::now(),
                ..SessionState::default()
            }),
            max_files,
            options,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let compositor = Arc::new(Compositor::from_config(config));
        let runner = BatchRunner::new(compositor, config.render.concurrency);
        Self::new(
            runner,
            config.selection.max_files,
            RenderOptions {
                quality: config.render.quality,
            },
        )
    }

    /// Replace the selection. Any running batch is abandoned, previous outputs
    /// and previews are dropped and only the first `max_files` files are kept.
    pub async fn select_files(&self, files: Vec<(String, Vec<u8>)>) -> SelectionSummary {
        self.generation.invalidate();

        let dropped = files.len().saturating_sub(self.max_files);
        if dropped > 0 {
            warn!(
                "Only the first {} of {} files are used",
                self.max_files,
                files.len()
            );
        }

        let mut selection = Vec::new();
        let mut skipped = Vec::new();
        for (name, bytes) in files.into_iter().take(self.max_files) {
            let bytes: Arc<[u8]> = Arc::from(bytes);
            let data = Arc::clone(&bytes);
            let decoded = match tokio::task::spawn_blocking(move || decode(&data)).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match decoded {
                Ok(image) => {
                    debug!("Selected {} ({}x{})", name, image.width(), image.height());
                    selection.push(SelectedImage {
                        id: Uuid::new_v4(),
                        name,
                        image,
                        preview: self.previews.acquire(bytes),
                    });
                }
                Err(e) => {
                    warn!("Error loading image {}: {}", name, e);
                    skipped.push(name);
                }
            }
        }

        let summary = SelectionSummary {
            selected: selection.iter().map(SelectionEntry::from).collect(),
            skipped,
            dropped,
        };

        // Invalidate again under the lock: a batch begun while decoding ran
        // over the old selection and must not commit.
        let mut state = self.state.write().await;
        self.generation.invalidate();
        state.selection = selection;
        state.outputs.clear();
        info!(
            "Selection now holds {} images ({} skipped)",
            summary.selected.len(),
            summary.skipped.len()
        );

        summary
    }

    /// Drop one image from the selection. Returns false for unknown ids.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut state = self.state.write().await;
        let before = state.selection.len();
        state.selection.retain(|selected| selected.id != id);
        before != state.selection.len()
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        self.generation.invalidate();
        state.selection.clear();
        state.outputs.clear();
    }

    /// Abandon the running batch, if any.
    pub fn cancel(&self) {
        self.generation.invalidate();
    }

    pub async fn selection(&self) -> Vec<SelectionEntry> {
        let state = self.state.read().await;
        state.selection.iter().map(SelectionEntry::from).collect()
    }

    /// Original bytes of a selected image.
    pub async fn preview(&self, id: Uuid) -> Option<Arc<[u8]>> {
        let state = self.state.read().await;
        state
            .selection
            .iter()
            .find(|selected| selected.id == id)
            .and_then(|selected| selected.preview.bytes())
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub async fn set_fields(&self, fields: WatermarkFields) {
        self.state.write().await.fields = fields;
    }

    pub async fn fields(&self) -> WatermarkFields {
        self.state.read().await.fields.clone()
    }

    /// Render the whole selection with the current fields. Outputs are kept
    /// only if no newer batch or selection change happened meanwhile.
    pub async fn process<F>(&self, progress: F) -> Result<BatchReport, BatchError>
    where
        F: FnMut(BatchProgress) + Send,
    {
        let (ticket, items, fields) = {
            let mut state = self.state.write().await;
            let ticket = self.generation.begin();
            state.outputs.clear();
            let items: Vec<_> = state
                .selection
                .iter()
                .map(|selected| {
                    BatchItem::decoded(selected.id, selected.name.clone(), selected.image.clone())
                })
                .collect();
            (ticket, items, state.fields.clone())
        };

        let report = self
            .runner
            .process_all(items, &fields, &self.options, &ticket, progress)
            .await?;

        let mut state = self.state.write().await;
        if !ticket.is_current() {
            return Err(BatchError::Superseded);
        }
        state.outputs = report.outputs.clone();

        Ok(report)
    }

    pub async fn outputs(&self) -> Vec<RenderedOutput> {
        self.state.read().await.outputs.clone()
    }

    pub async fn export_one(&self, id: Uuid, dir: &Path) -> Result<PathBuf, ExportError> {
        let output = {
            let state = self.state.read().await;
            state
                .outputs
                .iter()
                .find(|output| output.id == id)
                .cloned()
                .ok_or(ExportError::NotFound)?
        };
        export::export_one(&output, dir).await
    }

    pub async fn export_all(&self, dir: &Path) -> Result<PathBuf, ArchiveError> {
        let outputs = self.outputs().await;
        export::export_all(&outputs, dir).await
    }
}
