use super::ItemError;
use crate::compositor::RenderedOutput;
use crate::decode::DecodedImage;
use std::sync::Arc;
use uuid::Uuid;

/// Image data for one batch item: already decoded, or raw file bytes that the
/// batch decodes itself.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Decoded(DecodedImage),
    Encoded(Arc<[u8]>),
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: Uuid,
    pub name: String,
    pub source: ImageSource,
}

impl BatchItem {
    pub fn decoded(id: Uuid, name: impl Into<String>, image: DecodedImage) -> Self {
        Self {
            id,
            name: name.into(),
            source: ImageSource::Decoded(image),
        }
    }

    pub fn encoded(id: Uuid, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            name: name.into(),
            source: ImageSource::Encoded(bytes.into()),
        }
    }
}

/// Reported after each item finishes, successfully or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f32 / self.total as f32 * 100.0
    }
}

#[derive(Debug)]
pub struct ItemFailure {
    pub id: Uuid,
    pub name: String,
    pub error: ItemError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Nothing was selected.
    Empty,
    Completed,
    /// Some items failed, at least one succeeded.
    Partial,
    AllFailed,
}

/// Result of one batch: successful outputs in input order plus the failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub outputs: Vec<RenderedOutput>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        match (self.outputs.len(), self.failures.len()) {
            (0, 0) => BatchStatus::Empty,
            (0, _) => BatchStatus::AllFailed,
            (_, 0) => BatchStatus::Completed,
            _ => BatchStatus::Partial,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }

    /// One user-facing line summarising the batch.
    pub fn summary(&self) -> String {
        let failed = self.failed_names().join(", ");
        match self.status() {
            BatchStatus::Empty => "Chưa chọn ảnh nào.".to_string(),
            BatchStatus::Completed => {
                format!("Đã xử lý {} ảnh thành công.", self.succeeded())
            }
            BatchStatus::Partial => format!(
                "Đã xử lý {} ảnh thành công. Không thể xử lý ảnh: {}",
                self.succeeded(),
                failed
            ),
            BatchStatus::AllFailed => format!("Không thể xử lý ảnh: {}", failed),
        }
    }
}
