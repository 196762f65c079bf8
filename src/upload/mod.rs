pub mod collector;
pub mod duplicates;
mod pipeline;
mod scheduler;
mod types;

pub use collector::{collect, DropEntry, DropPayload, DroppedItem};
pub use duplicates::{DuplicateChoice, DuplicateDecision, DuplicatePrompt, DuplicateReport};
pub use pipeline::{IngestPipeline, IngestReport, IngestRequest};
pub use scheduler::{BatchObserver, UploadScheduler};
pub use types::{
    BatchOutcome, BatchProgress, FileDescriptor, FileHandle, FileStatus, UploadBatch, UploadStatus,
};
