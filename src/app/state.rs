use meagle_uploader::api::{Annotation, AnnotationCount, AssetId, Folder, SmartFolder, TagCount};
use meagle_uploader::upload::{BatchProgress, DuplicateChoice, DuplicateReport, FileStatus};
use meagle_uploader::utils::byte_size::ByteSize;
use std::collections::HashSet;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
pub enum ActionProgress {
    #[default]
    NotStarted,
    Uploading {
        files: usize,
        progress: BatchProgress,
        failed: usize,
    },
    Deleting {
        total: usize,
        current: usize,
    },
    Completed {
        total: usize,
        successful: usize,
        failed: usize,
    },
}

/// A duplicate question waiting for the user's answer.
pub struct PendingDuplicate {
    pub report: DuplicateReport,
    pub reply: oneshot::Sender<DuplicateChoice>,
}

#[derive(Default)]
pub struct UploadState {
    pub progress: ActionProgress,
    pub current_file: Option<String>,
    pub file_statuses: Vec<FileStatus>,
    pub file_errors: Vec<String>,
    pub error_message: Option<String>,
    pub show_details: bool,
    pub is_uploading: bool,
    pub is_deleting: bool,
    pub pending_duplicate: Option<PendingDuplicate>,
}

impl UploadState {
    pub fn begin_upload(&mut self) {
        self.progress = ActionProgress::Uploading {
            files: 0,
            progress: BatchProgress::default(),
            failed: 0,
        };
        self.is_uploading = true;
        self.error_message = None;
        self.current_file = None;
        self.file_statuses.clear();
        self.file_errors.clear();
    }

    pub fn begin_delete(&mut self, total: usize) {
        self.progress = ActionProgress::Deleting { total, current: 0 };
        self.is_deleting = true;
        self.error_message = None;
    }

    pub fn record_progress(&mut self, update: BatchProgress) {
        if let ActionProgress::Uploading { progress, .. } = &mut self.progress {
            *progress = update;
        }
    }

    pub fn record_status(&mut self, status: FileStatus) {
        if let ActionProgress::Uploading { files, .. } = &mut self.progress {
            if !self.file_statuses.iter().any(|s| s.key() == status.key()) {
                *files += 1;
            }
        }
        self.current_file = Some(status.key().to_string());
        match self
            .file_statuses
            .iter_mut()
            .rev()
            .find(|s| s.key() == status.key())
        {
            Some(existing) => *existing = status,
            None => self.file_statuses.push(status),
        }
    }

    pub fn record_file_error(&mut self, message: String) {
        if let ActionProgress::Uploading { failed, .. } = &mut self.progress {
            *failed += 1;
        }
        self.file_errors.push(message);
    }

    pub fn finish(&mut self, total: usize, successful: usize, failed: usize) {
        self.progress = ActionProgress::Completed {
            total,
            successful,
            failed,
        };
        self.is_uploading = false;
        self.is_deleting = false;
        if failed > 0 {
            self.error_message = Some(format!(
                "Upload finished with {failed} failed file(s). Check details for more information."
            ));
        }
    }

    pub fn get_progress_percentage(&self) -> f32 {
        match &self.progress {
            ActionProgress::NotStarted => 0.0,
            ActionProgress::Uploading { progress, .. } => progress.percent as f32 / 100.0,
            ActionProgress::Deleting { total, current } => {
                if *total == 0 {
                    0.0
                } else {
                    (*current as f32) / (*total as f32)
                }
            }
            ActionProgress::Completed { .. } => 1.0,
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                files,
                progress,
                failed,
            } => format!(
                "Uploading: {} of {} | {} started | ❌ Failed: {}",
                ByteSize(progress.uploaded_bytes),
                ByteSize(progress.total_bytes),
                files,
                failed
            ),
            ActionProgress::Deleting { total, current } => {
                format!("Deleting: {}/{} assets", current, total)
            }
            ActionProgress::Completed {
                total,
                successful,
                failed,
            } => format!(
                "Final Status: {} files | ✅ Success: {} | ❌ Failed: {}",
                total, successful, failed
            ),
        }
    }
}

/// Sidebar data that is refreshed after every batch.
#[derive(Default)]
pub struct LibraryMeta {
    pub folders: Vec<Folder>,
    pub tags: Vec<TagCount>,
    pub notes: Vec<AnnotationCount>,
    pub smart_folders: Vec<SmartFolder>,
    pub selected_assets: HashSet<AssetId>,
    /// Asset whose notes are expanded in the list.
    pub note_asset: Option<AssetId>,
    pub asset_notes: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use meagle_uploader::upload::UploadStatus;

    fn status(name: &str, relative_path: &str, status: UploadStatus) -> FileStatus {
        FileStatus {
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            status,
        }
    }

    #[test]
    fn same_name_in_different_folders_gets_two_rows() {
        let mut state = UploadState::default();
        state.begin_upload();
        state.record_status(status("a.jpg", "day1/a.jpg", UploadStatus::Uploading));
        state.record_status(status("a.jpg", "day2/a.jpg", UploadStatus::Uploading));
        state.record_status(status("a.jpg", "day1/a.jpg", UploadStatus::Success));

        assert_eq!(state.file_statuses.len(), 2);
        assert_eq!(state.file_statuses[0].status, UploadStatus::Success);
        assert_eq!(state.file_statuses[1].status, UploadStatus::Uploading);
        assert!(matches!(state.progress, ActionProgress::Uploading { files: 2, .. }));
    }
}
