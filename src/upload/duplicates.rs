//! Name-collision check for flat uploads into a folder.

use super::types::FileDescriptor;
use crate::api::{AssetApi, AssetId, AssetQuery, AssetRecord, FolderId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateReport {
    /// Distinct candidate names (case-insensitive) already present in the folder.
    pub count: usize,
    /// The first few colliding names, in candidate order.
    pub sample: Vec<String>,
    /// Every existing record whose name collided.
    pub affected_asset_ids: Vec<AssetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateChoice {
    KeepBoth,
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DuplicateDecision {
    SkipCheck,
    KeepBoth,
    Replace(Vec<AssetId>),
}

/// Asks the user what to do about colliding names.
#[async_trait]
pub trait DuplicatePrompt: Send + Sync {
    async fn choose(&self, report: &DuplicateReport) -> DuplicateChoice;
}

/// Directory uploads keep their structure as-is and are never checked.
pub fn needs_check(candidates: &[FileDescriptor]) -> bool {
    !candidates.iter().any(FileDescriptor::is_nested)
}

/// Matches candidate names against the existing folder contents, ignoring case.
pub fn find_collisions(
    existing: &[AssetRecord],
    candidates: &[FileDescriptor],
) -> Option<DuplicateReport> {
    let mut index: HashMap<String, Vec<AssetId>> = HashMap::new();
    for asset in existing {
        index
            .entry(asset.filename.to_lowercase())
            .or_default()
            .push(asset.id);
    }

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut affected_asset_ids = Vec::new();
    for candidate in candidates {
        let key = candidate.name.to_lowercase();
        if let Some(ids) = index.get(&key) {
            if seen.insert(key) {
                names.push(candidate.name.clone());
                affected_asset_ids.extend(ids.iter().copied());
            }
        }
    }

    if names.is_empty() {
        return None;
    }
    Some(DuplicateReport {
        count: names.len(),
        sample: names.into_iter().take(SAMPLE_SIZE).collect(),
        affected_asset_ids,
    })
}

/// Looks for name collisions in `folder_id` and, if there are any, lets `prompt` decide.
/// A failed listing degrades to `SkipCheck`.
pub async fn check(
    api: &dyn AssetApi,
    folder_id: FolderId,
    candidates: &[FileDescriptor],
    prompt: &dyn DuplicatePrompt,
) -> DuplicateDecision {
    if candidates.is_empty() || !needs_check(candidates) {
        return DuplicateDecision::SkipCheck;
    }

    let existing = match api.list_assets(&AssetQuery::in_folder(folder_id)).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!("Duplicate check skipped, folder listing failed: {}", e);
            return DuplicateDecision::SkipCheck;
        }
    };

    let Some(report) = find_collisions(&existing, candidates) else {
        return DuplicateDecision::SkipCheck;
    };
    info!(
        "{} duplicate names in folder {}: {:?}",
        report.count, folder_id, report.sample
    );

    match prompt.choose(&report).await {
        DuplicateChoice::KeepBoth => DuplicateDecision::KeepBoth,
        DuplicateChoice::Replace => DuplicateDecision::Replace(report.affected_asset_ids),
    }
}

/// Carries out a `Replace` decision. Failures are logged and counted but never stop
/// the upload that follows. Returns the number of records that could not be deleted.
pub async fn apply(api: &dyn AssetApi, decision: &DuplicateDecision) -> usize {
    let DuplicateDecision::Replace(ids) = decision else {
        return 0;
    };

    let mut failed = 0;
    for id in ids {
        if let Err(e) = api.delete_asset(*id).await {
            warn!("Could not remove superseded asset {}: {}", id, e);
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, FakeLibrary, FixedPrompt};

    fn existing(names: &[(&str, AssetId)]) -> Vec<AssetRecord> {
        names
            .iter()
            .map(|(name, id)| FakeLibrary::asset(*id, name, 9))
            .collect()
    }

    #[test]
    fn reports_count_and_sample_case_insensitively() {
        let folder = existing(&[("A.JPG", 1), ("a.jpg", 2), ("other.png", 3)]);
        let candidates = vec![descriptor("a.jpg", "", 10), descriptor("b.png", "", 10)];

        let report = find_collisions(&folder, &candidates).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.sample, vec!["a.jpg".to_string()]);
        assert_eq!(report.affected_asset_ids, vec![1, 2]);
    }

    #[test]
    fn sample_is_truncated_to_five() {
        let names: Vec<String> = (0..8).map(|i| format!("{i}.jpg")).collect();
        let folder: Vec<AssetRecord> = names
            .iter()
            .enumerate()
            .map(|(i, n)| FakeLibrary::asset(i as AssetId, n, 9))
            .collect();
        let candidates: Vec<_> = names.iter().map(|n| descriptor(n, "", 1)).collect();

        let report = find_collisions(&folder, &candidates).unwrap();
        assert_eq!(report.count, 8);
        assert_eq!(report.sample.len(), 5);
        assert_eq!(report.sample[0], "0.jpg");
    }

    #[test]
    fn nested_candidates_bypass_the_check() {
        assert!(needs_check(&[descriptor("a.jpg", "", 1)]));
        assert!(!needs_check(&[
            descriptor("a.jpg", "", 1),
            descriptor("b.jpg", "trip/b.jpg", 1)
        ]));
    }

    #[tokio::test]
    async fn directory_uploads_never_prompt() {
        let library = FakeLibrary::with_assets(existing(&[("a.jpg", 1)]));
        let prompt = FixedPrompt::new(DuplicateChoice::Replace);
        let candidates = vec![descriptor("a.jpg", "trip/a.jpg", 1)];

        let decision = check(&library, 9, &candidates, &prompt).await;
        assert_eq!(decision, DuplicateDecision::SkipCheck);
        assert_eq!(prompt.asked(), 0);
    }

    #[tokio::test]
    async fn replace_returns_every_colliding_record() {
        let library = FakeLibrary::with_assets(existing(&[("a.jpg", 1), ("A.jpg", 2)]));
        let prompt = FixedPrompt::new(DuplicateChoice::Replace);
        let candidates = vec![descriptor("a.jpg", "", 1), descriptor("b.png", "", 1)];

        let decision = check(&library, 9, &candidates, &prompt).await;
        assert_eq!(decision, DuplicateDecision::Replace(vec![1, 2]));
        assert_eq!(prompt.asked(), 1);
    }

    #[tokio::test]
    async fn listing_failure_skips_the_check() {
        let library = FakeLibrary::with_assets(existing(&[("a.jpg", 1)]));
        library.fail_listing();
        let prompt = FixedPrompt::new(DuplicateChoice::Replace);

        let decision = check(&library, 9, &[descriptor("a.jpg", "", 1)], &prompt).await;
        assert_eq!(decision, DuplicateDecision::SkipCheck);
        assert_eq!(prompt.asked(), 0);
    }

    #[tokio::test]
    async fn cleanup_failures_are_counted_not_raised() {
        let library = FakeLibrary::with_assets(existing(&[("a.jpg", 1), ("a.jpg", 2)]));
        library.fail_delete_of(1);

        let failed = apply(&library, &DuplicateDecision::Replace(vec![1, 2])).await;
        assert_eq!(failed, 1);
        let remaining: Vec<_> = library.assets().iter().map(|a| a.id).collect();
        assert_eq!(remaining, vec![1]);
    }
}
