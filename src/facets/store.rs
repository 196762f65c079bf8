//! Filter state, visible assets and facet caches as one explicit store.
//!
//! Every filter change bumps a generation counter. Asynchronous results carry the
//! generation they were requested for and are dropped if a newer one exists.

use super::filter::{compute_options, FacetDimension, FacetOptions};
use crate::api::{AssetApi, AssetQuery, AssetRecord, FolderId};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FacetSnapshot {
    pub dimension: FacetDimension,
    pub options: FacetOptions,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    ToggleFormat(String),
    ToggleColor(String),
    ToggleTag(String),
    ToggleAnnotation(String),
    SelectFolder(Option<FolderId>),
    Search(String),
    ClearFilters,
    Refresh,
    /// Shows the assets of a saved smart folder; filters stay as they are.
    OpenSmartFolder(i64),
    AssetsLoaded {
        generation: u64,
        assets: Vec<AssetRecord>,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
    FacetComputed(FacetSnapshot),
}

/// Work the store asks its owner to perform; see [`run_effect`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchAssets {
        generation: u64,
        query: AssetQuery,
    },
    FetchSmartFolder {
        generation: u64,
        id: i64,
    },
    ComputeFacet {
        dimension: FacetDimension,
        generation: u64,
        filters: AssetQuery,
        visible: Vec<AssetRecord>,
    },
}

#[derive(Debug, Clone)]
pub struct LibraryStore {
    pub filters: AssetQuery,
    pub assets: Vec<AssetRecord>,
    pub formats: Option<FacetSnapshot>,
    pub colors: Option<FacetSnapshot>,
    pub notice: Option<String>,
    generation: u64,
    color_filter_threshold: f64,
}

impl LibraryStore {
    pub fn new(color_filter_threshold: f64) -> Self {
        Self {
            filters: AssetQuery::default(),
            assets: Vec::new(),
            formats: None,
            colors: None,
            notice: None,
            generation: 0,
            color_filter_threshold,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selected_folder(&self) -> Option<FolderId> {
        self.filters.folder_ids.first().copied()
    }

    pub fn facet(&self, dimension: FacetDimension) -> Option<&FacetSnapshot> {
        match dimension {
            FacetDimension::Format => self.formats.as_ref(),
            FacetDimension::Color => self.colors.as_ref(),
        }
    }

    pub fn apply(&mut self, event: StoreEvent) -> Vec<Effect> {
        match event {
            StoreEvent::ToggleFormat(format) => {
                toggle(&mut self.filters.formats, format.to_lowercase());
                self.refetch()
            }
            StoreEvent::ToggleColor(hex) => {
                toggle(&mut self.filters.colors, hex.to_lowercase());
                self.filters.color_threshold = (!self.filters.colors.is_empty())
                    .then_some(self.color_filter_threshold);
                self.refetch()
            }
            StoreEvent::ToggleTag(tag) => {
                toggle(&mut self.filters.tags, tag);
                self.refetch()
            }
            StoreEvent::ToggleAnnotation(text) => {
                toggle(&mut self.filters.annotations, text.to_lowercase());
                self.refetch()
            }
            StoreEvent::SelectFolder(folder) => {
                self.filters.folder_ids = folder.into_iter().collect();
                self.refetch()
            }
            StoreEvent::Search(text) => {
                let text = text.trim().to_string();
                self.filters.q = (!text.is_empty()).then_some(text);
                self.refetch()
            }
            StoreEvent::ClearFilters => {
                let folder = self.filters.folder_ids.clone();
                self.filters = AssetQuery {
                    folder_ids: folder,
                    ..AssetQuery::default()
                };
                self.refetch()
            }
            StoreEvent::Refresh => self.refetch(),
            StoreEvent::OpenSmartFolder(id) => {
                self.generation += 1;
                vec![Effect::FetchSmartFolder {
                    generation: self.generation,
                    id,
                }]
            }
            StoreEvent::AssetsLoaded { generation, assets } => {
                if generation != self.generation {
                    debug!("Dropping asset list for stale generation {}", generation);
                    return Vec::new();
                }
                self.assets = assets;
                self.notice = None;
                FacetDimension::ALL
                    .into_iter()
                    .map(|dimension| Effect::ComputeFacet {
                        dimension,
                        generation,
                        filters: self.filters.clone(),
                        visible: self.assets.clone(),
                    })
                    .collect()
            }
            StoreEvent::LoadFailed {
                generation,
                message,
            } => {
                if generation == self.generation {
                    self.notice = Some(format!("Could not load assets: {message}"));
                }
                Vec::new()
            }
            StoreEvent::FacetComputed(snapshot) => {
                if snapshot.generation != self.generation {
                    debug!(
                        "Dropping stale {:?} options (generation {} < {})",
                        snapshot.dimension, snapshot.generation, self.generation
                    );
                    return Vec::new();
                }
                match snapshot.dimension {
                    FacetDimension::Format => self.formats = Some(snapshot),
                    FacetDimension::Color => self.colors = Some(snapshot),
                }
                Vec::new()
            }
        }
    }

    fn refetch(&mut self) -> Vec<Effect> {
        self.generation += 1;
        vec![Effect::FetchAssets {
            generation: self.generation,
            query: self.filters.clone(),
        }]
    }
}

fn toggle(values: &mut Vec<String>, value: String) {
    if let Some(pos) = values.iter().position(|v| *v == value) {
        values.remove(pos);
    } else {
        values.push(value);
    }
}

/// Performs one effect against the backend and returns the event to feed back.
pub async fn run_effect(api: &dyn AssetApi, effect: Effect, color_threshold: f64) -> StoreEvent {
    match effect {
        Effect::FetchAssets { generation, query } => match api.list_assets(&query).await {
            Ok(assets) => StoreEvent::AssetsLoaded { generation, assets },
            Err(e) => {
                warn!("Asset listing failed: {}", e);
                StoreEvent::LoadFailed {
                    generation,
                    message: e.to_string(),
                }
            }
        },
        Effect::FetchSmartFolder { generation, id } => match api.smart_folder_assets(id).await {
            Ok(assets) => StoreEvent::AssetsLoaded { generation, assets },
            Err(e) => StoreEvent::LoadFailed {
                generation,
                message: e.to_string(),
            },
        },
        Effect::ComputeFacet {
            dimension,
            generation,
            filters,
            visible,
        } => {
            let options = compute_options(api, dimension, &filters, &visible, color_threshold).await;
            StoreEvent::FacetComputed(FacetSnapshot {
                dimension,
                options,
                generation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLibrary;

    fn library() -> FakeLibrary {
        let rows = [
            (1, "jpg", "#101010"),
            (2, "png", "#f0f0f0"),
            (3, "png", "#0f0f0f"),
        ];
        FakeLibrary::with_assets(
            rows.iter()
                .map(|(id, format, color)| {
                    let mut asset = FakeLibrary::asset(*id, &format!("{id}.{format}"), 1);
                    asset.format = Some(format.to_string());
                    asset.colors = vec![color.to_string()];
                    asset
                })
                .collect(),
        )
    }

    /// Runs effects to completion, feeding results back into the store.
    async fn settle(store: &mut LibraryStore, api: &FakeLibrary, effects: Vec<Effect>) {
        let mut queue = effects;
        while let Some(effect) = queue.pop() {
            let event = run_effect(api, effect, 28.0).await;
            queue.extend(store.apply(event));
        }
    }

    #[tokio::test]
    async fn toggling_a_format_refreshes_assets_and_both_facets() {
        let api = library();
        let mut store = LibraryStore::new(60.0);

        let effects = store.apply(StoreEvent::ToggleFormat("PNG".into()));
        assert_eq!(store.filters.formats, vec!["png".to_string()]);
        settle(&mut store, &api, effects).await;

        assert_eq!(store.assets.len(), 2);
        let formats = store.facet(FacetDimension::Format).unwrap();
        assert_eq!(
            formats.options,
            FacetOptions::Formats(vec!["jpg".into(), "png".into()])
        );
        let colors = store.facet(FacetDimension::Color).unwrap();
        assert_eq!(colors.options.len(), 2);
        assert_eq!(colors.generation, store.generation());
    }

    #[tokio::test]
    async fn stale_results_are_discarded() {
        let api = library();
        let mut store = LibraryStore::new(60.0);

        let first = store.apply(StoreEvent::ToggleFormat("jpg".into()));
        let second = store.apply(StoreEvent::ToggleFormat("jpg".into()));
        assert!(store.filters.formats.is_empty());

        // the older request resolves last and must not win
        settle(&mut store, &api, second).await;
        let fresh = store.formats.clone();
        let Effect::FetchAssets { generation, .. } = first[0].clone() else {
            panic!("expected a fetch");
        };
        let late = run_effect(&api, first[0].clone(), 28.0).await;
        assert!(store.apply(late).is_empty());
        assert_eq!(store.assets.len(), 3);

        let stale = store.apply(StoreEvent::FacetComputed(FacetSnapshot {
            dimension: FacetDimension::Format,
            options: FacetOptions::Formats(vec!["stale".into()]),
            generation,
        }));
        assert!(stale.is_empty());
        assert_eq!(store.formats, fresh);
    }

    #[tokio::test]
    async fn color_selection_carries_the_filter_threshold() {
        let mut store = LibraryStore::new(45.0);
        store.apply(StoreEvent::ToggleColor("#0F0F0F".into()));
        assert_eq!(store.filters.colors, vec!["#0f0f0f".to_string()]);
        assert_eq!(store.filters.color_threshold, Some(45.0));

        store.apply(StoreEvent::ToggleColor("#0f0f0f".into()));
        assert!(store.filters.colors.is_empty());
        assert_eq!(store.filters.color_threshold, None);
    }

    #[tokio::test]
    async fn load_failure_sets_a_notice() {
        let api = library();
        api.fail_listing();
        let mut store = LibraryStore::new(60.0);
        let effects = store.apply(StoreEvent::SelectFolder(Some(1)));
        settle(&mut store, &api, effects).await;

        assert_eq!(store.selected_folder(), Some(1));
        assert!(store.notice.as_deref().unwrap().starts_with("Could not load assets"));
    }

    #[tokio::test]
    async fn smart_folder_lists_its_saved_query() {
        let api = library();
        let query = AssetQuery {
            formats: vec!["png".into()],
            ..AssetQuery::default()
        };
        let saved = api.create_smart_folder("pngs", &query).await.unwrap();
        let mut store = LibraryStore::new(60.0);

        let effects = store.apply(StoreEvent::OpenSmartFolder(saved.id));
        assert_eq!(store.generation(), 1);
        settle(&mut store, &api, effects).await;

        assert_eq!(store.assets.len(), 2);
        assert!(store.assets.iter().all(|a| a.format.as_deref() == Some("png")));

        let effects = store.apply(StoreEvent::OpenSmartFolder(saved.id + 100));
        settle(&mut store, &api, effects).await;
        assert!(store.notice.is_some());
    }

    #[test]
    fn clearing_filters_keeps_the_folder() {
        let mut store = LibraryStore::new(60.0);
        store.apply(StoreEvent::SelectFolder(Some(4)));
        store.apply(StoreEvent::ToggleFormat("jpg".into()));
        store.apply(StoreEvent::ToggleTag("beach".into()));
        store.apply(StoreEvent::ToggleAnnotation("Sunset".into()));
        store.apply(StoreEvent::Search("  dune ".into()));
        assert_eq!(store.filters.annotations, vec!["sunset".to_string()]);
        assert_eq!(store.filters.q.as_deref(), Some("dune"));
        store.apply(StoreEvent::ClearFilters);

        assert_eq!(store.filters, AssetQuery::in_folder(4));
        assert_eq!(store.generation(), 6);
    }
}
