//! Option lists for the format and color filter panels.

use super::color::{cluster, ColorGroup};
use crate::api::{AssetApi, AssetQuery, AssetRecord};
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetDimension {
    Format,
    Color,
}

impl FacetDimension {
    pub const ALL: [FacetDimension; 2] = [FacetDimension::Format, FacetDimension::Color];

    pub fn is_active(self, filters: &AssetQuery) -> bool {
        match self {
            FacetDimension::Format => !filters.formats.is_empty(),
            FacetDimension::Color => !filters.colors.is_empty(),
        }
    }

    /// `filters` minus this dimension's own selection.
    pub fn exclude_from(self, filters: &AssetQuery) -> AssetQuery {
        let mut query = filters.clone();
        match self {
            FacetDimension::Format => query.formats.clear(),
            FacetDimension::Color => {
                query.colors.clear();
                query.color_threshold = None;
            }
        }
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FacetOptions {
    Formats(Vec<String>),
    Colors(Vec<ColorGroup>),
}

impl FacetOptions {
    pub fn empty(dimension: FacetDimension) -> Self {
        match dimension {
            FacetDimension::Format => FacetOptions::Formats(Vec::new()),
            FacetDimension::Color => FacetOptions::Colors(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FacetOptions::Formats(formats) => formats.len(),
            FacetOptions::Colors(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct lowercase formats, sorted.
pub fn format_options(assets: &[AssetRecord]) -> Vec<String> {
    assets
        .iter()
        .filter_map(|asset| asset.format.as_deref())
        .map(|format| format.trim().to_lowercase())
        .filter(|format| !format.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn options_from(
    dimension: FacetDimension,
    assets: &[AssetRecord],
    color_threshold: f64,
) -> FacetOptions {
    match dimension {
        FacetDimension::Format => FacetOptions::Formats(format_options(assets)),
        FacetDimension::Color => FacetOptions::Colors(cluster(assets, color_threshold)),
    }
}

/// Options for `dimension`. When the dimension has a selection of its own, the library is
/// re-queried without it so sibling values stay visible; otherwise `visible` is used as-is.
/// A failed re-query yields an empty option list.
pub async fn compute_options(
    api: &dyn AssetApi,
    dimension: FacetDimension,
    filters: &AssetQuery,
    visible: &[AssetRecord],
    color_threshold: f64,
) -> FacetOptions {
    if !dimension.is_active(filters) {
        return options_from(dimension, visible, color_threshold);
    }

    match api.list_assets(&dimension.exclude_from(filters)).await {
        Ok(assets) => options_from(dimension, &assets, color_threshold),
        Err(e) => {
            warn!("{:?} options unavailable: {}", dimension, e);
            FacetOptions::empty(dimension)
        }
    }
}
