//! Online grouping of asset color swatches into a handful of representative buckets.

use crate::api::AssetRecord;
use crate::utils::color::Rgb;

pub const DEFAULT_THRESHOLD: f64 = 28.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ColorGroup {
    pub centroid: Rgb,
    pub hex: String,
    pub count: usize,
}

impl ColorGroup {
    fn seeded(sample: Rgb) -> Self {
        Self {
            centroid: sample,
            hex: sample.to_hex(),
            count: 1,
        }
    }

    /// Folds `sample` into the running mean, rounding each channel on every update.
    fn absorb(&mut self, sample: Rgb) {
        self.count += 1;
        let n = self.count as f64;
        let mean = |old: u8, new: u8| ((old as f64 * (n - 1.0) + new as f64) / n).round() as u8;
        self.centroid = Rgb::new(
            mean(self.centroid.r, sample.r),
            mean(self.centroid.g, sample.g),
            mean(self.centroid.b, sample.b),
        );
        self.hex = self.centroid.to_hex();
    }
}

/// Clusters every swatch of `assets`, largest groups first.
pub fn cluster<'a>(
    assets: impl IntoIterator<Item = &'a AssetRecord>,
    threshold: f64,
) -> Vec<ColorGroup> {
    cluster_swatches(
        assets
            .into_iter()
            .flat_map(|asset| asset.colors.iter().map(String::as_str)),
        threshold,
    )
}

/// Single pass: each swatch joins the nearest group within `threshold` or starts a new one.
/// Groups are never merged afterwards. Malformed hex values are ignored.
pub fn cluster_swatches<'a>(
    swatches: impl IntoIterator<Item = &'a str>,
    threshold: f64,
) -> Vec<ColorGroup> {
    let mut groups: Vec<ColorGroup> = Vec::new();

    for sample in swatches.into_iter().filter_map(Rgb::from_hex) {
        let nearest = groups
            .iter()
            .enumerate()
            .map(|(idx, group)| (idx, group.centroid.distance(sample)))
            .fold(None, |best: Option<(usize, f64)>, (idx, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((idx, dist)),
            });

        match nearest {
            Some((idx, dist)) if dist <= threshold => groups[idx].absorb(sample),
            _ => groups.push(ColorGroup::seeded(sample)),
        }
    }

    // stable: equal counts keep first-seen order
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}
