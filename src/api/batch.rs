use super::{AssetApi, AssetId};
use crate::error::Result;
use tracing::info;

/// Deletes `ids` one after another. `on_progress(done, total)` is called after each
/// deletion; the first failure stops the loop and is returned, leaving earlier
/// deletions applied.
pub async fn delete_assets(
    api: &dyn AssetApi,
    ids: &[AssetId],
    mut on_progress: impl FnMut(usize, usize),
) -> Result<usize> {
    let total = ids.len();
    info!("Deleting {} assets", total);
    for (done, id) in ids.iter().enumerate() {
        api.delete_asset(*id).await?;
        on_progress(done + 1, total);
    }
    Ok(total)
}
