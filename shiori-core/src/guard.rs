//! ソース変更の検知

use crate::settings::Settings;
use shiori_source::{SourceId, SourceRegistry};
use tracing::{info, warn};

/// ソースの行情報がディスク上の内容と一致するよう必要に応じて読み直す
///
/// `autoreload` が無効なら何もしません。既存ブレークポイントの行は変更せず、
/// 以降の位置解決だけに影響します。読み直した場合に `true` を返します。
pub fn ensure_fresh(registry: &mut dyn SourceRegistry, id: &SourceId, settings: &Settings) -> bool {
    if !settings.autoreload || !registry.is_stale(id) {
        return false;
    }

    info!("{} changed on disk, reloading", id);
    match registry.reload(id) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to reload {}: {}", id, e);
            false
        }
    }
}
