//! ソースファイルキャッシュ

use crate::source::{FileSignature, SourceFile, SourceId};
use crate::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// ソースレジストリ
///
/// ブレークポイントの位置解決が参照する、パスと行情報の提供元です。
pub trait SourceRegistry {
    /// パス文字列をソース識別子に解決する
    fn resolve_path(&self, text: &str) -> Option<SourceId>;

    /// ソースの行数を取得する
    fn line_count(&self, id: &SourceId) -> Option<usize>;

    /// 指定行が停止可能行かどうか
    fn is_stopping_point(&self, id: &SourceId, line: u32) -> bool;

    /// ディスク上の内容がキャッシュ時点から変更されているかどうか
    fn is_stale(&self, id: &SourceId) -> bool;

    /// ソースを読み直して行情報を再構築する
    fn reload(&mut self, id: &SourceId) -> Result<()>;
}

/// パスから行単位の内容へのキャッシュ
#[derive(Debug, Default)]
pub struct LineCache {
    files: HashMap<SourceId, SourceFile>,
}

impl LineCache {
    /// 空のキャッシュを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// ファイルを読み込んでキャッシュに登録する
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<SourceId> {
        let id = SourceId::canonicalize(path)?;
        let file = SourceFile::read(id.clone())?;
        info!(
            "Cached {} ({} lines, {} stopping points)",
            id,
            file.line_count(),
            file.stopping_points.len()
        );
        self.files.insert(id.clone(), file);
        Ok(id)
    }

    /// メモリ上のテキストをキャッシュに登録する
    ///
    /// ディスク上のファイルと結びつかないため、変更検知の対象になりません。
    pub fn insert_text(&mut self, id: SourceId, text: &str) {
        let file = SourceFile::from_text(id.clone(), text);
        self.files.insert(id, file);
    }

    /// キャッシュ済みのソースを取得する
    pub fn get(&self, id: &SourceId) -> Option<&SourceFile> {
        self.files.get(id)
    }
}

impl SourceRegistry for LineCache {
    fn resolve_path(&self, text: &str) -> Option<SourceId> {
        // 完全一致を優先
        let exact = SourceId::new(text);
        if self.files.contains_key(&exact) {
            return Some(exact);
        }

        // 正規化したパスで照合
        let canonical = SourceId::canonicalize(text).ok()?;
        if self.files.contains_key(&canonical) {
            Some(canonical)
        } else {
            debug!("No cached source for '{}'", text);
            None
        }
    }

    fn line_count(&self, id: &SourceId) -> Option<usize> {
        self.files.get(id).map(SourceFile::line_count)
    }

    fn is_stopping_point(&self, id: &SourceId, line: u32) -> bool {
        self.files
            .get(id)
            .map(|file| file.is_stopping_point(line))
            .unwrap_or(false)
    }

    fn is_stale(&self, id: &SourceId) -> bool {
        let Some(cached) = self.files.get(id).and_then(|file| file.signature) else {
            return false;
        };
        match FileSignature::read(id.path()) {
            Ok(current) => current != cached,
            // 削除されたファイルは読み直せないため、キャッシュを使い続ける
            Err(_) => false,
        }
    }

    fn reload(&mut self, id: &SourceId) -> Result<()> {
        let file = SourceFile::read(id.clone())?;
        info!(
            "Reloaded {} ({} lines, {} stopping points)",
            id,
            file.line_count(),
            file.stopping_points.len()
        );
        self.files.insert(id.clone(), file);
        Ok(())
    }
}
