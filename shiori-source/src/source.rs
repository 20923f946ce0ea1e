//! ソースファイル情報

use crate::lines::{stopping_points, StoppingPoints};
use crate::Result;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// ソースの識別子（正規化された絶対パス）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(PathBuf);

impl SourceId {
    /// 絶対パスから識別子を作成する
    ///
    /// 相対パスが渡された場合はカレントディレクトリを基準に絶対パス化します。
    /// ファイルの存在は確認しません。
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            Self(path.to_path_buf())
        } else {
            let base = std::env::current_dir().unwrap_or_default();
            Self(base.join(path))
        }
    }

    /// 既存ファイルのパスを正規化して識別子を作成する
    pub fn canonicalize<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path)
            .map_err(|e| anyhow::anyhow!("Failed to resolve path {:?}: {}", path, e))?;
        Ok(Self(canonical))
    }

    /// フルパスを取得する
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// ファイル名部分を取得する（取得できなければフルパス）
    pub fn basename(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.display().to_string())
    }

    /// 表示用の名前を取得する
    pub fn display_name(&self, basename: bool) -> String {
        if basename {
            self.basename()
        } else {
            self.0.display().to_string()
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// ファイルの変更検知用シグネチャ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileSignature {
    /// ディスク上のファイルからシグネチャを読み取る
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)
            .map_err(|e| anyhow::anyhow!("Failed to stat {:?}: {}", path, e))?;
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

/// キャッシュされたソースファイル
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    pub lines: Vec<String>,
    pub stopping_points: StoppingPoints,
    /// ディスクから読んだ場合のみ持つ
    pub signature: Option<FileSignature>,
}

impl SourceFile {
    /// ディスクからソースファイルを読み込む
    pub fn read(id: SourceId) -> Result<Self> {
        let text = fs::read_to_string(id.path())
            .map_err(|e| anyhow::anyhow!("Failed to read file {:?}: {}", id.path(), e))?;
        let signature = FileSignature::read(id.path())?;
        let mut file = Self::from_text(id, &text);
        file.signature = Some(signature);
        Ok(file)
    }

    /// メモリ上のテキストからソースファイルを作成する
    pub fn from_text(id: SourceId, text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let stopping_points = stopping_points(&lines);
        Self {
            id,
            lines,
            stopping_points,
            signature: None,
        }
    }

    /// 行数を取得する
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 指定行（1始まり）のテキストを取得する
    pub fn line(&self, line: u32) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    /// 指定行が停止可能行かどうか
    pub fn is_stopping_point(&self, line: u32) -> bool {
        self.stopping_points.contains(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_and_display() {
        let id = SourceId::new("/tmp/scripts/breakpoint1.rb");
        assert_eq!(id.basename(), "breakpoint1.rb");
        assert_eq!(id.display_name(true), "breakpoint1.rb");
        assert_eq!(id.display_name(false), "/tmp/scripts/breakpoint1.rb");
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let id = SourceId::new("relative/script.rb");
        assert!(id.path().is_absolute());
        assert!(id.path().ends_with("relative/script.rb"));
    }

    #[test]
    fn test_from_text_lines() {
        let file = SourceFile::from_text(SourceId::new("/a.rb"), "x = 1\n\ny = 2\n");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line(1), Some("x = 1"));
        assert_eq!(file.line(0), None);
        assert_eq!(file.line(4), None);
        assert!(file.is_stopping_point(1));
        assert!(!file.is_stopping_point(2));
        assert!(file.is_stopping_point(3));
    }
}
