//! Shiori ソース情報
//!
//! このクレートは、デバッグ対象スクリプトのソース情報を提供します。
//! ソースファイルのキャッシュ、停止可能行の判定、クラス/メソッド名から定義行への解決などを行います。

pub mod source;
pub mod lines;
pub mod cache;
pub mod symbols;

pub use source::{FileSignature, SourceFile, SourceId};
pub use lines::{stopping_points, StoppingPoints};
pub use cache::{LineCache, SourceRegistry};
pub use symbols::{scan_methods, MethodIndex, MethodKind, MethodLocation, SymbolTable};

/// ソース情報処理の結果型
pub type Result<T> = anyhow::Result<T>;
