//! Shiori デバッガのコア機能
//!
//! このクレートは、ブレークポイントの中核となるロジックを提供します。
//! 位置指定の解決、条件式のコンパイルと評価、ブレークポイントの管理、
//! 停止判定、ソース変更の検知を統合します。

pub mod breakpoint;
pub mod command;
pub mod condition;
pub mod debugger;
pub mod errors;
pub mod expr_eval;
pub mod guard;
pub mod location;
pub mod parse;
pub mod report;
pub mod settings;
pub mod trigger;

pub use breakpoint::{Breakpoint, BreakpointId, BreakpointManager, HitCondition};
pub use command::{Command, CommandError};
pub use condition::Condition;
pub use debugger::{Created, Debugger};
pub use errors::{BreakpointError, BreakpointResult, ErrorKind, PendingBreakpoint};
pub use expr_eval::{Bindings, ExecutionContext, Value};
pub use location::Position;
pub use settings::{Setting, Settings};

// 他のクレートから使用するために再エクスポート
pub use shiori_source::SourceId;

/// デバッガの結果型
pub type Result<T> = anyhow::Result<T>;
