//! ブレークポイント操作のエラー
//!
//! どのエラーもデバッガセッションを中断しません。`Display` がそのままユーザー向けメッセージです。

use crate::breakpoint::BreakpointId;
use std::fmt;
use thiserror::Error;

/// 確認後に強制的に設定できるブレークポイント
///
/// 未登録のファイルを指定された場合に、後でロードされる可能性があるため保持しておきます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBreakpoint {
    /// ユーザーが指定したファイル名
    pub file: String,
    pub line: u32,
    pub condition: Option<String>,
}

/// 不正な条件式が検出された場面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionPhase {
    /// `break N if EXPR` での作成時
    Creation,
    /// 無効化されたブレークポイントの再有効化時
    Enable,
}

impl fmt::Display for ConditionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionPhase::Creation => write!(f, "breakpoint disabled"),
            ConditionPhase::Enable => write!(f, "breakpoint remains disabled"),
        }
    }
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LocationSyntax,
    LineOutOfRange,
    NotAStoppingPoint,
    UnknownSource,
    UnknownClass,
    UnknownMethod,
    ExpectingIf,
    ConditionSyntax,
    UnknownBreakpointId,
    EmptyRegistry,
    NoDefaultSource,
}

/// ブレークポイント操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakpointError {
    #[error("Invalid breakpoint location: {0}.")]
    InvalidLocation(String),

    #[error("There are only {line_count} lines in file \"{file}\".")]
    LineOutOfRange {
        file: String,
        line: u32,
        line_count: usize,
    },

    #[error("Line {line} is not a stopping point in file \"{file}\".")]
    NotAStoppingPoint { file: String, line: u32 },

    #[error("No source file named {}", .0.file)]
    UnknownSource(PendingBreakpoint),

    #[error("Unknown class {0}.")]
    UnknownClass(String),

    #[error("Unknown method {method} for class {class}.")]
    UnknownMethod { class: String, method: String },

    #[error("Expecting 'if' in breakpoint condition; got: {0}.")]
    ExpectingIf(String),

    #[error("Expression \"{expr}\" syntactically incorrect; {phase}.")]
    ConditionSyntax { expr: String, phase: ConditionPhase },

    #[error("Breakpoint {0} not found.")]
    UnknownBreakpointId(BreakpointId),

    #[error("No breakpoints have been set.")]
    EmptyRegistry,

    #[error("No default source file to set a breakpoint in.")]
    NoDefaultSource,
}

impl BreakpointError {
    /// エラーの分類を取得する
    pub fn kind(&self) -> ErrorKind {
        match self {
            BreakpointError::InvalidLocation(_) => ErrorKind::LocationSyntax,
            BreakpointError::LineOutOfRange { .. } => ErrorKind::LineOutOfRange,
            BreakpointError::NotAStoppingPoint { .. } => ErrorKind::NotAStoppingPoint,
            BreakpointError::UnknownSource(_) => ErrorKind::UnknownSource,
            BreakpointError::UnknownClass(_) => ErrorKind::UnknownClass,
            BreakpointError::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            BreakpointError::ExpectingIf(_) => ErrorKind::ExpectingIf,
            BreakpointError::ConditionSyntax { .. } => ErrorKind::ConditionSyntax,
            BreakpointError::UnknownBreakpointId(_) => ErrorKind::UnknownBreakpointId,
            BreakpointError::EmptyRegistry => ErrorKind::EmptyRegistry,
            BreakpointError::NoDefaultSource => ErrorKind::NoDefaultSource,
        }
    }

    /// ユーザーに「それでも設定するか」を確認すべき場合、その対象を返す
    pub fn pending(&self) -> Option<&PendingBreakpoint> {
        match self {
            BreakpointError::UnknownSource(pending) => Some(pending),
            _ => None,
        }
    }
}

/// ブレークポイント操作の結果型
pub type BreakpointResult<T> = std::result::Result<T, BreakpointError>;

/// 未登録ファイルへの設定を確認するプロンプト
pub const CONFIRM_UNKNOWN_SOURCE: &str = "Set breakpoint anyway? (y/n) ";

/// 全削除を確認するプロンプト
pub const CONFIRM_DELETE_ALL: &str = "Delete all breakpoints? (y/n) ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BreakpointError::InvalidLocation("foo".into()).to_string(),
            "Invalid breakpoint location: foo."
        );
        assert_eq!(
            BreakpointError::LineOutOfRange {
                file: "breakpoint1.rb".into(),
                line: 100,
                line_count: 19,
            }
            .to_string(),
            "There are only 19 lines in file \"breakpoint1.rb\"."
        );
        assert_eq!(
            BreakpointError::ConditionSyntax {
                expr: "b -=( 3".into(),
                phase: ConditionPhase::Enable,
            }
            .to_string(),
            "Expression \"b -=( 3\" syntactically incorrect; breakpoint remains disabled."
        );
        assert_eq!(
            BreakpointError::ConditionSyntax {
                expr: "b -=) 3".into(),
                phase: ConditionPhase::Creation,
            }
            .to_string(),
            "Expression \"b -=) 3\" syntactically incorrect; breakpoint disabled."
        );
    }

    #[test]
    fn test_unknown_source_carries_pending() {
        let err = BreakpointError::UnknownSource(PendingBreakpoint {
            file: "asf".into(),
            line: 324,
            condition: None,
        });
        assert_eq!(err.to_string(), "No source file named asf");
        assert_eq!(err.kind(), ErrorKind::UnknownSource);
        assert_eq!(err.pending().map(|p| p.line), Some(324));
        assert!(BreakpointError::EmptyRegistry.pending().is_none());
    }
}
