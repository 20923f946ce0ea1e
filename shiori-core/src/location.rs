//! ブレークポイント位置の解決
//!
//! `10`、`file.rb:3`、`A#b`、`A.a` のような位置指定を、
//! ソース識別子と行番号の組に変換します。

use crate::errors::{BreakpointError, BreakpointResult, PendingBreakpoint};
use crate::guard;
use crate::settings::Settings;
use regex::Regex;
use shiori_source::{MethodIndex, MethodKind, MethodLocation, SourceId, SourceRegistry};
use std::sync::OnceLock;
use tracing::debug;

/// 位置指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSpec {
    /// 現在の停止位置
    Current,
    /// 現在のファイルの行番号: `10`
    Line(u32),
    /// ファイル名付きの行番号: `path:10`
    FileLine { file: String, line: u32 },
    /// メソッド: `Class#method` / `Class.method`
    Method {
        class: String,
        method: String,
        kind: MethodKind,
    },
}

/// `break` コマンドの引数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRequest {
    pub location: LocationSpec,
    /// `if` 以降の条件式テキスト
    pub condition: Option<String>,
}

/// ソース上の位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub source: SourceId,
    pub line: u32,
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("static regex is valid"))
}

fn file_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+):(\d+)$").expect("static regex is valid"))
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z]\w*(?:::[A-Z]\w*)*)([#.])([A-Za-z_]\w*[?!=]?)$")
            .expect("static regex is valid")
    })
}

fn if_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^if\s+(.+)$").expect("static regex is valid"))
}

/// 1トークンを位置指定として解釈する
pub fn parse_location(token: &str) -> Option<LocationSpec> {
    if line_re().is_match(token) {
        return token.parse().ok().map(LocationSpec::Line);
    }
    if let Some(caps) = file_line_re().captures(token) {
        let line = caps[2].parse().ok()?;
        return Some(LocationSpec::FileLine {
            file: caps[1].to_string(),
            line,
        });
    }
    if let Some(caps) = method_re().captures(token) {
        let kind = if &caps[2] == "#" {
            MethodKind::Instance
        } else {
            MethodKind::Singleton
        };
        return Some(LocationSpec::Method {
            class: caps[1].to_string(),
            method: caps[3].to_string(),
            kind,
        });
    }
    None
}

/// `break` コマンドの引数を位置指定と条件式に分割する
///
/// 位置指定の後ろには独立した `if` キーワードに続く条件式だけを置けます。
pub fn parse_break_args(args: &str) -> BreakpointResult<BreakRequest> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(BreakRequest {
            location: LocationSpec::Current,
            condition: None,
        });
    }

    let (first, rest) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (args, ""),
    };

    let (location, remainder) = match parse_location(first) {
        Some(location) => (Some(location), rest),
        None => (None, args),
    };

    let condition = if remainder.is_empty() {
        None
    } else if remainder == "if" {
        // 条件式が空。作成時の構文エラーとして扱う
        Some(String::new())
    } else if let Some(caps) = if_re().captures(remainder) {
        Some(caps[1].trim().to_string())
    } else if location.is_some() {
        return Err(BreakpointError::ExpectingIf(remainder.to_string()));
    } else {
        return Err(BreakpointError::InvalidLocation(remainder.to_string()));
    };

    Ok(BreakRequest {
        location: location.unwrap_or(LocationSpec::Current),
        condition,
    })
}

/// `Class#method` / `Class.method` の定義位置を索引から引く
pub fn resolve_method(
    methods: &dyn MethodIndex,
    class: &str,
    method: &str,
    kind: MethodKind,
) -> BreakpointResult<MethodLocation> {
    if !methods.has_class(class) {
        return Err(BreakpointError::UnknownClass(class.to_string()));
    }
    let found = match kind {
        MethodKind::Instance => methods.resolve_instance_method(class, method),
        MethodKind::Singleton => methods.resolve_class_method(class, method),
    };
    found.ok_or_else(|| BreakpointError::UnknownMethod {
        class: class.to_string(),
        method: method.to_string(),
    })
}

/// 位置解決器
pub struct LocationResolver<'a> {
    sources: &'a mut dyn SourceRegistry,
    methods: &'a dyn MethodIndex,
    settings: &'a Settings,
}

impl<'a> LocationResolver<'a> {
    /// 新しい位置解決器を作成する
    pub fn new(
        sources: &'a mut dyn SourceRegistry,
        methods: &'a dyn MethodIndex,
        settings: &'a Settings,
    ) -> Self {
        Self {
            sources,
            methods,
            settings,
        }
    }

    /// 位置指定を解決し、停止可能行であることを検証する
    ///
    /// `current` は現在デバッグ中の位置で、行番号のみの指定や位置省略時に使われます。
    pub fn resolve(
        &mut self,
        spec: &LocationSpec,
        current: Option<&Position>,
        condition: Option<&str>,
    ) -> BreakpointResult<Position> {
        let (source, line) = match spec {
            LocationSpec::Current => {
                let current = current.ok_or(BreakpointError::NoDefaultSource)?;
                (current.source.clone(), current.line)
            }
            LocationSpec::Line(line) => {
                let current = current.ok_or(BreakpointError::NoDefaultSource)?;
                (current.source.clone(), *line)
            }
            LocationSpec::FileLine { file, line } => match self.sources.resolve_path(file) {
                Some(source) => (source, *line),
                None => {
                    return Err(BreakpointError::UnknownSource(PendingBreakpoint {
                        file: file.clone(),
                        line: *line,
                        condition: condition.map(str::to_string),
                    }))
                }
            },
            LocationSpec::Method { class, method, kind } => {
                let location = resolve_method(self.methods, class, method, *kind)?;
                (location.source, location.line)
            }
        };

        self.validate(&source, line, condition)?;
        debug!("Resolved {:?} to {}:{}", spec, source, line);
        Ok(Position { source, line })
    }

    /// 行番号が範囲内かつ停止可能行であることを検証する
    fn validate(&mut self, source: &SourceId, line: u32, condition: Option<&str>) -> BreakpointResult<()> {
        guard::ensure_fresh(&mut *self.sources, source, self.settings);

        let Some(line_count) = self.sources.line_count(source) else {
            return Err(BreakpointError::UnknownSource(PendingBreakpoint {
                file: source.to_string(),
                line,
                condition: condition.map(str::to_string),
            }));
        };

        if line as usize > line_count {
            return Err(BreakpointError::LineOutOfRange {
                file: source.basename(),
                line,
                line_count,
            });
        }
        if !self.sources.is_stopping_point(source, line) {
            return Err(BreakpointError::NotAStoppingPoint {
                file: source.basename(),
                line,
            });
        }
        Ok(())
    }
}
