//! パース関連のユーティリティ関数

use crate::breakpoint::BreakpointId;
use crate::condition::parse_expression;
use crate::expr_eval::{evaluate, Bindings, Value};
use anyhow::Result;

/// ブレークポイント番号をパース
///
/// # Examples
/// ```
/// use shiori_core::parse::parse_breakpoint_id;
///
/// assert_eq!(parse_breakpoint_id("3").unwrap(), 3);
/// assert!(parse_breakpoint_id("foo").is_err());
/// ```
pub fn parse_breakpoint_id(s: &str) -> Result<BreakpointId> {
    let s = s.trim();
    s.parse::<BreakpointId>()
        .map_err(|e| anyhow::anyhow!("Invalid breakpoint number '{}': {}", s, e))
}

/// リテラル文字列を値に変換する
///
/// `5`、`-1.5`、`"abc"`、`true`、`nil` などを解釈し、
/// 解釈できなければ文字列そのものを値とします。
pub fn parse_value(s: &str) -> Value {
    let s = s.trim();
    parse_expression(s)
        .ok()
        .and_then(|expr| evaluate(&expr, &Bindings::new()).ok())
        .unwrap_or_else(|| Value::Str(s.to_string()))
}

/// `name=value` 形式の変数束縛をパース
///
/// # Examples
/// ```
/// use shiori_core::parse::parse_binding;
/// use shiori_core::Value;
///
/// assert_eq!(parse_binding("b=5").unwrap(), ("b".to_string(), Value::Int(5)));
/// ```
pub fn parse_binding(s: &str) -> Result<(String, Value)> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid binding '{}': expected name=value", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow::anyhow!("Invalid binding '{}': empty variable name", s));
    }
    Ok((name.to_string(), parse_value(value)))
}

/// 変数束縛の並びから実行コンテキストを作成する
pub fn parse_bindings<S: AsRef<str>>(items: &[S]) -> Result<Bindings> {
    let mut bindings = Bindings::new();
    for item in items {
        let (name, value) = parse_binding(item.as_ref())?;
        bindings.set(name, value);
    }
    Ok(bindings)
}
