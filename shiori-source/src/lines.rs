//! 停止可能行の判定

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// 停止可能行の集合（1始まりの行番号）
pub type StoppingPoints = BTreeSet<u32>;

/// 単独では実行されないキーワード・閉じ括弧だけの行
fn non_executable_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:end|else|ensure|begin|then|do|[})\]])\s*(?:#.*)?$")
            .expect("static regex is valid")
    })
}

/// ソース行から停止可能行を求める
///
/// 空行、コメントのみの行、`=begin`〜`=end` のブロックコメント、
/// `end` や閉じ括弧だけの行は停止可能行に含めません。
pub fn stopping_points<S: AsRef<str>>(lines: &[S]) -> StoppingPoints {
    let mut points = BTreeSet::new();
    let mut in_block_comment = false;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let trimmed = line.trim();

        if in_block_comment {
            if line.starts_with("=end") {
                in_block_comment = false;
            }
            continue;
        }
        if line.starts_with("=begin") {
            in_block_comment = true;
            continue;
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if non_executable_line().is_match(line) {
            continue;
        }

        points.insert(index as u32 + 1);
    }

    points
}
