//! ユーザー向け表示の整形

use crate::breakpoint::Breakpoint;
use crate::settings::Settings;
use std::fmt::Write;

/// 作成時のメッセージ: `Breakpoint 1 file /path/to/x.rb, line 10`
pub fn format_created(bp: &Breakpoint, settings: &Settings) -> String {
    format!(
        "Breakpoint {} file {}, line {}",
        bp.id,
        bp.source.display_name(settings.basename),
        bp.line
    )
}

/// 停止時のメッセージ: `Breakpoint 1 at x.rb:14`
pub fn format_hit(bp: &Breakpoint, settings: &Settings) -> String {
    format!(
        "Breakpoint {} at {}:{}",
        bp.id,
        bp.source.display_name(settings.basename),
        bp.line
    )
}

/// `info breakpoints` の一覧
pub fn format_listing<'a>(
    breakpoints: impl IntoIterator<Item = &'a Breakpoint>,
    settings: &Settings,
) -> String {
    let mut out = String::new();
    let mut any = false;

    for bp in breakpoints {
        if !any {
            out.push_str("Num Enb What\n");
            any = true;
        }
        let _ = write!(
            out,
            "{:>3} {}   at {}:{}",
            bp.id,
            if bp.enabled { 'y' } else { 'n' },
            bp.source.display_name(settings.basename),
            bp.line
        );
        if let Some(expr) = bp.expr() {
            let _ = write!(out, " if {}", expr);
        }
        out.push('\n');

        if bp.hit_count > 0 {
            let plural = if bp.hit_count > 1 { "s" } else { "" };
            let _ = writeln!(out, "\tbreakpoint already hit {} time{}", bp.hit_count, plural);
        }
    }

    if !any {
        out.push_str("No breakpoints.\n");
    }
    out
}
