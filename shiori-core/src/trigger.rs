//! 停止判定

use crate::breakpoint::{Breakpoint, BreakpointManager};
use crate::expr_eval::{evaluate_truthy, ExecutionContext};
use shiori_source::SourceId;
use tracing::debug;

/// 到達した位置で停止すべきかを判定する
///
/// 指定位置のブレークポイントを作成順に調べ、有効かつ条件が成立したもののヒット回数を
/// 1だけ増やします。ヒット条件も満たした最初の1つを返します。
/// 無効なもの、条件が偽または評価に失敗したものはヒット回数を変更しません。
pub fn should_stop<'a>(
    manager: &'a mut BreakpointManager,
    source: &SourceId,
    line: u32,
    ctx: &dyn ExecutionContext,
) -> Option<&'a Breakpoint> {
    let mut fired = None;

    for id in manager.find_ids(source, line) {
        let Some(bp) = manager.get_mut(id) else {
            continue;
        };
        if !bp.enabled || !condition_holds(bp, ctx) {
            continue;
        }

        bp.hit_count += 1;
        if bp.hit_condition.allows(bp.hit_count, bp.hit_value) {
            fired = Some(id);
            break;
        }
        debug!(
            "Breakpoint {} reached (hit {}), hit condition not met",
            bp.id, bp.hit_count
        );
    }

    let bp = manager.get(fired?)?;
    debug!("Breakpoint {} triggered at {}:{} (hit {})", bp.id, source, line, bp.hit_count);
    Some(bp)
}

/// 条件がないか、現在のスコープで真と評価されるかどうか
fn condition_holds(bp: &Breakpoint, ctx: &dyn ExecutionContext) -> bool {
    let Some(condition) = &bp.condition else {
        return true;
    };
    let Some(expr) = condition.expression() else {
        debug!("Breakpoint {} has an invalid condition '{}'", bp.id, condition.text());
        return false;
    };
    match evaluate_truthy(expr, ctx) {
        Ok(result) => result,
        Err(e) => {
            debug!(
                "Condition '{}' of breakpoint {} failed: {}",
                condition.text(),
                bp.id,
                e
            );
            false
        }
    }
}
