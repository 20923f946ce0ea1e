//! ブレークポイント管理

use crate::condition::Condition;
use crate::errors::{BreakpointError, BreakpointResult, ConditionPhase};
use shiori_source::SourceId;
use std::collections::BTreeMap;
use tracing::debug;

/// ブレークポイントID
pub type BreakpointId = usize;

/// ヒット回数による停止条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitCondition {
    /// 常に停止する
    #[default]
    None,
    /// ヒット回数が hit_value 以上で停止する
    GreaterOrEqual,
    /// ヒット回数が hit_value と等しいときだけ停止する
    Equal,
    /// ヒット回数が hit_value の倍数のときに停止する
    Modulo,
}

impl HitCondition {
    /// 現在のヒット回数で停止すべきかどうか
    pub fn allows(self, hit_count: u64, hit_value: u64) -> bool {
        match self {
            HitCondition::None => true,
            HitCondition::GreaterOrEqual => hit_count >= hit_value,
            HitCondition::Equal => hit_count == hit_value,
            HitCondition::Modulo => hit_value != 0 && hit_count % hit_value == 0,
        }
    }
}

/// ブレークポイント
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub source: SourceId,
    pub line: u32,
    pub condition: Option<Condition>,
    pub enabled: bool,
    pub hit_count: u64,
    pub hit_value: u64,
    pub hit_condition: HitCondition,
}

impl Breakpoint {
    /// 条件式のテキストを取得する
    pub fn expr(&self) -> Option<&str> {
        self.condition.as_ref().map(Condition::text)
    }

    /// 指定位置のブレークポイントかどうか
    pub fn is_at(&self, source: &SourceId, line: u32) -> bool {
        self.line == line && &self.source == source
    }
}

/// ブレークポイントマネージャ
///
/// IDの昇順（＝作成順）で全ブレークポイントを保持します。
/// 削除したIDは再利用しません。
#[derive(Debug)]
pub struct BreakpointManager {
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_id: BreakpointId,
}

impl BreakpointManager {
    /// 新しいブレークポイントマネージャを作成する
    pub fn new() -> Self {
        Self {
            breakpoints: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// ブレークポイントを追加する
    ///
    /// 位置の検証は呼び出し側で済んでいる前提です。
    pub fn add(&mut self, source: SourceId, line: u32, condition: Option<Condition>) -> &Breakpoint {
        let id = self.next_id;
        self.next_id += 1;

        let bp = Breakpoint {
            id,
            source,
            line,
            condition,
            enabled: true,
            hit_count: 0,
            hit_value: 0,
            hit_condition: HitCondition::None,
        };
        debug!("Added breakpoint {} at {}:{}", id, bp.source, bp.line);

        self.breakpoints.entry(id).or_insert(bp)
    }

    /// 指定位置のブレークポイントを作成順にすべて取得する
    pub fn find(&self, source: &SourceId, line: u32) -> Vec<&Breakpoint> {
        self.breakpoints
            .values()
            .filter(|bp| bp.is_at(source, line))
            .collect()
    }

    /// 指定位置のブレークポイントIDを作成順にすべて取得する
    pub fn find_ids(&self, source: &SourceId, line: u32) -> Vec<BreakpointId> {
        self.find(source, line).into_iter().map(|bp| bp.id).collect()
    }

    /// ブレークポイントを取得する
    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    /// ブレークポイントを可変参照で取得する
    pub fn get_mut(&mut self, id: BreakpointId) -> Option<&mut Breakpoint> {
        self.breakpoints.get_mut(&id)
    }

    /// 存在するブレークポイントを取得する（なければエラー）
    pub fn require_mut(&mut self, id: BreakpointId) -> BreakpointResult<&mut Breakpoint> {
        if self.breakpoints.is_empty() {
            return Err(BreakpointError::EmptyRegistry);
        }
        self.breakpoints
            .get_mut(&id)
            .ok_or(BreakpointError::UnknownBreakpointId(id))
    }

    /// ブレークポイントを有効化する
    ///
    /// IDごとに結果を返し、存在しないIDがあっても他のIDの処理は続けます。
    /// 条件式に構文エラーがあるブレークポイントは有効化しません。
    pub fn enable(&mut self, ids: &[BreakpointId]) -> Vec<BreakpointResult<BreakpointId>> {
        self.set_enabled(ids, true)
    }

    /// ブレークポイントを無効化する
    pub fn disable(&mut self, ids: &[BreakpointId]) -> Vec<BreakpointResult<BreakpointId>> {
        self.set_enabled(ids, false)
    }

    fn set_enabled(&mut self, ids: &[BreakpointId], enabled: bool) -> Vec<BreakpointResult<BreakpointId>> {
        if self.breakpoints.is_empty() {
            return vec![Err(BreakpointError::EmptyRegistry)];
        }

        ids.iter()
            .map(|&id| {
                let bp = self.require_mut(id)?;
                if enabled {
                    if let Some(cond) = bp.condition.as_ref().filter(|c| !c.is_valid()) {
                        return Err(BreakpointError::ConditionSyntax {
                            expr: cond.text().to_string(),
                            phase: ConditionPhase::Enable,
                        });
                    }
                }
                bp.enabled = enabled;
                debug!("Breakpoint {} enabled={}", id, enabled);
                Ok(id)
            })
            .collect()
    }

    /// ブレークポイントの条件を設定する（`None` で解除）
    pub fn set_condition(&mut self, id: BreakpointId, condition: Option<Condition>) -> BreakpointResult<()> {
        let bp = self.require_mut(id)?;
        bp.condition = condition;
        Ok(())
    }

    /// ヒット回数による停止条件を設定する
    pub fn set_hit_condition(
        &mut self,
        id: BreakpointId,
        hit_condition: HitCondition,
        hit_value: u64,
    ) -> BreakpointResult<()> {
        let bp = self.require_mut(id)?;
        bp.hit_condition = hit_condition;
        bp.hit_value = hit_value;
        Ok(())
    }

    /// ブレークポイントを削除する
    pub fn delete(&mut self, id: BreakpointId) -> BreakpointResult<Breakpoint> {
        if self.breakpoints.is_empty() {
            return Err(BreakpointError::EmptyRegistry);
        }
        let removed = self
            .breakpoints
            .remove(&id)
            .ok_or(BreakpointError::UnknownBreakpointId(id))?;
        debug!("Deleted breakpoint {}", id);
        Ok(removed)
    }

    /// 全ブレークポイントを削除する
    pub fn clear(&mut self) -> usize {
        let count = self.breakpoints.len();
        self.breakpoints.clear();
        count
    }

    /// 全てのブレークポイントを作成順に取得する
    pub fn all(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    /// ブレークポイントの数を取得する
    pub fn count(&self) -> usize {
        self.breakpoints.len()
    }

    /// ブレークポイントが1つもないかどうか
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

impl Default for BreakpointManager {
    fn default() -> Self {
        Self::new()
    }
}
