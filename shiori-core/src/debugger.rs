//! デバッガのメインロジック

use crate::breakpoint::{BreakpointManager, HitCondition};
use crate::condition::Condition;
use crate::errors::{BreakpointError, BreakpointResult, ConditionPhase, PendingBreakpoint};
use crate::expr_eval::ExecutionContext;
use crate::location::{
    parse_break_args, parse_location, resolve_method, LocationResolver, LocationSpec, Position,
};
use crate::settings::{Setting, Settings};
use crate::{guard, report, trigger, Breakpoint, BreakpointId, Result};
use shiori_source::{LineCache, SourceId, SourceRegistry, SymbolTable};
use std::path::Path;
use tracing::{info, warn};

/// ブレークポイント作成の結果
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// 作成されたブレークポイント
    pub breakpoint: Breakpoint,
    /// 条件式が不正だった場合のエラー（ブレークポイント自体は作成済み）
    pub condition_error: Option<BreakpointError>,
}

/// デバッガ
pub struct Debugger {
    /// ソース行情報のキャッシュ
    line_cache: LineCache,
    /// クラス・メソッドの定義位置
    symbol_table: SymbolTable,
    /// ブレークポイント管理
    breakpoint_manager: BreakpointManager,
    /// 設定
    settings: Settings,
    /// 現在の停止位置
    current: Option<Position>,
}

impl Debugger {
    /// 新しいデバッガを作成する
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// 設定を指定してデバッガを作成する
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            line_cache: LineCache::new(),
            symbol_table: SymbolTable::new(),
            breakpoint_manager: BreakpointManager::new(),
            settings,
            current: None,
        }
    }

    /// ソースファイルを読み込む
    ///
    /// メソッド定義を索引に登録します。現在位置が未設定なら、
    /// 最初の停止可能行を現在位置にします。
    pub fn load_source<P: AsRef<Path>>(&mut self, path: P) -> Result<SourceId> {
        let id = self.line_cache.load(path)?;
        let file = self
            .line_cache
            .get(&id)
            .ok_or_else(|| anyhow::anyhow!("{} was not cached", id))?;

        self.symbol_table.extend_from_source(file);
        if self.current.is_none() {
            if let Some(&line) = file.stopping_points.iter().next() {
                self.current = Some(Position {
                    source: id.clone(),
                    line,
                });
            }
        }
        Ok(id)
    }

    /// 現在の停止位置を取得する
    pub fn current(&self) -> Option<&Position> {
        self.current.as_ref()
    }

    /// 現在の停止位置を変更する
    pub fn set_current(&mut self, position: Position) {
        self.current = Some(position);
    }

    /// 設定を取得する
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// 設定項目を変更する
    pub fn set(&mut self, setting: Setting, value: bool) {
        self.settings.apply(setting, value);
        info!("Setting {:?} = {}", setting, value);
    }

    /// `break` コマンドの引数からブレークポイントを作成する
    ///
    /// 位置の解決に失敗した場合は何も追加しません。条件式だけが不正な場合は
    /// 条件なしで作成し、そのエラーを `Created::condition_error` に入れて返します。
    pub fn create_breakpoint(&mut self, args: &str) -> BreakpointResult<Created> {
        let request = parse_break_args(args)?;

        let position = {
            let mut resolver =
                LocationResolver::new(&mut self.line_cache, &self.symbol_table, &self.settings);
            resolver.resolve(
                &request.location,
                self.current.as_ref(),
                request.condition.as_deref(),
            )?
        };

        let (condition, condition_error) = compile_for_creation(request.condition.as_deref());
        let breakpoint = self
            .breakpoint_manager
            .add(position.source, position.line, condition)
            .clone();
        info!("Breakpoint {} set at {}:{}", breakpoint.id, breakpoint.source, breakpoint.line);

        Ok(Created {
            breakpoint,
            condition_error,
        })
    }

    /// 未登録ファイルへのブレークポイントを検証なしで作成する
    ///
    /// `No source file named ...` の確認に同意された場合に使います。
    pub fn create_unverified(&mut self, pending: &PendingBreakpoint) -> Created {
        let (condition, condition_error) = compile_for_creation(pending.condition.as_deref());
        let breakpoint = self
            .breakpoint_manager
            .add(SourceId::new(&pending.file), pending.line, condition)
            .clone();
        info!(
            "Unverified breakpoint {} set at {}:{}",
            breakpoint.id, breakpoint.source, breakpoint.line
        );

        Created {
            breakpoint,
            condition_error,
        }
    }

    /// ブレークポイントを有効化する（空なら全て）
    pub fn enable_breakpoints(&mut self, ids: &[BreakpointId]) -> Vec<BreakpointResult<BreakpointId>> {
        let ids = self.targets(ids);
        self.breakpoint_manager.enable(&ids)
    }

    /// ブレークポイントを無効化する（空なら全て）
    pub fn disable_breakpoints(&mut self, ids: &[BreakpointId]) -> Vec<BreakpointResult<BreakpointId>> {
        let ids = self.targets(ids);
        self.breakpoint_manager.disable(&ids)
    }

    fn targets(&self, ids: &[BreakpointId]) -> Vec<BreakpointId> {
        if ids.is_empty() {
            self.breakpoint_manager.all().map(|bp| bp.id).collect()
        } else {
            ids.to_vec()
        }
    }

    /// ブレークポイントを削除する
    pub fn delete_breakpoint(&mut self, id: BreakpointId) -> BreakpointResult<Breakpoint> {
        self.breakpoint_manager.delete(id)
    }

    /// 複数のブレークポイントを削除する
    pub fn delete_breakpoints(&mut self, ids: &[BreakpointId]) -> Vec<BreakpointResult<Breakpoint>> {
        ids.iter().map(|&id| self.delete_breakpoint(id)).collect()
    }

    /// 全ブレークポイントを削除し、削除した数を返す
    pub fn delete_all(&mut self) -> usize {
        let count = self.breakpoint_manager.clear();
        info!("Deleted all {} breakpoints", count);
        count
    }

    /// 条件式を設定する（`None` で解除）
    ///
    /// ここでは構文を検査しません。不正な条件式は有効化の時点で拒否されます。
    pub fn set_condition(&mut self, id: BreakpointId, expr: Option<&str>) -> BreakpointResult<()> {
        let condition = expr.map(Condition::unchecked);
        if let Some(condition) = condition.as_ref().filter(|c| !c.is_valid()) {
            warn!("Condition '{}' of breakpoint {} does not parse", condition.text(), id);
        }
        self.breakpoint_manager.set_condition(id, condition)
    }

    /// ヒット回数による停止条件を設定する
    pub fn set_hit_condition(
        &mut self,
        id: BreakpointId,
        hit_condition: HitCondition,
        hit_value: u64,
    ) -> BreakpointResult<()> {
        self.breakpoint_manager
            .set_hit_condition(id, hit_condition, hit_value)
    }

    /// すべてのブレークポイントを作成順に取得する
    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoint_manager.all()
    }

    /// ブレークポイントを取得する
    pub fn breakpoint(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoint_manager.get(id)
    }

    /// `info breakpoints` の表示内容
    pub fn listing(&self) -> String {
        report::format_listing(self.breakpoint_manager.all(), &self.settings)
    }

    /// 作成時のメッセージ
    pub fn created_message(&self, bp: &Breakpoint) -> String {
        report::format_created(bp, &self.settings)
    }

    /// 停止時のメッセージ
    pub fn hit_message(&self, bp: &Breakpoint) -> String {
        report::format_hit(bp, &self.settings)
    }

    /// 停止候補地点への到達を通知する
    ///
    /// 停止すべき場合は発火したブレークポイントを返します。
    /// 到達した位置は以降の行番号指定の基準になります。
    pub fn notify_reached(
        &mut self,
        source: &SourceId,
        line: u32,
        ctx: &dyn ExecutionContext,
    ) -> Option<Breakpoint> {
        guard::ensure_fresh(&mut self.line_cache, source, &self.settings);
        self.current = Some(Position {
            source: source.clone(),
            line,
        });
        self.should_stop(source, line, ctx)
    }

    /// 指定位置で停止すべきかを判定する
    pub fn should_stop(
        &mut self,
        source: &SourceId,
        line: u32,
        ctx: &dyn ExecutionContext,
    ) -> Option<Breakpoint> {
        trigger::should_stop(&mut self.breakpoint_manager, source, line, ctx).cloned()
    }

    /// 到達位置のテキスト（`10`、`file.rb:10`、`A#b`）をソース上の位置に変換する
    ///
    /// 停止可能行かどうかは検査しません。
    pub fn locate(&self, token: &str) -> BreakpointResult<Position> {
        let spec = parse_location(token)
            .ok_or_else(|| BreakpointError::InvalidLocation(token.to_string()))?;

        match spec {
            LocationSpec::Current => self.current.clone().ok_or(BreakpointError::NoDefaultSource),
            LocationSpec::Line(line) => {
                let current = self.current.as_ref().ok_or(BreakpointError::NoDefaultSource)?;
                Ok(Position {
                    source: current.source.clone(),
                    line,
                })
            }
            LocationSpec::FileLine { file, line } => {
                let source = self.line_cache.resolve_path(&file).ok_or_else(|| {
                    BreakpointError::UnknownSource(PendingBreakpoint {
                        file: file.clone(),
                        line,
                        condition: None,
                    })
                })?;
                Ok(Position { source, line })
            }
            LocationSpec::Method { class, method, kind } => {
                let location = resolve_method(&self.symbol_table, &class, &method, kind)?;
                Ok(Position {
                    source: location.source,
                    line: location.line,
                })
            }
        }
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

/// 作成時の条件式をコンパイルする
///
/// 不正な条件式は付けずに、エラーだけを返します。
fn compile_for_creation(text: Option<&str>) -> (Option<Condition>, Option<BreakpointError>) {
    let Some(text) = text else {
        return (None, None);
    };
    match Condition::compile(text) {
        Ok(condition) => (Some(condition), None),
        Err(e) => {
            warn!("Dropping condition '{}': {}", text, e);
            (
                None,
                Some(BreakpointError::ConditionSyntax {
                    expr: text.to_string(),
                    phase: ConditionPhase::Creation,
                }),
            )
        }
    }
}
