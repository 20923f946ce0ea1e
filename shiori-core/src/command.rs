//! デバッガコマンド

use crate::breakpoint::BreakpointId;
use crate::parse::parse_breakpoint_id;
use crate::settings::Setting;
use thiserror::Error;

/// デバッガコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// ブレークポイントを設定（位置指定と `if` 条件のテキスト）
    Break(String),
    /// 条件式を設定（`None` で解除）
    Condition {
        id: BreakpointId,
        expr: Option<String>,
    },
    /// ブレークポイントを有効化（空なら全て）
    Enable(Vec<BreakpointId>),
    /// ブレークポイントを無効化（空なら全て）
    Disable(Vec<BreakpointId>),
    /// ブレークポイントを削除（空なら全て）
    Delete(Vec<BreakpointId>),
    /// ブレークポイント一覧表示
    InfoBreakpoints,
    /// 設定変更
    Set(Setting, bool),
    /// 設定表示
    ShowSettings,
    /// 実行エンジンの代わりに停止候補地点への到達を通知する
    Reach {
        location: String,
        bindings: Vec<String>,
    },
    /// ソースファイルを読み込む
    Load(String),
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

/// コマンドのパースエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("\"{0}\" must be followed \"display\", \"breakpoints\" or breakpoint numbers.")]
    MissingTarget(&'static str),

    #[error("{command} breakpoints argument '{arg}' needs to be a number.")]
    NotANumber { command: &'static str, arg: String },

    #[error("Display expressions are not supported.")]
    DisplayUnsupported,

    #[error("{0}")]
    Usage(String),
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return Err(CommandError::Empty);
        }

        match parts[0] {
            "break" | "b" => {
                let args = input[parts[0].len()..].trim();
                Ok(Command::Break(args.to_string()))
            }
            "condition" | "cond" => {
                let Some(id_text) = parts.get(1) else {
                    return Err(CommandError::Usage(
                        "\"condition\" must be followed by a breakpoint number.".to_string(),
                    ));
                };
                let id = parse_breakpoint_id(id_text).map_err(|_| CommandError::NotANumber {
                    command: "Condition",
                    arg: id_text.to_string(),
                })?;
                // 条件式は空白を含めて元の入力から切り出す
                let expr = input
                    .split_once(char::is_whitespace)
                    .map(|(_, rest)| rest.trim_start())
                    .and_then(|rest| rest.strip_prefix(id_text))
                    .map(str::trim)
                    .filter(|expr| !expr.is_empty())
                    .map(str::to_string);
                Ok(Command::Condition { id, expr })
            }
            "enable" | "en" => parse_targets("enable", "Enable", &parts[1..]).map(Command::Enable),
            "disable" | "dis" => {
                parse_targets("disable", "Disable", &parts[1..]).map(Command::Disable)
            }
            "delete" | "d" => {
                let args = match parts.get(1) {
                    Some(&"breakpoints") => &parts[2..],
                    _ => &parts[1..],
                };
                parse_ids("Delete", args).map(Command::Delete)
            }
            "info" | "i" => match parts.get(1) {
                Some(&("breakpoints" | "break" | "b")) => Ok(Command::InfoBreakpoints),
                _ => Err(CommandError::Usage(
                    "\"info\" must be followed by \"breakpoints\".".to_string(),
                )),
            },
            "set" => {
                let name = parts.get(1).copied().unwrap_or_default();
                crate::settings::Setting::parse(name)
                    .map(|(setting, value)| Command::Set(setting, value))
                    .ok_or_else(|| CommandError::Usage(format!("Unknown setting: {}", name)))
            }
            "show" => Ok(Command::ShowSettings),
            "reach" => match parts.get(1) {
                Some(location) => Ok(Command::Reach {
                    location: location.to_string(),
                    bindings: parts[2..].iter().map(|s| s.to_string()).collect(),
                }),
                None => Err(CommandError::Usage(
                    "\"reach\" must be followed by a line or file:line.".to_string(),
                )),
            },
            "load" => match parts.get(1) {
                Some(path) => Ok(Command::Load(path.to_string())),
                None => Err(CommandError::Usage(
                    "\"load\" must be followed by a file name.".to_string(),
                )),
            },
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(input.to_string())),
        }
    }
}

/// `enable`/`disable` の引数をパースする
fn parse_targets(
    name: &'static str,
    command: &'static str,
    args: &[&str],
) -> Result<Vec<BreakpointId>, CommandError> {
    match args.first() {
        None => Err(CommandError::MissingTarget(name)),
        Some(&"display") => Err(CommandError::DisplayUnsupported),
        Some(&"breakpoints") => parse_ids(command, &args[1..]),
        Some(_) => parse_ids(command, args),
    }
}

fn parse_ids(command: &'static str, args: &[&str]) -> Result<Vec<BreakpointId>, CommandError> {
    args.iter()
        .map(|arg| {
            parse_breakpoint_id(arg).map_err(|_| CommandError::NotANumber {
                command,
                arg: arg.to_string(),
            })
        })
        .collect()
}
