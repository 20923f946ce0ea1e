//! デバッガ設定

use std::fmt;

/// 位置解決・変更検知・表示に渡される設定値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// ファイル名をベース名だけで表示する
    pub basename: bool,
    /// ソースファイルの変更を検知して読み直す
    pub autoreload: bool,
}

/// `set` コマンドで変更できる設定項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Basename,
    Autoreload,
}

impl Setting {
    /// 設定名をパースする（`no` 接頭辞は偽を表す）
    pub fn parse(name: &str) -> Option<(Self, bool)> {
        let (name, value) = match name.strip_prefix("no") {
            Some(rest) => (rest, false),
            None => (name, true),
        };
        let setting = match name {
            "basename" => Setting::Basename,
            "autoreload" => Setting::Autoreload,
            _ => return None,
        };
        Some((setting, value))
    }
}

impl Settings {
    /// 設定項目を変更する
    pub fn apply(&mut self, setting: Setting, value: bool) {
        match setting {
            Setting::Basename => self.basename = value,
            Setting::Autoreload => self.autoreload = value,
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "basename is {}.", on_off(self.basename))?;
        write!(f, "autoreload is {}.", on_off(self.autoreload))
    }
}
