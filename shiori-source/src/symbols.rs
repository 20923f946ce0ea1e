//! クラス/メソッド名の解決機能

use crate::source::{SourceFile, SourceId};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// メソッドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// インスタンスメソッド: `Class#method`
    Instance,
    /// 特異メソッド（クラスメソッド）: `Class.method`
    Singleton,
}

/// メソッド定義の位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLocation {
    pub source: SourceId,
    pub line: u32,
}

/// クラス/メソッドインデックス
///
/// デバッガエンジンが自身のシンボル情報から構築し、位置解決はこれを参照するだけです。
pub trait MethodIndex {
    /// クラス（またはモジュール）が定義されているかどうか
    fn has_class(&self, class_name: &str) -> bool;

    /// インスタンスメソッドの定義位置を解決する
    fn resolve_instance_method(&self, class_name: &str, method_name: &str) -> Option<MethodLocation>;

    /// 特異メソッドの定義位置を解決する
    fn resolve_class_method(&self, class_name: &str, method_name: &str) -> Option<MethodLocation>;
}

/// シンボルテーブル
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// 定義済みのクラス/モジュール名
    classes: HashSet<String>,
    /// (クラス名, メソッド名, 種類) -> 定義位置
    methods: HashMap<(String, String, MethodKind), MethodLocation>,
}

impl SymbolTable {
    /// 空のシンボルテーブルを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// クラスを登録する
    pub fn add_class(&mut self, class_name: impl Into<String>) {
        self.classes.insert(class_name.into());
    }

    /// メソッドを登録する（クラスも同時に登録される）
    pub fn add_method(
        &mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        kind: MethodKind,
        location: MethodLocation,
    ) {
        let class_name = class_name.into();
        self.classes.insert(class_name.clone());
        self.methods
            .insert((class_name, method_name.into(), kind), location);
    }

    /// ソースファイルを走査して得たメソッド定義をすべて登録する
    pub fn extend_from_source(&mut self, file: &SourceFile) {
        let scan = scan(file);
        for class_name in scan.classes {
            self.add_class(class_name);
        }
        for (class_name, method_name, kind, location) in scan.methods {
            self.add_method(class_name, method_name, kind, location);
        }
    }

    fn lookup(&self, class_name: &str, method_name: &str, kind: MethodKind) -> Option<MethodLocation> {
        self.methods
            .get(&(class_name.to_string(), method_name.to_string(), kind))
            .cloned()
    }
}

impl MethodIndex for SymbolTable {
    fn has_class(&self, class_name: &str) -> bool {
        self.classes.contains(class_name)
    }

    fn resolve_instance_method(&self, class_name: &str, method_name: &str) -> Option<MethodLocation> {
        self.lookup(class_name, method_name, MethodKind::Instance)
    }

    fn resolve_class_method(&self, class_name: &str, method_name: &str) -> Option<MethodLocation> {
        self.lookup(class_name, method_name, MethodKind::Singleton)
    }
}

fn class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:class|module)\s+([A-Z]\w*(?:::[A-Z]\w*)*)")
            .expect("static regex is valid")
    })
}

fn def_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*def\s+(self\.)?([A-Za-z_]\w*[?!=]?)").expect("static regex is valid")
    })
}

/// ブロックを開く行かどうか（`end` と対になる構文）
fn opens_block(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\s*(?:if|unless|while|until|case|begin|for)\b|\bdo\s*(?:\|[^|]*\|)?\s*(?:#.*)?$")
            .expect("static regex is valid")
    });
    re.is_match(line)
}

fn closes_block(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*end\b").expect("static regex is valid"));
    re.is_match(line)
}

/// ネストの種類
enum Scope {
    Class(String),
    /// `class << self` の内側
    Singleton(String),
    Other,
}

fn singleton_class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*class\s*<<\s*self\b").expect("static regex is valid"))
}

/// `def x; 1; end` のような1行定義かどうか
fn is_one_line_def(line: &str) -> bool {
    line.contains(';') && line.trim_end().ends_with("end")
}

/// メソッド定義: (クラス名, メソッド名, 種類, 定義位置)
pub type MethodEntry = (String, String, MethodKind, MethodLocation);

/// 1ファイルの走査結果
struct Scan {
    /// ネストを含めた完全修飾のクラス/モジュール名
    classes: Vec<String>,
    methods: Vec<MethodEntry>,
}

/// ソースを走査してメソッド定義を列挙する
///
/// `class`/`module` のネストを追跡し、`def name` をインスタンスメソッド、
/// `def self.name` を特異メソッドとして定義行を返します。
pub fn scan_methods(file: &SourceFile) -> Vec<MethodEntry> {
    scan(file).methods
}

fn scan(file: &SourceFile) -> Scan {
    let mut classes = Vec::new();
    let mut found = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();

    for (index, line) in file.lines.iter().enumerate() {
        let line_no = index as u32 + 1;

        if singleton_class_re().is_match(line) {
            let owner = current_class(&scopes).unwrap_or("Object").to_string();
            scopes.push(Scope::Singleton(owner));
            continue;
        }

        if let Some(caps) = class_re().captures(line) {
            let name = &caps[1];
            let qualified = match current_class(&scopes) {
                Some(outer) if !name.contains("::") => format!("{}::{}", outer, name),
                _ => name.to_string(),
            };
            classes.push(qualified.clone());
            scopes.push(Scope::Class(qualified));
            continue;
        }

        if let Some(caps) = def_re().captures(line) {
            let kind = if caps.get(1).is_some() || in_singleton_class(&scopes) {
                MethodKind::Singleton
            } else {
                MethodKind::Instance
            };
            let owner = current_class(&scopes).unwrap_or("Object").to_string();
            debug!("Found method {}{}{} at line {}", owner, kind_separator(kind), &caps[2], line_no);
            found.push((
                owner,
                caps[2].to_string(),
                kind,
                MethodLocation {
                    source: file.id.clone(),
                    line: line_no,
                },
            ));
            if !is_one_line_def(line) {
                scopes.push(Scope::Other);
            }
            continue;
        }

        if closes_block(line) {
            scopes.pop();
        } else if opens_block(line) && !line.trim_end().ends_with("end") {
            scopes.push(Scope::Other);
        }
    }

    Scan {
        classes,
        methods: found,
    }
}

fn current_class(scopes: &[Scope]) -> Option<&str> {
    scopes.iter().rev().find_map(|scope| match scope {
        Scope::Class(name) | Scope::Singleton(name) => Some(name.as_str()),
        Scope::Other => None,
    })
}

fn in_singleton_class(scopes: &[Scope]) -> bool {
    // メソッド本体などの内側ではなく、直近のクラス系スコープが `class << self` の場合のみ
    matches!(
        scopes.iter().rev().find(|scope| !matches!(scope, Scope::Other)),
        Some(Scope::Singleton(_))
    )
}

fn kind_separator(kind: MethodKind) -> &'static str {
    match kind {
        MethodKind::Instance => "#",
        MethodKind::Singleton => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> SourceFile {
        SourceFile::from_text(SourceId::new("/scripts/methods.rb"), text)
    }

    #[test]
    fn test_scan_instance_and_singleton_methods() {
        let file = source(
            "class A\n  def self.a\n    a = 2\n  end\n  def b\n    a = 1\n  end\nend\n",
        );
        let mut table = SymbolTable::new();
        table.extend_from_source(&file);

        assert!(table.has_class("A"));
        assert!(!table.has_class("B"));
        assert_eq!(table.resolve_class_method("A", "a").map(|l| l.line), Some(2));
        assert_eq!(table.resolve_instance_method("A", "b").map(|l| l.line), Some(5));
        assert_eq!(table.resolve_instance_method("A", "a"), None);
        assert_eq!(table.resolve_class_method("A", "b"), None);
    }

    #[test]
    fn test_nested_classes_and_blocks() {
        let file = source(
            "module M\n  class C\n    def run\n      if x\n        1\n      end\n      [1].each do |i|\n        i\n      end\n    end\n    def stop; end\n  end\n  def self.helper\n  end\nend\n",
        );
        let mut table = SymbolTable::new();
        table.extend_from_source(&file);

        assert_eq!(table.resolve_instance_method("M::C", "run").map(|l| l.line), Some(3));
        assert_eq!(table.resolve_instance_method("M::C", "stop").map(|l| l.line), Some(11));
        assert_eq!(table.resolve_class_method("M", "helper").map(|l| l.line), Some(13));
        assert!(table.has_class("M"));
        assert!(table.has_class("M::C"));
        // ネストしたクラスは修飾名でのみ登録される
        assert!(!table.has_class("C"));
    }

    #[test]
    fn test_method_less_classes_are_registered() {
        let file = source("module Outer
  class Empty
  end
end
class Plain
end
");
        let mut table = SymbolTable::new();
        table.extend_from_source(&file);

        assert!(table.has_class("Outer"));
        assert!(table.has_class("Outer::Empty"));
        assert!(table.has_class("Plain"));
        assert!(!table.has_class("Empty"));
    }

    #[test]
    fn test_singleton_class_block() {
        let file = source(
            "class Config
  class << self
    def load
      1
    end
  end
  def save
  end
end
",
        );
        let mut table = SymbolTable::new();
        table.extend_from_source(&file);

        assert_eq!(table.resolve_class_method("Config", "load").map(|l| l.line), Some(3));
        assert_eq!(table.resolve_instance_method("Config", "load"), None);
        assert_eq!(table.resolve_instance_method("Config", "save").map(|l| l.line), Some(7));
    }

    #[test]
    fn test_top_level_methods_belong_to_object() {
        let file = source("def helper\n  1\nend\n");
        let methods = scan_methods(&file);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].0, "Object");
        assert_eq!(methods[0].2, MethodKind::Instance);
    }
}
