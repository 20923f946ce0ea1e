//! 式評価エンジン
//!
//! 停止判定時に、ブレークポイント条件を現在の変数スコープで評価します。

use crate::condition::{BinaryOp, Expression, UnaryOp};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// 評価値
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// 真偽値として解釈する（`nil` と `false` のみ偽）
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// 型名を取得する
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::Int(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Str(_) => "String",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// 評価エラー
///
/// 停止判定ではどのエラーも「条件が偽」として扱われ、再試行はしません。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined local variable or method `{0}'")]
    UnknownVariable(String),

    #[error("undefined method `{op}' for {lhs} and {rhs}")]
    TypeMismatch {
        op: String,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("divided by 0")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

/// 実行コンテキスト
///
/// 停止地点での変数束縛を提供します。実行エンジンが実装します。
pub trait ExecutionContext {
    /// 変数名から値を取得する
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// 名前と値の対応表による実行コンテキスト
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    /// 空の束縛を作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 変数を束縛した新しい束縛を返す
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// 変数を束縛する
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }
}

impl ExecutionContext for Bindings {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// 式を評価する
pub fn evaluate(expr: &Expression, ctx: &dyn ExecutionContext) -> Result<Value, EvalError> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Variable(name) => ctx
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownVariable(name.clone())),
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            eval_unary(*op, value)
        }
        Expression::Binary { op, lhs, rhs } => match op {
            // 短絡評価
            BinaryOp::And => {
                let l = evaluate(lhs, ctx)?;
                if l.is_truthy() {
                    evaluate(rhs, ctx)
                } else {
                    Ok(l)
                }
            }
            BinaryOp::Or => {
                let l = evaluate(lhs, ctx)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    evaluate(rhs, ctx)
                }
            }
            _ => {
                let l = evaluate(lhs, ctx)?;
                let r = evaluate(rhs, ctx)?;
                eval_binary(*op, l, r)
            }
        },
    }
}

/// 式を真偽値として評価する
pub fn evaluate_truthy(expr: &Expression, ctx: &dyn ExecutionContext) -> Result<bool, EvalError> {
    evaluate(expr, ctx).map(|v| v.is_truthy())
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Neg, v) => Err(EvalError::TypeMismatch {
            op: "-@".to_string(),
            lhs: v.type_name(),
            rhs: "nothing",
        }),
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.to_string(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| mismatch(op, &lhs, &rhs))?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, lhs, rhs)
        }
        // 短絡評価は evaluate で処理済み
        BinaryOp::And => Ok(if lhs.is_truthy() { rhs } else { lhs }),
        BinaryOp::Or => Ok(if lhs.is_truthy() { lhs } else { rhs }),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            lhs.as_f64() == rhs.as_f64()
        }
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b).map(Value::Int),
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{}{}", a, b))),
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(mismatch(op, &lhs, &rhs));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a - b * (a / b).floor(),
            };
            Ok(Value::Float(result))
        }
    }
}

/// 整数演算（除算と剰余は負の無限大方向への丸め）
fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or(EvalError::Overflow),
        BinaryOp::Sub => a.checked_sub(b).ok_or(EvalError::Overflow),
        BinaryOp::Mul => a.checked_mul(b).ok_or(EvalError::Overflow),
        BinaryOp::Div | BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let q = a.checked_div(b).ok_or(EvalError::Overflow)?;
            let r = a.checked_rem(b).ok_or(EvalError::Overflow)?;
            let adjust = r != 0 && ((r < 0) != (b < 0));
            if op == BinaryOp::Div {
                Ok(if adjust { q - 1 } else { q })
            } else {
                Ok(if adjust { r + b } else { r })
            }
        }
        _ => unreachable!("non-arithmetic operator {}", op),
    }
}
