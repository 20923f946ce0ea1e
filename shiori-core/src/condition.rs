//! ブレークポイント条件式のコンパイル
//!
//! 設定時には構文チェックのみを行い、評価は停止判定時まで遅延します。

use crate::expr_eval::Value;
use std::fmt;
use thiserror::Error;

/// 式の抽象構文木
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// リテラル: `5`, `"abc"`, `nil`
    Literal(Value),
    /// 変数名: `b`, `@count`
    Variable(String),
    /// 単項演算: `-x`, `!x`
    Unary { op: UnaryOp, operand: Box<Expression> },
    /// 二項演算: `a + b`, `b == 5`
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        f.write_str(s)
    }
}

/// 条件式の構文エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// ブレークポイントに付与された条件
///
/// 構文エラーの条件も元のテキストごと保持し、再有効化の際に検出できるようにします。
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    text: String,
    compiled: Option<Expression>,
}

impl Condition {
    /// 条件式をコンパイルする
    pub fn compile(text: &str) -> Result<Self, SyntaxError> {
        let expr = parse_expression(text)?;
        Ok(Self {
            text: text.trim().to_string(),
            compiled: Some(expr),
        })
    }

    /// 構文エラーを許容して条件を作成する
    pub fn unchecked(text: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            compiled: parse_expression(text).ok(),
        }
    }

    /// 元の式テキスト
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 構文的に正しいかどうか
    pub fn is_valid(&self) -> bool {
        self.compiled.is_some()
    }

    /// コンパイル済みの式
    pub fn expression(&self) -> Option<&Expression> {
        self.compiled.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Nil,
    AndKw,
    OrKw,
    NotKw,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, SyntaxError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('!', _) => (Token::Bang, 1),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('"', _) | ('\'', _) => {
                let (s, consumed) = lex_string(&chars[i..], c, offset)?;
                (Token::Str(s), consumed)
            }
            _ if c.is_ascii_digit() => lex_number(&chars[i..], offset)?,
            _ if c.is_alphabetic() || c == '_' || c == '@' || c == '$' => {
                let mut end = i + 1;
                while end < chars.len() {
                    let ch = chars[end].1;
                    if ch.is_alphanumeric() || ch == '_' || (ch == '@' && end == i + 1 && c == '@') {
                        end += 1;
                    } else {
                        break;
                    }
                }
                if end < chars.len() && chars[end].1 == '?' {
                    end += 1;
                }
                let word: String = chars[i..end].iter().map(|&(_, ch)| ch).collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "nil" => Token::Nil,
                    "and" => Token::AndKw,
                    "or" => Token::OrKw,
                    "not" => Token::NotKw,
                    _ => Token::Ident(word),
                };
                (token, end - i)
            }
            _ => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{}'", c),
                    offset,
                ))
            }
        };

        tokens.push((token, offset));
        i += width;
    }

    Ok(tokens)
}

fn lex_string(chars: &[(usize, char)], quote: char, offset: usize) -> Result<(String, usize), SyntaxError> {
    let mut s = String::new();
    let mut i = 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == quote {
            return Ok((s, i + 1));
        }
        if c == '\\' && i + 1 < chars.len() {
            let escaped = chars[i + 1].1;
            s.push(match escaped {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            i += 2;
            continue;
        }
        s.push(c);
        i += 1;
    }
    Err(SyntaxError::new("unterminated string literal", offset))
}

fn lex_number(chars: &[(usize, char)], offset: usize) -> Result<(Token, usize), SyntaxError> {
    let mut end = 0;
    let mut is_float = false;
    while end < chars.len() {
        let c = chars[end].1;
        if c.is_ascii_digit() || c == '_' {
            end += 1;
        } else if c == '.'
            && !is_float
            && chars.get(end + 1).map_or(false, |&(_, d)| d.is_ascii_digit())
        {
            is_float = true;
            end += 1;
        } else {
            break;
        }
    }
    let text: String = chars[..end]
        .iter()
        .map(|&(_, c)| c)
        .filter(|&c| c != '_')
        .collect();

    let token = if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| SyntaxError::new(format!("invalid number '{}'", text), offset))?
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| SyntaxError::new(format!("invalid number '{}'", text), offset))?
    };
    Ok((token, end))
}

/// 再帰下降パーサー
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end_offset: usize,
    /// 括弧・単項演算子の現在のネスト数
    depth: usize,
}

/// 括弧と単項演算子のネストの上限
const MAX_NESTING: usize = 64;

/// 条件式のトークン数の上限（評価時の再帰の深さを抑える）
const MAX_TOKENS: usize = 1024;

impl Parser {
    fn descend(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(SyntaxError::new("expression nested too deeply", self.offset()));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|&(_, o)| o)
            .unwrap_or(self.end_offset)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expression, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::OrOr) || self.eat(&Token::OrKw) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression, SyntaxError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&Token::AndAnd) || self.eat(&Token::AndKw) {
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression, SyntaxError> {
        if self.eat(&Token::NotKw) {
            self.descend()?;
            let operand = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, SyntaxError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::NotEq,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_sum()?;
        Ok(binary(op, lhs, rhs))
    }

    fn parse_sum(&mut self) -> Result<Expression, SyntaxError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<Expression, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, SyntaxError> {
        let op = if self.eat(&Token::Minus) {
            UnaryOp::Neg
        } else if self.eat(&Token::Bang) {
            UnaryOp::Not
        } else {
            return self.parse_primary();
        };
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expression, SyntaxError> {
        let offset = self.offset();
        let token = self
            .tokens
            .get(self.pos)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| SyntaxError::new("unexpected end of expression", offset))?;
        self.pos += 1;

        match token {
            Token::Int(n) => Ok(Expression::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expression::Literal(Value::Float(x))),
            Token::Str(s) => Ok(Expression::Literal(Value::Str(s))),
            Token::True => Ok(Expression::Literal(Value::Bool(true))),
            Token::False => Ok(Expression::Literal(Value::Bool(false))),
            Token::Nil => Ok(Expression::Literal(Value::Nil)),
            Token::Ident(name) => Ok(Expression::Variable(name)),
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                if !self.eat(&Token::RParen) {
                    return Err(SyntaxError::new("missing closing ')'", self.offset()));
                }
                Ok(inner)
            }
            other => Err(SyntaxError::new(
                format!("unexpected token {:?}", other),
                offset,
            )),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
    Expression::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// 条件式をパースする
pub fn parse_expression(input: &str) -> Result<Expression, SyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(SyntaxError::new("empty expression", 0));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(SyntaxError::new("expression too long", tokens[MAX_TOKENS].1));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end_offset: input.len(),
        depth: 0,
    };
    let expr = parser.parse_or()?;

    if parser.pos < parser.tokens.len() {
        return Err(SyntaxError::new("unexpected trailing input", parser.offset()));
    }
    Ok(expr)
}
