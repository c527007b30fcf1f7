//! Calculator Skill
//!
//! Arithmetic over `+ - * / % ^` and parentheses. `^` binds tightest and is
//! right-associative; unary minus applies to the following factor.

use async_trait::async_trait;
use serde_json::{Value, json};

use skills_core::{Arguments, EntryPoint};

use crate::error::{Result, SkillPackError};

/// Deepest nesting of parentheses and signs accepted
const MAX_DEPTH: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Number(f64),
    Op(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &expr[start..end];
                let value = literal
                    .parse()
                    .map_err(|_| SkillPackError::Expression(format!("bad number '{literal}'")))?;
                tokens.push(Token::Number(value));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => {
                return Err(SkillPackError::Expression(format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            if op != '*' && rhs == 0.0 {
                return Err(SkillPackError::DivisionByZero);
            }
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    // Every recursive path passes through here
    fn unary(&mut self) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(SkillPackError::Expression("expression nested too deeply".into()));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := atom ('^' unary)?
    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Op('^')) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(SkillPackError::Expression("missing ')'".into())),
                }
            }
            Some(token) => Err(SkillPackError::Expression(format!("unexpected {token:?}"))),
            None => Err(SkillPackError::Expression("unexpected end of expression".into())),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &str) -> Result<f64> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(SkillPackError::Expression("empty expression".into()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(SkillPackError::Expression("trailing input".into()));
    }
    Ok(value)
}

/// Entry point for the `calculator` skill package
#[derive(Debug, Default, Clone, Copy)]
pub struct Calculator;

#[async_trait]
impl EntryPoint for Calculator {
    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        let expression = crate::str_arg(&args, "expression")?;
        let result = evaluate(expression)?;
        Ok(json!({ "expression": expression, "result": result }))
    }
}
