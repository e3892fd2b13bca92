//! Setup-script parser.
//!
//! Recursive descent over [`lexer`](super::lexer) tokens. A module holds
//! optional top-level `const` declarations and exactly one entry point:
//!
//! ```text
//! export default [async] function [name]({ context, tools }) { ... }
//! export default [async] ({ context, tools }) => { ... }
//! module.exports = <either of the above>
//! ```
//!
//! The entry point takes a single object. Positional parameter lists such
//! as `(context, tools)` are rejected when the module is loaded.

use super::lexer::{tokenize, TemplateChunk, Tok, Token};

/// Shape every entry point must follow.
pub const EXPECTED_SIGNATURE: &str = "export default function ({ context, tools }) { ... }";

#[derive(Debug, Clone, PartialEq)]
pub enum BinOp {
    StrictEq,
    StrictNe,
    And,
    Or,
    Add,
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    /// `new Error(message)`.
    NewError(Box<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let { name: String, init: Expr },
    Expr(Expr),
    If { cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt> },
    ForOf { name: String, iter: Expr, body: Vec<Stmt> },
    Throw(Expr),
    Return,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

/// How the entry point receives its argument.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryParam {
    /// No parameter at all.
    None,
    /// `({ context, tools: t })`: (property, local name) pairs.
    Destructured(Vec<(String, String)>),
    /// `(args)`: the whole bundle under one name.
    Bundle(String),
}

/// A parsed setup script.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Top-level declarations evaluated before the entry point.
    pub prelude: Vec<Stmt>,
    pub param: EntryParam,
    pub body: Vec<Stmt>,
}

/// Parse a full module.
pub fn parse_module(source: &str) -> Result<Module, String> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut prelude = Vec::new();
    let mut entry: Option<(EntryParam, Vec<Stmt>)> = None;

    while !parser.at_end() {
        let line = parser.line();
        if parser.eat_ident("export") {
            parser.expect_ident("default")?;
            let found = parser.entry_function()?;
            parser.eat_punct(";");
            if entry.replace(found).is_some() {
                return Err(format!("line {line}: more than one entry point"));
            }
        } else if parser.peek_module_exports() {
            parser.advance();
            parser.expect_punct(".")?;
            parser.expect_ident("exports")?;
            parser.expect_punct("=")?;
            let found = parser.entry_function()?;
            parser.eat_punct(";");
            if entry.replace(found).is_some() {
                return Err(format!("line {line}: more than one entry point"));
            }
        } else {
            let stmt = parser.statement()?;
            match &stmt.kind {
                StmtKind::Let { .. } => prelude.push(stmt),
                StmtKind::Expr(Expr::Str(_)) => {}
                _ => {
                    return Err(format!(
                        "line {line}: only declarations may appear outside the entry point"
                    ))
                }
            }
        }
    }

    let (param, body) = entry.ok_or_else(|| {
        format!("no entry point found; expected `{EXPECTED_SIGNATURE}`")
    })?;
    Ok(Module {
        prelude,
        param,
        body,
    })
}

/// Parse a standalone expression, as found inside `${...}`.
pub fn parse_expression(source: &str, line: usize) -> Result<Expr, String> {
    let mut tokens = tokenize(source).map_err(|e| format!("line {line}: {e}"))?;
    for token in &mut tokens {
        token.line = line;
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    if !parser.at_end() {
        return Err(parser.unexpected("end of interpolation"));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        self.pos += 1;
        tok
    }

    fn check_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn check_ident(&self, name: &str) -> bool {
        self.peek().is_some_and(|t| t.is_ident(name))
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.check_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.check_ident(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, wanted: &str) -> String {
        match self.peek() {
            Some(tok) => format!(
                "line {}: expected {wanted}, found {}",
                self.line(),
                tok.describe()
            ),
            None => format!("line {}: expected {wanted}, found end of script", self.line()),
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), String> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{p}'")))
        }
    }

    fn expect_ident(&mut self, name: &str) -> Result<(), String> {
        if self.eat_ident(name) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{name}'")))
        }
    }

    fn identifier(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(Tok::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn peek_module_exports(&self) -> bool {
        self.check_ident("module")
            && self.peek_at(1).is_some_and(|t| t.is_punct("."))
            && self.peek_at(2).is_some_and(|t| t.is_ident("exports"))
    }

    // ---- entry point ----

    fn entry_function(&mut self) -> Result<(EntryParam, Vec<Stmt>), String> {
        self.eat_ident("async");

        if self.eat_ident("function") {
            if matches!(self.peek(), Some(Tok::Ident(_))) {
                self.pos += 1;
            }
            let param = self.entry_params()?;
            let body = self.block()?;
            return Ok((param, body));
        }

        let param = if matches!(self.peek(), Some(Tok::Ident(_))) {
            EntryParam::Bundle(self.identifier()?)
        } else {
            self.entry_params()?
        };
        self.expect_punct("=>")?;
        let body = if self.check_punct("{") {
            self.block()?
        } else {
            let line = self.line();
            vec![Stmt {
                kind: StmtKind::Expr(self.expression()?),
                line,
            }]
        };
        Ok((param, body))
    }

    fn entry_params(&mut self) -> Result<EntryParam, String> {
        let line = self.line();
        self.expect_punct("(")?;
        if self.eat_punct(")") {
            return Ok(EntryParam::None);
        }

        let param = if self.eat_punct("{") {
            let mut names = Vec::new();
            while !self.eat_punct("}") {
                let property = self.identifier()?;
                let local = if self.eat_punct(":") {
                    self.identifier()?
                } else {
                    property.clone()
                };
                names.push((property, local));
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
            EntryParam::Destructured(names)
        } else {
            EntryParam::Bundle(self.identifier()?)
        };

        if self.check_punct(",") {
            return Err(format!(
                "line {line}: the entry point takes one object argument, not positional \
                 parameters; expected `{EXPECTED_SIGNATURE}`"
            ));
        }
        self.expect_punct(")")?;
        Ok(param)
    }

    // ---- statements ----

    fn block(&mut self) -> Result<Vec<Stmt>, String> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.eat_punct("}") {
            if self.at_end() {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    fn block_or_statement(&mut self) -> Result<Vec<Stmt>, String> {
        if self.check_punct("{") {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        let line = self.line();
        let kind = if self.eat_ident("const") || self.eat_ident("let") || self.eat_ident("var") {
            let name = self.identifier()?;
            self.expect_punct("=")?;
            StmtKind::Let {
                name,
                init: self.expression()?,
            }
        } else if self.eat_ident("if") {
            self.expect_punct("(")?;
            let cond = self.expression()?;
            self.expect_punct(")")?;
            let then = self.block_or_statement()?;
            let otherwise = if self.eat_ident("else") {
                self.block_or_statement()?
            } else {
                Vec::new()
            };
            return Ok(Stmt {
                kind: StmtKind::If {
                    cond,
                    then,
                    otherwise,
                },
                line,
            });
        } else if self.eat_ident("for") {
            self.expect_punct("(")?;
            if !(self.eat_ident("const") || self.eat_ident("let")) {
                return Err(self.unexpected("'const'"));
            }
            let name = self.identifier()?;
            self.expect_ident("of")?;
            let iter = self.expression()?;
            self.expect_punct(")")?;
            let body = self.block_or_statement()?;
            return Ok(Stmt {
                kind: StmtKind::ForOf { name, iter, body },
                line,
            });
        } else if self.eat_ident("throw") {
            StmtKind::Throw(self.expression()?)
        } else if self.eat_ident("return") {
            if !self.check_punct(";") && !self.check_punct("}") {
                self.expression()?;
            }
            StmtKind::Return
        } else if self.check_ident("function") || self.check_ident("import") {
            return Err(self.unexpected("statement"));
        } else {
            let expr = self.expression()?;
            if self.check_punct("=") {
                return Err(format!("line {}: assignment is not supported", self.line()));
            }
            StmtKind::Expr(expr)
        };
        self.eat_punct(";");
        Ok(Stmt { kind, line })
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Expr, String> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and()?;
        while self.eat_punct("||") {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.equality()?;
        while self.eat_punct("&&") {
            let rhs = self.equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, String> {
        let mut lhs = self.additive()?;
        loop {
            let op = if self.eat_punct("===") || self.eat_punct("==") {
                BinOp::StrictEq
            } else if self.eat_punct("!==") || self.eat_punct("!=") {
                BinOp::StrictNe
            } else {
                return Ok(lhs);
            };
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat_punct("+") {
                BinOp::Add
            } else if self.eat_punct("-") {
                BinOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat_punct("!") {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.eat_punct("-") {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat_ident("await") {
            return self.unary();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let name = self.identifier()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.check_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let line = self.line();
        match self.advance() {
            Some(Tok::Str(s)) => Ok(Expr::Str(s)),
            Some(Tok::Num(n)) => Ok(Expr::Num(n)),
            Some(Tok::Template(chunks)) => template(chunks, line),
            Some(Tok::Punct("(")) => {
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Some(Tok::Punct("[")) => {
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.expression()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Some(Tok::Punct("{")) => self.object(),
            Some(Tok::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "null" => Ok(Expr::Null),
                "undefined" => Ok(Expr::Undefined),
                "new" => {
                    let class = self.identifier()?;
                    if class != "Error" {
                        return Err(format!("line {line}: only `new Error(...)` is supported"));
                    }
                    let mut args = self.arguments()?;
                    let message = if args.is_empty() {
                        Expr::Str(String::new())
                    } else {
                        args.swap_remove(0)
                    };
                    Ok(Expr::NewError(Box::new(message)))
                }
                "function" | "async" | "class" | "import" => Err(format!(
                    "line {line}: '{name}' is not supported inside setup scripts"
                )),
                _ => Ok(Expr::Ident(name)),
            },
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
            None => Err(self.unexpected("expression")),
        }
    }

    fn object(&mut self) -> Result<Expr, String> {
        let mut fields = Vec::new();
        while !self.eat_punct("}") {
            let key = match self.advance() {
                Some(Tok::Ident(name)) | Some(Tok::Str(name)) => name,
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("property name"));
                }
            };
            let value = if self.eat_punct(":") {
                self.expression()?
            } else {
                Expr::Ident(key.clone())
            };
            fields.push((key, value));
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(fields))
    }
}

fn template(chunks: Vec<TemplateChunk>, line: usize) -> Result<Expr, String> {
    let parts = chunks
        .into_iter()
        .map(|chunk| match chunk {
            TemplateChunk::Text(text) => Ok(TemplatePart::Text(text)),
            TemplateChunk::Code(code) => parse_expression(&code, line).map(TemplatePart::Expr),
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Expr::Template(parts))
}
