//! Evaluator for parsed setup scripts.
//!
//! Values follow JavaScript loosely: strings, numbers, booleans, `null`,
//! `undefined`, arrays and plain objects. The only callable things are the
//! tool groups, `console`, `JSON` and a handful of string and array
//! methods. Bindings are immutable once declared.

use serde_json::{Map, Number};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use super::edit::TextEdit;
use super::json_edit::JsonEdit;
use super::parser::{BinOp, EntryParam, Expr, Module, Stmt, StmtKind, TemplatePart};
use super::tools::ToolSurface;
use super::{OptionValue, ProjectContext};

/// A script value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    /// Result of `new Error(message)`.
    Error(String),
    Namespace(Namespace),
}

/// Host objects exposed to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Tools,
    Group(ToolGroup),
    Console,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolGroup {
    Placeholders,
    Ide,
    Files,
    Json,
}

impl ToolGroup {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "placeholders" => Some(ToolGroup::Placeholders),
            "ide" => Some(ToolGroup::Ide),
            "files" => Some(ToolGroup::Files),
            "json" => Some(ToolGroup::Json),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ToolGroup::Placeholders => "placeholders",
            ToolGroup::Ide => "ide",
            ToolGroup::Files => "files",
            ToolGroup::Json => "json",
        }
    }
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Error(_) => "error",
            Value::Object(_) | Value::Namespace(_) => "object",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    fn property(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Convert to JSON; `undefined` becomes `None`.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Value::Undefined | Value::Namespace(_) => return None,
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Num(n) => number_to_json(*n),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Error(message) => serde_json::json!({ "message": message }),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|v| v.to_json().unwrap_or(serde_json::Value::Null))
                    .collect(),
            ),
            Value::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    if let Some(json) = value.to_json() {
                        map.insert(key.clone(), json);
                    }
                }
                serde_json::Value::Object(map)
            }
        })
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) if n.is_nan() => f.write_str("NaN"),
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => write!(f, "{}", *n as i64),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Error(message) => write!(f, "Error: {message}"),
            Value::Object(_) | Value::Namespace(_) => f.write_str("[object Object]"),
        }
    }
}

/// Build the frozen `context` object.
pub fn context_value(context: &ProjectContext) -> Value {
    let options = context
        .options
        .iter()
        .map(|(dim, value)| {
            let value = match value {
                OptionValue::One(v) => Value::Str(v.clone()),
                OptionValue::Many(vs) => Value::Array(vs.iter().cloned().map(Value::Str).collect()),
            };
            (dim.clone(), value)
        })
        .collect();

    Value::Object(vec![
        ("name".to_string(), Value::Str(context.name.clone())),
        (
            "directory".to_string(),
            Value::Str(context.directory.display().to_string()),
        ),
        ("options".to_string(), Value::Object(options)),
        (
            "ide".to_string(),
            context.ide.clone().map(Value::Str).unwrap_or(Value::Null),
        ),
    ])
}

enum Flow {
    Next,
    Return,
}

type Eval<T> = std::result::Result<T, String>;

/// Executes one module against a tool surface.
pub struct Interpreter<'t> {
    tools: &'t mut dyn ToolSurface,
    context: Value,
    ide: Option<String>,
    started: Instant,
    timeout: Duration,
    scopes: Vec<BTreeMap<String, Value>>,
    tool_calls: usize,
}

impl<'t> Interpreter<'t> {
    pub fn new(context: &ProjectContext, tools: &'t mut dyn ToolSurface, timeout: Duration) -> Self {
        Self {
            tools,
            context: context_value(context),
            ide: context.ide.clone(),
            started: Instant::now(),
            timeout,
            scopes: Vec::new(),
            tool_calls: 0,
        }
    }

    /// Tool calls made so far.
    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    /// Run the prelude, then the entry point.
    ///
    /// Errors are final diagnostics: thrown messages verbatim, everything
    /// else prefixed with its line.
    pub fn run(&mut self, module: &Module) -> Eval<()> {
        self.started = Instant::now();
        self.scopes = vec![BTreeMap::from([
            ("console".to_string(), Value::Namespace(Namespace::Console)),
            ("JSON".to_string(), Value::Namespace(Namespace::Json)),
        ])];

        self.exec_block(&module.prelude)?;

        let mut entry = BTreeMap::new();
        match &module.param {
            EntryParam::None => {}
            EntryParam::Destructured(names) => {
                for (property, local) in names {
                    entry.insert(local.clone(), self.argument_property(property));
                }
            }
            EntryParam::Bundle(name) => {
                let bundle = Value::Object(vec![
                    ("context".to_string(), self.context.clone()),
                    ("tools".to_string(), Value::Namespace(Namespace::Tools)),
                ]);
                entry.insert(name.clone(), bundle);
            }
        }
        self.scopes.push(entry);
        let flow = self.exec_block(&module.body);
        self.scopes.truncate(1);
        flow.map(|_| ())
    }

    fn argument_property(&self, property: &str) -> Value {
        match property {
            "context" => self.context.clone(),
            "tools" => Value::Namespace(Namespace::Tools),
            _ => Value::Undefined,
        }
    }

    fn check_deadline(&self) -> Eval<()> {
        if self.started.elapsed() >= self.timeout {
            return Err(format!(
                "timed out after {}s",
                self.timeout.as_secs_f64().ceil() as u64
            ));
        }
        Ok(())
    }

    // ---- statements ----

    fn exec_block(&mut self, stmts: &[Stmt]) -> Eval<Flow> {
        for stmt in stmts {
            self.check_deadline()?;
            if let Flow::Return = self.exec(stmt)? {
                return Ok(Flow::Return);
            }
        }
        Ok(Flow::Next)
    }

    fn scoped(&mut self, stmts: &[Stmt], binding: Option<(String, Value)>) -> Eval<Flow> {
        self.scopes.push(binding.into_iter().collect());
        let flow = self.exec_block(stmts);
        self.scopes.pop();
        flow
    }

    fn exec(&mut self, stmt: &Stmt) -> Eval<Flow> {
        let line = stmt.line;
        let at = |e: String| format!("line {line}: {e}");

        match &stmt.kind {
            StmtKind::Let { name, init } => {
                let value = self.eval(init).map_err(at)?;
                let scope = self
                    .scopes
                    .last_mut()
                    .ok_or_else(|| at("no active scope".to_string()))?;
                if scope.contains_key(name) {
                    return Err(at(format!("'{name}' has already been declared")));
                }
                scope.insert(name.clone(), value);
                Ok(Flow::Next)
            }
            StmtKind::Expr(expr) => {
                self.eval(expr).map_err(at)?;
                Ok(Flow::Next)
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond).map_err(at)?.truthy() {
                    self.scoped(then, None)
                } else {
                    self.scoped(otherwise, None)
                }
            }
            StmtKind::ForOf { name, iter, body } => {
                let items = match self.eval(iter).map_err(at)? {
                    Value::Array(items) => items,
                    Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    other => return Err(at(format!("{} is not iterable", other.type_name()))),
                };
                for item in items {
                    self.check_deadline()?;
                    if let Flow::Return = self.scoped(body, Some((name.clone(), item)))? {
                        return Ok(Flow::Return);
                    }
                }
                Ok(Flow::Next)
            }
            StmtKind::Throw(expr) => {
                let thrown = self.eval(expr).map_err(at)?;
                Err(match thrown {
                    Value::Error(message) | Value::Str(message) => message,
                    other => other.to_string(),
                })
            }
            StmtKind::Return => Ok(Flow::Return),
        }
    }

    // ---- expressions ----

    fn lookup(&self, name: &str) -> Eval<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| format!("{name} is not defined"))
    }

    fn eval(&mut self, expr: &Expr) -> Eval<Value> {
        match expr {
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => out.push_str(&self.eval(expr)?.to_string()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Array(items) => Ok(Value::Array(
                items.iter().map(|e| self.eval(e)).collect::<Eval<_>>()?,
            )),
            Expr::Object(fields) => {
                let mut out: Vec<(String, Value)> = Vec::with_capacity(fields.len());
                for (key, expr) in fields {
                    let value = self.eval(expr)?;
                    match out.iter_mut().find(|(k, _)| k == key) {
                        Some(slot) => slot.1 = value,
                        None => out.push((key.clone(), value)),
                    }
                }
                Ok(Value::Object(out))
            }
            Expr::Ident(name) => self.lookup(name),
            Expr::Member(object, name) => {
                let target = self.eval(object)?;
                member(&target, name)
            }
            Expr::Index(object, index) => {
                let target = self.eval(object)?;
                let index = self.eval(index)?;
                match (&target, &index) {
                    (Value::Array(items), Value::Num(n)) => Ok(usize_index(*n)
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Undefined)),
                    (Value::Str(s), Value::Num(n)) => Ok(usize_index(*n)
                        .and_then(|i| s.chars().nth(i))
                        .map(|c| Value::Str(c.to_string()))
                        .unwrap_or(Value::Undefined)),
                    (_, key) => member(&target, &key.to_string()),
                }
            }
            Expr::Call(callee, args) => {
                let Expr::Member(object, method) = callee.as_ref() else {
                    let value = self.eval(callee)?;
                    return Err(format!("{} is not a function", describe_callee(callee, &value)));
                };
                let target = self.eval(object)?;
                let args = args.iter().map(|a| self.eval(a)).collect::<Eval<Vec<_>>>()?;
                self.call_method(&target, method, args)
            }
            Expr::NewError(message) => {
                let message = self.eval(message)?;
                Ok(Value::Error(match message {
                    Value::Undefined => String::new(),
                    other => other.to_string(),
                }))
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.truthy())),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Num(n) => Ok(Value::Num(-n)),
                other => Err(format!("cannot negate {}", other.type_name())),
            },
            Expr::Binary(op, lhs, rhs) => {
                let left = self.eval(lhs)?;
                match op {
                    BinOp::And if !left.truthy() => return Ok(left),
                    BinOp::Or if left.truthy() => return Ok(left),
                    BinOp::And | BinOp::Or => return self.eval(rhs),
                    _ => {}
                }
                let right = self.eval(rhs)?;
                binary(op, left, right)
            }
        }
    }

    fn call_method(&mut self, target: &Value, method: &str, args: Vec<Value>) -> Eval<Value> {
        match target {
            Value::Namespace(Namespace::Group(group)) => self.call_tool(*group, method, args),
            Value::Namespace(Namespace::Console) => console(method, &args),
            Value::Namespace(Namespace::Json) if method == "stringify" => stringify(&args),
            Value::Str(s) => string_method(s, method, &args),
            Value::Array(items) => array_method(items, method, &args),
            Value::Undefined | Value::Null => Err(format!(
                "cannot read properties of {target} (reading '{method}')"
            )),
            _ => Err(format!("{}.{method} is not a function", target.type_name())),
        }
    }

    fn call_tool(&mut self, group: ToolGroup, method: &str, args: Vec<Value>) -> Eval<Value> {
        self.check_deadline()?;
        let name = format!("tools.{}.{method}", group.name());
        let args = Args {
            name: &name,
            values: args,
        };

        let result = match (group, method) {
            (ToolGroup::Placeholders, "replaceAll") => {
                let files = args.string_list(0, "files")?;
                let values = args.string_map(1)?;
                self.tools
                    .replace_placeholders(&files, values.as_ref())
                    .map(|n| Value::Num(n as f64))
            }
            (ToolGroup::Ide, "apply") => {
                let preset = match args.get(0) {
                    Value::Undefined | Value::Null => self.ide.clone().ok_or_else(|| {
                        format!("{name}: no preset given and no IDE was selected")
                    })?,
                    _ => args.string(0, "preset")?,
                };
                self.tools
                    .apply_ide_preset(&preset)
                    .map(|files| Value::Array(files.into_iter().map(Value::Str).collect()))
            }
            (ToolGroup::Files, _) => {
                let path = args.string(0, "path")?;
                let edit = match method {
                    "insertAfter" => TextEdit::InsertAfter {
                        marker: args.string(1, "marker")?,
                        text: args.string(2, "text")?,
                    },
                    "insertBefore" => TextEdit::InsertBefore {
                        marker: args.string(1, "marker")?,
                        text: args.string(2, "text")?,
                    },
                    "replaceBetween" => TextEdit::ReplaceBetween {
                        start: args.string(1, "startMarker")?,
                        end: args.string(2, "endMarker")?,
                        text: args.string(3, "text")?,
                    },
                    "append" => TextEdit::Append {
                        text: args.string(1, "text")?,
                    },
                    "replace" => TextEdit::Replace {
                        search: args.string(1, "search")?,
                        replacement: args.string(2, "replacement")?,
                    },
                    _ => return Err(format!("{name} is not a function")),
                };
                self.tools.edit_text(&path, &edit).map(|_| Value::Undefined)
            }
            (ToolGroup::Json, _) => {
                let path = args.string(0, "path")?;
                let key_path = args.string(1, "keyPath")?;
                let edit = match method {
                    "set" => JsonEdit::Set {
                        key_path,
                        value: args.json(2, "value")?,
                    },
                    "merge" => JsonEdit::Merge {
                        key_path,
                        items: args.json(2, "items")?,
                    },
                    "remove" => JsonEdit::Remove { key_path },
                    _ => return Err(format!("{name} is not a function")),
                };
                self.tools.edit_json(&path, &edit).map(|_| Value::Undefined)
            }
            _ => return Err(format!("{name} is not a function")),
        };

        self.tool_calls += 1;
        result.map_err(|e| format!("{name}: {e}"))
    }
}

struct Args<'a> {
    name: &'a str,
    values: Vec<Value>,
}

impl Args<'_> {
    fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Undefined)
    }

    fn string(&self, index: usize, what: &str) -> Eval<String> {
        match self.get(index) {
            Value::Str(s) => Ok(s.clone()),
            other => Err(format!(
                "{}: {what} must be a string, got {}",
                self.name,
                other.type_name()
            )),
        }
    }

    fn string_list(&self, index: usize, what: &str) -> Eval<Vec<String>> {
        match self.get(index) {
            Value::Str(s) => Ok(vec![s.clone()]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Str(s) => Ok(s.clone()),
                    other => Err(format!(
                        "{}: {what} must contain strings, got {}",
                        self.name,
                        other.type_name()
                    )),
                })
                .collect(),
            other => Err(format!(
                "{}: {what} must be an array of strings, got {}",
                self.name,
                other.type_name()
            )),
        }
    }

    fn string_map(&self, index: usize) -> Eval<Option<BTreeMap<String, String>>> {
        match self.get(index) {
            Value::Undefined | Value::Null => Ok(None),
            Value::Object(fields) => Ok(Some(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_string()))
                    .collect(),
            )),
            other => Err(format!(
                "{}: values must be an object, got {}",
                self.name,
                other.type_name()
            )),
        }
    }

    fn json(&self, index: usize, what: &str) -> Eval<serde_json::Value> {
        self.get(index)
            .to_json()
            .ok_or_else(|| format!("{}: {what} is required", self.name))
    }
}

fn usize_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn describe_callee(callee: &Expr, value: &Value) -> String {
    match callee {
        Expr::Ident(name) => name.clone(),
        _ => value.type_name().to_string(),
    }
}

fn member(target: &Value, name: &str) -> Eval<Value> {
    match target {
        Value::Undefined | Value::Null => Err(format!(
            "cannot read properties of {target} (reading '{name}')"
        )),
        Value::Object(_) => Ok(target.property(name).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) if name == "length" => Ok(Value::Num(items.len() as f64)),
        Value::Str(s) if name == "length" => Ok(Value::Num(s.chars().count() as f64)),
        Value::Error(message) if name == "message" => Ok(Value::Str(message.clone())),
        Value::Namespace(Namespace::Tools) => Ok(ToolGroup::from_name(name)
            .map(|g| Value::Namespace(Namespace::Group(g)))
            .unwrap_or(Value::Undefined)),
        _ => Ok(Value::Undefined),
    }
}

fn binary(op: &BinOp, left: Value, right: Value) -> Eval<Value> {
    match op {
        BinOp::StrictEq => Ok(Value::Bool(left == right)),
        BinOp::StrictNe => Ok(Value::Bool(left != right)),
        BinOp::Add => match (&left, &right) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{left}{right}"))),
            _ => Err(format!(
                "cannot add {} and {}",
                left.type_name(),
                right.type_name()
            )),
        },
        BinOp::Sub => match (&left, &right) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a - b)),
            _ => Err(format!(
                "cannot subtract {} from {}",
                right.type_name(),
                left.type_name()
            )),
        },
        BinOp::And | BinOp::Or => Ok(right),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Eval<Value> {
    let arg = |i: usize| -> Eval<String> {
        match args.get(i) {
            Some(Value::Str(v)) => Ok(v.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(format!("string.{method} expects an argument")),
        }
    };
    Ok(match method {
        "includes" => Value::Bool(s.contains(arg(0)?.as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg(0)?.as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg(0)?.as_str())),
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "trim" => Value::Str(s.trim().to_string()),
        "split" => {
            let sep = arg(0)?;
            Value::Array(
                s.split(sep.as_str())
                    .map(|p| Value::Str(p.to_string()))
                    .collect(),
            )
        }
        _ => return Err(format!("string.{method} is not a function")),
    })
}

fn array_method(items: &[Value], method: &str, args: &[Value]) -> Eval<Value> {
    Ok(match method {
        "includes" => {
            let needle = args.first().unwrap_or(&Value::Undefined);
            Value::Bool(items.contains(needle))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(other) => other.to_string(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect();
            Value::Str(parts.join(&sep))
        }
        _ => return Err(format!("array.{method} is not a function")),
    })
}

fn console(method: &str, args: &[Value]) -> Eval<Value> {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match method {
        "log" | "info" => tracing::info!("[setup] {}", line),
        "debug" => tracing::debug!("[setup] {}", line),
        "warn" | "error" => tracing::warn!("[setup] {}", line),
        _ => return Err(format!("console.{method} is not a function")),
    }
    Ok(Value::Undefined)
}

fn stringify(args: &[Value]) -> Eval<Value> {
    let Some(json) = args.first().and_then(Value::to_json) else {
        return Ok(Value::Undefined);
    };
    let pretty = args.get(2).is_some_and(Value::truthy);
    let text = match pretty {
        true => serde_json::to_string_pretty(&json),
        false => serde_json::to_string(&json),
    };
    text.map(Value::Str).map_err(|e| e.to_string())
}
