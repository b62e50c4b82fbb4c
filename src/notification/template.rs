//! `${...}` 模板引擎
//!
//! 支持的语法：
//!
//! - `${event.message}` — 按点号路径替换
//! - `${if event.fields}...${else}...${end}` — 条件，`${if !key}` 取反，
//!   `${if key='value'}` 比较字符串值
//! - `${foreach backlog message}...${end}` — 遍历数组；遍历对象时每项带
//!   `key` 和 `value`
//! - `\${` — 输出字面量 `${`
//!
//! 未知 key 的处理由 [`MissingKeyPolicy`] 决定，默认替换为空串。条件判断中
//! 的未知 key 始终视为 false。

use serde_json::{Map, Value};

use super::error::TemplateError;
use super::model::{descend, RenderModel};

/// 未知 key 的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// 替换为空串
    #[default]
    Empty,
    /// 返回 [`TemplateError::UnknownKey`]
    Strict,
}

/// 模板引擎（无全局状态，可跨线程共享）
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateEngine {
    missing_key: MissingKeyPolicy,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_key_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.missing_key = policy;
        self
    }

    pub fn missing_key_policy(&self) -> MissingKeyPolicy {
        self.missing_key
    }

    /// 解析模板（只做语法检查，不需要模型）
    pub fn parse(&self, source: &str) -> Result<Template, TemplateError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let (nodes, stop) = parser.sequence()?;
        match stop {
            Stop::Eof => Ok(Template { nodes }),
            Stop::Else(at) => Err(TemplateError::syntax(at, "`${else}` outside of `${if}`")),
            Stop::End(at) => Err(TemplateError::syntax(at, "`${end}` without an open block")),
        }
    }

    /// 解析并渲染
    pub fn transform(&self, source: &str, model: &RenderModel) -> Result<String, TemplateError> {
        self.parse(source)?.render(model, self.missing_key)
    }
}

/// 已解析的模板
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn render(&self, model: &RenderModel, policy: MissingKeyPolicy) -> Result<String, TemplateError> {
        let mut scope = Scope {
            model,
            locals: Vec::new(),
        };
        let mut out = String::new();
        render_nodes(&self.nodes, &mut scope, policy, &mut out)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    If {
        cond: Condition,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Foreach {
        path: String,
        var: String,
        body: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Truthy(String),
    Falsy(String),
    Equals(String, String),
}

// ============================================================================
// 词法
// ============================================================================

#[derive(Debug)]
enum Token {
    Text(String),
    Tag { expr: String, at: usize },
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(idx) = rest.find("${") {
        if rest[..idx].ends_with('\\') {
            // 转义：丢掉反斜杠，保留 `${`
            text.push_str(&rest[..idx - 1]);
            text.push_str("${");
            rest = &rest[idx + 2..];
            offset += idx + 2;
            continue;
        }

        text.push_str(&rest[..idx]);
        let start = offset + idx;
        let body = &rest[idx + 2..];
        let close = find_close(body)
            .ok_or_else(|| TemplateError::syntax(start, "unterminated `${`"))?;

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }
        tokens.push(Token::Tag {
            expr: body[..close].trim().to_string(),
            at: start,
        });

        let consumed = idx + 2 + close + 1;
        rest = &rest[consumed..];
        offset += consumed;
    }

    text.push_str(rest);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(tokens)
}

/// 找到表达式结束的 `}`，单引号内的 `}` 不算
fn find_close(body: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in body.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '}' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

// ============================================================================
// 语法
// ============================================================================

/// `${if}` / `${foreach}` 的最大嵌套层数
pub const MAX_NESTING: usize = 64;

enum Stop {
    Eof,
    Else(usize),
    End(usize),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn sequence(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();

        while self.pos < self.tokens.len() {
            let token = std::mem::replace(&mut self.tokens[self.pos], Token::Text(String::new()));
            self.pos += 1;

            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Tag { expr, at } => {
                    if expr.is_empty() {
                        return Err(TemplateError::syntax(at, "empty expression"));
                    }
                    let (keyword, args) = match expr.split_once(char::is_whitespace) {
                        Some((k, a)) => (k, a.trim()),
                        None => (expr.as_str(), ""),
                    };

                    match keyword {
                        "end" if args.is_empty() => return Ok((nodes, Stop::End(at))),
                        "else" if args.is_empty() => return Ok((nodes, Stop::Else(at))),
                        "if" => nodes.push(self.nested(at, |p| p.if_block(args, at))?),
                        "foreach" => nodes.push(self.nested(at, |p| p.foreach_block(args, at))?),
                        _ => nodes.push(Node::Var(parse_path(&expr, at)?)),
                    }
                }
            }
        }

        Ok((nodes, Stop::Eof))
    }

    /// 进入一层块；超过 [`MAX_NESTING`] 时报语法错误（渲染只遍历解析成功的树）
    fn nested(
        &mut self,
        at: usize,
        block: impl FnOnce(&mut Self) -> Result<Node, TemplateError>,
    ) -> Result<Node, TemplateError> {
        if self.depth >= MAX_NESTING {
            return Err(TemplateError::syntax(at, "blocks nested too deeply"));
        }
        self.depth += 1;
        let node = block(self);
        self.depth -= 1;
        node
    }

    fn if_block(&mut self, args: &str, at: usize) -> Result<Node, TemplateError> {
        let cond = parse_condition(args, at)?;
        let (then, stop) = self.sequence()?;

        let otherwise = match stop {
            Stop::End(_) => Vec::new(),
            Stop::Else(_) => {
                let (otherwise, stop) = self.sequence()?;
                match stop {
                    Stop::End(_) => otherwise,
                    Stop::Else(pos) => {
                        return Err(TemplateError::syntax(pos, "duplicate `${else}`"));
                    }
                    Stop::Eof => {
                        return Err(TemplateError::syntax(at, "missing `${end}` for `${if}`"));
                    }
                }
            }
            Stop::Eof => return Err(TemplateError::syntax(at, "missing `${end}` for `${if}`")),
        };

        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    fn foreach_block(&mut self, args: &str, at: usize) -> Result<Node, TemplateError> {
        let mut parts = args.split_whitespace();
        let (path, var) = match (parts.next(), parts.next(), parts.next()) {
            (Some(path), Some(var), None) => (parse_path(path, at)?, parse_path(var, at)?),
            _ => {
                return Err(TemplateError::syntax(
                    at,
                    "expected `${foreach <path> <variable>}`",
                ));
            }
        };
        if var.contains('.') {
            return Err(TemplateError::syntax(at, "loop variable must be a plain name"));
        }

        let (body, stop) = self.sequence()?;
        match stop {
            Stop::End(_) => Ok(Node::Foreach { path, var, body }),
            Stop::Else(pos) => Err(TemplateError::syntax(pos, "`${else}` inside `${foreach}`")),
            Stop::Eof => Err(TemplateError::syntax(at, "missing `${end}` for `${foreach}`")),
        }
    }
}

fn parse_path(raw: &str, at: usize) -> Result<String, TemplateError> {
    let valid = !raw.is_empty()
        && raw.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        });
    if valid {
        Ok(raw.to_string())
    } else {
        Err(TemplateError::syntax(at, format!("invalid key `{}`", raw)))
    }
}

fn parse_condition(args: &str, at: usize) -> Result<Condition, TemplateError> {
    if args.is_empty() {
        return Err(TemplateError::syntax(at, "`${if}` needs a condition"));
    }
    if let Some(path) = args.strip_prefix('!') {
        return Ok(Condition::Falsy(parse_path(path.trim(), at)?));
    }
    if let Some((path, literal)) = args.split_once('=') {
        let literal = literal.trim();
        let literal = literal
            .strip_prefix('\'')
            .and_then(|l| l.strip_suffix('\''))
            .ok_or_else(|| TemplateError::syntax(at, "comparison value must be single-quoted"))?;
        return Ok(Condition::Equals(parse_path(path.trim(), at)?, literal.to_string()));
    }
    Ok(Condition::Truthy(parse_path(args, at)?))
}

// ============================================================================
// 渲染
// ============================================================================

struct Scope<'a> {
    model: &'a RenderModel,
    locals: Vec<(String, Value)>,
}

impl Scope<'_> {
    /// 先查循环变量（内层优先），再查模型
    fn resolve(&self, path: &str) -> Option<&Value> {
        let (head, tail) = match path.split_once('.') {
            Some((h, t)) => (h, Some(t)),
            None => (path, None),
        };

        if let Some((_, value)) = self.locals.iter().rev().find(|(name, _)| name == head) {
            return match tail {
                Some(t) => descend(value, t.split('.')),
                None => Some(value),
            };
        }
        self.model.lookup(path)
    }
}

fn render_nodes(
    nodes: &[Node],
    scope: &mut Scope<'_>,
    policy: MissingKeyPolicy,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => match scope.resolve(path) {
                Some(value) => out.push_str(&stringify(value)),
                None if policy == MissingKeyPolicy::Strict => {
                    return Err(TemplateError::UnknownKey(path.clone()));
                }
                None => {}
            },
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if evaluate(cond, scope) { then } else { otherwise };
                render_nodes(branch, scope, policy, out)?;
            }
            Node::Foreach { path, var, body } => {
                let items = match scope.resolve(path) {
                    Some(value) => iteration_items(value),
                    None if policy == MissingKeyPolicy::Strict => {
                        return Err(TemplateError::UnknownKey(path.clone()));
                    }
                    None => Vec::new(),
                };

                for item in items {
                    scope.locals.push((var.clone(), item));
                    let result = render_nodes(body, scope, policy, out);
                    scope.locals.pop();
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn evaluate(cond: &Condition, scope: &Scope<'_>) -> bool {
    match cond {
        Condition::Truthy(path) => scope.resolve(path).is_some_and(is_truthy),
        Condition::Falsy(path) => !scope.resolve(path).is_some_and(is_truthy),
        Condition::Equals(path, literal) => scope
            .resolve(path)
            .is_some_and(|v| stringify(v) == *literal),
    }
}

fn iteration_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let mut entry = Map::new();
                entry.insert("key".to_string(), Value::String(k.clone()));
                entry.insert("value".to_string(), v.clone());
                Value::Object(entry)
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// null / false / "" / 0 / 空数组 / 空对象 为假
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
