use std::collections::{BTreeMap, HashMap};

use super::ast::{BinOp, Expr, Stmt, StmtKind, Target, UnOp};
use super::value::Value;
use super::ScriptError;

/// Upper bound on iterations of a single `for` loop.
pub const MAX_LOOP_ITERATIONS: u64 = 10_000_000;
/// Largest list `range` may materialize outside a `for` header.
const MAX_MATERIALIZED_RANGE: u64 = 100_000;

enum Flow {
    Normal,
    Break,
    Continue,
}

#[derive(Debug)]
pub struct Interpreter {
    vars: HashMap<String, Value>,
    clock: fn() -> i64,
}

impl Interpreter {
    pub fn new(clock: fn() -> i64) -> Self {
        Self {
            vars: HashMap::new(),
            clock,
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn run(&mut self, program: &[Stmt]) -> Result<(), ScriptError> {
        // Top-level break/continue are rejected by the parser.
        self.block(program).map(|_| ())
    }

    fn block(&mut self, stmts: &[Stmt]) -> Result<Flow, ScriptError> {
        for stmt in stmts {
            match self.stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<Flow, ScriptError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::Assign(target, expr) => {
                let value = self.eval(expr, line)?;
                self.assign(target, value, line)?;
            }
            StmtKind::If(cond, then, otherwise) => {
                let branch = if self.eval(cond, line)?.truthy() {
                    then
                } else {
                    otherwise
                };
                return self.block(branch);
            }
            StmtKind::For(var, iter, body) => return self.for_loop(var, iter, body, line),
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Fail(expr) => {
                let message = self.eval(expr, line)?.display();
                return Err(ScriptError::Raised { line, message });
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, line)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn for_loop(
        &mut self,
        var: &str,
        iter: &Expr,
        body: &[Stmt],
        line: usize,
    ) -> Result<Flow, ScriptError> {
        // `range` in a loop header is iterated lazily.
        if let Expr::Call(name, args) = iter {
            if name == "range" {
                let args = args
                    .iter()
                    .map(|a| self.eval(a, line))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, end) = range_bounds(&args, line)?;
                let mut i = start;
                while i < end {
                    self.vars.insert(var.to_string(), Value::Num(i as f64));
                    if let Flow::Break = self.block(body)? {
                        break;
                    }
                    i += 1;
                }
                return Ok(Flow::Normal);
            }
        }

        let items: Vec<Value> = match self.eval(iter, line)? {
            Value::List(items) => items,
            Value::Map(m) => m.into_keys().map(Value::Str).collect(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            other => {
                return Err(runtime(
                    line,
                    format!("cannot iterate over {}", other.type_name()),
                ))
            }
        };
        if items.len() as u64 > MAX_LOOP_ITERATIONS {
            return Err(runtime(line, "loop exceeds iteration bound".into()));
        }
        for item in items {
            self.vars.insert(var.to_string(), item);
            if let Flow::Break = self.block(body)? {
                break;
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, value: Value, line: usize) -> Result<(), ScriptError> {
        if target.path.is_empty() {
            self.vars.insert(target.name.clone(), value);
            return Ok(());
        }
        let keys = target
            .path
            .iter()
            .map(|k| self.eval(k, line))
            .collect::<Result<Vec<_>, _>>()?;
        let root = self.vars.entry(target.name.clone()).or_insert(Value::Null);
        set_path(root, &keys, value, line)
    }

    fn eval(&mut self, expr: &Expr, line: usize) -> Result<Value, ScriptError> {
        Ok(match expr {
            Expr::Num(n) => Value::Num(*n),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| runtime(line, format!("undefined variable `{name}`")))?,
            Expr::List(items) => Value::List(
                items
                    .iter()
                    .map(|e| self.eval(e, line))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Object(fields) => {
                let mut m = BTreeMap::new();
                for (k, e) in fields {
                    let v = self.eval(e, line)?;
                    m.insert(k.clone(), v);
                }
                Value::Map(m)
            }
            Expr::Index(base, key) => {
                let base = self.eval(base, line)?;
                let key = self.eval(key, line)?;
                index(&base, &key, line)?
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|e| self.eval(e, line))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, args, line)?
            }
            Expr::Unary(UnOp::Neg, inner) => match self.eval(inner, line)? {
                Value::Num(n) => Value::Num(-n),
                other => return Err(type_error(line, "-", &other)),
            },
            Expr::Unary(UnOp::Not, inner) => Value::Bool(!self.eval(inner, line)?.truthy()),
            Expr::Binary(BinOp::And, lhs, rhs) => {
                Value::Bool(self.eval(lhs, line)?.truthy() && self.eval(rhs, line)?.truthy())
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                Value::Bool(self.eval(lhs, line)?.truthy() || self.eval(rhs, line)?.truthy())
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs, line)?;
                let r = self.eval(rhs, line)?;
                binary(*op, l, r, line)?
            }
        })
    }

    fn call(&mut self, name: &str, args: Vec<Value>, line: usize) -> Result<Value, ScriptError> {
        let arity = |n: usize| -> Result<(), ScriptError> {
            if args.len() == n {
                Ok(())
            } else {
                Err(runtime(
                    line,
                    format!("{name} expects {n} argument(s), got {}", args.len()),
                ))
            }
        };

        Ok(match name {
            "len" => {
                arity(1)?;
                Value::Num(match &args[0] {
                    Value::Str(s) => s.chars().count() as f64,
                    Value::List(items) => items.len() as f64,
                    Value::Map(m) => m.len() as f64,
                    Value::Null => 0.0,
                    other => return Err(type_error(line, "len", other)),
                })
            }
            "min" | "max" => {
                let nums = numbers_of(&args, name, line)?;
                let pick = if name == "min" { f64::min } else { f64::max };
                let first = *nums
                    .first()
                    .ok_or_else(|| runtime(line, format!("{name} of empty sequence")))?;
                Value::Num(nums.iter().copied().fold(first, pick))
            }
            "abs" | "floor" | "ceil" => {
                arity(1)?;
                let n = as_num(&args[0], name, line)?;
                Value::Num(match name {
                    "abs" => n.abs(),
                    "floor" => n.floor(),
                    _ => n.ceil(),
                })
            }
            "round" => {
                let n = as_num(args.first().unwrap_or(&Value::Null), name, line)?;
                match args.len() {
                    1 => Value::Num(n.round()),
                    2 => {
                        let digits = as_int(&args[1], line)?.clamp(0, 12) as i32;
                        let f = 10f64.powi(digits);
                        Value::Num((n * f).round() / f)
                    }
                    _ => return Err(runtime(line, "round expects 1 or 2 arguments".into())),
                }
            }
            "clamp" => {
                arity(3)?;
                let n = as_num(&args[0], name, line)?;
                let lo = as_num(&args[1], name, line)?;
                let hi = as_num(&args[2], name, line)?;
                if lo > hi {
                    return Err(runtime(line, "clamp lower bound exceeds upper".into()));
                }
                Value::Num(n.clamp(lo, hi))
            }
            "range" => {
                let (start, end) = range_bounds(&args, line)?;
                let span = end.saturating_sub(start).max(0) as u64;
                if span > MAX_MATERIALIZED_RANGE {
                    return Err(runtime(
                        line,
                        "range too large outside of a for loop".into(),
                    ));
                }
                Value::List((start..end).map(|i| Value::Num(i as f64)).collect())
            }
            "keys" => {
                arity(1)?;
                match &args[0] {
                    Value::Map(m) => Value::List(m.keys().cloned().map(Value::Str).collect()),
                    Value::Null => Value::List(Vec::new()),
                    other => return Err(type_error(line, "keys", other)),
                }
            }
            "contains" => {
                arity(2)?;
                Value::Bool(match (&args[0], &args[1]) {
                    (Value::Str(h), Value::Str(n)) => h.contains(n.as_str()),
                    (Value::List(items), needle) => items.contains(needle),
                    (Value::Map(m), Value::Str(k)) => m.contains_key(k),
                    (Value::Null, _) => false,
                    (other, _) => return Err(type_error(line, "contains", other)),
                })
            }
            "lower" => {
                arity(1)?;
                match &args[0] {
                    Value::Str(s) => Value::Str(s.to_lowercase()),
                    other => return Err(type_error(line, "lower", other)),
                }
            }
            "str" => {
                arity(1)?;
                Value::Str(args[0].display())
            }
            "num" => {
                arity(1)?;
                match &args[0] {
                    Value::Num(n) => Value::Num(*n),
                    Value::Bool(b) => Value::Num(if *b { 1.0 } else { 0.0 }),
                    Value::Str(s) => s.trim().parse::<f64>().map(Value::Num).unwrap_or(Value::Null),
                    _ => Value::Null,
                }
            }
            "now_ms" => {
                arity(0)?;
                Value::Num((self.clock)() as f64)
            }
            other => return Err(runtime(line, format!("unknown function `{other}`"))),
        })
    }
}

fn range_bounds(args: &[Value], line: usize) -> Result<(i64, i64), ScriptError> {
    let (start, end) = match args {
        [end] => (0, as_int(end, line)?),
        [start, end] => (as_int(start, line)?, as_int(end, line)?),
        _ => return Err(runtime(line, "range expects 1 or 2 arguments".into())),
    };
    let span = end.saturating_sub(start).max(0) as u64;
    if span > MAX_LOOP_ITERATIONS {
        return Err(runtime(
            line,
            format!("range of {span} exceeds iteration bound {MAX_LOOP_ITERATIONS}"),
        ));
    }
    Ok((start, end))
}

fn runtime(line: usize, message: String) -> ScriptError {
    ScriptError::Runtime { line, message }
}

fn type_error(line: usize, op: &str, v: &Value) -> ScriptError {
    runtime(line, format!("`{op}` not supported for {}", v.type_name()))
}

fn as_num(v: &Value, op: &str, line: usize) -> Result<f64, ScriptError> {
    match v {
        Value::Num(n) => Ok(*n),
        other => Err(type_error(line, op, other)),
    }
}

fn as_int(v: &Value, line: usize) -> Result<i64, ScriptError> {
    match v {
        Value::Num(n) if n.is_finite() => Ok(n.trunc() as i64),
        other => Err(runtime(
            line,
            format!("expected an integer, got {}", other.type_name()),
        )),
    }
}

fn numbers_of(args: &[Value], op: &str, line: usize) -> Result<Vec<f64>, ScriptError> {
    let source: &[Value] = match args {
        [Value::List(items)] => items,
        _ => args,
    };
    source.iter().map(|v| as_num(v, op, line)).collect()
}

fn index(base: &Value, key: &Value, line: usize) -> Result<Value, ScriptError> {
    Ok(match (base, key) {
        (Value::Null, _) => Value::Null,
        (Value::Map(m), Value::Str(k)) => m.get(k).cloned().unwrap_or(Value::Null),
        (Value::List(items), Value::Num(n)) => list_slot(items.len(), *n)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null),
        (Value::Str(s), Value::Num(n)) => list_slot(s.chars().count(), *n)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Null),
        (b, k) => {
            return Err(runtime(
                line,
                format!("cannot index {} with {}", b.type_name(), k.type_name()),
            ))
        }
    })
}

/// Negative indices count from the end.
fn list_slot(len: usize, n: f64) -> Option<usize> {
    if !n.is_finite() || n.fract() != 0.0 {
        return None;
    }
    let i = n as i64;
    let i = if i < 0 { len as i64 + i } else { i };
    (i >= 0).then_some(i as usize)
}

fn set_path(slot: &mut Value, keys: &[Value], value: Value, line: usize) -> Result<(), ScriptError> {
    let Some((key, rest)) = keys.split_first() else {
        *slot = value;
        return Ok(());
    };
    if matches!(slot, Value::Null) && matches!(key, Value::Str(_)) {
        *slot = Value::Map(BTreeMap::new());
    }
    match (slot, key) {
        (Value::Map(m), Value::Str(k)) => {
            let child = m.entry(k.clone()).or_insert(Value::Null);
            set_path(child, rest, value, line)
        }
        (Value::List(items), Value::Num(n)) => {
            let len = items.len();
            match list_slot(len, *n) {
                Some(i) if i < len => set_path(&mut items[i], rest, value, line),
                Some(i) if i == len => {
                    items.push(Value::Null);
                    set_path(&mut items[i], rest, value, line)
                }
                _ => Err(runtime(line, format!("list index {n} out of range"))),
            }
        }
        (s, k) => Err(runtime(
            line,
            format!("cannot assign into {} with {}", s.type_name(), k.type_name()),
        )),
    }
}

fn binary(op: BinOp, l: Value, r: Value, line: usize) -> Result<Value, ScriptError> {
    use std::cmp::Ordering;

    let ord = |l: &Value, r: &Value| -> Result<Ordering, ScriptError> {
        match (l, r) {
            (Value::Num(a), Value::Num(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| runtime(line, "cannot compare NaN".into())),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (a, b) => Err(runtime(
                line,
                format!("cannot compare {} with {}", a.type_name(), b.type_name()),
            )),
        }
    };

    Ok(match op {
        BinOp::Eq => Value::Bool(l == r),
        BinOp::Ne => Value::Bool(l != r),
        BinOp::Lt => Value::Bool(ord(&l, &r)? == Ordering::Less),
        BinOp::Le => Value::Bool(ord(&l, &r)? != Ordering::Greater),
        BinOp::Gt => Value::Bool(ord(&l, &r)? == Ordering::Greater),
        BinOp::Ge => Value::Bool(ord(&l, &r)? != Ordering::Less),
        BinOp::Add => match (l, r) {
            (Value::Num(a), Value::Num(b)) => Value::Num(a + b),
            (Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Value::List(a)
            }
            (Value::Map(mut a), Value::Map(b)) => {
                a.extend(b);
                Value::Map(a)
            }
            (a, b) => {
                return Err(runtime(
                    line,
                    format!("cannot add {} and {}", a.type_name(), b.type_name()),
                ))
            }
        },
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            let (Value::Num(a), Value::Num(b)) = (&l, &r) else {
                return Err(runtime(
                    line,
                    format!(
                        "arithmetic on {} and {}",
                        l.type_name(),
                        r.type_name()
                    ),
                ));
            };
            let (a, b) = (*a, *b);
            if matches!(op, BinOp::Div | BinOp::Rem) && b == 0.0 {
                return Err(runtime(line, "division by zero".into()));
            }
            Value::Num(match op {
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            })
        }
        BinOp::And | BinOp::Or => Value::Bool(match op {
            BinOp::And => l.truthy() && r.truthy(),
            _ => l.truthy() || r.truthy(),
        }),
    })
}
