use super::ast::{BinOp, Expr, Stmt, StmtKind, Target, UnOp};
use super::lexer::{tokenize, Tok, Token};
use super::ScriptError;

const MAX_NESTING: usize = 64;

pub fn parse(src: &str) -> Result<Vec<Stmt>, ScriptError> {
    let mut p = Parser {
        toks: tokenize(src)?,
        pos: 0,
        depth: 0,
        loops: 0,
    };
    let stmts = p.statements(&Tok::Eof)?;
    p.expect(&Tok::Eof)?;
    Ok(stmts)
}

struct Parser {
    toks: Vec<Token>,
    pos: usize,
    depth: usize,
    loops: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos.min(self.toks.len() - 1)].tok
    }

    fn line(&self) -> usize {
        self.toks[self.pos.min(self.toks.len() - 1)].line
    }

    fn bump(&mut self) -> Tok {
        let t = self.peek().clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), ScriptError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    fn skip_seps(&mut self) {
        while self.eat(&Tok::Sep) {}
    }

    fn error(&self, message: String) -> ScriptError {
        ScriptError::Syntax {
            line: self.line(),
            message,
        }
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("nesting too deep".into()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Statements up to (not including) `end`.
    fn statements(&mut self, end: &Tok) -> Result<Vec<Stmt>, ScriptError> {
        let mut out = Vec::new();
        self.skip_seps();
        while self.peek() != end && self.peek() != &Tok::Eof {
            out.push(self.statement()?);
            if self.peek() == end {
                break;
            }
            if !self.eat(&Tok::Sep) {
                return Err(self.error(format!(
                    "expected end of statement, found {:?}",
                    self.peek()
                )));
            }
            self.skip_seps();
        }
        Ok(out)
    }

    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.enter()?;
        self.expect(&Tok::LBrace)?;
        let body = self.statements(&Tok::RBrace)?;
        self.expect(&Tok::RBrace)?;
        self.leave();
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        let kind = match self.peek() {
            Tok::If => self.if_statement()?,
            Tok::For => {
                self.bump();
                let var = match self.bump() {
                    Tok::Ident(name) => name,
                    other => return Err(self.error(format!("expected loop variable, found {other:?}"))),
                };
                self.expect(&Tok::In)?;
                let iter = self.expr()?;
                self.loops += 1;
                let body = self.block();
                self.loops -= 1;
                StmtKind::For(var, iter, body?)
            }
            Tok::Break | Tok::Continue => {
                if self.loops == 0 {
                    return Err(self.error(format!("{:?} outside of a loop", self.peek())));
                }
                if self.bump() == Tok::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            Tok::Fail => {
                self.bump();
                StmtKind::Fail(self.expr()?)
            }
            _ => {
                let lhs = self.expr()?;
                if self.eat(&Tok::Assign) {
                    let target = into_target(lhs).ok_or_else(|| {
                        self.error("left side of `=` must be a variable, field or index".into())
                    })?;
                    StmtKind::Assign(target, self.expr()?)
                } else {
                    StmtKind::Expr(lhs)
                }
            }
        };
        Ok(Stmt { line, kind })
    }

    fn if_statement(&mut self) -> Result<StmtKind, ScriptError> {
        self.expect(&Tok::If)?;
        let cond = self.expr()?;
        let then = self.block()?;

        // Allow `}` newline `else`.
        let save = self.pos;
        self.skip_seps();
        if !self.eat(&Tok::Else) {
            self.pos = save;
            return Ok(StmtKind::If(cond, then, Vec::new()));
        }

        let otherwise = if self.peek() == &Tok::If {
            let line = self.line();
            self.enter()?;
            let nested = self.if_statement()?;
            self.leave();
            vec![Stmt { line, kind: nested }]
        } else {
            self.block()?
        };
        Ok(StmtKind::If(cond, then, otherwise))
    }

    fn expr(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let e = self.or_expr();
        self.leave();
        e
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Tok::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Tok::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&Tok::Not) {
            self.enter()?;
            let inner = self.not_expr();
            self.leave();
            return Ok(Expr::Unary(UnOp::Not, Box::new(inner?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Tok::EqEq => BinOp::Eq,
            Tok::NotEq => BinOp::Ne,
            Tok::Lt => BinOp::Lt,
            Tok::Le => BinOp::Le,
            Tok::Gt => BinOp::Gt,
            Tok::Ge => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.additive()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&Tok::Minus) {
            self.enter()?;
            let inner = self.unary();
            self.leave();
            return Ok(Expr::Unary(UnOp::Neg, Box::new(inner?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut e = self.primary()?;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.bump();
                    match self.bump() {
                        Tok::Ident(field) => {
                            e = Expr::Index(Box::new(e), Box::new(Expr::Str(field)));
                        }
                        other => {
                            return Err(self.error(format!("expected field name, found {other:?}")))
                        }
                    }
                }
                Tok::LBracket => {
                    self.bump();
                    self.skip_seps();
                    let key = self.expr()?;
                    self.skip_seps();
                    self.expect(&Tok::RBracket)?;
                    e = Expr::Index(Box::new(e), Box::new(key));
                }
                Tok::LParen => {
                    let Expr::Var(name) = e else {
                        return Err(self.error("only builtin functions can be called".into()));
                    };
                    self.bump();
                    let args = self.comma_list(&Tok::RParen)?;
                    e = Expr::Call(name, args);
                }
                _ => return Ok(e),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.bump() {
            Tok::Num(n) => Ok(Expr::Num(n)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::True => Ok(Expr::Bool(true)),
            Tok::False => Ok(Expr::Bool(false)),
            Tok::Null => Ok(Expr::Null),
            Tok::Ident(name) => Ok(Expr::Var(name)),
            Tok::LParen => {
                self.skip_seps();
                let e = self.expr()?;
                self.skip_seps();
                self.expect(&Tok::RParen)?;
                Ok(e)
            }
            Tok::LBracket => Ok(Expr::List(self.comma_list(&Tok::RBracket)?)),
            Tok::LBrace => self.object_literal(),
            other => Err(self.error(format!("unexpected {other:?}"))),
        }
    }

    /// Comma separated expressions; the opening delimiter is already consumed.
    fn comma_list(&mut self, close: &Tok) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        self.skip_seps();
        while !self.eat(close) {
            items.push(self.expr()?);
            self.skip_seps();
            if !self.eat(&Tok::Comma) {
                self.skip_seps();
                self.expect(close)?;
                break;
            }
            self.skip_seps();
        }
        Ok(items)
    }

    fn object_literal(&mut self) -> Result<Expr, ScriptError> {
        let mut fields = Vec::new();
        self.skip_seps();
        while !self.eat(&Tok::RBrace) {
            let key = match self.bump() {
                Tok::Ident(k) | Tok::Str(k) => k,
                other => return Err(self.error(format!("expected object key, found {other:?}"))),
            };
            self.skip_seps();
            self.expect(&Tok::Colon)?;
            self.skip_seps();
            fields.push((key, self.expr()?));
            self.skip_seps();
            if !self.eat(&Tok::Comma) {
                self.skip_seps();
                self.expect(&Tok::RBrace)?;
                break;
            }
            self.skip_seps();
        }
        Ok(Expr::Object(fields))
    }
}

fn into_target(e: Expr) -> Option<Target> {
    let mut path = Vec::new();
    let mut cur = e;
    loop {
        match cur {
            Expr::Var(name) => {
                path.reverse();
                return Some(Target { name, path });
            }
            Expr::Index(base, key) => {
                path.push(*key);
                cur = *base;
            }
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignment_and_precedence() {
        let stmts = parse("x = 1 + 2 * 3").unwrap();
        assert_eq!(stmts.len(), 1);
        let StmtKind::Assign(target, Expr::Binary(BinOp::Add, lhs, rhs)) = &stmts[0].kind else {
            panic!("unexpected ast: {:?}", stmts[0]);
        };
        assert_eq!(target.name, "x");
        assert_eq!(**lhs, Expr::Num(1.0));
        assert!(matches!(**rhs, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn parses_nested_target_path() {
        let stmts = parse("result.meta[\"k\"] = 1").unwrap();
        let StmtKind::Assign(target, _) = &stmts[0].kind else {
            panic!("not an assignment");
        };
        assert_eq!(target.name, "result");
        assert_eq!(
            target.path,
            vec![Expr::Str("meta".into()), Expr::Str("k".into())]
        );
    }

    #[test]
    fn multiline_object_and_else_on_next_line() {
        let src = r#"
            if payload.size > 10 {
                result = {
                    "ok": false,
                    issues: ["too big"],
                }
            }
            else if payload.size > 5 {
                result = {ok: true}
            } else {
                result = {}
            }
        "#;
        let stmts = parse(src).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line, 2);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        assert!(parse("break").is_err());
        assert!(parse("for i in range(3) { if i > 1 { break } }").is_ok());
    }

    #[test]
    fn calls_are_limited_to_names() {
        assert!(parse("x = (1)(2)").is_err());
        assert!(parse("x = len([1, 2])").is_ok());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let src = format!("x = {}1{}", "(".repeat(200), ")".repeat(200));
        assert!(matches!(parse(&src), Err(ScriptError::Syntax { .. })));
    }

    #[test]
    fn invalid_assignment_target() {
        assert!(parse("1 = 2").is_err());
        assert!(parse("len(x) = 2").is_err());
    }
}
