//! The `operators` filter (`spec.md` §4.3): binary and unary operator
//! syntax becomes canonical prefix calls via a Pratt parser. Does not cross
//! template-list `<…>` boundaries (heuristically matched) or literal/
//! comment regions (already opaque sentinels by this point).

use super::tokens::{tokenize, Kind, Tok};
use super::Error;

pub fn apply(source: &str) -> Result<String, Error> {
    let toks = tokenize(source);
    let mut cursor = Cursor { toks: &toks, pos: 0 };
    let mut out = String::new();
    rewrite_region(&mut cursor, &mut out, None)?;
    Ok(out)
}

struct Cursor<'a> {
    toks: &'a [Tok],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> &'a Tok {
        &self.toks[self.pos.min(self.toks.len() - 1)]
    }

    fn advance(&mut self) -> &'a Tok {
        let t = &self.toks[self.pos.min(self.toks.len() - 1)];
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn peek_at(&self, offset: usize) -> &'a Tok {
        &self.toks[(self.pos + offset).min(self.toks.len() - 1)]
    }
}

fn matching_close(open: &Kind) -> Option<Kind> {
    match open {
        Kind::OpenParen => Some(Kind::CloseParen),
        Kind::OpenBrace => Some(Kind::CloseBrace),
        Kind::OpenBracket => Some(Kind::CloseBracket),
        _ => None,
    }
}

/// Copies structural tokens verbatim, recursing into bracketed regions, and
/// invokes the Pratt parser at every point an expression could start. This
/// needs no notion of statement boundaries: a Pratt parse naturally stops
/// once no further operator continues it, so adjacent statements with no
/// connecting token (`doA() doB()`) fall out correctly as two expressions.
fn rewrite_region(cur: &mut Cursor, out: &mut String, stop: Option<Kind>) -> Result<(), Error> {
    loop {
        let at_stop = stop.as_ref().map_or(false, |k| &cur.peek().kind == k);
        if at_stop {
            return Ok(());
        }
        if cur.peek().kind == Kind::Eof {
            return if stop.is_some() {
                Err(Error::MismatchedParentheses)
            } else {
                Ok(())
            };
        }
        if is_expression_start(&cur.peek().kind) {
            out.push_str(&cur.peek().trivia);
            let expr = parse_expr(cur, 0)?;
            out.push_str(&render(&expr));
            continue;
        }
        let tok = cur.advance();
        out.push_str(&tok.trivia);
        out.push_str(&tok.text);
        if let Some(close) = matching_close(&tok.kind) {
            rewrite_region(cur, out, Some(close))?;
            let closing = cur.advance();
            out.push_str(&closing.trivia);
            out.push_str(&closing.text);
        }
    }
}

fn is_expression_start(k: &Kind) -> bool {
    matches!(
        k,
        Kind::Ident
            | Kind::Number
            | Kind::Sentinel
            | Kind::Bang
            | Kind::Minus
            | Kind::Amp
            | Kind::Star
            | Kind::PlusPlus
            | Kind::MinusMinus
    )
}

#[derive(Debug)]
enum FExpr {
    /// Already-rendered text: an identifier/number/sentinel atom, a call's
    /// argument list, a template-arg list, or a dropped grouping paren.
    Verbatim(String),
    Call(String, Vec<FExpr>),
}

fn render(e: &FExpr) -> String {
    match e {
        FExpr::Verbatim(s) => s.clone(),
        FExpr::Call(name, args) => {
            let rendered: Vec<String> = args.iter().map(render).collect();
            format!("{}({})", name, rendered.join(", "))
        }
    }
}

fn unary_name(k: &Kind) -> Option<&'static str> {
    match k {
        Kind::Bang => Some("not"),
        Kind::Minus => Some("negate"),
        Kind::Amp => Some("location"),
        Kind::Star => Some("dereference"),
        Kind::PlusPlus => Some("increment"),
        Kind::MinusMinus => Some("decrement"),
        _ => None,
    }
}

fn binary_op(k: &Kind) -> Option<(&'static str, u8, bool)> {
    // (canonical name, precedence, right-associative)
    match k {
        Kind::Eq => Some(("assign", 1, true)),
        Kind::Or => Some(("or", 2, false)),
        Kind::And => Some(("and", 3, false)),
        Kind::EqEq => Some(("equal", 4, false)),
        Kind::NotEq => Some(("not_equal", 4, false)),
        Kind::LeftAngle => Some(("less_than", 5, false)),
        Kind::LtEq => Some(("less_equal", 5, false)),
        Kind::RightAngle => Some(("greater_than", 5, false)),
        Kind::GtEq => Some(("greater_equal", 5, false)),
        Kind::Plus => Some(("plus", 6, false)),
        Kind::Minus => Some(("minus", 6, false)),
        Kind::Star => Some(("multiply", 7, false)),
        Kind::Slash => Some(("divide", 7, false)),
        _ => None,
    }
}

fn parse_expr(cur: &mut Cursor, min_prec: u8) -> Result<FExpr, Error> {
    let mut left = parse_unary(cur)?;
    loop {
        // `<`/`>` that are really template delimiters must not be consumed
        // as comparisons; `parse_primary` already swallows `ident<…>` whole
        // when it looks like a template list, so by the time we're back
        // here any remaining `<`/`>` is a genuine comparison operator.
        let Some((name, prec, right_assoc)) = binary_op(&cur.peek().kind) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        cur.advance();
        let next_min = if right_assoc { prec } else { prec + 1 };
        let right = parse_expr(cur, next_min)?;
        left = FExpr::Call(name.to_string(), vec![left, right]);
    }
    Ok(left)
}

/// A `-` immediately followed by a digit, with no trivia between them, is
/// the sign of a numeric literal rather than a unary negation: leave it
/// untouched so `implicit-i32` later range-checks the signed value as a
/// whole, matching `rewriteUnaryMinus`'s digit-lookahead in ground truth.
fn is_negative_literal_sign(cur: &Cursor) -> bool {
    cur.peek().kind == Kind::Minus && cur.peek_at(1).kind == Kind::Number && cur.peek_at(1).trivia.is_empty()
}

fn parse_unary(cur: &mut Cursor) -> Result<FExpr, Error> {
    if is_negative_literal_sign(cur) {
        cur.advance();
        let num = cur.advance();
        let mut text = format!("-{}", num.text);
        if cur.peek().kind == Kind::LeftAngle {
            if let Some(template_text) = try_match_template_args(cur) {
                text.push_str(&template_text);
            }
        }
        if cur.peek().kind == Kind::OpenParen {
            let name = text;
            let args = parse_paren_args(cur)?;
            return Ok(FExpr::Call(name, args));
        }
        return Ok(FExpr::Verbatim(text));
    }
    if let Some(name) = unary_name(&cur.peek().kind) {
        cur.advance();
        let operand = parse_unary(cur)?;
        return Ok(FExpr::Call(name.to_string(), vec![operand]));
    }
    parse_postfix(cur)
}

fn parse_postfix(cur: &mut Cursor) -> Result<FExpr, Error> {
    let mut expr = parse_primary(cur)?;
    loop {
        match cur.peek().kind {
            Kind::PlusPlus => {
                cur.advance();
                expr = FExpr::Call("increment".to_string(), vec![expr]);
            }
            Kind::MinusMinus => {
                cur.advance();
                expr = FExpr::Call("decrement".to_string(), vec![expr]);
            }
            Kind::Dot => {
                cur.advance();
                let method = cur.advance();
                let method_name = method.text.clone();
                let args = if cur.peek().kind == Kind::OpenParen {
                    parse_paren_args(cur)?
                } else {
                    Vec::new()
                };
                let mut call_args = vec![expr];
                call_args.extend(args);
                expr = FExpr::Call(method_name, call_args);
            }
            _ => break,
        }
    }
    Ok(expr)
}

fn parse_primary(cur: &mut Cursor) -> Result<FExpr, Error> {
    match cur.peek().kind.clone() {
        Kind::OpenParen => {
            cur.advance();
            let inner = parse_expr(cur, 0)?;
            if cur.peek().kind != Kind::CloseParen {
                return Err(Error::MismatchedParentheses);
            }
            cur.advance();
            Ok(inner)
        }
        Kind::Ident | Kind::Number | Kind::Sentinel => {
            let tok = cur.advance();
            let mut text = tok.text.clone();
            if cur.peek().kind == Kind::LeftAngle {
                if let Some(template_text) = try_match_template_args(cur) {
                    text.push_str(&template_text);
                }
            }
            if cur.peek().kind == Kind::OpenParen {
                let name = text;
                let args = parse_paren_args(cur)?;
                return Ok(FExpr::Call(name, args));
            }
            Ok(FExpr::Verbatim(text))
        }
        _ => Err(Error::MismatchedParentheses),
    }
}

fn parse_paren_args(cur: &mut Cursor) -> Result<Vec<FExpr>, Error> {
    cur.advance(); // '('
    let mut args = Vec::new();
    if cur.peek().kind == Kind::CloseParen {
        cur.advance();
        return Ok(args);
    }
    loop {
        args.push(parse_expr(cur, 0)?);
        match cur.peek().kind {
            Kind::Comma => {
                cur.advance();
            }
            Kind::CloseParen => {
                cur.advance();
                break;
            }
            _ => return Err(Error::MismatchedParentheses),
        }
    }
    Ok(args)
}

/// Tentatively scans a `<…>` as a template-argument list, accepting only
/// tokens a type/path expression could contain. Returns the rendered text
/// (including both angle brackets) and advances past it on success; leaves
/// the cursor untouched and returns `None` on failure, letting the caller
/// treat the `<` as a comparison operator instead.
fn try_match_template_args(cur: &mut Cursor) -> Option<String> {
    let start = cur.pos;
    let mut depth = 0i32;
    let mut text = String::new();
    loop {
        let tok = cur.peek();
        match tok.kind {
            Kind::LeftAngle => {
                depth += 1;
                text.push_str(&tok.trivia);
                text.push_str(&tok.text);
                cur.advance();
            }
            Kind::RightAngle => {
                depth -= 1;
                text.push_str(&tok.trivia);
                text.push_str(&tok.text);
                cur.advance();
                if depth == 0 {
                    return Some(text);
                }
            }
            Kind::Ident | Kind::Number | Kind::Comma | Kind::Dot | Kind::Colon | Kind::Sentinel => {
                text.push_str(&tok.trivia);
                text.push_str(&tok.text);
                cur.advance();
            }
            _ => {
                cur.pos = start;
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_operators_become_prefix_calls_with_precedence() {
        assert_eq!(apply("a + b * c").unwrap(), "plus(a, multiply(b, c))");
    }

    #[test]
    fn assign_is_right_associative() {
        assert_eq!(apply("a = b = c").unwrap(), "assign(a, assign(b, c))");
    }

    #[test]
    fn unary_forms_rewrite() {
        assert_eq!(apply("!x").unwrap(), "not(x)");
        assert_eq!(apply("-x").unwrap(), "negate(x)");
        assert_eq!(apply("&x").unwrap(), "location(x)");
        assert_eq!(apply("*x").unwrap(), "dereference(x)");
        assert_eq!(apply("++x").unwrap(), "increment(x)");
        assert_eq!(apply("x++").unwrap(), "increment(x)");
    }

    #[test]
    fn a_minus_directly_against_a_digit_is_a_literal_sign_not_a_negation() {
        assert_eq!(apply("-2147483648i32").unwrap(), "-2147483648i32");
        assert_eq!(apply("- 5").unwrap(), "negate(5)");
        assert_eq!(apply("a - 1i32").unwrap(), "minus(a, 1i32)");
    }

    #[test]
    fn template_angle_brackets_are_not_rewritten_as_comparisons() {
        assert_eq!(apply("Pointer<i32>(x)").unwrap(), "Pointer<i32>(x)");
    }

    #[test]
    fn comparison_operators_still_rewrite_outside_templates() {
        assert_eq!(apply("a < b").unwrap(), "less_than(a, b)");
    }

    #[test]
    fn adjacent_statements_with_no_connective_stay_separate() {
        assert_eq!(apply("doA() doB()").unwrap(), "doA() doB()");
    }

    #[test]
    fn recurses_into_call_argument_lists_and_bodies() {
        assert_eq!(
            apply("main() { return(a + b) }").unwrap(),
            "main() { return(plus(a, b)) }"
        );
    }
}
