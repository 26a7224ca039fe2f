//! The `collections` filter (`spec.md` §4.3): `array<T>{…}`/`array<T>[…]`
//! (and `vector`, `map`) become `array<T>(…)` etc, with `map`'s `=`- or
//! whitespace-joined pairs flattened to a positional list.

use super::tokens::{tokenize, Kind, Tok};
use super::Error;

pub fn apply(source: &str) -> Result<String, Error> {
    rewrite(&tokenize(source))
}

fn rewrite(toks: &[Tok]) -> Result<String, Error> {
    let mut out = String::new();
    let mut i = 0;
    while i < toks.len() {
        let t = &toks[i];
        if t.kind == Kind::Eof {
            out.push_str(&t.trivia);
            i += 1;
            continue;
        }
        if t.kind == Kind::Ident
            && matches!(t.text.as_str(), "array" | "vector" | "map")
            && toks.get(i + 1).map(|n| &n.kind) == Some(&Kind::LeftAngle)
        {
            if let Some((angle_end, open_idx, close_idx)) = match_literal(toks, i)? {
                out.push_str(&t.trivia);
                out.push_str(&t.text);
                for tk in &toks[i + 1..angle_end] {
                    out.push_str(&tk.trivia);
                    out.push_str(&tk.text);
                }
                out.push_str(&toks[open_idx].trivia);
                out.push('(');
                let inner = &toks[open_idx + 1..close_idx];
                let inner_text = if t.text == "map" {
                    flatten_map_entries(inner)?
                } else {
                    rewrite(inner)?
                };
                out.push_str(&inner_text);
                out.push_str(&toks[close_idx].trivia);
                out.push(')');
                i = close_idx + 1;
                continue;
            }
        }
        out.push_str(&t.trivia);
        out.push_str(&t.text);
        i += 1;
    }
    Ok(out)
}

/// Returns `(angle_end, open_idx, close_idx)` if `array`/`vector`/`map` at
/// `start` is followed by a matching `<…>` and then a brace- or
/// bracket-delimited literal body; `None` if it is a bare type mention with
/// no literal attached.
fn match_literal(toks: &[Tok], start: usize) -> Result<Option<(usize, usize, usize)>, Error> {
    let mut depth = 0i32;
    let mut j = start + 1;
    loop {
        match toks.get(j).map(|t| &t.kind) {
            Some(Kind::LeftAngle) => {
                depth += 1;
                j += 1;
            }
            Some(Kind::RightAngle) => {
                depth -= 1;
                j += 1;
                if depth == 0 {
                    break;
                }
            }
            Some(Kind::Eof) | None => return Err(Error::UnterminatedTemplateList),
            _ => j += 1,
        }
    }
    let angle_end = j;
    let (want_open, want_close) = match toks.get(angle_end).map(|t| &t.kind) {
        Some(Kind::OpenBrace) => (Kind::OpenBrace, Kind::CloseBrace),
        Some(Kind::OpenBracket) => (Kind::OpenBracket, Kind::CloseBracket),
        _ => return Ok(None),
    };
    let open_idx = angle_end;
    let mut depth = 0i32;
    let mut k = open_idx;
    loop {
        match toks.get(k).map(|t| &t.kind) {
            Some(kd) if *kd == want_open => {
                depth += 1;
                k += 1;
            }
            Some(kd) if *kd == want_close => {
                depth -= 1;
                k += 1;
                if depth == 0 {
                    break;
                }
            }
            Some(Kind::Eof) | None => return Err(Error::UnterminatedCollectionLiteral),
            _ => k += 1,
        }
    }
    let close_idx = k - 1;
    Ok(Some((angle_end, open_idx, close_idx)))
}

fn is_open(k: &Kind) -> bool {
    matches!(
        k,
        Kind::OpenParen | Kind::OpenBrace | Kind::OpenBracket | Kind::LeftAngle
    )
}

fn is_close(k: &Kind) -> bool {
    matches!(
        k,
        Kind::CloseParen | Kind::CloseBrace | Kind::CloseBracket | Kind::RightAngle
    )
}

fn split_top_level(toks: &[Tok], is_sep: impl Fn(&Kind) -> bool) -> Vec<Vec<Tok>> {
    let mut groups = Vec::new();
    let mut cur = Vec::new();
    let mut depth = 0i32;
    for t in toks {
        if t.kind == Kind::Eof {
            continue;
        }
        if is_open(&t.kind) {
            depth += 1;
            cur.push(t.clone());
        } else if is_close(&t.kind) {
            depth -= 1;
            cur.push(t.clone());
        } else if depth == 0 && is_sep(&t.kind) {
            groups.push(std::mem::take(&mut cur));
        } else {
            cur.push(t.clone());
        }
    }
    if !cur.is_empty() {
        groups.push(cur);
    }
    groups
}

fn split_juxtaposed_pair(chunk: &[Tok]) -> Option<(Vec<Tok>, Vec<Tok>)> {
    let mut depth = 0i32;
    for (idx, t) in chunk.iter().enumerate() {
        if is_open(&t.kind) {
            depth += 1;
        } else if is_close(&t.kind) {
            depth -= 1;
        }
        if depth == 0 && idx + 1 < chunk.len() {
            let nxt = &chunk[idx + 1];
            if matches!(nxt.kind, Kind::Ident | Kind::Number | Kind::Sentinel) {
                return Some((chunk[..=idx].to_vec(), chunk[idx + 1..].to_vec()));
            }
        }
    }
    None
}

fn flatten_map_entries(inner: &[Tok]) -> Result<String, Error> {
    let comma_chunks = split_top_level(inner, |k| matches!(k, Kind::Comma));
    let mut pairs: Vec<(Vec<Tok>, Vec<Tok>)> = Vec::new();
    for chunk in comma_chunks {
        if chunk.is_empty() {
            continue;
        }
        let eq_split = split_top_level(&chunk, |k| matches!(k, Kind::Eq));
        if eq_split.len() >= 2 {
            let key = eq_split[0].clone();
            let value = eq_split[1..].concat();
            pairs.push((key, value));
        } else if let Some((key, value)) = split_juxtaposed_pair(&chunk) {
            pairs.push((key, value));
        } else {
            pairs.push((chunk, Vec::new()));
        }
    }
    let mut out = String::new();
    for (idx, (k, v)) in pairs.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(rewrite(k)?.trim());
        if !v.is_empty() {
            out.push_str(", ");
            out.push_str(rewrite(v)?.trim());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braces_and_brackets_both_become_parens() {
        assert_eq!(apply("array<i32>{1, 2, 3}").unwrap(), "array<i32>(1, 2, 3)");
        assert_eq!(apply("vector<i32>[1, 2]").unwrap(), "vector<i32>(1, 2)");
    }

    #[test]
    fn map_equals_pairs_flatten_to_positional() {
        assert_eq!(
            apply("map<string,i32>{a=1, b=2}").unwrap(),
            "map<string,i32>(a, 1, b, 2)"
        );
    }

    #[test]
    fn nested_collection_literals_both_convert() {
        assert_eq!(
            apply("vector<vector<i32>>{vector<i32>{1}, vector<i32>{2}}").unwrap(),
            "vector<vector<i32>>(vector<i32>(1), vector<i32>(2))"
        );
    }

    #[test]
    fn bare_type_mention_without_a_literal_is_untouched() {
        assert_eq!(apply("return<array<i32>>").unwrap(), "return<array<i32>>");
    }
}
