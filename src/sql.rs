//! Pre-parsed SQL fragments: positional/named parameters, quoted literals, and the
//! comment-derived "extra" metadata block (SPEC_FULL.md §4.4).
use crate::data::Composite;

/// One piece of a parsed [`SqlString`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Positional(u32),
    Named(String),
    Quoted(String),
}

/// Failures while parsing or manipulating an [`SqlString`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SqlError {
    #[error("unterminated dollar-quoted literal starting with ${0}$")]
    UnterminatedDollarQuote(String),
    #[error("unterminated single-quoted literal")]
    UnterminatedQuote,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("positional parameter index must be >= 1")]
    ZeroPositionalIndex,
}

const NAMED_CHARS: fn(char) -> bool =
    |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/');

/// A pre-parsed SQL string: an ordered fragment list plus the extra metadata
/// dictionary scraped from `/* $key$value$key$ */` comment headers.
#[derive(Debug, Clone, Default)]
pub struct SqlString {
    fragments: Vec<Fragment>,
    extra: Composite,
}

impl SqlString {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn extra(&self) -> &Composite {
        &self.extra
    }

    /// `true` iff no fragment is an unbound positional/named parameter reference.
    /// Since this type carries only fragment *shape* (no bound values attached — see
    /// [`crate::statement::PreparedStatement`] for bindings), this is `true` iff the
    /// string has no parameter fragments at all.
    pub fn bound(&self) -> bool {
        !self.fragments.iter().any(|f| matches!(f, Fragment::Positional(_) | Fragment::Named(_)))
    }

    /// Concatenate `other`'s fragments onto `self`, renumbering positional parameters
    /// to keep a dense sequence, and merging `extra` with last-wins semantics.
    pub fn append(&mut self, other: &SqlString) {
        let base = self.max_positional();
        for fragment in &other.fragments {
            let fragment = match fragment {
                Fragment::Positional(n) => Fragment::Positional(n + base),
                other => other.clone(),
            };
            self.fragments.push(fragment);
        }
        for (name, value) in other.extra.iter() {
            // last-wins: remove any existing entry for `name` before re-adding
            while let Some(i) = self.extra.find(name, 0) {
                self.extra.erase(i);
            }
            self.extra.push(name, value.cloned());
        }
    }

    fn max_positional(&self) -> u32 {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Positional(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Replace every `Named(name)` fragment with `replacement`'s fragments. Any named
    /// parameters in `replacement` are left intact (now referenced by `self`).
    pub fn replace_parameter(&mut self, name: &str, replacement: &SqlString) {
        let mut out = Vec::with_capacity(self.fragments.len());
        for fragment in self.fragments.drain(..) {
            match &fragment {
                Fragment::Named(n) if n == name => out.extend(replacement.fragments.iter().cloned()),
                _ => out.push(fragment),
            }
        }
        self.fragments = out;
    }

    /// Render, assigning `$n` numbers to positional and named parameters in
    /// first-occurrence order, named parameters numbered after the highest existing
    /// positional index.
    pub fn to_query_string(&self) -> String {
        let mut out = String::new();
        let mut named_numbers: Vec<(String, u32)> = Vec::new();
        let mut next = self.max_positional();

        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Positional(n) => {
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                Fragment::Named(name) => {
                    let n = match named_numbers.iter().find(|(n, _)| n == name) {
                        Some((_, n)) => *n,
                        None => {
                            next += 1;
                            named_numbers.push((name.clone(), next));
                            next
                        }
                    };
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                Fragment::Quoted(body) => {
                    out.push('\'');
                    out.push_str(&body.replace('\'', "''"));
                    out.push('\'');
                }
            }
        }
        out
    }
}

enum State {
    Text,
    Positional { start: usize },
    Named { start: usize },
}

/// Parse one SQL statement, stopping at a top-level `;` or NUL (SPEC_FULL.md §4.4).
/// Use [`parse_all`] to split an input containing several statements.
pub fn parse(input: &str) -> Result<SqlString, SqlError> {
    let (sql, _) = parse_one(input)?;
    Ok(sql)
}

/// Split `input` into a vector of statements at top-level `;`/NUL boundaries.
pub fn parse_all(mut input: &str) -> Result<Vec<SqlString>, SqlError> {
    let mut out = Vec::new();
    loop {
        let (sql, consumed) = parse_one(input)?;
        out.push(sql);
        if consumed >= input.len() {
            break;
        }
        input = &input[consumed..];
        if input.trim_start_matches([';', '\0']).is_empty() {
            break;
        }
        input = input.trim_start_matches([';', '\0']);
    }
    Ok(out)
}

fn parse_one(input: &str) -> Result<(SqlString, usize), SqlError> {
    let mut fragments = Vec::new();
    let mut extra = Composite::new();
    let mut state = State::Text;
    let mut text_start = 0usize;
    let bytes = input.as_bytes();
    let mut chars = input.char_indices().peekable();
    let mut end = input.len();

    macro_rules! flush_text {
        ($upto:expr) => {
            if $upto > text_start {
                fragments.push(Fragment::Text(input[text_start..$upto].to_string()));
            }
        };
    }

    while let Some((i, c)) = chars.next() {
        match &state {
            State::Text => match c {
                '\0' => {
                    flush_text!(i);
                    end = i;
                    break;
                }
                ';' => {
                    flush_text!(i);
                    end = i + 1;
                    break;
                }
                '$' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                    flush_text!(i);
                    state = State::Positional { start: i + 1 };
                }
                ':' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') => {
                    flush_text!(i);
                    state = State::Named { start: i + 1 };
                }
                '$' => {
                    if let Some(tag_end) = input[i + 1..].find('$') {
                        let tag = &input[i + 1..i + 1 + tag_end];
                        if tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                            let body_start = i + 1 + tag_end + 1;
                            let closing = format!("${tag}$");
                            if let Some(rel) = input[body_start..].find(&closing) {
                                flush_text!(i);
                                let body = &input[body_start..body_start + rel];
                                fragments.push(Fragment::Quoted(body.to_string()));
                                let consumed_end = body_start + rel + closing.len();
                                advance_to(&mut chars, consumed_end);
                                text_start = consumed_end;
                                continue;
                            } else {
                                return Err(SqlError::UnterminatedDollarQuote(tag.to_string()));
                            }
                        }
                    }
                }
                '\'' => {
                    let mut j = i + 1;
                    let rest = input.as_bytes();
                    loop {
                        match rest.get(j) {
                            None => return Err(SqlError::UnterminatedQuote),
                            Some(b'\'') if rest.get(j + 1) == Some(&b'\'') => j += 2,
                            Some(b'\'') => {
                                j += 1;
                                break;
                            }
                            Some(_) => j += 1,
                        }
                    }
                    advance_to(&mut chars, j);
                }
                '-' if bytes.get(i + 1) == Some(&b'-') => {
                    let line_end = input[i..].find('\n').map(|n| i + n).unwrap_or(input.len());
                    advance_to(&mut chars, line_end);
                }
                '/' if bytes.get(i + 1) == Some(&b'*') => {
                    let close_rel = input[i + 2..]
                        .find("*/")
                        .ok_or(SqlError::UnterminatedBlockComment)?;
                    let body = &input[i + 2..i + 2 + close_rel];
                    scan_extra(body, &mut extra);
                    let comment_end = i + 2 + close_rel + 2;
                    advance_to(&mut chars, comment_end);
                }
                _ => {}
            },
            State::Positional { start } => {
                if !c.is_ascii_digit() {
                    let n: u32 = input[*start..i].parse().map_err(|_| SqlError::ZeroPositionalIndex)?;
                    if n == 0 {
                        return Err(SqlError::ZeroPositionalIndex);
                    }
                    fragments.push(Fragment::Positional(n));
                    text_start = i;
                    state = State::Text;
                    // reprocess this char in Text state
                    if c == ';' || c == '\0' {
                        if c == ';' {
                            end = i + 1;
                        } else {
                            end = i;
                        }
                        break;
                    }
                }
            }
            State::Named { start } => {
                if !NAMED_CHARS(c) {
                    fragments.push(Fragment::Named(input[*start..i].to_string()));
                    text_start = i;
                    state = State::Text;
                    if c == ';' || c == '\0' {
                        if c == ';' {
                            end = i + 1;
                        } else {
                            end = i;
                        }
                        break;
                    }
                }
            }
        }
    }

    // Flush whatever trailing fragment the loop ended mid-way through.
    match state {
        State::Text => flush_text!(end.min(input.len())),
        State::Positional { start } => {
            let n: u32 = input[start..end.min(input.len())].parse().unwrap_or(0);
            if n > 0 {
                fragments.push(Fragment::Positional(n));
            }
        }
        State::Named { start } => {
            let name = &input[start..end.min(input.len())];
            if !name.is_empty() {
                fragments.push(Fragment::Named(name.to_string()));
            }
        }
    }

    Ok((SqlString { fragments, extra }, end))
}

fn advance_to(chars: &mut std::iter::Peekable<std::str::CharIndices>, target: usize) {
    while let Some((i, _)) = chars.peek() {
        if *i >= target {
            break;
        }
        chars.next();
    }
}

/// Scan a block-comment body for one or more `$key$value$key$` extra entries.
fn scan_extra(body: &str, extra: &mut Composite) {
    let mut rest = body;
    while let Some(open) = rest.find('$') {
        let after_open = &rest[open + 1..];
        let Some(mid) = after_open.find('$') else { break };
        let key = &after_open[..mid];
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            rest = &after_open[mid + 1..];
            continue;
        }
        let after_value_start = &after_open[mid + 1..];
        let closing = format!("${key}$");
        let Some(close_rel) = after_value_start.find(&closing) else { break };
        let value = &after_value_start[..close_rel];
        extra.push(key, Some(crate::data::Data::owned(value.as_bytes().to_vec(), crate::data::Format::Text)));
        rest = &after_value_start[close_rel + closing.len()..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_parameters_render_sequentially() {
        let sql = parse(":a + :b").unwrap();
        assert_eq!(
            sql.fragments(),
            &[Fragment::Named("a".into()), Fragment::Text(" + ".into()), Fragment::Named("b".into())]
        );
        assert_eq!(sql.to_query_string(), "$1 + $2");
    }

    #[test]
    fn extras_are_scraped_from_block_comments() {
        let sql = parse("/* $id$q1$id$ */ SELECT 1").unwrap();
        assert_eq!(sql.extra().get_by_name("id").unwrap().as_str().unwrap(), "q1");
        assert!(sql.fragments().iter().any(|f| matches!(f, Fragment::Text(t) if !t.trim().is_empty())));
    }

    #[test]
    fn positional_parameters_parse() {
        let sql = parse("SELECT $1::int + $2::int").unwrap();
        let positionals: Vec<_> = sql
            .fragments()
            .iter()
            .filter_map(|f| match f {
                Fragment::Positional(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(positionals, vec![1, 2]);
    }

    #[test]
    fn dollar_quoted_literal_is_captured() {
        let sql = parse("SELECT $tag$it's fine$tag$").unwrap();
        assert!(sql.fragments().iter().any(|f| matches!(f, Fragment::Quoted(s) if s == "it's fine")));
    }

    #[test]
    fn stops_at_top_level_semicolon() {
        let sqls = parse_all("SELECT 1; SELECT 2").unwrap();
        assert_eq!(sqls.len(), 2);
    }

    #[test]
    fn replace_parameter_removes_occurrences() {
        let mut sql = parse("SELECT :a").unwrap();
        let replacement = parse("42").unwrap();
        sql.replace_parameter("a", &replacement);
        assert!(!sql.fragments().iter().any(|f| matches!(f, Fragment::Named(n) if n == "a")));
    }
}
