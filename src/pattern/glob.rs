// src/pattern/glob.rs

use std::fmt;

use regex::Regex;
use tracing::warn;

/// Returns true if `glob` contains any wildcard (`*` or `?`).
pub fn is_wild(glob: &str) -> bool {
    glob.contains('*') || glob.contains('?')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// `*`: any run of non-separator characters.
    Star,
    /// `**`: any run of characters, separators included.
    DoubleStar,
    /// `**/`: zero or more whole directories.
    DoubleStarSlash,
    /// `?`: one non-separator character.
    Question,
}

impl Token {
    fn is_star(self) -> bool {
        matches!(self, Token::Star | Token::DoubleStar | Token::DoubleStarSlash)
    }

    fn regex(self) -> String {
        match self {
            Token::Literal(c) => regex::escape(c.encode_utf8(&mut [0u8; 4])),
            Token::Star => "[^/]*".to_string(),
            Token::DoubleStar => ".*".to_string(),
            Token::DoubleStarSlash => "(?:.*/)?".to_string(),
            Token::Question => "[^/]".to_string(),
        }
    }
}

/// Split a glob into tokens, left to right. `***` reads as `**` then `*`.
fn tokenize(glob: &str) -> Vec<Token> {
    let chars: Vec<char> = glob.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    tokens.push(Token::DoubleStarSlash);
                    i += 3;
                } else {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                }
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

#[derive(Clone)]
enum Matcher {
    Exact(String),
    Pattern { re: Regex, captures_stem: bool },
}

/// A compiled glob pattern.
///
/// Paths are matched as `/`-separated strings and the match is anchored: the
/// whole path has to match, not a substring. A glob without wildcards matches
/// only the identical string.
///
/// Adjacent `*`/`**` tokens form one *wildcard run*. When a glob has exactly
/// one run, [`stem`](Self::stem) returns the part of a matched path that the
/// run consumed, i.e. the path with the glob's literal prefix and suffix
/// stripped.
#[derive(Clone)]
pub struct CompiledGlob {
    source: String,
    matcher: Matcher,
}

impl fmt::Debug for CompiledGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledGlob").field(&self.source).finish()
    }
}

impl CompiledGlob {
    /// Compile `glob`. Never fails: every character that is not a wildcard is
    /// matched literally.
    pub fn new(glob: &str) -> Self {
        let matcher = if is_wild(glob) {
            compile_pattern(glob)
        } else {
            Matcher::Exact(glob.to_string())
        };

        Self {
            source: glob.to_string(),
            matcher,
        }
    }

    /// The glob string this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(s) => s == path,
            Matcher::Pattern { re, .. } => re.is_match(path),
        }
    }

    /// Substring of `path` covered by the glob's single wildcard run.
    ///
    /// `None` if the path does not match, or if the glob has zero or several
    /// wildcard runs.
    pub fn stem<'p>(&self, path: &'p str) -> Option<&'p str> {
        match &self.matcher {
            Matcher::Pattern {
                re,
                captures_stem: true,
            } => re.captures(path)?.get(1).map(|m| m.as_str()),
            _ => None,
        }
    }
}

fn compile_pattern(glob: &str) -> Matcher {
    let tokens = tokenize(glob);

    let runs = tokens
        .iter()
        .enumerate()
        .filter(|(i, t)| t.is_star() && (*i == 0 || !tokens[i - 1].is_star()))
        .count();
    let captures_stem = runs == 1;

    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');
    let mut in_run = false;
    for token in &tokens {
        if captures_stem && token.is_star() && !in_run {
            re.push('(');
            in_run = true;
        } else if in_run && !token.is_star() {
            re.push(')');
            in_run = false;
        }
        re.push_str(&token.regex());
    }
    if in_run {
        re.push(')');
    }
    re.push('$');

    match Regex::new(&re) {
        Ok(re) => Matcher::Pattern { re, captures_stem },
        Err(e) => {
            // Only reachable through regex size limits on absurd globs.
            warn!(glob = %glob, error = %e, "glob too large to compile; matching literally");
            Matcher::Exact(glob.to_string())
        }
    }
}
