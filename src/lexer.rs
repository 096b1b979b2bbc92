//! Lexical analysis for slot templates
//!
//! Splits a template into literal text and `{{...}}` directive tokens. The
//! lexer never fails: anything it does not recognise stays literal text.

use std::fmt;

/// Block directives that open with `{{#kind ...}}` and close with `{{/kind}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Each,
    If,
    Unless,
}

impl BlockKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "each" => Some(BlockKind::Each),
            "if" => Some(BlockKind::If),
            "unless" => Some(BlockKind::Unless),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Each => "each",
            BlockKind::If => "if",
            BlockKind::Unless => "unless",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    Text(String),
    /// `{{path}}`
    Variable(String),
    /// `{{{path}}}`
    RawVariable(String),
    /// `{{t 'key'}}`
    Translation(String),
    /// `{{#each path}}`, `{{#if cond}}`, `{{#unless cond}}`
    Open { kind: BlockKind, argument: String },
    Else,
    Close(BlockKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Byte span in the template source
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Text(_) => write!(f, "text"),
            TokenType::Variable(path) => write!(f, "{{{{{}}}}}", path),
            TokenType::RawVariable(path) => write!(f, "{{{{{{{}}}}}}}", path),
            TokenType::Translation(key) => write!(f, "{{{{t '{}'}}}}", key),
            TokenType::Open { kind, argument } => write!(f, "{{{{#{} {}}}}}", kind.name(), argument),
            TokenType::Else => write!(f, "{{{{else}}}}"),
            TokenType::Close(kind) => write!(f, "{{{{/{}}}}}", kind.name()),
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let input = self.input;
        while self.position < input.len() {
            let rest = &input[self.position..];
            match rest.find("{{") {
                Some(0) => self.lex_directive(),
                Some(offset) => self.push_text(self.position + offset),
                None => self.push_text(input.len()),
            }
        }
        self.tokens
    }

    /// Consume literal text up to `end`, merging with a preceding text token
    fn push_text(&mut self, end: usize) {
        let input = self.input;
        let start = self.position;
        let text = &input[start..end];
        let line = self.line;
        self.line += text.matches('\n').count();
        self.position = end;

        if let Some(Token { token_type: TokenType::Text(previous), end: prev_end, .. }) = self.tokens.last_mut() {
            if *prev_end == start {
                previous.push_str(text);
                *prev_end = end;
                return;
            }
        }
        self.tokens.push(Token {
            token_type: TokenType::Text(text.to_string()),
            start,
            end,
            line,
        });
    }

    fn push(&mut self, token_type: TokenType, end: usize) {
        let start = self.position;
        let line = self.line;
        self.line += self.input[start..end].matches('\n').count();
        self.position = end;
        self.tokens.push(Token { token_type, start, end, line });
    }

    fn lex_directive(&mut self) {
        let input = self.input;
        let start = self.position;
        let rest = &input[start..];

        if rest.starts_with("{{{") {
            if let Some(close) = rest[3..].find("}}}") {
                let inner = rest[3..3 + close].trim();
                if !inner.is_empty() {
                    self.push(TokenType::RawVariable(inner.to_string()), start + 3 + close + 3);
                    return;
                }
            }
            // A stray brace before a regular directive
            self.push_text(start + 1);
            return;
        }

        let Some(close) = rest[2..].find("}}") else {
            self.push_text(input.len());
            return;
        };
        let end = start + 2 + close + 2;
        let inner = rest[2..2 + close].trim();

        match classify(inner) {
            Some(token_type) => self.push(token_type, end),
            None => self.push_text(end),
        }
    }
}

fn classify(inner: &str) -> Option<TokenType> {
    if inner.is_empty() {
        return None;
    }

    if let Some(body) = inner.strip_prefix('#') {
        let (name, argument) = split_word(body);
        let kind = BlockKind::from_name(name)?;
        return Some(TokenType::Open {
            kind,
            argument: argument.to_string(),
        });
    }

    if let Some(body) = inner.strip_prefix('/') {
        return BlockKind::from_name(body.trim()).map(TokenType::Close);
    }

    if inner == "else" {
        return Some(TokenType::Else);
    }

    if let Some(key) = translation_key(inner) {
        return Some(TokenType::Translation(key.to_string()));
    }

    if inner.contains(char::is_whitespace) {
        // Unknown helper call; leave it alone
        return None;
    }

    Some(TokenType::Variable(inner.to_string()))
}

fn split_word(body: &str) -> (&str, &str) {
    let body = body.trim_start();
    match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], body[idx..].trim()),
        None => (body, ""),
    }
}

/// `t 'key'` or `t "key"` -> `key`
fn translation_key(inner: &str) -> Option<&str> {
    let rest = inner.strip_prefix('t')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let quoted = rest.trim();
    let quote = quoted.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let body = quoted[1..].strip_suffix(quote)?;
    if body.contains(quote) {
        return None;
    }
    Some(body.trim())
}

pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        tokenize(input).into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(types("hello world"), vec![TokenType::Text("hello world".to_string())]);
        assert!(types("").is_empty());
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            types("Hi {{ user.name }} and {{{ bio }}}"),
            vec![
                TokenType::Text("Hi ".to_string()),
                TokenType::Variable("user.name".to_string()),
                TokenType::Text(" and ".to_string()),
                TokenType::RawVariable("bio".to_string()),
            ]
        );
    }

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            types("{{#each items}}{{#if (eq this.kind \"a\")}}A{{else}}B{{/if}}{{/each}}"),
            vec![
                TokenType::Open { kind: BlockKind::Each, argument: "items".to_string() },
                TokenType::Open { kind: BlockKind::If, argument: "(eq this.kind \"a\")".to_string() },
                TokenType::Text("A".to_string()),
                TokenType::Else,
                TokenType::Text("B".to_string()),
                TokenType::Close(BlockKind::If),
                TokenType::Close(BlockKind::Each),
            ]
        );
    }

    #[test]
    fn test_translations() {
        assert_eq!(types("{{t 'cart.title'}}"), vec![TokenType::Translation("cart.title".to_string())]);
        assert_eq!(types("{{t \"add_to_cart\"}}"), vec![TokenType::Translation("add_to_cart".to_string())]);
        assert_eq!(types("{{t}}"), vec![TokenType::Variable("t".to_string())]);
        assert_eq!(types("{{total}}"), vec![TokenType::Variable("total".to_string())]);
    }

    #[test]
    fn test_unknown_directives_stay_text() {
        assert_eq!(
            types("a {{#with x}}b{{/with}} {{helper a b}} {{unclosed"),
            vec![TokenType::Text("a {{#with x}}b{{/with}} {{helper a b}} {{unclosed".to_string())]
        );
    }

    #[test]
    fn test_spans_and_lines() {
        let tokens = tokenize("line1\n{{#if a}}\n{{b}}{{/if}}");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[3].line, 3);
        assert_eq!(&"line1\n{{#if a}}\n{{b}}{{/if}}"[tokens[1].start..tokens[1].end], "{{#if a}}");
    }

    #[test]
    fn test_stray_triple_brace() {
        assert_eq!(
            types("{{{x}}"),
            vec![TokenType::Text("{".to_string()), TokenType::Variable("x".to_string())]
        );
    }
}
