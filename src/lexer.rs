use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Spanned<Lexeme>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Lexeme::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Lexeme> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Lexeme::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            let ch = self.source[self.pos];

            if is_ident_start(ch) {
                return self.scan_ident_or_keyword();
            }

            // `.5` is a number, `.x` is a member access
            if ch.is_ascii_digit()
                || (ch == b'.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
            {
                return self.scan_number();
            }

            if let Some(tok) = self.scan_symbol(start) {
                return tok;
            }
            // scan_symbol returned None → error was recorded, try again
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.pos + 1 < self.source.len() && self.source[self.pos] == b'/' {
                if self.source[self.pos + 1] == b'/' {
                    while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    continue;
                }
                if self.source[self.pos + 1] == b'*' {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.pos + 1 >= self.source.len() {
                            self.pos = self.source.len();
                            self.diagnostics.push(
                                Diagnostic::error("unterminated block comment".to_string())
                                    .at(Span::new(start as u32, self.pos as u32)),
                            );
                            break;
                        }
                        if self.source[self.pos] == b'*' && self.source[self.pos + 1] == b'/' {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                    continue;
                }
            }

            break;
        }
    }

    fn scan_ident_or_keyword(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;
        while self.pos < self.source.len() && is_ident_continue(self.source[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        let token = Lexeme::from_keyword(text).unwrap_or_else(|| Lexeme::Ident(text.to_string()));
        self.make_token(token, start, self.pos)
    }

    fn scan_number(&mut self) -> Spanned<Lexeme> {
        let start = self.pos;

        // Hex literal
        if self.source[self.pos] == b'0'
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
            && self.peek_at(2).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.pos += 2;
            let digits_start = self.pos;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            let digits = std::str::from_utf8(&self.source[digits_start..self.pos]).unwrap();
            let value = u64::from_str_radix(digits, 16).unwrap_or_else(|_| {
                self.diagnostics.push(
                    Diagnostic::error(format!("hex literal '0x{}' is too large", digits))
                        .at(Span::new(start as u32, self.pos as u32)),
                );
                0
            });
            return self.make_token(
                Lexeme::Number {
                    value: value as f64,
                    integer: true,
                },
                start,
                self.pos,
            );
        }

        while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.pos < self.source.len()
            && self.source[self.pos] == b'.'
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.pos += 1;
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        } else if self.pos < self.source.len()
            && self.source[self.pos] == b'.'
            && !self.peek_at(1).is_some_and(is_ident_start)
        {
            // trailing dot: `1.`
            self.pos += 1;
        }
        if self.pos < self.source.len() && matches!(self.source[self.pos], b'e' | b'E') {
            let mark = self.pos;
            self.pos += 1;
            if self.pos < self.source.len() && matches!(self.source[self.pos], b'+' | b'-') {
                self.pos += 1;
            }
            if self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                while self.pos < self.source.len() && self.source[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            } else {
                // not an exponent after all: `1e` is `1` followed by ident `e`
                self.pos = mark;
            }
        }

        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap();
        match text.parse::<f64>() {
            Ok(value) => {
                // integer-ness follows the value, so `1.0` counts
                let integer = value.fract() == 0.0 && value.is_finite();
                self.make_token(Lexeme::Number { value, integer }, start, self.pos)
            }
            Err(_) => {
                self.diagnostics.push(
                    Diagnostic::error(format!("malformed number literal '{}'", text))
                        .at(Span::new(start as u32, self.pos as u32)),
                );
                self.make_token(
                    Lexeme::Number {
                        value: 0.0,
                        integer: true,
                    },
                    start,
                    self.pos,
                )
            }
        }
    }

    fn scan_symbol(&mut self, start: usize) -> Option<Spanned<Lexeme>> {
        let ch = self.source[self.pos];
        self.pos += 1;

        let token = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'{' => Lexeme::LBrace,
            b'}' => Lexeme::RBrace,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            b';' => Lexeme::Semicolon,
            b':' => Lexeme::Colon,
            b'?' => Lexeme::Question,
            b'.' => Lexeme::Dot,
            b'~' => Lexeme::Tilde,
            b'^' => Lexeme::Caret,
            b'+' => match self.peek() {
                Some(b'+') => self.two(Lexeme::PlusPlus),
                Some(b'=') => self.two(Lexeme::PlusEq),
                _ => Lexeme::Plus,
            },
            b'-' => match self.peek() {
                Some(b'-') => self.two(Lexeme::MinusMinus),
                Some(b'=') => self.two(Lexeme::MinusEq),
                _ => Lexeme::Minus,
            },
            b'*' => match self.peek() {
                Some(b'=') => self.two(Lexeme::StarEq),
                _ => Lexeme::Star,
            },
            b'/' => match self.peek() {
                Some(b'=') => self.two(Lexeme::SlashEq),
                _ => Lexeme::Slash,
            },
            b'%' => match self.peek() {
                Some(b'=') => self.two(Lexeme::PercentEq),
                _ => Lexeme::Percent,
            },
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.two(Lexeme::EqEqEq)
                    } else {
                        Lexeme::EqEq
                    }
                } else {
                    Lexeme::Eq
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.two(Lexeme::BangEqEq)
                    } else {
                        Lexeme::BangEq
                    }
                } else {
                    Lexeme::Bang
                }
            }
            b'<' => match self.peek() {
                Some(b'=') => self.two(Lexeme::LtEq),
                Some(b'<') => self.two(Lexeme::LtLt),
                _ => Lexeme::Lt,
            },
            b'>' => match self.peek() {
                Some(b'=') => self.two(Lexeme::GtEq),
                Some(b'>') => {
                    self.pos += 1;
                    if self.peek() == Some(b'>') {
                        self.two(Lexeme::GtGtGt)
                    } else {
                        Lexeme::GtGt
                    }
                }
                _ => Lexeme::Gt,
            },
            b'&' => match self.peek() {
                Some(b'&') => self.two(Lexeme::AmpAmp),
                _ => Lexeme::Amp,
            },
            b'|' => match self.peek() {
                Some(b'|') => self.two(Lexeme::PipePipe),
                _ => Lexeme::Pipe,
            },
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(format!(
                        "unexpected character '{}' (U+{:04X})",
                        ch as char, ch
                    ))
                    .at(Span::new(start as u32, self.pos as u32))
                    .with_help(
                        "this character is not part of the supported kernel subset".to_string(),
                    ),
                );
                return None;
            }
        };

        Some(self.make_token(token, start, self.pos))
    }

    fn two(&mut self, token: Lexeme) -> Lexeme {
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.source.get(self.pos + n).copied()
    }

    fn make_token(&self, token: Lexeme, start: usize, end: usize) -> Spanned<Lexeme> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Lexeme> {
        let (tokens, diags) = Lexer::new(source).tokenize();
        assert!(diags.is_empty(), "unexpected errors: {:?}", diags);
        tokens.into_iter().map(|t| t.node).collect()
    }

    #[test]
    fn test_keywords() {
        let tokens = lex("function return var let const if else for while do break continue this");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Function,
                Lexeme::Return,
                Lexeme::Var,
                Lexeme::Let,
                Lexeme::Const,
                Lexeme::If,
                Lexeme::Else,
                Lexeme::For,
                Lexeme::While,
                Lexeme::Do,
                Lexeme::Break,
                Lexeme::Continue,
                Lexeme::This,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = lex("+ - * / % ++ -- == === != !== < > <= >= && || ! << >> >>>");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Plus,
                Lexeme::Minus,
                Lexeme::Star,
                Lexeme::Slash,
                Lexeme::Percent,
                Lexeme::PlusPlus,
                Lexeme::MinusMinus,
                Lexeme::EqEq,
                Lexeme::EqEqEq,
                Lexeme::BangEq,
                Lexeme::BangEqEq,
                Lexeme::Lt,
                Lexeme::Gt,
                Lexeme::LtEq,
                Lexeme::GtEq,
                Lexeme::AmpAmp,
                Lexeme::PipePipe,
                Lexeme::Bang,
                Lexeme::LtLt,
                Lexeme::GtGt,
                Lexeme::GtGtGt,
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_literals() {
        let tokens = lex("0 1 42 0xff");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Number {
                    value: 0.0,
                    integer: true
                },
                Lexeme::Number {
                    value: 1.0,
                    integer: true
                },
                Lexeme::Number {
                    value: 42.0,
                    integer: true
                },
                Lexeme::Number {
                    value: 255.0,
                    integer: true
                },
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_float_literals() {
        let tokens = lex("1.5 .25 2e3 1.5e-2");
        assert!(matches!(
            tokens[0],
            Lexeme::Number {
                value: v,
                integer: false
            } if v == 1.5
        ));
        assert!(matches!(
            tokens[1],
            Lexeme::Number {
                value: v,
                integer: false
            } if v == 0.25
        ));
        assert!(matches!(tokens[2], Lexeme::Number { value: v, .. } if v == 2000.0));
        assert!(matches!(
            tokens[3],
            Lexeme::Number {
                value: v,
                integer: false
            } if v == 0.015
        ));
    }

    #[test]
    fn test_member_chain() {
        let tokens = lex("this.thread.x");
        assert_eq!(
            tokens,
            vec![
                Lexeme::This,
                Lexeme::Dot,
                Lexeme::Ident("thread".into()),
                Lexeme::Dot,
                Lexeme::Ident("x".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = lex("a // line comment\nb /* block\ncomment */ c");
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("a".into()),
                Lexeme::Ident("b".into()),
                Lexeme::Ident("c".into()),
                Lexeme::Eof,
            ]
        );
    }

    #[test]
    fn test_simple_kernel() {
        let tokens = lex("function kernel(a) { return a[0]; }");
        assert_eq!(tokens[0], Lexeme::Function);
        assert_eq!(tokens[1], Lexeme::Ident("kernel".into()));
        assert_eq!(tokens[2], Lexeme::LParen);
        assert_eq!(tokens[3], Lexeme::Ident("a".into()));
        assert_eq!(tokens[4], Lexeme::RParen);
    }

    // --- Error path tests ---

    fn lex_with_errors(source: &str) -> (Vec<Lexeme>, Vec<Diagnostic>) {
        let (tokens, diags) = Lexer::new(source).tokenize();
        let lexemes = tokens.into_iter().map(|t| t.node).collect();
        (lexemes, diags)
    }

    #[test]
    fn test_error_unexpected_character() {
        let (_tokens, diags) = lex_with_errors("a @ b");
        assert!(!diags.is_empty(), "should produce an error for '@'");
        assert!(
            diags[0].message.contains("unexpected character '@'"),
            "error should name the character, got: {}",
            diags[0].message
        );
    }

    #[test]
    fn test_error_unterminated_block_comment() {
        let (_tokens, diags) = lex_with_errors("a /* no end");
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("unterminated block comment"));
    }

    #[test]
    fn test_error_recovery_continues() {
        let (tokens, diags) = lex_with_errors("a @ b");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            tokens,
            vec![
                Lexeme::Ident("a".into()),
                Lexeme::Ident("b".into()),
                Lexeme::Eof,
            ]
        );
    }
}
