//! CPL lexer: converts source text into tokens.
//!
//! The scanner is greedy (longest match wins), keywords win over
//! identifiers, and everything it cannot classify comes back in-band as
//! an [`TokenKind::Illegal`] token rather than an error, so the parser
//! can keep consuming input for recovery.

use cpq_syntax::token::{Position, Token, TokenKind};

/// Identifiers longer than this are illegal. Keywords are matched by
/// exact lexeme lookup before this check, which is how `static_cast`
/// (11 characters, one underscore) stays legal.
pub const MAX_IDENTIFIER_LENGTH: usize = 9;

/// Streaming character scanner that produces tokens with positions.
///
/// Positions are zero-based; tabs advance the column by one and a
/// newline resets it. Once the input is exhausted, [`next_token`]
/// returns an EOF token on every subsequent call.
///
/// [`next_token`]: Lexer::next_token
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        ch
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.col,
        }
    }

    /// Skip a (possibly nested) block comment. The opening `/*` has not
    /// been consumed yet. Returns false when the input ends inside the
    /// comment.
    fn skip_comment(&mut self) -> bool {
        self.advance();
        self.advance();
        let mut depth = 1usize;
        while let Some(c) = self.advance() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            } else if c == '/' && self.peek() == Some('*') {
                self.advance();
                depth += 1;
            }
        }
        false
    }

    fn scan_word(&mut self, start: Position) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = match word.as_str() {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "else" => TokenKind::Else,
            "float" => TokenKind::Float,
            "if" => TokenKind::If,
            "input" => TokenKind::Input,
            "int" => TokenKind::Int,
            "output" => TokenKind::Output,
            "static_cast" => TokenKind::StaticCast,
            "switch" => TokenKind::Switch,
            "while" => TokenKind::While,
            _ if word.len() <= MAX_IDENTIFIER_LENGTH && !word.contains('_') => TokenKind::Ident,
            _ => TokenKind::Illegal,
        };
        Token::new(kind, word, start)
    }

    /// Scan a number: digits and dots, greedily. `1.2.3` comes out as a
    /// single NUM lexeme; the parser reports it when it fails to parse.
    fn scan_number(&mut self, start: Position) -> Token {
        let mut number = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                number.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Num, number, start)
    }

    /// Scan a one- or two-character operator. `second` extends the
    /// operator when it immediately follows; `alone` classifies the
    /// single character by itself.
    fn scan_operator(
        &mut self,
        start: Position,
        second: char,
        extended: TokenKind,
        alone: TokenKind,
    ) -> Token {
        let Some(first) = self.advance() else {
            return Token::new(TokenKind::Eof, "", start);
        };
        if self.peek() == Some(second) {
            self.advance();
            let mut lexeme = String::from(first);
            lexeme.push(second);
            Token::new(extended, lexeme, start)
        } else {
            Token::new(alone, first.to_string(), start)
        }
    }

    /// Return the next token and its literal value.
    pub fn next_token(&mut self) -> Token {
        // Skip whitespace and comments; both advance positions.
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let start = self.position();
                    if !self.skip_comment() {
                        return Token::new(TokenKind::Illegal, "", start);
                    }
                }
                _ => break,
            }
        }

        let start = self.position();
        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::Eof, "", start);
        };

        match ch {
            c if c.is_ascii_alphabetic() => self.scan_word(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            '<' | '>' => self.scan_operator(start, '=', TokenKind::RelOp, TokenKind::RelOp),
            '=' => self.scan_operator(start, '=', TokenKind::RelOp, TokenKind::Equals),
            '!' => self.scan_operator(start, '=', TokenKind::RelOp, TokenKind::Not),
            '|' => self.scan_operator(start, '|', TokenKind::Or, TokenKind::Illegal),
            '&' => self.scan_operator(start, '&', TokenKind::And, TokenKind::Illegal),
            '+' | '-' => self.single(start, TokenKind::AddOp),
            '*' | '/' => self.single(start, TokenKind::MulOp),
            '(' => self.single(start, TokenKind::LParen),
            ')' => self.single(start, TokenKind::RParen),
            '{' => self.single(start, TokenKind::LBrace),
            '}' => self.single(start, TokenKind::RBrace),
            ',' => self.single(start, TokenKind::Comma),
            ';' => self.single(start, TokenKind::Semicolon),
            ':' => self.single(start, TokenKind::Colon),
            _ => self.single(start, TokenKind::Illegal),
        }
    }

    fn single(&mut self, start: Position, kind: TokenKind) -> Token {
        match self.advance() {
            Some(c) => Token::new(kind, c.to_string(), start),
            None => Token::new(TokenKind::Eof, "", start),
        }
    }

    /// Tokenize the entire input into a vector ending with an EOF token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}
