//! Recursive-descent CPL parser.
//!
//! One token of lookahead over the token stream produced by the lexer.
//! Missing structural terminals (`:`, `;`, braces, parentheses, type
//! keywords, `else`, `default`, EOF) trigger panic-mode recovery: one
//! error is recorded per source position, tokens are skipped until a
//! member of the expected set reappears, and parsing continues from the
//! recovered point. If the input ends first, the lookahead is restored
//! and the caller proceeds without the terminal. Expression parsing does
//! not recover: a malformed factor fails the whole expression at once.

use cpq_syntax::ast::{
    ArithmeticOp, BooleanExpression, CompareOp, DataType, Declaration, Expression, Program,
    Statement, SwitchCase,
};
use cpq_syntax::error::ParseError;
use cpq_syntax::token::{Token, TokenKind};

fn starts_statement(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Input
            | TokenKind::Output
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Switch
            | TokenKind::Break
            | TokenKind::LBrace
    )
}

/// CPL parser over a fully tokenized input.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    /// Create a parser over the given tokens. A trailing EOF token is
    /// appended if the lexer did not provide one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", position));
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// All errors recorded so far, in source order.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    fn peek(&self) -> &Token {
        // The vector always ends with EOF and pos never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    /// Consume and return the lookahead if its kind is in `kinds`.
    fn match_token(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        let token = self.peek();
        if kinds.contains(&token.kind) {
            let token = token.clone();
            self.advance();
            Some(token)
        } else {
            None
        }
    }

    /// Record an error at the found token, unless one was already
    /// reported at the same position.
    fn add_error(&mut self, found: &Token, expected: &[&str]) {
        if self.errors.iter().any(|e| e.position == found.position) {
            return;
        }
        self.errors
            .push(ParseError::new(found.lexeme.clone(), expected, found.position));
    }

    /// Match one of `kinds`, applying panic-mode recovery on failure:
    /// record the error, then skip tokens one at a time re-attempting
    /// the match. At EOF the lookahead is restored and `None` returned.
    fn expect(&mut self, kinds: &[TokenKind], expected: &[&str]) -> Option<Token> {
        if let Some(token) = self.match_token(kinds) {
            return Some(token);
        }
        let found = self.peek().clone();
        self.add_error(&found, expected);

        let origin = self.pos;
        while self.peek().kind != TokenKind::Eof {
            self.advance();
            if let Some(token) = self.match_token(kinds) {
                return Some(token);
            }
        }
        self.pos = origin;
        None
    }

    /// `program -> declarations stmt_block EOF`
    pub fn parse_program(&mut self) -> Program {
        let declarations = self.parse_declarations();
        let body = self.parse_statements_block();
        self.expect(&[TokenKind::Eof], &["end of input"]);
        Program { declarations, body }
    }

    /// `declarations -> (declaration)*`
    pub fn parse_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while self.peek().kind == TokenKind::Ident {
            declarations.push(self.parse_declaration());
        }
        declarations
    }

    /// `declaration -> idlist ':' type ';'`
    fn parse_declaration(&mut self) -> Declaration {
        let names = self.parse_id_list();
        self.expect(&[TokenKind::Colon], &[":"]);
        let data_type = self.parse_type();
        self.expect(&[TokenKind::Semicolon], &[";"]);
        Declaration { names, data_type }
    }

    /// `idlist -> ID (',' ID)*`
    fn parse_id_list(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(token) = self.expect(&[TokenKind::Ident], &["ID"]) {
            names.push(token.lexeme);
        }
        while self.match_token(&[TokenKind::Comma]).is_some() {
            if let Some(token) = self.expect(&[TokenKind::Ident], &["ID"]) {
                names.push(token.lexeme);
            }
        }
        names
    }

    /// `type -> INT | FLOAT`; `Unknown` marks an already-reported failure.
    fn parse_type(&mut self) -> DataType {
        match self.expect(&[TokenKind::Int, TokenKind::Float], &["int", "float"]) {
            Some(token) if token.kind == TokenKind::Int => DataType::Integer,
            Some(_) => DataType::Float,
            None => DataType::Unknown,
        }
    }

    /// `stmt_block -> '{' (stmt)* '}'`
    pub fn parse_statements_block(&mut self) -> Vec<Statement> {
        let has_open = self.expect(&[TokenKind::LBrace], &["{"]).is_some();
        let statements = self.parse_statements();
        if has_open {
            self.expect(&[TokenKind::RBrace], &["}"]);
        } else {
            // No '{' was found; a missing '}' is not worth a second error.
            self.match_token(&[TokenKind::RBrace]);
        }
        statements
    }

    fn parse_statements(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        while starts_statement(self.peek().kind) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
        }
        statements
    }

    /// Dispatch on the lookahead. Returns `None` when the lookahead does
    /// not start a statement, or when a sub-parser failed (in which case
    /// the error is already recorded).
    pub fn parse_statement(&mut self) -> Option<Statement> {
        match self.peek().kind {
            TokenKind::Ident => self.parse_assignment(),
            TokenKind::Input => self.parse_input(),
            TokenKind::Output => self.parse_output(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => self.parse_break(),
            TokenKind::LBrace => Some(Statement::Block(self.parse_statements_block())),
            _ => None,
        }
    }

    /// A statement in a position where the grammar requires one (the
    /// branches of `if`, the body of `while`).
    fn parse_required_statement(&mut self) -> Option<Statement> {
        if starts_statement(self.peek().kind) {
            self.parse_statement()
        } else {
            let found = self.peek().clone();
            self.add_error(&found, &["statement"]);
            None
        }
    }

    /// `assignment -> ID '=' (STATIC_CAST '(' type ')')? expression ';'`
    fn parse_assignment(&mut self) -> Option<Statement> {
        let variable = self.expect(&[TokenKind::Ident], &["ID"])?.lexeme;
        self.expect(&[TokenKind::Equals], &["="]);

        let mut cast_type = DataType::Unknown;
        if self.match_token(&[TokenKind::StaticCast]).is_some() {
            self.expect(&[TokenKind::LParen], &["("]);
            cast_type = self.parse_type();
            self.expect(&[TokenKind::RParen], &[")"]);
        }

        let value = self.parse_expression();
        self.expect(&[TokenKind::Semicolon], &[";"]);
        Some(Statement::Assignment {
            variable,
            value: value?,
            cast_type,
        })
    }

    /// `input -> INPUT '(' ID ')' ';'`
    fn parse_input(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::LParen], &["("]);
        let variable = self.expect(&[TokenKind::Ident], &["ID"]).map(|t| t.lexeme);
        self.expect(&[TokenKind::RParen], &[")"]);
        self.expect(&[TokenKind::Semicolon], &[";"]);
        Some(Statement::Input {
            variable: variable?,
        })
    }

    /// `output -> OUTPUT '(' expression ')' ';'`
    fn parse_output(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::LParen], &["("]);
        let value = self.parse_expression();
        self.expect(&[TokenKind::RParen], &[")"]);
        self.expect(&[TokenKind::Semicolon], &[";"]);
        Some(Statement::Output { value: value? })
    }

    /// `if -> IF '(' bool_expr ')' stmt ELSE stmt`
    fn parse_if(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::LParen], &["("]);
        let condition = self.parse_boolean_expression();
        self.expect(&[TokenKind::RParen], &[")"]);
        let then_branch = self.parse_required_statement();
        self.expect(&[TokenKind::Else], &["else"]);
        let else_branch = self.parse_required_statement();
        Some(Statement::If {
            condition: condition?,
            then_branch: Box::new(then_branch?),
            else_branch: Box::new(else_branch?),
        })
    }

    /// `while -> WHILE '(' bool_expr ')' stmt`
    fn parse_while(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::LParen], &["("]);
        let condition = self.parse_boolean_expression();
        self.expect(&[TokenKind::RParen], &[")"]);
        let body = self.parse_required_statement();
        Some(Statement::While {
            condition: condition?,
            body: Box::new(body?),
        })
    }

    /// `switch -> SWITCH '(' expression ')' '{' case* default '}'`
    fn parse_switch(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::LParen], &["("]);
        let selector = self.parse_expression();
        self.expect(&[TokenKind::RParen], &[")"]);
        self.expect(&[TokenKind::LBrace], &["{"]);

        let mut cases = Vec::new();
        while self.match_token(&[TokenKind::Case]).is_some() {
            let value = self.parse_case_value();
            self.expect(&[TokenKind::Colon], &[":"]);
            let statements = self.parse_statements();
            if let Some(value) = value {
                cases.push(SwitchCase { value, statements });
            }
        }

        self.expect(&[TokenKind::Default], &["default"]);
        self.expect(&[TokenKind::Colon], &[":"]);
        let default_case = self.parse_statements();
        self.expect(&[TokenKind::RBrace], &["}"]);

        Some(Statement::Switch {
            selector: selector?,
            cases,
            default_case,
        })
    }

    /// Case labels must be integer literals.
    fn parse_case_value(&mut self) -> Option<i64> {
        let token = self.expect(&[TokenKind::Num], &["NUM"])?;
        match token.lexeme.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.add_error(&token, &["integer literal"]);
                None
            }
        }
    }

    /// `break -> BREAK ';'`
    fn parse_break(&mut self) -> Option<Statement> {
        self.advance();
        self.expect(&[TokenKind::Semicolon], &[";"]);
        Some(Statement::Break)
    }

    /// `expression -> term (ADDOP term)*`, left-associative.
    pub fn parse_expression(&mut self) -> Option<Expression> {
        let mut result = self.parse_term()?;
        while self.peek().kind == TokenKind::AddOp {
            let token = self.peek().clone();
            self.advance();
            let op = if token.lexeme == "+" {
                ArithmeticOp::Add
            } else {
                ArithmeticOp::Subtract
            };
            let rhs = self.parse_term()?;
            result = Expression::Arithmetic {
                op,
                lhs: Box::new(result),
                rhs: Box::new(rhs),
            };
        }
        Some(result)
    }

    /// `term -> factor (MULOP factor)*`, left-associative.
    fn parse_term(&mut self) -> Option<Expression> {
        let mut result = self.parse_factor()?;
        while self.peek().kind == TokenKind::MulOp {
            let token = self.peek().clone();
            self.advance();
            let op = if token.lexeme == "*" {
                ArithmeticOp::Multiply
            } else {
                ArithmeticOp::Divide
            };
            let rhs = self.parse_factor()?;
            result = Expression::Arithmetic {
                op,
                lhs: Box::new(result),
                rhs: Box::new(rhs),
            };
        }
        Some(result)
    }

    /// `factor -> '(' expression ')' | ID | NUM`
    fn parse_factor(&mut self) -> Option<Expression> {
        match self.peek().kind {
            TokenKind::LParen => {
                self.advance();
                let expression = self.parse_expression();
                self.expect(&[TokenKind::RParen], &[")"]);
                expression
            }
            TokenKind::Ident => {
                let token = self.peek().clone();
                self.advance();
                Some(Expression::Variable(token.lexeme))
            }
            TokenKind::Num => {
                let token = self.peek().clone();
                self.advance();
                self.parse_number(&token)
            }
            _ => {
                let found = self.peek().clone();
                self.add_error(&found, &["(", "ID", "NUM"]);
                None
            }
        }
    }

    /// A NUM lexeme with a dot is a float literal, otherwise an integer.
    fn parse_number(&mut self, token: &Token) -> Option<Expression> {
        if token.lexeme.contains('.') {
            match token.lexeme.parse::<f64>() {
                Ok(value) => Some(Expression::FloatLiteral(value)),
                Err(_) => {
                    self.add_error(token, &["NUM"]);
                    None
                }
            }
        } else {
            match token.lexeme.parse::<i64>() {
                Ok(value) => Some(Expression::IntLiteral(value)),
                Err(_) => {
                    self.add_error(token, &["NUM"]);
                    None
                }
            }
        }
    }

    /// `bool_expr -> bool_term (OR bool_term)*`, OR binds loosest.
    pub fn parse_boolean_expression(&mut self) -> Option<BooleanExpression> {
        let mut result = self.parse_boolean_term()?;
        while self.match_token(&[TokenKind::Or]).is_some() {
            let rhs = self.parse_boolean_term()?;
            result = BooleanExpression::Or(Box::new(result), Box::new(rhs));
        }
        Some(result)
    }

    /// `bool_term -> bool_factor (AND bool_factor)*`
    fn parse_boolean_term(&mut self) -> Option<BooleanExpression> {
        let mut result = self.parse_boolean_factor()?;
        while self.match_token(&[TokenKind::And]).is_some() {
            let rhs = self.parse_boolean_factor()?;
            result = BooleanExpression::And(Box::new(result), Box::new(rhs));
        }
        Some(result)
    }

    /// `bool_factor -> NOT bool_factor | '(' bool_expr ')'
    ///               | expression RELOP expression`
    ///
    /// A leading '(' is ambiguous between the two last productions, so
    /// the parenthesized-boolean reading is tried speculatively and
    /// rolled back (position and error list) when it does not pan out.
    fn parse_boolean_factor(&mut self) -> Option<BooleanExpression> {
        if self.match_token(&[TokenKind::Not]).is_some() {
            let inner = self.parse_boolean_factor()?;
            return Some(BooleanExpression::Not(Box::new(inner)));
        }

        if self.peek().kind == TokenKind::LParen {
            let origin = self.pos;
            let recorded = self.errors.len();
            self.advance();
            if let Some(inner) = self.parse_boolean_expression() {
                if self.match_token(&[TokenKind::RParen]).is_some() {
                    return Some(inner);
                }
            }
            self.pos = origin;
            self.errors.truncate(recorded);
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Option<BooleanExpression> {
        let lhs = self.parse_expression()?;
        let Some(token) = self.match_token(&[TokenKind::RelOp]) else {
            let found = self.peek().clone();
            self.add_error(&found, &["==", "!=", "<", ">", "<=", ">="]);
            return None;
        };
        let op = match token.lexeme.as_str() {
            "==" => CompareOp::EqualTo,
            "!=" => CompareOp::NotEqualTo,
            "<" => CompareOp::LessThan,
            ">" => CompareOp::GreaterThan,
            "<=" => CompareOp::LessThanOrEqualTo,
            _ => CompareOp::GreaterThanOrEqualTo,
        };
        let rhs = self.parse_expression()?;
        Some(BooleanExpression::Compare { op, lhs, rhs })
    }
}
