use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

pub struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse a whole source: a sequence of statements.
    pub fn parse_program(mut self) -> Result<Vec<Spanned<Node>>, Vec<Diagnostic>> {
        let mut statements = Vec::new();
        while !self.at(&Lexeme::Eof) {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                // Statement made no progress; skip the offending token.
                self.advance();
            }
        }
        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(statements)
    }

    // --- Statements ---

    fn parse_statement(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        match self.peek() {
            Lexeme::Function => self.parse_function(true),
            Lexeme::Return => {
                self.advance();
                let argument = if self.at(&Lexeme::Semicolon) || self.at(&Lexeme::RBrace) {
                    None
                } else {
                    Some(Box::new(self.parse_expression_sequence()))
                };
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::Return(argument), start)
            }
            Lexeme::Var | Lexeme::Let | Lexeme::Const => {
                let decl = self.parse_variable_declaration();
                self.eat(&Lexeme::Semicolon);
                decl
            }
            Lexeme::If => self.parse_if(),
            Lexeme::For => self.parse_for(),
            Lexeme::While => {
                self.advance();
                self.expect(&Lexeme::LParen);
                let test = Box::new(self.parse_expression_sequence());
                self.expect(&Lexeme::RParen);
                let body = Box::new(self.parse_statement());
                self.spanned(Node::While { test, body }, start)
            }
            Lexeme::Do => {
                self.advance();
                let body = Box::new(self.parse_statement());
                self.expect(&Lexeme::While);
                self.expect(&Lexeme::LParen);
                let test = Box::new(self.parse_expression_sequence());
                self.expect(&Lexeme::RParen);
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::DoWhile { body, test }, start)
            }
            Lexeme::Break => {
                self.advance();
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::Break, start)
            }
            Lexeme::Continue => {
                self.advance();
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::Continue, start)
            }
            Lexeme::Debugger => {
                self.advance();
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::Debugger, start)
            }
            Lexeme::Semicolon => {
                self.advance();
                self.spanned(Node::Empty, start)
            }
            Lexeme::LBrace => self.parse_block(),
            _ => {
                let expr = self.parse_expression_sequence();
                self.eat(&Lexeme::Semicolon);
                self.spanned(Node::ExpressionStatement(Box::new(expr)), start)
            }
        }
    }

    fn parse_block(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        self.expect(&Lexeme::LBrace);
        let mut statements = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let before = self.pos;
            statements.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        self.expect(&Lexeme::RBrace);
        self.spanned(Node::Block(statements), start)
    }

    fn parse_function(&mut self, statement_position: bool) -> Spanned<Node> {
        let start = self.current_span();
        self.expect(&Lexeme::Function);
        let name = self.try_ident();
        self.expect(&Lexeme::LParen);
        let mut params = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            params.push(self.expect_ident());
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.expect(&Lexeme::RParen);
        let body = Box::new(self.parse_block());
        let node = if statement_position {
            Node::FunctionDeclaration { name, params, body }
        } else {
            Node::FunctionExpression { name, params, body }
        };
        self.spanned(node, start)
    }

    fn parse_variable_declaration(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let kind = match self.peek() {
            Lexeme::Let => VarKind::Let,
            Lexeme::Const => VarKind::Const,
            _ => VarKind::Var,
        };
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current_span();
            let id = self.expect_ident();
            let id = Box::new(Spanned::new(Node::Identifier(id.node), id.span));
            let init = if self.eat(&Lexeme::Eq) {
                Some(Box::new(self.parse_expression()))
            } else {
                None
            };
            declarations.push(self.spanned(Node::VariableDeclarator { id, init }, decl_start));
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        self.spanned(Node::VariableDeclaration { kind, declarations }, start)
    }

    fn parse_if(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        self.expect(&Lexeme::If);
        self.expect(&Lexeme::LParen);
        let test = Box::new(self.parse_expression_sequence());
        self.expect(&Lexeme::RParen);
        let consequent = Box::new(self.parse_statement());
        let alternate = if self.eat(&Lexeme::Else) {
            Some(Box::new(self.parse_statement()))
        } else {
            None
        };
        self.spanned(
            Node::If {
                test,
                consequent,
                alternate,
            },
            start,
        )
    }

    fn parse_for(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        self.expect(&Lexeme::For);
        self.expect(&Lexeme::LParen);

        let init = if self.at(&Lexeme::Semicolon) {
            None
        } else if matches!(self.peek(), Lexeme::Var | Lexeme::Let | Lexeme::Const) {
            Some(Box::new(self.parse_variable_declaration()))
        } else {
            Some(Box::new(self.parse_expression_sequence()))
        };
        self.expect(&Lexeme::Semicolon);

        let test = if self.at(&Lexeme::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression_sequence()))
        };
        self.expect(&Lexeme::Semicolon);

        let update = if self.at(&Lexeme::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression_sequence()))
        };
        self.expect(&Lexeme::RParen);

        let body = Box::new(self.parse_statement());
        self.spanned(
            Node::For {
                init,
                test,
                update,
                body,
            },
            start,
        )
    }

    // --- Expressions ---

    /// Expression that may be a comma-joined sequence.
    fn parse_expression_sequence(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let first = self.parse_expression();
        if !self.at(&Lexeme::Comma) {
            return first;
        }
        let mut expressions = vec![first];
        while self.eat(&Lexeme::Comma) {
            expressions.push(self.parse_expression());
        }
        self.spanned(Node::Sequence(expressions), start)
    }

    pub fn parse_expression(&mut self) -> Spanned<Node> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let target = self.parse_conditional();
        let op = match self.peek() {
            Lexeme::Eq => AssignOp::Assign,
            Lexeme::PlusEq => AssignOp::AddAssign,
            Lexeme::MinusEq => AssignOp::SubAssign,
            Lexeme::StarEq => AssignOp::MulAssign,
            Lexeme::SlashEq => AssignOp::DivAssign,
            Lexeme::PercentEq => AssignOp::ModAssign,
            _ => return target,
        };
        if !matches!(target.node, Node::Identifier(_) | Node::Member { .. }) {
            self.error_at_current("invalid assignment target");
        }
        self.advance();
        let value = Box::new(self.parse_assignment());
        self.spanned(
            Node::Assignment {
                op,
                target: Box::new(target),
                value,
            },
            start,
        )
    }

    fn parse_conditional(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let test = self.parse_binary(0);
        if !self.eat(&Lexeme::Question) {
            return test;
        }
        let consequent = Box::new(self.parse_assignment());
        self.expect(&Lexeme::Colon);
        let alternate = Box::new(self.parse_assignment());
        self.spanned(
            Node::Conditional {
                test: Box::new(test),
                consequent,
                alternate,
            },
            start,
        )
    }

    fn parse_binary(&mut self, min_bp: u8) -> Spanned<Node> {
        let start = self.current_span();
        let mut lhs = self.parse_unary();

        loop {
            let (l_bp, r_bp, op) = match binding_power(self.peek()) {
                Some(bp) => bp,
                None => break,
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(r_bp);
            let node = match op {
                InfixOp::Binary(op) => Node::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
                InfixOp::Logical(op) => Node::Logical {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                },
            };
            lhs = self.spanned(node, start);
        }

        lhs
    }

    fn parse_unary(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let op = match self.peek() {
            Lexeme::Minus => Some(UnaryOp::Minus),
            Lexeme::Plus => Some(UnaryOp::Plus),
            Lexeme::Bang => Some(UnaryOp::Not),
            Lexeme::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = Box::new(self.parse_unary());
            return self.spanned(
                Node::Unary {
                    op,
                    prefix: true,
                    argument,
                },
                start,
            );
        }
        let update = match self.peek() {
            Lexeme::PlusPlus => Some(UpdateOp::Inc),
            Lexeme::MinusMinus => Some(UpdateOp::Dec),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let argument = Box::new(self.parse_unary());
            return self.spanned(
                Node::Update {
                    op,
                    prefix: true,
                    argument,
                },
                start,
            );
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        let mut expr = self.parse_primary();

        loop {
            match self.peek() {
                Lexeme::LParen => {
                    self.advance();
                    let mut arguments = Vec::new();
                    while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
                        arguments.push(self.parse_expression());
                        if !self.eat(&Lexeme::Comma) {
                            break;
                        }
                    }
                    self.expect(&Lexeme::RParen);
                    expr = self.spanned(
                        Node::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        start,
                    );
                }
                Lexeme::LBracket => {
                    self.advance();
                    let index = self.parse_expression_sequence();
                    self.expect(&Lexeme::RBracket);
                    expr = self.spanned(
                        Node::Member {
                            object: Box::new(expr),
                            property: MemberProperty::Computed(Box::new(index)),
                        },
                        start,
                    );
                }
                Lexeme::Dot => {
                    self.advance();
                    let name = self.expect_ident();
                    expr = self.spanned(
                        Node::Member {
                            object: Box::new(expr),
                            property: MemberProperty::Named(name),
                        },
                        start,
                    );
                }
                Lexeme::PlusPlus | Lexeme::MinusMinus => {
                    let op = if self.at(&Lexeme::PlusPlus) {
                        UpdateOp::Inc
                    } else {
                        UpdateOp::Dec
                    };
                    self.advance();
                    expr = self.spanned(
                        Node::Update {
                            op,
                            prefix: false,
                            argument: Box::new(expr),
                        },
                        start,
                    );
                }
                _ => break,
            }
        }

        expr
    }

    fn parse_primary(&mut self) -> Spanned<Node> {
        let start = self.current_span();
        match self.peek().clone() {
            Lexeme::Number { value, integer } => {
                self.advance();
                self.spanned(Node::Literal(Literal::Number { value, integer }), start)
            }
            Lexeme::True => {
                self.advance();
                self.spanned(Node::Literal(Literal::Boolean(true)), start)
            }
            Lexeme::False => {
                self.advance();
                self.spanned(Node::Literal(Literal::Boolean(false)), start)
            }
            Lexeme::Ident(name) => {
                self.advance();
                self.spanned(Node::Identifier(name), start)
            }
            Lexeme::This => {
                self.advance();
                self.spanned(Node::This, start)
            }
            Lexeme::Function => self.parse_function(false),
            Lexeme::LParen => {
                self.advance();
                let expr = self.parse_expression_sequence();
                self.expect(&Lexeme::RParen);
                expr
            }
            Lexeme::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(&Lexeme::RBracket) && !self.at(&Lexeme::Eof) {
                    elements.push(self.parse_expression());
                    if !self.eat(&Lexeme::Comma) {
                        break;
                    }
                }
                self.expect(&Lexeme::RBracket);
                self.spanned(Node::Array(elements), start)
            }
            tok => {
                self.error_at_current(&format!("unexpected {}", tok.description()));
                // recovery placeholder so callers can continue
                self.spanned(
                    Node::Literal(Literal::Number {
                        value: 0.0,
                        integer: true,
                    }),
                    start,
                )
            }
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn spanned(&self, node: Node, start: Span) -> Spanned<Node> {
        Spanned::new(node, start.merge(self.prev_span()))
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!("expected {}", token.description()));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current("expected identifier");
            Spanned::new("_error_".to_string(), self.current_span())
        }
    }

    fn try_ident(&mut self) -> Option<Spanned<String>> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Some(Spanned::new(name, span))
        } else {
            None
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        let span = self.current_span();
        self.diagnostics
            .push(Diagnostic::error(msg.to_string()).at(span));
    }
}

enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Returns (left binding power, right binding power, operator) for an infix
/// token. Higher binding power = higher precedence; all left-associative.
fn binding_power(token: &Lexeme) -> Option<(u8, u8, InfixOp)> {
    use InfixOp::*;
    let bp = match token {
        Lexeme::PipePipe => (1, 2, Logical(LogicalOp::Or)),
        Lexeme::AmpAmp => (3, 4, Logical(LogicalOp::And)),
        Lexeme::Pipe => (5, 6, Binary(BinaryOp::BitOr)),
        Lexeme::Caret => (7, 8, Binary(BinaryOp::BitXor)),
        Lexeme::Amp => (9, 10, Binary(BinaryOp::BitAnd)),
        Lexeme::EqEq => (11, 12, Binary(BinaryOp::Eq)),
        Lexeme::BangEq => (11, 12, Binary(BinaryOp::NotEq)),
        Lexeme::EqEqEq => (11, 12, Binary(BinaryOp::StrictEq)),
        Lexeme::BangEqEq => (11, 12, Binary(BinaryOp::StrictNotEq)),
        Lexeme::Lt => (13, 14, Binary(BinaryOp::Lt)),
        Lexeme::Gt => (13, 14, Binary(BinaryOp::Gt)),
        Lexeme::LtEq => (13, 14, Binary(BinaryOp::LtEq)),
        Lexeme::GtEq => (13, 14, Binary(BinaryOp::GtEq)),
        Lexeme::LtLt => (15, 16, Binary(BinaryOp::Shl)),
        Lexeme::GtGt => (15, 16, Binary(BinaryOp::Shr)),
        Lexeme::GtGtGt => (15, 16, Binary(BinaryOp::UShr)),
        Lexeme::Plus => (17, 18, Binary(BinaryOp::Add)),
        Lexeme::Minus => (17, 18, Binary(BinaryOp::Sub)),
        Lexeme::Star => (19, 20, Binary(BinaryOp::Mul)),
        Lexeme::Slash => (19, 20, Binary(BinaryOp::Div)),
        Lexeme::Percent => (19, 20, Binary(BinaryOp::Mod)),
        _ => return None,
    };
    Some(bp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Vec<Spanned<Node>> {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(lex_diags.is_empty(), "lex errors: {:?}", lex_diags);
        Parser::new(tokens).parse_program().unwrap()
    }

    fn parse_expr(source: &str) -> Node {
        let stmts = parse(source);
        assert_eq!(stmts.len(), 1);
        match stmts.into_iter().next().unwrap().node {
            Node::ExpressionStatement(e) => e.node,
            other => panic!("expected expression statement, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_function_declaration() {
        let stmts = parse("function kernel(a, b) { return a; }");
        assert_eq!(stmts.len(), 1);
        if let Node::FunctionDeclaration { name, params, body } = &stmts[0].node {
            assert_eq!(name.as_ref().unwrap().node, "kernel");
            assert_eq!(params.len(), 2);
            assert_eq!(params[0].node, "a");
            assert!(matches!(body.node, Node::Block(_)));
        } else {
            panic!("expected function declaration");
        }
    }

    #[test]
    fn test_function_expression_in_initializer() {
        let stmts = parse("const parser_kernel = function(a) { return a; };");
        if let Node::VariableDeclaration { declarations, .. } = &stmts[0].node {
            if let Node::VariableDeclarator { init, .. } = &declarations[0].node {
                assert!(matches!(
                    init.as_ref().unwrap().node,
                    Node::FunctionExpression { .. }
                ));
            } else {
                panic!("expected declarator");
            }
        } else {
            panic!("expected variable declaration");
        }
    }

    #[test]
    fn test_precedence() {
        // a + b * c parses as a + (b * c)
        if let Node::Binary { op, right, .. } = parse_expr("a + b * c;") {
            assert_eq!(op, BinaryOp::Add);
            assert!(matches!(
                right.node,
                Node::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        } else {
            panic!("expected binary expression");
        }
    }

    #[test]
    fn test_logical_vs_binary() {
        if let Node::Logical { op, .. } = parse_expr("a < b && c > d;") {
            assert_eq!(op, LogicalOp::And);
        } else {
            panic!("expected logical expression");
        }
    }

    #[test]
    fn test_member_chain() {
        // this.constants.foo[0]
        let expr = parse_expr("this.constants.foo[0];");
        if let Node::Member { object, property } = expr {
            assert!(matches!(property, MemberProperty::Computed(_)));
            assert!(matches!(object.node, Node::Member { .. }));
        } else {
            panic!("expected member expression");
        }
    }

    #[test]
    fn test_call_with_arguments() {
        let expr = parse_expr("Math.max(a, 1.5);");
        if let Node::Call { callee, arguments } = expr {
            assert_eq!(arguments.len(), 2);
            assert!(matches!(callee.node, Node::Member { .. }));
        } else {
            panic!("expected call expression");
        }
    }

    #[test]
    fn test_for_loop() {
        let stmts = parse("for (var i = 0; i < 10; i++) { sum += i; }");
        if let Node::For {
            init,
            test,
            update,
            body,
        } = &stmts[0].node
        {
            assert!(matches!(
                init.as_ref().unwrap().node,
                Node::VariableDeclaration { .. }
            ));
            assert!(test.is_some());
            assert!(matches!(
                update.as_ref().unwrap().node,
                Node::Update { prefix: false, .. }
            ));
            assert!(matches!(body.node, Node::Block(_)));
        } else {
            panic!("expected for statement");
        }
    }

    #[test]
    fn test_multi_declarator() {
        let stmts = parse("var x = 1, y = 2;");
        if let Node::VariableDeclaration { kind, declarations } = &stmts[0].node {
            assert_eq!(*kind, VarKind::Var);
            assert_eq!(declarations.len(), 2);
        } else {
            panic!("expected variable declaration");
        }
    }

    #[test]
    fn test_conditional_expression() {
        let expr = parse_expr("a > 0 ? a : 0 - a;");
        assert!(matches!(expr, Node::Conditional { .. }));
    }

    #[test]
    fn test_sequence_expression() {
        let expr = parse_expr("a = 1, b = 2;");
        if let Node::Sequence(exprs) = expr {
            assert_eq!(exprs.len(), 2);
        } else {
            panic!("expected sequence expression");
        }
    }

    #[test]
    fn test_array_literal() {
        let expr = parse_expr("[1, 2, 3];");
        if let Node::Array(elements) = expr {
            assert_eq!(elements.len(), 3);
        } else {
            panic!("expected array expression");
        }
    }

    #[test]
    fn test_if_else() {
        let stmts = parse("if (a > b) { return a; } else { return b; }");
        if let Node::If { alternate, .. } = &stmts[0].node {
            assert!(alternate.is_some());
        } else {
            panic!("expected if statement");
        }
    }

    #[test]
    fn test_while_and_do_while() {
        let stmts = parse("while (a < 10) a++; do a--; while (a > 0);");
        assert!(matches!(stmts[0].node, Node::While { .. }));
        assert!(matches!(stmts[1].node, Node::DoWhile { .. }));
    }

    // --- Error path tests ---

    fn parse_errors(source: &str) -> Vec<Diagnostic> {
        let (tokens, _lex_diags) = Lexer::new(source).tokenize();
        match Parser::new(tokens).parse_program() {
            Ok(_) => Vec::new(),
            Err(diags) => diags,
        }
    }

    #[test]
    fn test_error_missing_paren() {
        let diags = parse_errors("if (a > b { return a; }");
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("expected ')'"));
    }

    #[test]
    fn test_error_bad_assignment_target() {
        let diags = parse_errors("1 = 2;");
        assert!(!diags.is_empty());
        assert!(diags[0].message.contains("invalid assignment target"));
    }

    #[test]
    fn test_error_unexpected_token() {
        let diags = parse_errors("return ];");
        assert!(!diags.is_empty());
    }
}
