//! Reader for the engine's set and map notation.
//!
//! ```text
//! input   := [ '[' names ']' '->' ] '{' [ piece { ';' piece } ] '}'
//! piece   := tuple [ '->' tuple ] [ ':' disj ]
//! tuple   := [ name ] '[' [ elem { ',' elem } ] ']'
//! disj    := conj { 'or' conj }
//! conj    := atom { 'and' atom }
//! atom    := 'true' | 'false' | '(' disj ')' | expr relop expr { relop expr }
//! expr    := [ '-' ] term { ('+' | '-') term }
//! term    := int [ '*' ] [ name ] | name
//! ```

use super::boxes::{cell_intersect, cell_is_empty, restriction, Cell, Interval, Poly, Restriction};
use super::space::{SpaceData, Tuple};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Semi,
    Colon,
    Arrow,
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
    Plus,
    Minus,
    Star,
    Int(i64),
    Ident(String),
}

fn lex(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, width) = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            ',' => (Token::Comma, 1),
            ';' => (Token::Semi, 1),
            ':' => (Token::Colon, 1),
            '+' => (Token::Plus, 1),
            '*' => (Token::Star, 1),
            '=' if next == Some('=') => (Token::Eq, 2),
            '=' => (Token::Eq, 1),
            '-' if next == Some('>') => (Token::Arrow, 2),
            '-' => (Token::Minus, 1),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value = digits
                    .parse::<i64>()
                    .map_err(|_| format!("integer literal {} out of range", digits))?;
                tokens.push(Token::Int(value));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '\'') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            other => return Err(format!("unexpected character '{}'", other)),
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

/// Affine form over the columns of one piece.
#[derive(Debug, Clone)]
struct Lin {
    coeffs: Vec<i64>,
    constant: i64,
}

impl Lin {
    fn constant(total: usize, value: i64) -> Self {
        Lin {
            coeffs: vec![0; total],
            constant: value,
        }
    }

    fn combine(&self, other: &Lin, sign: i64) -> Result<Lin, String> {
        let overflow = || "integer overflow in constraint".to_string();
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(a, b)| b.checked_mul(sign).and_then(|b| a.checked_add(b)).ok_or_else(overflow))
            .collect::<Result<Vec<_>, _>>()?;
        let constant = other
            .constant
            .checked_mul(sign)
            .and_then(|b| self.constant.checked_add(b))
            .ok_or_else(overflow)?;
        Ok(Lin { coeffs, constant })
    }

    fn shifted(mut self, by: i64) -> Result<Lin, String> {
        self.constant = self
            .constant
            .checked_add(by)
            .ok_or_else(|| "integer overflow in constraint".to_string())?;
        Ok(self)
    }
}

/// One parsed disjunct group of a set or map, over its own space.
#[derive(Debug, Clone)]
pub(crate) struct Piece {
    pub(crate) poly: Poly,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Names visible inside one piece, by column.
struct Scope {
    names: Vec<Option<String>>,
}

impl Scope {
    fn column(&self, name: &str) -> Option<usize> {
        // Tuple variables shadow parameters of the same name.
        self.names.iter().rposition(|n| n.as_deref() == Some(name))
    }
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == word)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_is(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), String> {
        match self.bump() {
            Some(ref t) if t == token => Ok(()),
            Some(t) => Err(format!("expected {:?}, found {:?}", token, t)),
            None => Err(format!("expected {:?}, found end of input", token)),
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            Some(t) => Err(format!("expected a name, found {:?}", t)),
            None => Err("expected a name, found end of input".to_string()),
        }
    }

    fn input(&mut self) -> Result<(Vec<Option<String>>, Vec<Piece>), String> {
        let mut params = Vec::new();
        if self.eat(&Token::LBracket) {
            if !self.peek_is(&Token::RBracket) {
                loop {
                    params.push(Some(self.ident()?));
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(&Token::RBracket)?;
            self.expect(&Token::Arrow)?;
        }
        self.expect(&Token::LBrace)?;
        let mut pieces = Vec::new();
        if !self.peek_is(&Token::RBrace) {
            loop {
                pieces.push(self.piece(&params)?);
                if !self.eat(&Token::Semi) {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace)?;
        if let Some(t) = self.peek() {
            return Err(format!("trailing input at {:?}", t));
        }
        Ok((params, pieces))
    }

    /// A tuple plus the constant positions it fixes.
    fn tuple(&mut self) -> Result<(Tuple, Vec<(usize, i64)>), String> {
        let name = if matches!(self.peek(), Some(Token::Ident(_))) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(&Token::LBracket)?;
        let mut dims = Vec::new();
        let mut fixed = Vec::new();
        if !self.peek_is(&Token::RBracket) {
            loop {
                let negative = self.eat(&Token::Minus);
                match self.bump() {
                    Some(Token::Ident(v)) if !negative => dims.push(Some(v)),
                    Some(Token::Int(v)) => {
                        fixed.push((dims.len(), if negative { -v } else { v }));
                        dims.push(None);
                    }
                    Some(t) => return Err(format!("unexpected {:?} in tuple", t)),
                    None => return Err("unterminated tuple".to_string()),
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket)?;
        Ok((Tuple { name, dims }, fixed))
    }

    fn piece(&mut self, params: &[Option<String>]) -> Result<Piece, String> {
        let (first, first_fixed) = self.tuple()?;
        let np = params.len();
        let (space, fixed) = if self.eat(&Token::Arrow) {
            let (second, second_fixed) = self.tuple()?;
            let offset = first.dims.len();
            let mut fixed: Vec<(usize, i64)> = first_fixed.iter().map(|&(p, v)| (np + p, v)).collect();
            fixed.extend(second_fixed.iter().map(|&(p, v)| (np + offset + p, v)));
            let space = SpaceData {
                params: params.to_vec(),
                input: Some(first),
                output: Some(second),
            };
            (space, fixed)
        } else {
            let fixed = first_fixed.iter().map(|&(p, v)| (np + p, v)).collect();
            let space = SpaceData {
                params: params.to_vec(),
                input: None,
                output: Some(first),
            };
            (space, fixed)
        };

        let mut names: Vec<Option<String>> = params.to_vec();
        for tuple in [&space.input, &space.output].into_iter().flatten() {
            names.extend(tuple.dims.iter().cloned());
        }
        for (i, name) in names.iter().enumerate().skip(np) {
            if let Some(name) = name {
                if names[np..i].iter().any(|n| n.as_deref() == Some(name.as_str())) {
                    return Err(format!("repeated variable {} is not supported", name));
                }
            }
        }
        let scope = Scope { names };

        let mut poly = Poly::universe(space);
        for (col, v) in fixed {
            poly.restrict(Restriction::Column(col, Interval::point(v)));
        }
        if self.eat(&Token::Colon) {
            let cells = self.disj(&scope)?;
            let mut restricted = Vec::new();
            for base in &poly.cells {
                for c in &cells {
                    let cell = cell_intersect(base, c);
                    if !cell_is_empty(&cell) {
                        restricted.push(cell);
                    }
                }
            }
            poly.cells = restricted;
        }
        Ok(Piece {
            poly: poly.coalesced(),
        })
    }

    fn disj(&mut self, scope: &Scope) -> Result<Vec<Cell>, String> {
        let mut cells = self.conj(scope)?;
        while self.peek_keyword("or") {
            self.pos += 1;
            cells.extend(self.conj(scope)?);
        }
        Ok(cells)
    }

    fn conj(&mut self, scope: &Scope) -> Result<Vec<Cell>, String> {
        let mut cells = self.atom(scope)?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let rhs = self.atom(scope)?;
            let mut next = Vec::new();
            for a in &cells {
                for b in &rhs {
                    let c = cell_intersect(a, b);
                    if !cell_is_empty(&c) {
                        next.push(c);
                    }
                }
            }
            cells = next;
        }
        Ok(cells)
    }

    fn atom(&mut self, scope: &Scope) -> Result<Vec<Cell>, String> {
        let total = scope.names.len();
        if self.peek_keyword("true") {
            self.pos += 1;
            return Ok(vec![vec![Interval::FULL; total]]);
        }
        if self.peek_keyword("false") {
            self.pos += 1;
            return Ok(Vec::new());
        }
        if self.eat(&Token::LParen) {
            let cells = self.disj(scope)?;
            self.expect(&Token::RParen)?;
            return Ok(cells);
        }

        let mut cell = vec![Interval::FULL; total];
        let mut lhs = self.expr(scope)?;
        let mut relations = 0;
        while let Some(op) = self.peek().cloned() {
            if !matches!(op, Token::Le | Token::Lt | Token::Ge | Token::Gt | Token::Eq) {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(scope)?;
            let (form, equality) = match op {
                Token::Le => (rhs.combine(&lhs, -1)?, false),
                Token::Lt => (rhs.combine(&lhs, -1)?.shifted(-1)?, false),
                Token::Ge => (lhs.combine(&rhs, -1)?, false),
                Token::Gt => (lhs.combine(&rhs, -1)?.shifted(-1)?, false),
                _ => (lhs.combine(&rhs, -1)?, true),
            };
            match restriction(&form.coeffs, form.constant, equality)? {
                Restriction::All => {}
                Restriction::Nothing => return Ok(Vec::new()),
                Restriction::Column(col, interval) => cell[col] = cell[col].intersect(interval),
            }
            lhs = rhs;
            relations += 1;
        }
        if relations == 0 {
            return Err("expected a comparison".to_string());
        }
        Ok(if cell_is_empty(&cell) { Vec::new() } else { vec![cell] })
    }

    fn expr(&mut self, scope: &Scope) -> Result<Lin, String> {
        let total = scope.names.len();
        let mut acc = Lin::constant(total, 0);
        let mut sign = if self.eat(&Token::Minus) { -1 } else { 1 };
        loop {
            let term = self.term(scope)?;
            acc = acc.combine(&term, sign)?;
            if self.eat(&Token::Plus) {
                sign = 1;
            } else if self.eat(&Token::Minus) {
                sign = -1;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self, scope: &Scope) -> Result<Lin, String> {
        let total = scope.names.len();
        match self.bump() {
            Some(Token::Int(k)) => {
                let star = self.eat(&Token::Star);
                let scaled = matches!(self.peek(), Some(Token::Ident(w)) if !matches!(w.as_str(), "and" | "or"));
                if scaled {
                    let name = self.ident()?;
                    let col = self.lookup(scope, &name)?;
                    let mut lin = Lin::constant(total, 0);
                    lin.coeffs[col] = k;
                    Ok(lin)
                } else if star {
                    Err("expected a name after '*'".to_string())
                } else {
                    Ok(Lin::constant(total, k))
                }
            }
            Some(Token::Ident(name)) => {
                let col = self.lookup(scope, &name)?;
                let mut lin = Lin::constant(total, 0);
                lin.coeffs[col] = 1;
                Ok(lin)
            }
            Some(t) => Err(format!("unexpected {:?} in expression", t)),
            None => Err("unexpected end of input in expression".to_string()),
        }
    }

    fn lookup(&self, scope: &Scope, name: &str) -> Result<usize, String> {
        scope.column(name).ok_or_else(|| format!("unknown identifier {}", name))
    }
}

/// Parse a set or map description into one piece per listed tuple.
pub(crate) fn parse(text: &str) -> Result<(Vec<Option<String>>, Vec<Piece>), String> {
    let tokens = lex(text)?;
    Parser { tokens, pos: 0 }.input()
}

/// Parse text describing pieces over a single space into one poly.
pub(crate) fn parse_single(text: &str, want_map: bool) -> Result<Poly, String> {
    let (_, pieces) = parse(text)?;
    let mut pieces = pieces.into_iter();
    let Some(first) = pieces.next() else {
        return Err("empty description has no space; use an explicit tuple".to_string());
    };
    let mut poly = first.poly;
    if poly.space.is_map() != want_map {
        return Err(if want_map {
            "expected a map, found a set".to_string()
        } else {
            "expected a set, found a map".to_string()
        });
    }
    for piece in pieces {
        poly = poly
            .union(&piece.poly)
            .map_err(|_| "pieces of a single set or map must share one space".to_string())?;
    }
    Ok(poly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(lo: i64, hi: i64) -> Interval {
        Interval {
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    #[test]
    fn plain_tuple_is_universe() {
        let poly = parse_single("{ A[a, b] }", false).unwrap();
        assert_eq!(poly.space.n_out(), 2);
        assert_eq!(poly.cells, vec![vec![Interval::FULL; 2]]);
    }

    #[test]
    fn chains_and_disjunctions() {
        let poly = parse_single("{ A[a] : 0 <= a <= 9 and a != 3 }", false);
        assert!(poly.is_err());
        let poly = parse_single("{ A[a, b] : 0 <= a < 10 and b >= 2 or a = -4 }", false).unwrap();
        let expected = Poly {
            space: poly.space.clone(),
            cells: vec![
                vec![iv(0, 9), Interval { lo: Some(2), hi: None }],
                vec![Interval::point(-4), Interval::FULL],
            ],
        };
        assert!(poly.is_equal(&expected).unwrap());
    }

    #[test]
    fn parameters_and_scaled_terms() {
        let poly = parse_single("[N] -> { S[i] : 2i >= 3 and N = 5 }", false).unwrap();
        assert_eq!(poly.space.n_param(), 1);
        assert_eq!(poly.cells, vec![vec![Interval::point(5), Interval { lo: Some(2), hi: None }]]);
    }

    #[test]
    fn map_with_fixed_output() {
        let poly = parse_single("{ A[i] -> B[0, j] : i <= 3 }", true).unwrap();
        assert!(poly.space.is_map());
        assert_eq!(
            poly.cells,
            vec![vec![Interval { lo: None, hi: Some(3) }, Interval::point(0), Interval::FULL]]
        );
    }

    #[test]
    fn rejects_coupled_constraints() {
        let err = parse_single("{ A[a, b] : a <= b }", false).unwrap_err();
        assert!(err.contains("several dimensions"));
    }

    #[test]
    fn union_lists_each_space() {
        let (_, pieces) = parse("{ A[a] : a >= 0; B[x, y] }").unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[1].poly.space.n_out(), 2);
    }

    #[test]
    fn empty_conjunction_prints_nothing() {
        let poly = parse_single("{ A[a] : a > 3 and a < 2 }", false).unwrap();
        assert!(poly.is_empty());
    }
}
