//! String-based selection of physics objects, e.g. "pt > 30 && abs(eta) < 2.4"
//!
//! Supports arithmetic (+, -, *, /), comparisons (==, !=, <, <=, >, >=),
//! boolean operators (&&, ||, !), parentheses and the built-in functions abs,
//! sqrt, min and max. A value is considered true when it is not zero. An empty
//! selection accepts everything.

use crate::{
    event::{Jet, MissingEnergy},
    numeric::Float,
    Result,
};
use eyre::{bail, ensure, eyre};
use std::{fmt, marker::PhantomData};

/// Object kinds on which a selection can be applied
pub trait Candidate {
    /// Names of the variables which selections may refer to
    const VARIABLES: &'static [&'static str];

    /// Value of the variable whose name is VARIABLES[index]
    fn variable(&self, index: usize) -> Float;
}

impl Candidate for Jet {
    const VARIABLES: &'static [&'static str] =
        &["pt", "eta", "phi", "px", "py", "pz", "energy", "mass"];

    fn variable(&self, index: usize) -> Float {
        let p4 = &self.p4;
        match index {
            0 => p4.pt(),
            1 => p4.eta(),
            2 => p4.phi(),
            3 => p4.px(),
            4 => p4.py(),
            5 => p4.pz(),
            6 => p4.e(),
            7 => p4.mass(),
            _ => unreachable!("Invalid jet variable index {}", index),
        }
    }
}

impl Candidate for MissingEnergy {
    const VARIABLES: &'static [&'static str] = &["pt", "phi", "px", "py", "sumEt", "significance"];

    fn variable(&self, index: usize) -> Float {
        match index {
            0 => self.pt(),
            1 => self.phi(),
            2 => self.px,
            3 => self.py,
            4 => self.sum_et,
            5 => self.significance,
            _ => unreachable!("Invalid MET variable index {}", index),
        }
    }
}

/// Compiled selection over objects of type C
pub struct Selection<C: Candidate> {
    /// Selection string, as configured
    text: String,

    /// Syntax tree, None if the selection accepts everything
    ast: Option<Expr>,

    /// Selections are bound to the kind of object whose variables they use
    candidate: PhantomData<fn(&C)>,
}
//
impl<C: Candidate> Selection<C> {
    /// Parse a selection string, checking that all the variables which it
    /// refers to exist for this kind of object
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let ast = if tokens.is_empty() {
            None
        } else {
            let mut parser = Parser {
                tokens: &tokens,
                pos: 0,
                variables: C::VARIABLES,
            };
            let ast = parser.parse_or()?;
            ensure!(
                parser.pos == tokens.len(),
                "Unexpected {:?} after the end of selection {:?}",
                tokens[parser.pos],
                text
            );
            Some(ast)
        };
        Ok(Self {
            text: text.to_owned(),
            ast,
            candidate: PhantomData,
        })
    }

    /// Decide whether an object passes the selection
    pub fn accepts(&self, candidate: &C) -> bool {
        match &self.ast {
            Some(ast) => ast.eval(candidate) != 0.,
            None => true,
        }
    }
}

impl<C: Candidate> fmt::Debug for Selection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selection").field(&self.text).finish()
    }
}

impl<C: Candidate> Clone for Selection<C> {
    fn clone(&self) -> Self {
        Self {
            text: self.text.clone(),
            ast: self.ast.clone(),
            candidate: PhantomData,
        }
    }
}

// ### SYNTAX TREE ###

#[derive(Clone, Debug)]
enum Expr {
    Number(Float),
    Var(usize),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Clone, Copy, Debug)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Clone, Copy, Debug)]
enum Func {
    Abs,
    Sqrt,
    Min,
    Max,
}
//
impl Func {
    /// Number of arguments expected by the function
    fn arity(self) -> usize {
        match self {
            Func::Abs | Func::Sqrt => 1,
            Func::Min | Func::Max => 2,
        }
    }
}

impl Expr {
    fn eval<C: Candidate>(&self, candidate: &C) -> Float {
        let truth = |b: bool| if b { 1. } else { 0. };
        match self {
            Expr::Number(x) => *x,
            Expr::Var(index) => candidate.variable(*index),
            Expr::Neg(e) => -e.eval(candidate),
            Expr::Not(e) => truth(e.eval(candidate) == 0.),
            Expr::BinOp(op, lhs, rhs) => {
                let lhs = lhs.eval(candidate);
                // Boolean operators short-circuit, like in C++
                match op {
                    BinOp::And if lhs == 0. => return 0.,
                    BinOp::Or if lhs != 0. => return 1.,
                    _ => {}
                }
                let rhs = rhs.eval(candidate);
                match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                    BinOp::Div => lhs / rhs,
                    BinOp::Eq => truth(lhs == rhs),
                    BinOp::Ne => truth(lhs != rhs),
                    BinOp::Lt => truth(lhs < rhs),
                    BinOp::Le => truth(lhs <= rhs),
                    BinOp::Gt => truth(lhs > rhs),
                    BinOp::Ge => truth(lhs >= rhs),
                    BinOp::And | BinOp::Or => truth(rhs != 0.),
                }
            }
            Expr::Call(func, args) => {
                let arg = |i: usize| args[i].eval(candidate);
                match func {
                    Func::Abs => arg(0).abs(),
                    Func::Sqrt => arg(0).sqrt(),
                    Func::Min => arg(0).min(arg(1)),
                    Func::Max => arg(0).max(arg(1)),
                }
            }
        }
    }
}

// ### TOKENIZER ###

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(Float),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars = input.chars().collect::<Vec<_>>();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators come first, so that "<=" is not "<" "="
        let next = chars.get(i + 1).copied();
        let two_char = match (c, next) {
            ('&', Some('&')) => Some(Token::And),
            ('|', Some('|')) => Some(Token::Or),
            ('=', Some('=')) => Some(Token::Eq),
            ('!', Some('=')) => Some(Token::Ne),
            ('<', Some('=')) => Some(Token::Le),
            ('>', Some('=')) => Some(Token::Ge),
            _ => None,
        };
        if let Some(token) = two_char {
            tokens.push(token);
            i += 2;
            continue;
        }

        let single_char = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            '!' => Some(Token::Not),
            _ => None,
        };
        if let Some(token) = single_char {
            tokens.push(token);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || chars[i] == '.'
                    || chars[i] == 'e'
                    || chars[i] == 'E'
                    || ((chars[i] == '+' || chars[i] == '-')
                        && matches!(chars[i - 1], 'e' | 'E')))
            {
                i += 1;
            }
            let literal = chars[start..i].iter().collect::<String>();
            let number = literal
                .parse::<Float>()
                .map_err(|_| eyre!("Invalid number {:?} in selection {:?}", literal, input))?;
            tokens.push(Token::Num(number));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            bail!("Unexpected character {:?} in selection {:?}", c, input);
        }
    }
    Ok(tokens)
}

// ### PARSER (RECURSIVE DESCENT) ###

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    variables: &'static [&'static str],
}
//
impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => bail!("Expected {:?} in selection, got {:?}", expected, other),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::BinOp(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cmp()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expr::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_add()?;
        Ok(Expr::BinOp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Not) => {
                self.advance();
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Num(x)) => Ok(Expr::Number(*x)),
            Some(Token::LParen) => {
                let e = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) if self.peek() == Some(&Token::LParen) => {
                self.advance();
                let func = match name.as_str() {
                    "abs" => Func::Abs,
                    "sqrt" => Func::Sqrt,
                    "min" => Func::Min,
                    "max" => Func::Max,
                    _ => bail!("Unknown function {:?} in selection", name),
                };
                let mut args = vec![self.parse_or()?];
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    args.push(self.parse_or()?);
                }
                self.expect(&Token::RParen)?;
                ensure!(
                    args.len() == func.arity(),
                    "Function {:?} expects {} argument(s), got {}",
                    name,
                    func.arity(),
                    args.len()
                );
                Ok(Expr::Call(func, args))
            }
            Some(Token::Ident(name)) => self
                .variables
                .iter()
                .position(|v| *v == name.as_str())
                .map(Expr::Var)
                .ok_or_else(|| {
                    eyre!(
                        "Unknown variable {:?} in selection (available: {})",
                        name,
                        self.variables.join(", ")
                    )
                }),
            other => bail!("Expected a number, variable or '(' in selection, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::FourVector;

    fn jet(pt: Float, eta: Float) -> Jet {
        Jet::new(FourVector::from_pt_eta_phi_m(pt, eta, 0.3, 5.))
    }

    #[test]
    fn empty_selection_accepts_everything() {
        let sel = Selection::<Jet>::parse("  ").unwrap();
        assert!(sel.accepts(&jet(1., 0.)));
    }

    #[test]
    fn default_selections() {
        let jet_sel = Selection::<Jet>::parse("pt > 80").unwrap();
        assert!(jet_sel.accepts(&jet(81., 0.)));
        assert!(!jet_sel.accepts(&jet(79., 0.)));

        let met_sel = Selection::<MissingEnergy>::parse("pt > 0").unwrap();
        assert!(met_sel.accepts(&MissingEnergy::new(1., 0.)));
        assert!(!met_sel.accepts(&MissingEnergy::new(0., 0.)));
    }

    #[test]
    fn compound_selection() {
        let sel = Selection::<Jet>::parse("pt > 30 && abs(eta) < 2.4 || pt >= 1e3").unwrap();
        assert!(sel.accepts(&jet(40., -2.)));
        assert!(!sel.accepts(&jet(40., -3.)));
        assert!(sel.accepts(&jet(1000., -3.)));
        assert!(!sel.accepts(&jet(20., 0.)));
    }

    #[test]
    fn arithmetic_and_negation() {
        let sel = Selection::<MissingEnergy>::parse("!(pt / max(sumEt, 1) > 0.5)").unwrap();
        let mut met = MissingEnergy::new(30., 40.);
        met.sum_et = 200.;
        assert!(sel.accepts(&met));
        met.sum_et = 80.;
        assert!(!sel.accepts(&met));
    }

    #[test]
    fn variables_are_checked_per_object_kind() {
        assert!(Selection::<MissingEnergy>::parse("sumEt > 100").is_ok());
        assert!(Selection::<Jet>::parse("sumEt > 100").is_err());
        assert!(Selection::<MissingEnergy>::parse("eta < 2").is_err());
    }

    #[test]
    fn malformed_selections_are_rejected() {
        for text in ["pt >", "pt > 80)", "(pt > 80", "pt $ 3", "log(pt) > 1", "min(pt) > 1"] {
            assert!(Selection::<Jet>::parse(text).is_err(), "{:?} should not parse", text);
        }
    }
}
