//! Skip-condition expressions.
//!
//! Conditions are a closed boolean algebra over the answer map. They arrive
//! either as a tree (`{neq: [deployment.model, cloud]}`) or as a legacy flat
//! string (`"deployment.model != 'cloud'"`); both are parsed at load time into
//! the same [`Condition`] so evaluation is a plain recursive match.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{format_number, parse_bool, AnswerMap, AnswerValue};

/// A parsed skip condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The answer to `field` equals the value.
    Eq(String, AnswerValue),
    /// The answer to `field` does not equal the value (true when unanswered).
    Neq(String, AnswerValue),
    /// The list answer to `field` contains the value.
    Has(String, AnswerValue),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

/// How a condition is written in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSource {
    Legacy(String),
    Tree(Condition),
}

impl ConditionSource {
    /// Resolve to a tree, parsing the legacy form if needed.
    pub fn compile(&self) -> Result<Condition, ExpressionError> {
        match self {
            ConditionSource::Tree(condition) => Ok(condition.clone()),
            ConditionSource::Legacy(text) => Condition::parse(text),
        }
    }
}

impl Condition {
    /// Evaluate against the current answers.
    ///
    /// Unanswered fields compare as "undefined": `eq` and `has` are false,
    /// `neq` is true, so questions stay visible until their dependency is
    /// answered.
    pub fn evaluate(&self, answers: &AnswerMap) -> bool {
        match self {
            Condition::Eq(field, expected) => answers
                .get(field)
                .map(|actual| values_match(actual, expected))
                .unwrap_or(false),
            Condition::Neq(field, expected) => answers
                .get(field)
                .map(|actual| !values_match(actual, expected))
                .unwrap_or(true),
            Condition::Has(field, expected) => match answers.get(field) {
                Some(AnswerValue::List(items)) => {
                    items.iter().any(|item| text_matches(item, expected))
                }
                Some(actual) => values_match(actual, expected),
                None => false,
            },
            Condition::Not(inner) => !inner.evaluate(answers),
            Condition::And(children) => children.iter().all(|c| c.evaluate(answers)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(answers)),
        }
    }

    /// Three-valued evaluation: `None` means the outcome still depends on a
    /// field that has not been answered.
    ///
    /// A comparison on an absent field is unknown unless `settled` reports the
    /// field as final (e.g. declined), in which case it falls back to
    /// [`Condition::evaluate`]. `and`/`or`/`not` follow Kleene logic, so an
    /// answered branch can decide the result on its own.
    pub fn evaluate_partial(
        &self,
        answers: &AnswerMap,
        settled: &dyn Fn(&str) -> bool,
    ) -> Option<bool> {
        match self {
            Condition::Eq(field, _) | Condition::Neq(field, _) | Condition::Has(field, _) => {
                if answers.contains(field) || settled(field) {
                    Some(self.evaluate(answers))
                } else {
                    None
                }
            }
            Condition::Not(inner) => inner.evaluate_partial(answers, settled).map(|v| !v),
            Condition::And(children) => {
                let mut unknown = false;
                for child in children {
                    match child.evaluate_partial(answers, settled) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(true)
            }
            Condition::Or(children) => {
                let mut unknown = false;
                for child in children {
                    match child.evaluate_partial(answers, settled) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(false)
            }
        }
    }

    /// Every field id the condition reads, in order of appearance.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Eq(field, _) | Condition::Neq(field, _) | Condition::Has(field, _) => {
                out.push(field.as_str())
            }
            Condition::Not(inner) => inner.collect_fields(out),
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }

    /// Parse the legacy flat string form.
    ///
    /// ```text
    /// expr  := or
    /// or    := and (("||" | "or") and)*
    /// and   := unary (("&&" | "and") unary)*
    /// unary := ("!" | "not") unary | "(" expr ")" | cmp
    /// cmp   := field ("==" | "!=") literal
    ///        | field ("contains" | "has") literal
    ///        | literal "in" field
    /// ```
    pub fn parse(input: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.parse_or()?;
        match parser.peek() {
            None => Ok(condition),
            Some(token) => Err(ExpressionError::UnexpectedToken(token.to_string())),
        }
    }
}

/// Compare an answer against a declared value. Text compares loosely with
/// numbers and booleans so `"99.9"` matches `99.9` and `"yes"` matches `true`.
fn values_match(actual: &AnswerValue, expected: &AnswerValue) -> bool {
    match (actual, expected) {
        (AnswerValue::Number(a), AnswerValue::Text(e)) | (AnswerValue::Text(e), AnswerValue::Number(a)) => {
            e.trim().parse::<f64>().map(|n| n == *a).unwrap_or(false)
        }
        (AnswerValue::Bool(a), AnswerValue::Text(e)) | (AnswerValue::Text(e), AnswerValue::Bool(a)) => {
            parse_bool(e) == Some(*a)
        }
        // a multi-select answer equals a value when that value was selected
        (AnswerValue::List(items), AnswerValue::Text(e)) => items.iter().any(|item| item == e),
        (a, e) => a == e,
    }
}

/// One selected option against a declared value of any scalar kind.
fn text_matches(item: &str, expected: &AnswerValue) -> bool {
    match expected {
        AnswerValue::Text(e) => item == e,
        AnswerValue::Number(n) => item.trim().parse::<f64>().map(|v| v == *n).unwrap_or(false),
        AnswerValue::Bool(b) => parse_bool(item) == Some(*b),
        AnswerValue::List(_) => false,
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Eq(field, value) => write!(f, "{} == {}", field, Literal(value)),
            Condition::Neq(field, value) => write!(f, "{} != {}", field, Literal(value)),
            Condition::Has(field, value) => write!(f, "{} in {}", Literal(value), field),
            Condition::Not(inner) => write!(f, "!({})", inner),
            Condition::And(children) => write_joined(f, children, " && "),
            Condition::Or(children) => write_joined(f, children, " || "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}

struct Literal<'a>(&'a AnswerValue);

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            AnswerValue::Text(s) => write!(f, "'{}'", s),
            AnswerValue::Number(n) => write!(f, "{}", format_number(*n)),
            AnswerValue::Bool(b) => write!(f, "{}", b),
            AnswerValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    #[error("empty expression")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
    In,
    Contains,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Num(n) => write!(f, "{}", format_number(*n)),
            Token::Bool(b) => write!(f, "{}", b),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::In => write!(f, "in"),
            Token::Contains => write!(f, "contains"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                expect_char(&mut chars, '=', offset)?;
                // tolerate JS-style ===
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                }
                tokens.push(Token::EqEq);
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    if matches!(chars.peek(), Some((_, '='))) {
                        chars.next();
                    }
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '&' => {
                chars.next();
                expect_char(&mut chars, '&', offset)?;
                tokens.push(Token::AndAnd);
            }
            '|' => {
                chars.next();
                expect_char(&mut chars, '|', offset)?;
                tokens.push(Token::OrOr);
            }
            '\'' | '"' => {
                chars.next();
                tokens.push(Token::Str(read_string(&mut chars, ch, offset)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let word = read_word(&mut chars);
                let number = word
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::UnexpectedChar { ch: c, offset })?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = read_word(&mut chars);
                tokens.push(match word.as_str() {
                    "and" => Token::AndAnd,
                    "or" => Token::OrOr,
                    "not" => Token::Bang,
                    "in" => Token::In,
                    "contains" | "has" => Token::Contains,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
            }
            other => return Err(ExpressionError::UnexpectedChar { ch: other, offset }),
        }
    }

    if tokens.is_empty() {
        return Err(ExpressionError::Empty);
    }
    Ok(tokens)
}

fn expect_char(
    chars: &mut Peekable<CharIndices<'_>>,
    expected: char,
    offset: usize,
) -> Result<(), ExpressionError> {
    match chars.next() {
        Some((_, c)) if c == expected => Ok(()),
        Some((at, c)) => Err(ExpressionError::UnexpectedChar { ch: c, offset: at }),
        None => Err(ExpressionError::UnexpectedChar {
            ch: expected,
            offset,
        }),
    }
}

fn read_string(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ExpressionError> {
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            c if c == quote => return Ok(value),
            c => value.push(c),
        }
    }
    Err(ExpressionError::UnterminatedString(start))
}

fn read_word(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ExpressionError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<Condition, ExpressionError> {
        let mut children = vec![self.parse_and()?];
        while self.peek() == Some(&Token::OrOr) {
            self.pos += 1;
            children.push(self.parse_and()?);
        }
        Ok(collapse(children, Condition::Or))
    }

    fn parse_and(&mut self) -> Result<Condition, ExpressionError> {
        let mut children = vec![self.parse_unary()?];
        while self.peek() == Some(&Token::AndAnd) {
            self.pos += 1;
            children.push(self.parse_unary()?);
        }
        Ok(collapse(children, Condition::And))
    }

    fn parse_unary(&mut self) -> Result<Condition, ExpressionError> {
        match self.peek() {
            Some(Token::Bang) => {
                self.pos += 1;
                Ok(Condition::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    other => Err(ExpressionError::UnexpectedToken(other.to_string())),
                }
            }
            _ => self.parse_comparison(),
        }
    }

    fn parse_comparison(&mut self) -> Result<Condition, ExpressionError> {
        let left = self.next()?;
        let op = self.next()?;
        match (left, op) {
            (Token::Ident(field), Token::EqEq) => Ok(Condition::Eq(field, self.parse_literal()?)),
            (Token::Ident(field), Token::NotEq) => Ok(Condition::Neq(field, self.parse_literal()?)),
            (Token::Ident(field), Token::Contains) => {
                Ok(Condition::Has(field, self.parse_literal()?))
            }
            (literal, Token::In) => {
                let value = literal_value(literal)?;
                match self.next()? {
                    Token::Ident(field) => Ok(Condition::Has(field, value)),
                    other => Err(ExpressionError::UnexpectedToken(other.to_string())),
                }
            }
            (_, other) => Err(ExpressionError::UnexpectedToken(other.to_string())),
        }
    }

    fn parse_literal(&mut self) -> Result<AnswerValue, ExpressionError> {
        literal_value(self.next()?)
    }
}

/// Bare words on the right-hand side read as text (`model == cloud`).
fn literal_value(token: Token) -> Result<AnswerValue, ExpressionError> {
    match token {
        Token::Str(s) | Token::Ident(s) => Ok(AnswerValue::Text(s)),
        Token::Num(n) => Ok(AnswerValue::Number(n)),
        Token::Bool(b) => Ok(AnswerValue::Bool(b)),
        other => Err(ExpressionError::UnexpectedToken(other.to_string())),
    }
}

fn collapse(mut children: Vec<Condition>, wrap: fn(Vec<Condition>) -> Condition) -> Condition {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, AnswerValue)]) -> AnswerMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unanswered_field_defaults_to_show() {
        let empty = AnswerMap::new();
        assert!(!Condition::Eq("a".into(), "x".into()).evaluate(&empty));
        assert!(Condition::Neq("a".into(), "x".into()).evaluate(&empty));
        assert!(!Condition::Has("a".into(), "x".into()).evaluate(&empty));
    }

    #[test]
    fn test_legacy_string_parses_to_tree() {
        let parsed = Condition::parse("a == 'x' && b != 'y'").unwrap();
        assert_eq!(
            parsed,
            Condition::And(vec![
                Condition::Eq("a".into(), "x".into()),
                Condition::Neq("b".into(), "y".into()),
            ])
        );
    }

    #[test]
    fn test_legacy_and_tree_forms_agree() {
        let tree: ConditionSource = serde_yaml::from_str(
            "or:\n  - eq: [deployment.model, cloud]\n  - not:\n      has: [features, sso]\n",
        )
        .unwrap();
        let legacy = ConditionSource::Legacy(
            "deployment.model == 'cloud' || !('sso' in features)".to_string(),
        );
        let tree = tree.compile().unwrap();
        let legacy = legacy.compile().unwrap();
        assert_eq!(tree, legacy);

        let cases = [
            answers(&[]),
            answers(&[("deployment.model", "cloud".into())]),
            answers(&[("features", AnswerValue::list(["sso"]))]),
            answers(&[
                ("deployment.model", "on-premise".into()),
                ("features", AnswerValue::list(["audit", "sso"])),
            ]),
        ];
        for case in &cases {
            assert_eq!(tree.evaluate(case), legacy.evaluate(case));
        }

        let tree: ConditionSource =
            serde_yaml::from_str("and:\n  - has: [tiers, 2]\n  - has: [flags, true]\n").unwrap();
        let legacy = ConditionSource::Legacy("2 in tiers && flags contains true".to_string());
        let tree = tree.compile().unwrap();
        let legacy = legacy.compile().unwrap();
        assert_eq!(tree, legacy);

        let cases = [
            answers(&[]),
            answers(&[
                ("tiers", AnswerValue::list(["1", "2"])),
                ("flags", AnswerValue::list(["true"])),
            ]),
            answers(&[("tiers", AnswerValue::list(["2"])), ("flags", true.into())]),
            answers(&[("tiers", 3.0.into()), ("flags", AnswerValue::list(["yes"]))]),
        ];
        let outcomes: Vec<bool> = cases.iter().map(|case| tree.evaluate(case)).collect();
        assert_eq!(outcomes, vec![false, true, true, false]);
        for case in &cases {
            assert_eq!(tree.evaluate(case), legacy.evaluate(case));
        }
    }

    #[test]
    fn test_kleene_evaluation() {
        let parsed = Condition::parse("a == 'x' || 'hipaa' in regs").unwrap();
        let never = |_: &str| false;
        assert_eq!(parsed.evaluate_partial(&AnswerMap::new(), &never), None);
        assert_eq!(
            parsed.evaluate_partial(&answers(&[("a", "x".into())]), &never),
            Some(true)
        );
        assert_eq!(
            parsed.evaluate_partial(&answers(&[("a", "y".into())]), &never),
            None
        );

        let parsed = Condition::parse("a == 'x' && !('hipaa' in regs)").unwrap();
        assert_eq!(
            parsed.evaluate_partial(&answers(&[("a", "y".into())]), &never),
            Some(false)
        );
        assert_eq!(
            parsed.evaluate_partial(&answers(&[("a", "x".into())]), &never),
            None
        );
        assert_eq!(
            parsed.evaluate_partial(&answers(&[("a", "x".into())]), &|f| f == "regs"),
            Some(true)
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let parsed = Condition::parse("a == 1 || b == 2 && c == 3").unwrap();
        match parsed {
            Condition::Or(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1], Condition::And(_)));
            }
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_keywords_and_booleans() {
        let parsed = Condition::parse("privacy.pii == true and not (payments.enabled == false)")
            .unwrap();
        let mut map = AnswerMap::new();
        map.insert("privacy.pii", true);
        map.insert("payments.enabled", true);
        assert!(parsed.evaluate(&map));
    }

    #[test]
    fn test_loose_comparison_between_text_and_scalars() {
        let mut map = AnswerMap::new();
        map.insert("operations.sla", "99.9");
        map.insert("flag", "yes");
        assert!(Condition::Eq("operations.sla".into(), 99.9.into()).evaluate(&map));
        assert!(Condition::Eq("flag".into(), true.into()).evaluate(&map));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(Condition::parse(""), Err(ExpressionError::Empty));
        assert_eq!(
            Condition::parse("a == 'x"),
            Err(ExpressionError::UnterminatedString(5))
        );
        assert!(matches!(
            Condition::parse("a == 'x' &&"),
            Err(ExpressionError::UnexpectedEnd)
        ));
        assert!(matches!(
            Condition::parse("a = 'x'"),
            Err(ExpressionError::UnexpectedChar { .. })
        ));
        assert!(matches!(
            Condition::parse("a == 'x' b"),
            Err(ExpressionError::UnexpectedToken(_))
        ));
        assert!(matches!(
            Condition::parse("import('os')"),
            Err(ExpressionError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_referenced_fields() {
        let parsed = Condition::parse("a == 1 && (b != 'x' || 'y' in c)").unwrap();
        assert_eq!(parsed.referenced_fields(), vec!["a", "b", "c"]);
    }
}
