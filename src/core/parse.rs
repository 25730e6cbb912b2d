//! Parser for the textual caps form
//!
//! ```text
//! caps      := "ANY" | "EMPTY" | "NONE" | structure (";" structure)* [";"]
//! structure := name ("," field)*
//! field     := key "=" ["(" type ")"] value
//! value     := "[" scalar "," scalar "]" | "{" scalar ("," scalar)* "}" | scalar
//! ```

use crate::core::caps::{Caps, Structure};
use crate::core::value::{Fraction, Value};
use crate::error::{AutoplugError, AutoplugResult};

/// Type annotation in front of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeHint {
    Int,
    Double,
    Bool,
    Str,
    Fraction,
}

impl TypeHint {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" | "i" | "gint" => Some(TypeHint::Int),
            "double" | "d" | "float" | "f" | "gdouble" => Some(TypeHint::Double),
            "boolean" | "bool" | "b" | "gboolean" => Some(TypeHint::Bool),
            "string" | "s" | "str" | "gchararray" => Some(TypeHint::Str),
            "fraction" => Some(TypeHint::Fraction),
            _ => None,
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

/// Parse a full caps string
pub fn parse_caps(input: &str) -> AutoplugResult<Caps> {
    let trimmed = input.trim();
    match trimmed {
        "ANY" => return Ok(Caps::new_any()),
        "EMPTY" | "NONE" => return Ok(Caps::new_empty()),
        "" => return Err(error(input, "caps string is empty")),
        _ => {}
    }

    let mut parser = Parser { input, pos: 0 };
    let mut structures = Vec::new();
    loop {
        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        structures.push(parser.structure()?);
        parser.skip_ws();
        match parser.peek() {
            Some(';') => parser.bump(),
            None => break,
            Some(c) => return Err(parser.fail(&format!("unexpected '{}'", c))),
        }
    }
    Ok(Caps::from_structures(structures))
}

fn error(input: &str, reason: &str) -> AutoplugError {
    AutoplugError::CapsParse {
        caps: input.to_string(),
        reason: reason.to_string(),
    }
}

impl<'a> Parser<'a> {
    fn fail(&self, reason: &str) -> AutoplugError {
        error(self.input, &format!("{} at offset {}", reason, self.pos))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> AutoplugResult<()> {
        self.skip_ws();
        if self.peek() == Some(want) {
            self.bump();
            Ok(())
        } else {
            Err(self.fail(&format!("expected '{}'", want)))
        }
    }

    /// Bare word: media type names, field keys and unquoted scalars
    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || "-_./+:".contains(c)) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn quoted(&mut self) -> AutoplugResult<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fail("unterminated string")),
                Some('"') => {
                    self.bump();
                    return Ok(out);
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.bump();
                        }
                        None => return Err(self.fail("dangling escape")),
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
    }

    fn structure(&mut self) -> AutoplugResult<Structure> {
        let name = self.word();
        if name.is_empty() {
            return Err(self.fail("expected media type name"));
        }
        let mut structure = Structure::new(name);

        loop {
            self.skip_ws();
            if self.peek() != Some(',') {
                return Ok(structure);
            }
            self.bump();

            let key = self.word();
            if key.is_empty() {
                return Err(self.fail("expected field name"));
            }
            self.expect('=')?;
            let hint = self.type_hint()?;
            let value = self.value(hint)?;
            structure.set(key, value);
        }
    }

    fn type_hint(&mut self) -> AutoplugResult<Option<TypeHint>> {
        self.skip_ws();
        if self.peek() != Some('(') {
            return Ok(None);
        }
        self.bump();
        let name = self.word();
        let hint =
            TypeHint::from_name(name).ok_or_else(|| self.fail(&format!("unknown type '{}'", name)))?;
        self.expect(')')?;
        Ok(Some(hint))
    }

    fn value(&mut self, hint: Option<TypeHint>) -> AutoplugResult<Value> {
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.bump();
                let min = self.scalar(hint)?;
                self.expect(',')?;
                let max = self.scalar(hint)?;
                self.expect(']')?;
                self.range(min, max)
            }
            Some('{') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    items.push(self.scalar(hint)?);
                    self.skip_ws();
                    match self.peek() {
                        Some(',') => self.bump(),
                        Some('}') => {
                            self.bump();
                            break;
                        }
                        _ => return Err(self.fail("expected ',' or '}' in list")),
                    }
                }
                Ok(match items.len() {
                    1 => items.remove(0),
                    _ => Value::List(items),
                })
            }
            _ => self.scalar(hint),
        }
    }

    fn range(&self, min: Value, max: Value) -> AutoplugResult<Value> {
        let value = match (min, max) {
            (Value::Int(min), Value::Int(max)) if min <= max => Value::IntRange { min, max },
            (Value::Double(min), Value::Double(max)) if min <= max => Value::DoubleRange { min, max },
            (Value::Fraction(min), Value::Fraction(max)) if min <= max => {
                Value::FractionRange { min, max }
            }
            _ => return Err(self.fail("range bounds must be ordered numbers of one type")),
        };
        Ok(value)
    }

    fn scalar(&mut self, hint: Option<TypeHint>) -> AutoplugResult<Value> {
        self.skip_ws();
        if self.peek() == Some('"') {
            let text = self.quoted()?;
            return match hint {
                None | Some(TypeHint::Str) => Ok(Value::Str(text)),
                Some(h) => self.typed(&text, h),
            };
        }

        let text = self.word();
        if text.is_empty() {
            return Err(self.fail("expected value"));
        }
        match hint {
            Some(h) => self.typed(text, h),
            None => Ok(infer(text)),
        }
    }

    fn typed(&self, text: &str, hint: TypeHint) -> AutoplugResult<Value> {
        let bad = || self.fail(&format!("'{}' is not a valid {:?}", text, hint));
        match hint {
            TypeHint::Int => text.parse().map(Value::Int).map_err(|_| bad()),
            TypeHint::Double => text.parse().map(Value::Double).map_err(|_| bad()),
            TypeHint::Bool => parse_bool(text).map(Value::Bool).ok_or_else(bad),
            TypeHint::Str => Ok(Value::Str(text.to_string())),
            TypeHint::Fraction => parse_fraction(text).map(Value::Fraction).ok_or_else(bad),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "t" | "1" => Some(true),
        "false" | "no" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_fraction(text: &str) -> Option<Fraction> {
    let (num, den) = match text.split_once('/') {
        Some((n, d)) => (n.parse().ok()?, d.parse().ok()?),
        None => (text.parse().ok()?, 1),
    };
    (den != 0).then(|| Fraction::new(num, den))
}

fn infer(text: &str) -> Value {
    if let Ok(v) = text.parse::<i64>() {
        return Value::Int(v);
    }
    if text.contains('.') {
        if let Ok(v) = text.parse::<f64>() {
            return Value::Double(v);
        }
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if text.contains('/') {
        if let Some(f) = parse_fraction(text) {
            return Value::Fraction(f);
        }
    }
    Value::Str(text.to_string())
}
