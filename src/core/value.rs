use std::cmp::Ordering;
use std::fmt;

/// A rational number such as a frame rate (`30000/1001`)
#[derive(Debug, Clone, Copy)]
pub struct Fraction {
    /// Numerator
    pub num: i64,
    /// Denominator (never zero once parsed)
    pub den: i64,
}

impl Fraction {
    /// Create a fraction
    pub fn new(num: i64, den: i64) -> Self {
        Fraction { num, den }
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // a/b vs c/d with positive denominators: compare a*d and c*b
        let (a, b) = normalize_sign(self.num, self.den);
        let (c, d) = normalize_sign(other.num, other.den);
        (i128::from(a) * i128::from(d)).cmp(&(i128::from(c) * i128::from(b)))
    }
}

fn normalize_sign(num: i64, den: i64) -> (i64, i64) {
    if den < 0 { (-num, -den) } else { (num, den) }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Value of a single caps field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Fixed integer
    Int(i64),
    /// Fixed floating point number
    Double(f64),
    /// Fixed boolean
    Bool(bool),
    /// Fixed string
    Str(String),
    /// Fixed fraction
    Fraction(Fraction),
    /// Inclusive integer range
    IntRange {
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },
    /// Inclusive floating point range
    DoubleRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
    /// Inclusive fraction range
    FractionRange {
        /// Lower bound
        min: Fraction,
        /// Upper bound
        max: Fraction,
    },
    /// Set of alternatives
    List(Vec<Value>),
}

impl Value {
    /// Name used for the `(type)` annotation when serializing
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) | Value::IntRange { .. } => "int",
            Value::Double(_) | Value::DoubleRange { .. } => "double",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Fraction(_) | Value::FractionRange { .. } => "fraction",
            Value::List(items) => items.first().map(Value::type_name).unwrap_or("string"),
        }
    }

    /// Intersect two field values.
    ///
    /// Returns `None` when no value satisfies both sides. Values of different
    /// types never intersect.
    pub fn intersect(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::List(items), _) => {
                let hits: Vec<Value> = items.iter().filter_map(|v| v.intersect(other)).collect();
                collapse(hits)
            }
            (_, Value::List(_)) => other.intersect(self),

            (Value::Int(a), Value::Int(b)) => (a == b).then(|| Value::Int(*a)),
            (Value::Int(v), Value::IntRange { min, max })
            | (Value::IntRange { min, max }, Value::Int(v)) => {
                (min <= v && v <= max).then(|| Value::Int(*v))
            }
            (Value::IntRange { min: a0, max: a1 }, Value::IntRange { min: b0, max: b1 }) => {
                let (min, max) = (*a0.max(b0), *a1.min(b1));
                match min.cmp(&max) {
                    Ordering::Less => Some(Value::IntRange { min, max }),
                    Ordering::Equal => Some(Value::Int(min)),
                    Ordering::Greater => None,
                }
            }

            (Value::Double(a), Value::Double(b)) => (a == b).then(|| Value::Double(*a)),
            (Value::Double(v), Value::DoubleRange { min, max })
            | (Value::DoubleRange { min, max }, Value::Double(v)) => {
                (min <= v && v <= max).then(|| Value::Double(*v))
            }
            (
                Value::DoubleRange { min: a0, max: a1 },
                Value::DoubleRange { min: b0, max: b1 },
            ) => {
                let (min, max) = (a0.max(*b0), a1.min(*b1));
                if min < max {
                    Some(Value::DoubleRange { min, max })
                } else if min == max {
                    Some(Value::Double(min))
                } else {
                    None
                }
            }

            (Value::Fraction(a), Value::Fraction(b)) => (a == b).then(|| Value::Fraction(*a)),
            (Value::Fraction(v), Value::FractionRange { min, max })
            | (Value::FractionRange { min, max }, Value::Fraction(v)) => {
                (min <= v && v <= max).then(|| Value::Fraction(*v))
            }
            (
                Value::FractionRange { min: a0, max: a1 },
                Value::FractionRange { min: b0, max: b1 },
            ) => {
                let (min, max) = (*a0.max(b0), *a1.min(b1));
                match min.cmp(&max) {
                    Ordering::Less => Some(Value::FractionRange { min, max }),
                    Ordering::Equal => Some(Value::Fraction(min)),
                    Ordering::Greater => None,
                }
            }

            (Value::Bool(a), Value::Bool(b)) => (a == b).then(|| Value::Bool(*a)),
            (Value::Str(a), Value::Str(b)) => (a == b).then(|| Value::Str(a.clone())),

            _ => None,
        }
    }
}

/// Flatten intersection hits into the smallest equivalent value
fn collapse(hits: Vec<Value>) -> Option<Value> {
    let mut flat: Vec<Value> = Vec::with_capacity(hits.len());
    for hit in hits {
        let parts = match hit {
            Value::List(inner) => inner,
            v => vec![v],
        };
        for part in parts {
            if !flat.contains(&part) {
                flat.push(part);
            }
        }
    }

    match flat.len() {
        0 => None,
        1 => flat.pop(),
        _ => Some(Value::List(flat)),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(s) => {
                if needs_quotes(s) {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            Value::Fraction(v) => write!(f, "{}", v),
            Value::IntRange { min, max } => write!(f, "[ {}, {} ]", min, max),
            Value::DoubleRange { min, max } => write!(
                f,
                "[ {}, {} ]",
                Value::Double(*min),
                Value::Double(*max)
            ),
            Value::FractionRange { min, max } => write!(f, "[ {}, {} ]", min, max),
            Value::List(items) => {
                write!(f, "{{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, " }}")
            }
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | ':'))
}
