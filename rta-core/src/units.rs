//! Physical units and unit-tagged quantities
//!
//! A [`Unit`] is a dimension vector plus a scale (and, for temperature
//! scales, an offset) relative to the coherent SI unit of that dimension.
//! Two units are compatible iff their dimension vectors are equal; scale
//! differences are converted automatically.
//!
//! Everything here is immutable value semantics. The unit registry is a
//! static table, so units can be parsed and combined from any thread.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

/// Standard gravity in m/s^2
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("incompatible units: \"{from}\" cannot be expressed in \"{to}\"")]
    Incompatible { from: String, to: String },

    #[error("unknown unit \"{0}\"")]
    UnknownUnit(String),

    #[error("cannot parse unit \"{input}\": {reason}")]
    Parse { input: String, reason: String },

    #[error("unit \"{0}\" has an offset and cannot be multiplied or divided")]
    OffsetArithmetic(String),

    #[error("dimension exponent out of range in \"{0}\"")]
    ExponentOverflow(String),
}

// ============================================================================
// Dimensions
// ============================================================================

/// Exponents of the base dimensions (length, mass, time, current, temperature)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub current: i8,
    pub temperature: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0, 0, 0);
    pub const MASS: Dimension = Dimension::new(0, 1, 0, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0, 0);
    pub const VELOCITY: Dimension = Dimension::new(1, 0, -1, 0, 0);
    pub const ACCELERATION: Dimension = Dimension::new(1, 0, -2, 0, 0);
    pub const ENERGY: Dimension = Dimension::new(2, 1, -2, 0, 0);
    pub const POWER: Dimension = Dimension::new(2, 1, -3, 0, 0);

    pub const fn new(length: i8, mass: i8, time: i8, current: i8, temperature: i8) -> Self {
        Self {
            length,
            mass,
            time,
            current,
            temperature,
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::NONE
    }

    fn exponents(&self) -> [i8; 5] {
        [
            self.length,
            self.mass,
            self.time,
            self.current,
            self.temperature,
        ]
    }

    fn from_exponents(e: [i8; 5]) -> Self {
        Self::new(e[0], e[1], e[2], e[3], e[4])
    }

    fn combine(self, other: Self, sign: i8) -> Option<Self> {
        let a = self.exponents();
        let b = other.exponents();
        let mut out = [0i8; 5];
        for i in 0..5 {
            out[i] = a[i].checked_add(b[i].checked_mul(sign)?)?;
        }
        Some(Self::from_exponents(out))
    }

    /// `self * other`, or None when an exponent leaves the `i8` range
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.combine(other, 1)
    }

    /// `self / other`, or None when an exponent leaves the `i8` range
    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.combine(other, -1)
    }

    pub fn checked_powi(self, n: i8) -> Option<Self> {
        let mut out = self.exponents();
        for e in out.iter_mut() {
            *e = e.checked_mul(n)?;
        }
        Some(Self::from_exponents(out))
    }

    /// SI symbol for this dimension, e.g. `kg*m^2/s^2`
    fn coherent_symbol(&self) -> String {
        if let Some(named) = NAMED_COHERENT
            .iter()
            .find(|(dim, _)| dim == self)
            .map(|(_, sym)| *sym)
        {
            return named.to_string();
        }

        // Ordered the way SI symbols are conventionally written
        let order = [
            (self.mass, "kg"),
            (self.length, "m"),
            (self.time, "s"),
            (self.current, "A"),
            (self.temperature, "K"),
        ];
        let term = |sym: &str, exp: i16| {
            if exp == 1 {
                sym.to_string()
            } else {
                format!("{}^{}", sym, exp)
            }
        };
        let num: Vec<String> = order
            .iter()
            .filter(|(e, _)| *e > 0)
            .map(|(e, s)| term(s, i16::from(*e)))
            .collect();
        let den: Vec<String> = order
            .iter()
            .filter(|(e, _)| *e < 0)
            .map(|(e, s)| term(s, -i16::from(*e)))
            .collect();

        let num = if num.is_empty() {
            "1".to_string()
        } else {
            num.join("*")
        };
        match den.len() {
            0 => num,
            1 => format!("{}/{}", num, den[0]),
            _ => format!("{}/({})", num, den.join("*")),
        }
    }
}

/// Coherent SI units that have their own symbol
const NAMED_COHERENT: &[(Dimension, &str)] = &[
    (Dimension::NONE, "dimensionless"),
    (Dimension::VELOCITY, "m/s"),
    (Dimension::ACCELERATION, "m/s^2"),
    (Dimension::new(1, 1, -2, 0, 0), "N"),
    (Dimension::ENERGY, "J"),
    (Dimension::POWER, "W"),
    (Dimension::new(-1, 1, -2, 0, 0), "Pa"),
    (Dimension::new(2, 1, -3, -1, 0), "V"),
];

// ============================================================================
// Registry
// ============================================================================

struct UnitDef {
    names: &'static [&'static str],
    dimension: Dimension,
    scale: f64,
    offset: f64,
}

const fn def(names: &'static [&'static str], dimension: Dimension, scale: f64) -> UnitDef {
    UnitDef {
        names,
        dimension,
        scale,
        offset: 0.0,
    }
}

const VOLUME: Dimension = Dimension::new(3, 0, 0, 0, 0);
const FREQUENCY: Dimension = Dimension::new(0, 0, -1, 0, 0);
const FORCE: Dimension = Dimension::new(1, 1, -2, 0, 0);
const PRESSURE: Dimension = Dimension::new(-1, 1, -2, 0, 0);
const CURRENT: Dimension = Dimension::new(0, 0, 0, 1, 0);
const VOLTAGE: Dimension = Dimension::new(2, 1, -3, -1, 0);
const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 0, 1);

// "g" is read as standard gravity: in acquisition logs it is always an
// acceleration. Mass in grams is spelled "gram".
// "C" is read as degrees Celsius for the same reason.
static REGISTRY: &[UnitDef] = &[
    def(&["dimensionless", "1"], Dimension::NONE, 1.0),
    def(&["percent", "pct", "%"], Dimension::NONE, 0.01),
    def(&["gear"], Dimension::NONE, 1.0),
    def(&["rad", "radian", "radians"], Dimension::NONE, 1.0),
    def(&["deg", "degree", "degrees", "°"], Dimension::NONE, PI / 180.0),
    def(&["rpm"], FREQUENCY, 2.0 * PI / 60.0),
    def(&["Hz", "hertz"], FREQUENCY, 1.0),
    def(&["m", "meter", "meters", "metre"], Dimension::LENGTH, 1.0),
    def(&["km", "kilometer", "kilometers"], Dimension::LENGTH, 1000.0),
    def(&["cm"], Dimension::LENGTH, 0.01),
    def(&["mm", "millimeter"], Dimension::LENGTH, 0.001),
    def(&["mi", "mile", "miles"], Dimension::LENGTH, 1609.344),
    def(&["ft", "foot", "feet"], Dimension::LENGTH, 0.3048),
    def(&["in", "inch"], Dimension::LENGTH, 0.0254),
    def(&["s", "sec", "second", "seconds"], Dimension::TIME, 1.0),
    def(&["ms", "millisecond"], Dimension::TIME, 0.001),
    def(&["min", "minute", "minutes"], Dimension::TIME, 60.0),
    def(&["h", "hr", "hour", "hours"], Dimension::TIME, 3600.0),
    def(&["kg", "kilogram", "kilograms"], Dimension::MASS, 1.0),
    def(&["gram", "grams"], Dimension::MASS, 0.001),
    def(&["lb", "lbs", "pound"], Dimension::MASS, 0.453_592_37),
    def(&["N", "newton"], FORCE, 1.0),
    def(&["J", "joule", "joules"], Dimension::ENERGY, 1.0),
    def(&["kJ", "kilojoule"], Dimension::ENERGY, 1000.0),
    def(&["W", "watt", "watts"], Dimension::POWER, 1.0),
    def(&["kW", "kilowatt"], Dimension::POWER, 1000.0),
    def(&["hp", "horsepower"], Dimension::POWER, 745.699_871_582_270_2),
    def(&["Pa", "pascal"], PRESSURE, 1.0),
    def(&["kPa"], PRESSURE, 1000.0),
    def(&["bar"], PRESSURE, 100_000.0),
    def(&["mbar"], PRESSURE, 100.0),
    def(&["psi"], PRESSURE, 6_894.757_293_168_361),
    def(&["V", "volt", "volts"], VOLTAGE, 1.0),
    def(&["A", "ampere", "amp"], CURRENT, 1.0),
    def(&["mA"], CURRENT, 0.001),
    def(&["K", "kelvin"], TEMPERATURE, 1.0),
    UnitDef {
        names: &["degC", "°C", "C", "celsius"],
        dimension: TEMPERATURE,
        scale: 1.0,
        offset: 273.15,
    },
    UnitDef {
        names: &["degF", "°F", "F", "fahrenheit"],
        dimension: TEMPERATURE,
        scale: 5.0 / 9.0,
        offset: 459.67 * 5.0 / 9.0,
    },
    def(&["L", "l", "liter", "litre"], VOLUME, 0.001),
    def(&["mph"], Dimension::VELOCITY, 0.44704),
    def(&["kph", "kmh"], Dimension::VELOCITY, 1000.0 / 3600.0),
    def(&["gravity", "G", "g", "g0"], Dimension::ACCELERATION, STANDARD_GRAVITY),
];

fn lookup(name: &str) -> Option<&'static UnitDef> {
    REGISTRY.iter().find(|d| d.names.contains(&name))
}

/// Clean a raw unit string from a log header: spaces removed, empty becomes
/// `dimensionless`, `%` becomes `percent`.
pub fn normalize_symbol(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return "dimensionless".to_string();
    }
    cleaned.replace('%', "percent")
}

// ============================================================================
// Unit
// ============================================================================

/// A physical unit: dimension vector, scale and offset relative to the
/// coherent SI unit of the same dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Unit {
    symbol: String,
    dimension: Dimension,
    scale: f64,
    offset: f64,
}

/// Affine map from magnitudes in one unit to magnitudes in another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    factor: f64,
    shift: f64,
}

impl Conversion {
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.shift
    }

    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.shift == 0.0
    }
}

impl Unit {
    /// Parse a unit expression such as `km/h`, `m/(s^2)` or `kg*m^2/s^2`
    pub fn parse(input: &str) -> Result<Self, UnitError> {
        let symbol = input.trim();
        if symbol.is_empty() {
            return Ok(Self::dimensionless());
        }

        // Single registered unit: the only place an offset unit is allowed
        if let Some(d) = lookup(symbol) {
            return Ok(Self {
                symbol: symbol.to_string(),
                dimension: d.dimension,
                scale: d.scale,
                offset: d.offset,
            });
        }

        let tokens = tokenize(symbol)?;
        let mut parser = Parser {
            input: symbol,
            tokens: &tokens,
            pos: 0,
        };
        let (dimension, scale) = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self {
            symbol: symbol.to_string(),
            dimension,
            scale,
            offset: 0.0,
        })
    }

    /// The coherent SI unit of a dimension (scale 1, no offset)
    pub fn coherent(dimension: Dimension) -> Self {
        Self {
            symbol: dimension.coherent_symbol(),
            dimension,
            scale: 1.0,
            offset: 0.0,
        }
    }

    pub fn dimensionless() -> Self {
        Self::coherent(Dimension::NONE)
    }

    pub fn percent() -> Self {
        Self::registered("percent")
    }

    pub fn seconds() -> Self {
        Self::registered("s")
    }

    pub fn meters() -> Self {
        Self::registered("m")
    }

    pub fn kilograms() -> Self {
        Self::registered("kg")
    }

    pub fn gravity() -> Self {
        Self::registered("gravity")
    }

    pub fn degrees() -> Self {
        Self::registered("deg")
    }

    pub fn joules() -> Self {
        Self::coherent(Dimension::ENERGY)
    }

    pub fn watts() -> Self {
        Self::coherent(Dimension::POWER)
    }

    fn registered(name: &'static str) -> Self {
        match lookup(name) {
            Some(d) => Self {
                symbol: name.to_string(),
                dimension: d.dimension,
                scale: d.scale,
                offset: d.offset,
            },
            // Every name passed here is in REGISTRY
            None => Self::dimensionless(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Scale relative to the coherent SI unit
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_dimensionless()
    }

    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Conversion of magnitudes from `self` into `to`
    pub fn conversion_to(&self, to: &Unit) -> Result<Conversion, UnitError> {
        if !self.is_compatible(to) {
            return Err(UnitError::Incompatible {
                from: self.symbol.clone(),
                to: to.symbol.clone(),
            });
        }
        Ok(Conversion {
            factor: self.scale / to.scale,
            shift: (self.offset - to.offset) / to.scale,
        })
    }

    fn check_multiplicative(&self) -> Result<(), UnitError> {
        if self.offset != 0.0 {
            return Err(UnitError::OffsetArithmetic(self.symbol.clone()));
        }
        Ok(())
    }

    /// Coherent unit of `self * other` and the factor to apply to the
    /// product of raw magnitudes
    pub fn product(&self, other: &Unit) -> Result<(Unit, f64), UnitError> {
        self.check_multiplicative()?;
        other.check_multiplicative()?;
        let dimension = self
            .dimension
            .checked_mul(other.dimension)
            .ok_or_else(|| UnitError::ExponentOverflow(format!("{}*{}", self.symbol, other.symbol)))?;
        Ok((Unit::coherent(dimension), self.scale * other.scale))
    }

    /// Coherent unit of `self / other` and the factor to apply to the
    /// quotient of raw magnitudes
    pub fn quotient(&self, other: &Unit) -> Result<(Unit, f64), UnitError> {
        self.check_multiplicative()?;
        other.check_multiplicative()?;
        let dimension = self
            .dimension
            .checked_div(other.dimension)
            .ok_or_else(|| UnitError::ExponentOverflow(format!("{}/{}", self.symbol, other.symbol)))?;
        Ok((Unit::coherent(dimension), self.scale / other.scale))
    }

    pub fn powi(&self, n: i8) -> Result<(Unit, f64), UnitError> {
        self.check_multiplicative()?;
        let dimension = self
            .dimension
            .checked_powi(n)
            .ok_or_else(|| UnitError::ExponentOverflow(format!("{}^{}", self.symbol, n)))?;
        Ok((Unit::coherent(dimension), self.scale.powi(i32::from(n))))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Unit::parse(&value)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol
    }
}

impl std::str::FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

/// Convert a magnitude between compatible units
pub fn convert(value: f64, from: &Unit, to: &Unit) -> Result<f64, UnitError> {
    Ok(from.conversion_to(to)?.apply(value))
}

// ============================================================================
// Unit expression parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(i32),
    Mul,
    Div,
    Pow,
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, UnitError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' => {
                chars.next();
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Pow);
                } else {
                    tokens.push(Token::Mul);
                }
            }
            '·' => {
                chars.next();
                tokens.push(Token::Mul);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Div);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Pow);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '²' | '³' => {
                chars.next();
                tokens.push(Token::Pow);
                tokens.push(Token::Number(if c == '²' { 2 } else { 3 }));
            }
            '-' | '0'..='9' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = text.parse::<i32>().map_err(|_| UnitError::Parse {
                    input: input.to_string(),
                    reason: format!("bad exponent \"{}\"", text),
                })?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '%' || c == '°' || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphabetic() || d == '%' || d == '°' || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(UnitError::Parse {
                    input: input.to_string(),
                    reason: format!("unexpected character '{}'", other),
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> UnitError {
        UnitError::Parse {
            input: self.input.to_string(),
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> Result<(Dimension, f64), UnitError> {
        let (mut dim, mut scale) = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Mul) => {
                    self.pos += 1;
                    let (d, s) = self.term()?;
                    dim = dim
                        .checked_mul(d)
                        .ok_or_else(|| self.error("exponent out of range"))?;
                    scale *= s;
                }
                Some(Token::Div) => {
                    self.pos += 1;
                    let (d, s) = self.term()?;
                    dim = dim
                        .checked_div(d)
                        .ok_or_else(|| self.error("exponent out of range"))?;
                    scale /= s;
                }
                _ => return Ok((dim, scale)),
            }
        }
    }

    fn term(&mut self) -> Result<(Dimension, f64), UnitError> {
        let (dim, scale) = self.factor()?;
        if self.peek() != Some(&Token::Pow) {
            return Ok((dim, scale));
        }
        self.pos += 1;
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                let exp = i8::try_from(n).map_err(|_| self.error("exponent out of range"))?;
                let dim = dim
                    .checked_powi(exp)
                    .ok_or_else(|| self.error("exponent out of range"))?;
                Ok((dim, scale.powi(n)))
            }
            _ => Err(self.error("expected integer exponent")),
        }
    }

    fn factor(&mut self) -> Result<(Dimension, f64), UnitError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                let d = lookup(&name).ok_or_else(|| UnitError::UnknownUnit(name.clone()))?;
                if d.offset != 0.0 {
                    return Err(UnitError::OffsetArithmetic(name));
                }
                Ok((d.dimension, d.scale))
            }
            Some(Token::Number(1)) => {
                self.pos += 1;
                Ok((Dimension::NONE, 1.0))
            }
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(self.error("missing ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            _ => Err(self.error("expected unit name")),
        }
    }
}

// ============================================================================
// Quantity
// ============================================================================

/// A magnitude tagged with a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    #[serde(serialize_with = "round4")]
    pub magnitude: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    /// Build a quantity from a unit expression
    pub fn of(magnitude: f64, unit: &str) -> Result<Self, UnitError> {
        Ok(Self::new(magnitude, Unit::parse(unit)?))
    }

    /// Re-express in a compatible unit
    pub fn to(&self, unit: &Unit) -> Result<Quantity, UnitError> {
        Ok(Self::new(convert(self.magnitude, &self.unit, unit)?, unit.clone()))
    }

    /// Re-express in the coherent SI unit of the same dimension
    pub fn to_base(&self) -> Quantity {
        let base = Unit::coherent(self.unit.dimension);
        Self::new(
            self.magnitude * self.unit.scale + self.unit.offset,
            base,
        )
    }

    /// Magnitude in `unit`
    pub fn value_in(&self, unit: &Unit) -> Result<f64, UnitError> {
        convert(self.magnitude, &self.unit, unit)
    }

    pub fn multiply(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        let (unit, factor) = self.unit.product(&other.unit)?;
        Ok(Self::new(self.magnitude * other.magnitude * factor, unit))
    }

    /// Division by a zero-magnitude quantity yields NaN
    pub fn divide(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        let (unit, factor) = self.unit.quotient(&other.unit)?;
        let magnitude = if other.magnitude == 0.0 {
            f64::NAN
        } else {
            self.magnitude / other.magnitude * factor
        };
        Ok(Self::new(magnitude, unit))
    }

    pub fn add(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        let rhs = other.value_in(&self.unit)?;
        Ok(Self::new(self.magnitude + rhs, self.unit.clone()))
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity, UnitError> {
        let rhs = other.value_in(&self.unit)?;
        Ok(Self::new(self.magnitude - rhs, self.unit.clone()))
    }

    /// Total ordering of compatible quantities (NaN sorts above every number)
    pub fn compare(&self, other: &Quantity) -> Result<Ordering, UnitError> {
        let rhs = other.value_in(&self.unit)?;
        Ok(self.magnitude.total_cmp(&rhs))
    }
}

impl std::ops::Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Self::Output {
        Quantity::new(self.magnitude * rhs, self.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_parse_simple_and_compound_units() {
        let kmh = Unit::parse("km/h").unwrap();
        assert_eq!(kmh.dimension(), Dimension::VELOCITY);
        assert!(close(kmh.scale(), 1000.0 / 3600.0));

        let acc = Unit::parse("m/(s^2)").unwrap();
        assert_eq!(acc.dimension(), Dimension::ACCELERATION);

        let energy = Unit::parse("kg*m**2/s²").unwrap();
        assert_eq!(energy.dimension(), Dimension::ENERGY);
        assert!(close(energy.scale(), 1.0));
    }

    #[test]
    fn test_parse_unknown_unit_fails() {
        assert_eq!(
            Unit::parse("furlong/fortnight"),
            Err(UnitError::UnknownUnit("furlong".to_string()))
        );
        assert!(matches!(Unit::parse("m/(s"), Err(UnitError::Parse { .. })));
    }

    #[test]
    fn test_exponent_overflow_is_an_error() {
        for input in ["(m^100)^2", "m^100*m^100", "1/(m^100*s)/m^100", "m^300"] {
            assert!(
                matches!(Unit::parse(input), Err(UnitError::Parse { .. })),
                "{} should not parse",
                input
            );
        }

        let big = Unit::parse("m^100").unwrap();
        assert!(matches!(big.powi(2), Err(UnitError::ExponentOverflow(_))));
        assert!(matches!(big.product(&big), Err(UnitError::ExponentOverflow(_))));
        let inverse = Unit::parse("1/m^100").unwrap();
        assert!(matches!(big.quotient(&inverse), Err(UnitError::ExponentOverflow(_))));
    }

    #[test]
    fn test_extreme_negative_exponent_renders() {
        let unit = Unit::parse("1/m^127/m").unwrap();
        assert_eq!(unit.dimension().length, -128);
        assert_eq!(Unit::coherent(unit.dimension()).symbol(), "1/m^128");
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(""), "dimensionless");
        assert_eq!(normalize_symbol("   "), "dimensionless");
        assert_eq!(normalize_symbol("%"), "percent");
        assert_eq!(normalize_symbol(" km / h "), "km/h");
    }

    #[test]
    fn test_percent_and_gear_are_dimensionless() {
        let pct = Unit::percent();
        assert!(pct.is_dimensionless());
        assert!(close(convert(50.0, &pct, &Unit::dimensionless()).unwrap(), 0.5));
        assert!(Unit::parse("gear").unwrap().is_compatible(&Unit::dimensionless()));
    }

    #[test]
    fn test_convert_incompatible_fails() {
        let err = convert(1.0, &Unit::meters(), &Unit::seconds()).unwrap_err();
        assert!(matches!(err, UnitError::Incompatible { .. }));
    }

    #[test]
    fn test_convert_speed_and_gravity() {
        let kmh = Unit::parse("km/h").unwrap();
        let ms = Unit::parse("m/s").unwrap();
        assert!(close(convert(36.0, &kmh, &ms).unwrap(), 10.0));

        let g = Unit::gravity();
        let acc = Unit::coherent(Dimension::ACCELERATION);
        assert!(close(convert(1.0, &g, &acc).unwrap(), STANDARD_GRAVITY));
    }

    #[test]
    fn test_temperature_offsets() {
        let c = Unit::parse("degC").unwrap();
        let f = Unit::parse("degF").unwrap();
        assert!(close(convert(100.0, &c, &f).unwrap(), 212.0));
        assert!(close(convert(0.0, &c, &Unit::parse("K").unwrap()).unwrap(), 273.15));
    }

    #[test]
    fn test_offset_units_cannot_be_multiplied() {
        let t = Quantity::of(20.0, "degC").unwrap();
        let m = Quantity::of(1.0, "kg").unwrap();
        assert!(matches!(t.multiply(&m), Err(UnitError::OffsetArithmetic(_))));
        assert!(matches!(Unit::parse("degC/s"), Err(UnitError::OffsetArithmetic(_))));
    }

    #[test]
    fn test_multiply_propagates_units_and_scales() {
        let speed = Quantity::of(72.0, "km/h").unwrap();
        let time = Quantity::of(2.0, "min").unwrap();
        let distance = speed.multiply(&time).unwrap();

        assert_eq!(distance.unit.dimension(), Dimension::LENGTH);
        assert_eq!(distance.unit.symbol(), "m");
        // 72 * 2 scaled by (1000/3600) * 60
        let expected = 72.0 * 2.0 * (1000.0 / 3600.0) * 60.0;
        assert!(close(distance.magnitude, expected));
        assert!(close(distance.value_in(&Unit::parse("km").unwrap()).unwrap(), 2.4));
    }

    #[test]
    fn test_multiply_names_coherent_units() {
        let mass = Quantity::of(593.0, "kg").unwrap();
        let acc = Quantity::of(1.0, "g").unwrap();
        let force = mass.multiply(&acc).unwrap();
        assert_eq!(force.unit.symbol(), "N");

        let odd = Quantity::of(1.0, "kg").unwrap().multiply(&Quantity::of(1.0, "m").unwrap()).unwrap();
        assert_eq!(odd.unit.symbol(), "kg*m");
        let reparsed = Unit::parse(odd.unit.symbol()).unwrap();
        assert_eq!(reparsed.dimension(), odd.unit.dimension());
    }

    #[test]
    fn test_divide_by_zero_is_nan() {
        let dv = Quantity::of(3.0, "m/s").unwrap();
        let dt = Quantity::of(0.0, "s").unwrap();
        let a = dv.divide(&dt).unwrap();
        assert!(a.magnitude.is_nan());
        assert_eq!(a.unit.dimension(), Dimension::ACCELERATION);
    }

    #[test]
    fn test_compare_requires_compatible_units() {
        let a = Quantity::of(1.0, "km").unwrap();
        let b = Quantity::of(999.0, "m").unwrap();
        assert_eq!(a.compare(&b).unwrap(), Ordering::Greater);
        assert_eq!(b.compare(&a).unwrap(), Ordering::Less);

        let c = Quantity::of(1.0, "s").unwrap();
        assert!(a.compare(&c).is_err());
    }

    #[test]
    fn test_add_converts_into_left_unit() {
        let a = Quantity::of(1.0, "km").unwrap();
        let b = Quantity::of(500.0, "m").unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.unit.symbol(), "km");
        assert!(close(sum.magnitude, 1.5));
        assert!(a.sub(&Quantity::of(1.0, "kg").unwrap()).is_err());
    }

    #[test]
    fn test_unit_serializes_as_symbol() {
        let q = Quantity::of(1.234567, "km/h").unwrap();
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, r#"{"magnitude":1.2346,"unit":"km/h"}"#);

        let back: Quantity = serde_json::from_str(r#"{"magnitude":2.0,"unit":"m/s"}"#).unwrap();
        assert_eq!(back.unit.dimension(), Dimension::VELOCITY);
    }
}
