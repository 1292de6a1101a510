//! Variables: codes, metadata and typed values
//!
//! A variable is identified by a BUFR-style descriptor code (`B12101`), carries
//! at most one value and an optional list of attribute variables. Numeric
//! values are stored as integers: decimal variables keep their value scaled by
//! the decimal scale declared in the variable metadata.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Variable codes
// =============================================================================

/// Packed F-XX-YYY variable descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Varcode(u16);

impl Varcode {
    /// Build a code from its F, X and Y components
    pub const fn new(f: u16, x: u16, y: u16) -> Self {
        Self(((f & 0x3) << 14) | ((x & 0x3f) << 8) | (y & 0xff))
    }

    pub const fn f(self) -> u16 {
        self.0 >> 14
    }

    pub const fn x(self) -> u16 {
        (self.0 >> 8) & 0x3f
    }

    pub const fn y(self) -> u16 {
        self.0 & 0xff
    }

    /// Raw packed representation
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Varcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.f() {
            0 => 'B',
            1 => 'R',
            2 => 'C',
            _ => 'D',
        };
        write!(f, "{}{:02}{:03}", prefix, self.x(), self.y())
    }
}

impl FromStr for Varcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let f = match chars.next() {
            Some('B') | Some('b') => 0,
            Some('R') | Some('r') => 1,
            Some('C') | Some('c') => 2,
            Some('D') | Some('d') => 3,
            _ => return Err(Error::parse(s, "variable code must start with B, R, C or D")),
        };
        let digits = chars.as_str();
        if digits.len() != 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::parse(s, "variable code must have five digits"));
        }
        let x: u16 = digits[..2]
            .parse()
            .map_err(|_| Error::parse(s, "invalid X component"))?;
        let y: u16 = digits[2..]
            .parse()
            .map_err(|_| Error::parse(s, "invalid Y component"))?;
        if x > 63 || y > 255 {
            return Err(Error::parse(s, "variable code component out of range"));
        }
        Ok(Self::new(f, x, y))
    }
}

impl TryFrom<String> for Varcode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Varcode> for String {
    fn from(code: Varcode) -> Self {
        code.to_string()
    }
}

// =============================================================================
// Variable metadata
// =============================================================================

/// Declared type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarType {
    /// Plain integer value
    Integer,
    /// Decimal value stored as an integer scaled by `10^scale`
    Decimal,
    /// Character data
    String,
    /// Opaque binary data, not comparable
    Binary,
}

/// Metadata describing how a variable is encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Varinfo {
    pub code: Varcode,
    pub var_type: VarType,
    /// Decimal scale, only meaningful for [`VarType::Decimal`]
    pub scale: i32,
    pub unit: String,
    pub description: String,
}

impl Varinfo {
    pub fn new(
        code: Varcode,
        var_type: VarType,
        scale: i32,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code,
            var_type,
            scale,
            unit: unit.into(),
            description: description.into(),
        }
    }

    /// True if values of this variable are stored as integers
    pub fn is_numeric(&self) -> bool {
        matches!(self.var_type, VarType::Integer | VarType::Decimal)
    }

    /// Encode a floating point value into the integer representation
    pub fn encode_decimal(&self, value: f64) -> Result<i32> {
        if !self.is_numeric() {
            return Err(Error::type_mismatch(
                self.code,
                "cannot store a number in a non-numeric variable",
            ));
        }
        let scaled = (value * 10f64.powi(self.effective_scale())).round();
        if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(Error::type_mismatch(
                self.code,
                format!("value {} out of range", value),
            ));
        }
        Ok(scaled as i32)
    }

    /// Decode the integer representation into a floating point value
    pub fn decode_decimal(&self, raw: i32) -> f64 {
        raw as f64 / 10f64.powi(self.effective_scale())
    }

    /// Parse text into the stored representation of this variable
    pub fn parse_value(&self, text: &str) -> Result<VarValue> {
        let text = text.trim();
        match self.var_type {
            VarType::String => Ok(VarValue::Str(text.to_string())),
            VarType::Integer => text
                .parse::<i32>()
                .map(VarValue::Int)
                .map_err(|_| Error::parse(text, format!("{} expects an integer", self.code))),
            VarType::Decimal => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| Error::parse(text, format!("{} expects a number", self.code)))?;
                Ok(VarValue::Int(self.encode_decimal(value)?))
            }
            VarType::Binary => Err(Error::type_mismatch(
                self.code,
                "binary variables cannot be parsed from text",
            )),
        }
    }

    /// Render a stored value in human readable form
    pub fn format_value(&self, value: &VarValue) -> String {
        match (self.var_type, value) {
            (VarType::Decimal, VarValue::Int(raw)) if self.scale > 0 => {
                format!(
                    "{:.*}",
                    self.scale as usize,
                    self.decode_decimal(*raw)
                )
            }
            (VarType::Decimal, VarValue::Int(raw)) => format!("{}", self.decode_decimal(*raw)),
            (_, other) => other.to_string(),
        }
    }

    fn effective_scale(&self) -> i32 {
        match self.var_type {
            VarType::Decimal => self.scale,
            _ => 0,
        }
    }
}

// =============================================================================
// Variables
// =============================================================================

/// Stored value of a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarValue {
    Int(i32),
    Str(String),
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Int(v) => write!(f, "{}", v),
            VarValue::Str(s) => f.write_str(s),
        }
    }
}

/// A variable with its value and attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Var {
    code: Varcode,
    value: Option<VarValue>,
    attrs: Vec<Var>,
}

impl Var {
    /// Create a variable with a missing value
    pub fn new(code: Varcode) -> Self {
        Self {
            code,
            value: None,
            attrs: Vec::new(),
        }
    }

    /// Create a variable holding an integer (or already scaled decimal) value
    pub fn int(code: Varcode, value: i32) -> Self {
        Self::with_value(code, Some(VarValue::Int(value)))
    }

    /// Create a variable holding a string value
    pub fn string(code: Varcode, value: impl Into<String>) -> Self {
        Self::with_value(code, Some(VarValue::Str(value.into())))
    }

    /// Create a variable from a floating point value, scaled per `info`
    pub fn decimal(info: &Varinfo, value: f64) -> Result<Self> {
        Ok(Self::int(info.code, info.encode_decimal(value)?))
    }

    pub fn with_value(code: Varcode, value: Option<VarValue>) -> Self {
        Self {
            code,
            value,
            attrs: Vec::new(),
        }
    }

    pub fn code(&self) -> Varcode {
        self.code
    }

    pub fn value(&self) -> Option<&VarValue> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Integer value, if the variable holds one
    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            Some(VarValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    /// String value, if the variable holds one
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(VarValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Replace the value, keeping attributes
    pub fn set_value(&mut self, value: Option<VarValue>) {
        self.value = value;
    }

    pub fn attrs(&self) -> &[Var] {
        &self.attrs
    }

    pub fn attr(&self, code: Varcode) -> Option<&Var> {
        self.attrs.iter().find(|a| a.code == code)
    }

    /// Set an attribute, replacing any previous attribute with the same code
    pub fn set_attr(&mut self, mut attr: Var) {
        // Attributes do not nest
        attr.attrs.clear();
        match self.attrs.iter_mut().find(|a| a.code == attr.code) {
            Some(existing) => *existing = attr,
            None => {
                self.attrs.push(attr);
                self.attrs.sort_by_key(|a| a.code);
            }
        }
    }

    /// Remove attributes with the given codes; an empty list removes all of them
    pub fn remove_attrs(&mut self, codes: &[Varcode]) {
        if codes.is_empty() {
            self.attrs.clear();
        } else {
            self.attrs.retain(|a| !codes.contains(&a.code));
        }
    }

    /// Replace value and attributes with those of `other`
    pub(crate) fn replace_with(&mut self, other: Var) {
        self.value = other.value;
        self.attrs = other.attrs;
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.code, v),
            None => write!(f, "{}=(missing)", self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varcode_parse_and_display() {
        let code: Varcode = "B12101".parse().unwrap();
        assert_eq!(code.f(), 0);
        assert_eq!(code.x(), 12);
        assert_eq!(code.y(), 101);
        assert_eq!(code.to_string(), "B12101");
        assert_eq!(code, Varcode::new(0, 12, 101));

        let attr: Varcode = "b33007".parse().unwrap();
        assert_eq!(attr.to_string(), "B33007");
    }

    #[test]
    fn test_varcode_rejects_malformed() {
        assert!("12101".parse::<Varcode>().is_err());
        assert!("B1210".parse::<Varcode>().is_err());
        assert!("B12A01".parse::<Varcode>().is_err());
        assert!("B99001".parse::<Varcode>().is_err());
    }

    #[test]
    fn test_decimal_encoding() {
        let info = Varinfo::new(
            Varcode::new(0, 12, 101),
            VarType::Decimal,
            2,
            "K",
            "temperature",
        );
        let var = Var::decimal(&info, 273.15).unwrap();
        assert_eq!(var.as_int(), Some(27315));
        assert_eq!(info.format_value(var.value().unwrap()), "273.15");
        assert_eq!(info.parse_value("10").unwrap(), VarValue::Int(1000));
    }

    #[test]
    fn test_string_variable_rejects_numbers() {
        let info = Varinfo::new(
            Varcode::new(0, 1, 19),
            VarType::String,
            0,
            "CCITTIA5",
            "station name",
        );
        assert!(matches!(
            Var::decimal(&info, 1.0),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_set_attr_replaces_same_code() {
        let code = Varcode::new(0, 12, 101);
        let conf = Varcode::new(0, 33, 7);
        let mut var = Var::int(code, 27315);
        var.set_attr(Var::int(conf, 50));
        var.set_attr(Var::int(conf, 70));
        assert_eq!(var.attrs().len(), 1);
        assert_eq!(var.attr(conf).and_then(Var::as_int), Some(70));

        var.remove_attrs(&[conf]);
        assert!(var.attrs().is_empty());
    }
}
