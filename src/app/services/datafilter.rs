//! Comparison expressions on variable values
//!
//! Parses expressions such as `B12101>=273.15`, `B01019=Bologna` or
//! `10<=B12101<=20` into a [`DataFilter`] bound to one variable code. Thresholds
//! are encoded once, at parse time, in the same representation as the variable
//! (scaled integer for decimals), so evaluation is a plain integer or string
//! comparison.
//!
//! Range forms only accept `<` and `<=` on both sides.

use crate::app::models::var::{VarType, VarValue, Var, Varcode};
use crate::app::services::vartable::VarTable;
use crate::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static BETWEEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^<>=!]+?)\s*(<=|<)\s*([BbRrCcDd]\d{5})\s*(<=|<)\s*([^<>=!]+?)\s*$")
        .expect("valid between regex")
});

static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([BbRrCcDd]\d{5})\s*(<=|>=|<>|!=|==|<|>|=)\s*(.*?)\s*$")
        .expect("valid single regex")
});

static THREE_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(.+?)\s*([<>=!]+)\s*([BbRrCcDd]\d{5})\s*([<>=!]+)\s*(.+?)\s*$")
        .expect("valid three-part regex")
});

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    fn parse(text: &str, input: &str) -> Result<Self> {
        match text {
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Le),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Ge),
            "=" | "==" => Ok(Op::Eq),
            "<>" | "!=" => Ok(Op::Ne),
            other => Err(Error::parse(input, format!("unsupported operator '{}'", other))),
        }
    }

    /// True if `ordering` (value compared to threshold) satisfies the operator
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "=",
            Op::Ne => "<>",
        }
    }
}

/// Parsed condition on an encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Single {
        op: Op,
        value: VarValue,
    },
    Between {
        low: VarValue,
        low_inclusive: bool,
        high: VarValue,
        high_inclusive: bool,
    },
}

/// Comparison expression bound to one variable code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFilter {
    code: Varcode,
    condition: Condition,
}

impl DataFilter {
    /// Parse an expression, encoding thresholds with the metadata in `table`
    pub fn parse(table: &dyn VarTable, expr: &str) -> Result<Self> {
        if let Some(caps) = BETWEEN_RE.captures(expr) {
            let code: Varcode = caps[3].parse()?;
            let info = table.query(code)?;
            check_comparable(info.var_type, code)?;
            let low = info.parse_value(&caps[1])?;
            let high = info.parse_value(&caps[5])?;
            return Ok(Self {
                code,
                condition: Condition::Between {
                    low,
                    low_inclusive: &caps[2] == "<=",
                    high,
                    high_inclusive: &caps[4] == "<=",
                },
            });
        }

        if let Some(caps) = SINGLE_RE.captures(expr) {
            let code: Varcode = caps[1].parse()?;
            let op = Op::parse(&caps[2], expr)?;
            let threshold = &caps[3];
            if threshold.is_empty() {
                return Err(Error::parse(expr, "missing threshold value"));
            }
            if threshold.starts_with(['<', '>', '=', '!']) {
                return Err(Error::parse(expr, "unparseable operator"));
            }
            let info = table.query(code)?;
            check_comparable(info.var_type, code)?;
            let value = info.parse_value(threshold)?;
            return Ok(Self {
                code,
                condition: Condition::Single { op, value },
            });
        }

        if let Some(caps) = THREE_PART_RE.captures(expr) {
            return Err(Error::parse(
                expr,
                format!(
                    "range expressions only accept < and <=, found '{}' and '{}'",
                    &caps[2], &caps[4]
                ),
            ));
        }

        if expr.contains(['<', '>', '=', '!']) {
            Err(Error::parse(expr, "unparseable operator"))
        } else {
            Err(Error::parse(expr, "no recognisable operator"))
        }
    }

    /// Code of the variable this filter applies to
    pub fn code(&self) -> Varcode {
        self.code
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Check an encoded value against the condition
    pub fn matches_value(&self, value: &VarValue) -> bool {
        match &self.condition {
            Condition::Single { op, value: threshold } => {
                compare(value, threshold).is_some_and(|ord| op.accepts(ord))
            }
            Condition::Between {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => {
                let above = compare(value, low).is_some_and(|ord| {
                    ord == Ordering::Greater || (*low_inclusive && ord == Ordering::Equal)
                });
                let below = compare(value, high).is_some_and(|ord| {
                    ord == Ordering::Less || (*high_inclusive && ord == Ordering::Equal)
                });
                above && below
            }
        }
    }

    /// Check a variable's own value; other codes and missing values never match
    pub fn matches_var(&self, var: &Var) -> bool {
        var.code() == self.code && var.value().is_some_and(|v| self.matches_value(v))
    }

    /// Check the attribute of `var` whose code is the filter's code
    pub fn matches_attrs(&self, var: &Var) -> bool {
        var.attr(self.code)
            .and_then(Var::value)
            .is_some_and(|v| self.matches_value(v))
    }
}

impl fmt::Display for DataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Single { op, value } => write!(f, "{}{}{}", self.code, op.symbol(), value),
            Condition::Between {
                low,
                low_inclusive,
                high,
                high_inclusive,
            } => write!(
                f,
                "{}{}{}{}{}",
                low,
                if *low_inclusive { "<=" } else { "<" },
                self.code,
                if *high_inclusive { "<=" } else { "<" },
                high
            ),
        }
    }
}

fn check_comparable(var_type: VarType, code: Varcode) -> Result<()> {
    if var_type == VarType::Binary {
        return Err(Error::type_mismatch(code, "binary values cannot be compared"));
    }
    Ok(())
}

fn compare(value: &VarValue, threshold: &VarValue) -> Option<Ordering> {
    match (value, threshold) {
        (VarValue::Int(a), VarValue::Int(b)) => Some(a.cmp(b)),
        (VarValue::Str(a), VarValue::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}
