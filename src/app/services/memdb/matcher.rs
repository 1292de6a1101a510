//! Residual predicates on stored variables
//!
//! Constraints that no index can answer are expressed as [`VarMatch`] values
//! and evaluated on each index-narrowed candidate. A query's predicates are
//! combined with AND by the result accumulator.

use crate::Result;
use crate::app::models::Query;
use crate::app::models::var::{Var, Varcode};
use crate::app::services::datafilter::DataFilter;
use crate::app::services::vartable::VarTable;
use std::collections::BTreeSet;

/// Predicate over one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarMatch {
    /// Variable code equals the given code
    Code(Varcode),
    /// Variable code is one of the given codes
    Codes(BTreeSet<Varcode>),
    /// Variable value satisfies the comparison
    Data(DataFilter),
    /// Attribute with the comparison's code satisfies it
    Attr(DataFilter),
}

impl VarMatch {
    /// Build the code predicate for a set of codes, `None` if the set is empty
    pub fn for_codes(codes: &BTreeSet<Varcode>) -> Option<Self> {
        match codes.len() {
            0 => None,
            1 => codes.iter().next().copied().map(VarMatch::Code),
            _ => Some(VarMatch::Codes(codes.clone())),
        }
    }

    /// Variable predicates of a query: codes, then data filter, then attribute filter
    ///
    /// # Errors
    /// * Returns the parse error of an invalid data or attribute filter
    pub fn for_query(query: &Query, table: &dyn VarTable) -> Result<Vec<Self>> {
        let mut matches: Vec<Self> = Self::for_codes(&query.varcodes).into_iter().collect();
        if let Some(expr) = &query.datafilter {
            matches.push(VarMatch::Data(DataFilter::parse(table, expr)?));
        }
        if let Some(expr) = &query.attrfilter {
            matches.push(VarMatch::Attr(DataFilter::parse(table, expr)?));
        }
        Ok(matches)
    }

    pub fn matches(&self, var: &Var) -> bool {
        match self {
            VarMatch::Code(code) => var.code() == *code,
            VarMatch::Codes(codes) => codes.contains(&var.code()),
            VarMatch::Data(filter) => filter.matches_var(var),
            VarMatch::Attr(filter) => filter.matches_attrs(var),
        }
    }
}
