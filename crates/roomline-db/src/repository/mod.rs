//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`catalog`] - channels, rooms, variants, channel listings
//! - [`discount`] - promotion rules with scopes and per-channel values
//! - [`stock`] - hotels, stock records, order lines, allocations
//! - [`jobs`] - the background job queue (outbox)

pub mod catalog;
pub mod discount;
pub mod jobs;
pub mod stock;

/// Builds a `?,?,...,?` placeholder list for dynamic IN clauses.
///
/// sqlx cannot bind a Vec into a single `IN (?)` placeholder on SQLite,
/// so batch queries interpolate the placeholder list (never the values)
/// and bind each id individually.
pub(crate) fn sql_placeholders(count: usize) -> String {
    let mut s = String::with_capacity(count * 2);
    for i in 0..count {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_placeholders() {
        assert_eq!(sql_placeholders(0), "");
        assert_eq!(sql_placeholders(1), "?");
        assert_eq!(sql_placeholders(3), "?,?,?");
    }
}
