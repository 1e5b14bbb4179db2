//! Composable filter predicates reduced into parameterized SQL.
//!
//! Listing endpoints accept a varying set of optional filters. Rather than
//! concatenating SQL fragments by hand, each supplied filter becomes a typed
//! [`Predicate`] and the whole set is reduced into a [`sqlx::QueryBuilder`]
//! with bound parameters, so the same filter renders both the count query and
//! the page query.

use sqlx::{Postgres, QueryBuilder};

use crate::models::{BusinessStatus, ReviewApproval};

/// A single WHERE predicate. Text matches are case-insensitive substring
/// matches; everything else is equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// OR of `column ILIKE '%needle%'` over one or more columns.
    Contains {
        columns: &'static [&'static str],
        needle: String,
    },
    StatusEq {
        column: &'static str,
        value: BusinessStatus,
    },
    ApprovalEq {
        column: &'static str,
        value: ReviewApproval,
    },
    BoolEq {
        column: &'static str,
        value: bool,
    },
}

/// An AND-combined set of predicates. Absent filters simply contribute no
/// predicate, so an empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Add a substring match over the given columns, skipped when the needle
    /// is empty or whitespace.
    pub fn contains(mut self, columns: &'static [&'static str], needle: &str) -> Self {
        let needle = needle.trim();
        if !needle.is_empty() {
            self.predicates.push(Predicate::Contains {
                columns,
                needle: needle.to_string(),
            });
        }
        self
    }

    pub fn status_eq(mut self, column: &'static str, value: BusinessStatus) -> Self {
        self.predicates.push(Predicate::StatusEq { column, value });
        self
    }

    pub fn approval_eq(mut self, column: &'static str, value: ReviewApproval) -> Self {
        self.predicates.push(Predicate::ApprovalEq { column, value });
        self
    }

    pub fn bool_eq(mut self, column: &'static str, value: bool) -> Self {
        self.predicates.push(Predicate::BoolEq { column, value });
        self
    }

    /// Render `WHERE ...` into the builder, binding every filter value.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.predicates.is_empty() {
            return;
        }

        qb.push(" WHERE ");
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            match predicate {
                Predicate::Contains { columns, needle } => {
                    let pattern = format!("%{needle}%");
                    qb.push("(");
                    for (j, column) in columns.iter().enumerate() {
                        if j > 0 {
                            qb.push(" OR ");
                        }
                        qb.push(*column);
                        qb.push(" ILIKE ");
                        qb.push_bind(pattern.clone());
                    }
                    qb.push(")");
                }
                Predicate::StatusEq { column, value } => {
                    qb.push(*column);
                    qb.push(" = ");
                    qb.push_bind(*value);
                }
                Predicate::ApprovalEq { column, value } => {
                    qb.push(*column);
                    qb.push(" = ");
                    qb.push_bind(*value);
                }
                Predicate::BoolEq { column, value } => {
                    qb.push(*column);
                    qb.push(" = ");
                    qb.push_bind(*value);
                }
            }
        }
    }
}

/// Page/limit pair clamped to sane bounds.
///
/// Zero and negative values from the query string are clamped rather than
/// rejected, and the limit is capped to keep a single request from pulling
/// the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub limit: i64,
}

pub const MAX_PAGE_SIZE: i64 = 100;

impl Page {
    pub fn clamped(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            number: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.limit
    }

    /// Render ` LIMIT $n OFFSET $m` into the builder.
    pub fn push_limit_offset(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ");
        qb.push_bind(self.limit);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_renders_no_where_clause() {
        let filter = Filter::new().contains(&["b.name"], "   ");
        assert!(filter.is_empty());
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM businesses b");
        filter.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM businesses b");
    }

    #[test]
    fn each_filter_adds_one_and_predicate() {
        let filter = Filter::new()
            .contains(&["b.name", "b.industry"], "plumb")
            .contains(&["b.location", "b.address"], "houston")
            .status_eq("b.status", BusinessStatus::Active);
        assert_eq!(filter.predicates().len(), 3);
        let mut qb = QueryBuilder::new("SELECT b.id FROM businesses b");
        filter.push_where(&mut qb);

        let sql = qb.sql();
        assert_eq!(
            sql,
            "SELECT b.id FROM businesses b WHERE \
             (b.name ILIKE $1 OR b.industry ILIKE $2) AND \
             (b.location ILIKE $3 OR b.address ILIKE $4) AND \
             b.status = $5"
        );
    }

    #[test]
    fn approval_and_bool_predicates_render_equality() {
        let filter = Filter::new()
            .approval_eq("r.approval", ReviewApproval::Pending)
            .bool_eq("u.is_admin", true);
        let mut qb = QueryBuilder::new("SELECT 1");
        filter.push_where(&mut qb);
        assert_eq!(qb.sql(), "SELECT 1 WHERE r.approval = $1 AND u.is_admin = $2");
    }

    #[test]
    fn page_clamps_nonsense_values() {
        let page = Page::clamped(Some(0), Some(-5), 20);
        assert_eq!(page, Page { number: 1, limit: 1 });

        let page = Page::clamped(Some(-3), Some(10_000), 20);
        assert_eq!(
            page,
            Page {
                number: 1,
                limit: MAX_PAGE_SIZE
            }
        );

        let page = Page::clamped(None, None, 20);
        assert_eq!(page, Page { number: 1, limit: 20 });
    }

    #[test]
    fn offset_is_zero_based_from_page_one() {
        assert_eq!(Page { number: 1, limit: 20 }.offset(), 0);
        assert_eq!(Page { number: 3, limit: 20 }.offset(), 40);
    }

    #[test]
    fn limit_and_offset_are_bound_not_inlined() {
        let page = Page { number: 2, limit: 25 };
        let mut qb = QueryBuilder::new("SELECT b.id FROM businesses b");
        page.push_limit_offset(&mut qb);
        assert_eq!(qb.sql(), "SELECT b.id FROM businesses b LIMIT $1 OFFSET $2");
    }
}
