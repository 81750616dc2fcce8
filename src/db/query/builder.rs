//! Dynamic list-query construction
//!
//! Assembles the id-resolution SQL for one paginated listing: joins and
//! grouping from the entity's [`ListSpec`], search routed to WHERE or HAVING by
//! the column's aggregate flag, availability filters as raw correlated
//! subqueries, and registry-driven ordering with a deterministic id tiebreak.
//!
//! Every expression comes from the static registry; the search term is the
//! only bound value ($1), with LIMIT/OFFSET bound after it in the page query.

use super::registry::{ColumnType, ListSpec};

/// Sort direction parsed from a `field.asc|desc` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Builder for the filtered, sorted id query of one listing request.
pub struct ListQuery {
    spec: &'static ListSpec,
    where_conds: Vec<String>,
    having_conds: Vec<String>,
    order_by: Vec<String>,
    search_term: Option<String>,
}

impl ListQuery {
    pub fn new(spec: &'static ListSpec) -> Self {
        Self {
            spec,
            where_conds: Vec::new(),
            having_conds: Vec::new(),
            order_by: Vec::new(),
            search_term: None,
        }
    }

    /// Case-insensitive substring search. A recognized column routes the
    /// condition through its registered expression (HAVING when aggregate);
    /// anything else falls back to the default OR-chain in WHERE.
    pub fn search(&mut self, term: &str, column: &str) -> &mut Self {
        if term.is_empty() {
            return self;
        }
        self.search_term = Some(term.to_string());

        match self.spec.column(column) {
            Some(col) => {
                let cond = format!("{} ILIKE $1", col.filter_expr);
                if col.aggregate {
                    self.having_conds.push(cond);
                } else {
                    self.where_conds.push(cond);
                }
            }
            None => {
                let chain = self
                    .spec
                    .default_search
                    .iter()
                    .map(|expr| format!("{expr} ILIKE $1"))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                self.where_conds.push(format!("({chain})"));
            }
        }
        self
    }

    /// Append a raw WHERE condition (availability/overdue filters). The
    /// condition must be static program text, never user input.
    pub fn filter(&mut self, condition: impl Into<String>) -> &mut Self {
        self.where_conds.push(condition.into());
        self
    }

    /// Resolve a `field.asc|desc` sort parameter against the registry.
    /// Unknown fields fall back to the root id ascending; ties are always
    /// broken by id so pages are stable.
    pub fn sort(&mut self, sort: &str) -> &mut Self {
        let (field, dir_raw) = sort.split_once('.').unwrap_or((sort, "asc"));
        let dir = if dir_raw.eq_ignore_ascii_case("desc") {
            Direction::Desc
        } else {
            Direction::Asc
        };

        match self.spec.column(field) {
            Some(col) if field == "id" => {
                self.order_by.push(format!("{} {}", col.sort_expr, dir.as_sql()));
            }
            Some(col) => {
                match col.column_type {
                    ColumnType::Text => {
                        // Alphabetic values sort ahead of digit/symbol-leading
                        // ones, then case-insensitively within each bucket.
                        self.order_by.push(format!(
                            "CASE WHEN {expr} ~* '^[a-zа-яё]' THEN 0 ELSE 1 END ASC",
                            expr = col.sort_expr
                        ));
                        self.order_by.push(format!(
                            "LOWER({}) {} NULLS LAST",
                            col.sort_expr,
                            dir.as_sql()
                        ));
                    }
                    ColumnType::Number | ColumnType::Date => {
                        self.order_by
                            .push(format!("{} {} NULLS LAST", col.sort_expr, dir.as_sql()));
                    }
                }
                self.order_by.push(format!("{} ASC", self.spec.id_expr));
            }
            None => {
                self.order_by.push(format!("{} ASC", self.spec.id_expr));
            }
        }
        self
    }

    /// Raw term to bind as $1 (caller wraps it in `%…%`), if a search applies.
    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    fn filtered_ids_sql(&self) -> String {
        let mut sql = format!(
            "SELECT {id} AS id FROM {from}",
            id = self.spec.id_expr,
            from = self.spec.from_clause
        );
        if !self.where_conds.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_conds.join(" AND "));
        }
        if self.spec.group_by {
            sql.push_str(&format!(" GROUP BY {}", self.spec.id_expr));
        }
        if !self.having_conds.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having_conds.join(" AND "));
        }
        sql
    }

    fn order_clause(&self) -> String {
        if self.order_by.is_empty() {
            format!(" ORDER BY {} ASC", self.spec.id_expr)
        } else {
            format!(" ORDER BY {}", self.order_by.join(", "))
        }
    }

    /// Total count of matching roots: the filtered id query (no ordering, no
    /// pagination) wrapped in COUNT so grouping is respected.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM ({}) sub", self.filtered_ids_sql())
    }

    /// Ordered page of ids; LIMIT and OFFSET are the next bind params after
    /// the optional search term.
    pub fn page_sql(&self) -> String {
        let base = if self.search_term.is_some() { 2 } else { 1 };
        format!(
            "{}{} LIMIT ${} OFFSET ${}",
            self.filtered_ids_sql(),
            self.order_clause(),
            base,
            base + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::registry::{BOOK_LIST, BORROW_LIST, COPY_LIST};
    use super::super::status;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_search_lands_in_where() {
        let mut q = ListQuery::new(&BOOK_LIST);
        q.search("war", "title");
        let sql = q.page_sql();
        assert!(sql.contains("WHERE book.title ILIKE $1"));
        assert!(!sql.contains("HAVING"));
    }

    #[test]
    fn aggregate_search_lands_in_having_after_group_by() {
        let mut q = ListQuery::new(&BOOK_LIST);
        q.search("84", "bbks");
        let sql = q.page_sql();
        assert!(!sql.contains("WHERE"));
        let group = sql.find("GROUP BY book.id").unwrap();
        let having = sql
            .find("HAVING string_agg(DISTINCT bbk.bbk_abb, ',') ILIKE $1")
            .unwrap();
        assert!(group < having);
    }

    #[test]
    fn unknown_column_falls_back_to_default_or_chain() {
        let mut q = ListQuery::new(&COPY_LIST);
        q.search("abc", "bogus");
        let sql = q.page_sql();
        assert!(sql.contains("(copy.inventory_no ILIKE $1 OR book.title ILIKE $1"));
        assert!(!sql.contains("HAVING"));
    }

    #[test]
    fn empty_term_adds_no_conditions() {
        let mut q = ListQuery::new(&BOOK_LIST);
        q.search("", "title");
        assert!(q.search_term().is_none());
        assert!(!q.page_sql().contains("WHERE"));
    }

    #[test]
    fn text_sort_gets_letter_bucket_and_id_tiebreak() {
        let mut q = ListQuery::new(&BOOK_LIST);
        q.sort("title.desc");
        let sql = q.page_sql();
        assert!(sql.contains(
            "ORDER BY CASE WHEN MIN(book.title) ~* '^[a-zа-яё]' THEN 0 ELSE 1 END ASC, \
             LOWER(MIN(book.title)) DESC NULLS LAST, book.id ASC"
        ));
    }

    #[test]
    fn date_sort_is_native_with_nulls_last() {
        let mut q = ListQuery::new(&BORROW_LIST);
        q.sort("returnDate.asc");
        let sql = q.page_sql();
        assert!(sql.contains("ORDER BY record.return_date ASC NULLS LAST, record.id ASC"));
    }

    #[test]
    fn unknown_sort_falls_back_to_id_asc() {
        let mut q = ListQuery::new(&COPY_LIST);
        q.sort("nonsense.desc");
        assert!(q.page_sql().contains("ORDER BY copy.id ASC"));
    }

    #[test]
    fn status_sort_uses_the_aggregate_flag() {
        let mut q = ListQuery::new(&COPY_LIST);
        q.sort("status.desc");
        let sql = q.page_sql();
        assert!(sql.contains("MAX(CASE WHEN br.return_date IS NULL THEN 1 ELSE 0 END) DESC"));
    }

    #[test]
    fn count_sql_carries_filters_but_not_pagination() {
        let mut q = ListQuery::new(&COPY_LIST);
        q.search("war", "title");
        q.filter(status::copy_available("copy.id"));
        q.sort("title.asc");
        let count = q.count_sql();
        assert!(count.starts_with("SELECT COUNT(*) FROM (SELECT copy.id AS id"));
        assert!(count.contains("book.title ILIKE $1"));
        assert!(count.contains("NOT EXISTS"));
        assert!(!count.contains("LIMIT"));
        assert!(!count.contains("ORDER BY"));
    }

    #[test]
    fn page_sql_binds_limit_and_offset_after_the_term() {
        let mut q = ListQuery::new(&BOOK_LIST);
        q.search("x", "title");
        assert!(q.page_sql().ends_with("LIMIT $2 OFFSET $3"));

        let q = ListQuery::new(&BOOK_LIST);
        assert!(q.page_sql().ends_with("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn filters_are_and_chained() {
        let mut q = ListQuery::new(&BORROW_LIST);
        q.search("ivan", "person");
        q.filter(status::overdue("record"));
        let sql = q.page_sql();
        let expected = format!(
            "WHERE concat_ws(' ', p.last_name, p.first_name, p.patronymic) ILIKE $1 AND {}",
            status::overdue("record")
        );
        assert!(sql.contains(&expected), "got: {sql}");
    }

    #[test]
    fn borrow_query_has_no_grouping() {
        let mut q = ListQuery::new(&BORROW_LIST);
        q.search("war", "title");
        let sql = q.page_sql();
        assert!(!sql.contains("GROUP BY"));
        assert_eq!(sql.matches("SELECT").count(), 1);
    }
}
