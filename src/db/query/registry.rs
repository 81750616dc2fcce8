//! Search/sort column registries
//!
//! Each listable entity declares its logical columns here: the raw SQL
//! expression used for filtering, the (often aggregated) expression used for
//! sorting, a value-type tag that controls collation, and whether the filter
//! expression is an aggregate and therefore must be routed to HAVING.
//!
//! Expressions are static program text; the only runtime value that ever
//! reaches the database is the bound search term. Unknown search columns fall
//! back to the entity's default OR-chain rather than erroring, matching the
//! documented behavior of the listing endpoints.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;

use super::status;

/// Value type of a logical column, governing sort collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Case-insensitive, letter-first ordering.
    Text,
    /// Native numeric ordering.
    Number,
    /// Native date ordering.
    Date,
}

/// One logical column of a listable entity.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Stable key accepted in `searchColumn` / `sort` query parameters.
    pub key: &'static str,
    /// Expression usable in WHERE (scalar) or HAVING (aggregate).
    pub filter_expr: String,
    /// Expression usable in ORDER BY; aggregated where the relation fans out.
    pub sort_expr: String,
    pub column_type: ColumnType,
    /// Aggregate filter expressions must go to HAVING, never WHERE.
    pub aggregate: bool,
}

impl ColumnDef {
    fn scalar(key: &'static str, expr: &str, sort: &str, column_type: ColumnType) -> Self {
        Self {
            key,
            filter_expr: expr.to_string(),
            sort_expr: sort.to_string(),
            column_type,
            aggregate: false,
        }
    }

    fn aggregate(key: &'static str, expr: &str, sort: &str, column_type: ColumnType) -> Self {
        Self {
            key,
            filter_expr: expr.to_string(),
            sort_expr: sort.to_string(),
            column_type,
            aggregate: true,
        }
    }
}

/// Everything the list-query builder needs to know about one root entity.
#[derive(Debug)]
pub struct ListSpec {
    /// Root id expression, also the pagination group key and sort tiebreak.
    pub id_expr: &'static str,
    /// FROM clause with every left join the filters and sorts may touch.
    pub from_clause: &'static str,
    /// Whether the joins fan out and the id query must GROUP BY the root id.
    pub group_by: bool,
    pub columns: Vec<ColumnDef>,
    /// Scalar expressions OR-ed together when no column is recognized.
    pub default_search: &'static [&'static str],
}

impl ListSpec {
    pub fn column(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Startup sanity check: every exposed key must carry both expressions,
    /// and the default OR-chain must stay scalar (it is applied in WHERE).
    pub fn validate(&self) -> Result<()> {
        for col in &self.columns {
            if col.filter_expr.trim().is_empty() || col.sort_expr.trim().is_empty() {
                bail!("column '{}' is missing a filter or sort expression", col.key);
            }
        }
        for expr in self.default_search {
            if looks_aggregate(expr) {
                bail!("default search expression '{expr}' is aggregate and cannot go in WHERE");
            }
        }
        if self.group_by {
            // Fan-out joins without grouping would duplicate page rows.
            for col in &self.columns {
                if col.aggregate && !looks_aggregate(&col.filter_expr) {
                    bail!("column '{}' is flagged aggregate but its filter is scalar", col.key);
                }
            }
        }
        Ok(())
    }
}

fn looks_aggregate(expr: &str) -> bool {
    let lower = expr.to_lowercase();
    ["string_agg", "count(", "sum(", "min(", "max(", "avg("]
        .iter()
        .any(|f| lower.contains(f))
}

const FULL_NAME: &str = "concat_ws(' ', a.last_name, a.first_name, a.patronymic)";
const PERSON_NAME: &str = "concat_ws(' ', p.last_name, p.first_name, p.patronymic)";
const PUB_PLACE: &str = "concat_ws(' ', pp.city, pub.name, pp.pub_year)";

/// Books joined to every classifier and loan relation the listing can touch.
pub static BOOK_LIST: Lazy<ListSpec> = Lazy::new(|| ListSpec {
    id_expr: "book.id",
    from_clause: "book \
         LEFT JOIN book_author ba ON ba.book_id = book.id \
         LEFT JOIN author a ON a.id = ba.author_id \
         LEFT JOIN book_bbk bb ON bb.book_id = book.id \
         LEFT JOIN bbk ON bbk.id = bb.bbk_id \
         LEFT JOIN book_udc bu ON bu.book_id = book.id \
         LEFT JOIN udc ON udc.id = bu.udc_id \
         LEFT JOIN book_grnti bg ON bg.book_id = book.id \
         LEFT JOIN grnti ON grnti.id = bg.grnti_id \
         LEFT JOIN book_bbk_raw bbr ON bbr.book_id = book.id \
         LEFT JOIN book_udc_raw udr ON udr.book_id = book.id \
         LEFT JOIN book_grnti_raw grr ON grr.book_id = book.id \
         LEFT JOIN book_pub_place pp ON pp.book_id = book.id \
         LEFT JOIN publisher pub ON pub.id = pp.publisher_id \
         LEFT JOIN book_copy bc ON bc.book_id = book.id \
         LEFT JOIN borrow_record br ON br.book_copy_id = bc.id",
    group_by: true,
    columns: vec![
        ColumnDef::scalar("title", "book.title", "MIN(book.title)", ColumnType::Text),
        ColumnDef::scalar(
            "description",
            "book.description",
            "MIN(book.description)",
            ColumnType::Text,
        ),
        ColumnDef::scalar(
            "authors",
            FULL_NAME,
            "string_agg(DISTINCT a.last_name, ',')",
            ColumnType::Text,
        ),
        ColumnDef::scalar("bookType", "book.type", "MIN(book.type)", ColumnType::Text),
        ColumnDef::scalar("edit", "book.edit", "MIN(book.edit)", ColumnType::Text),
        ColumnDef::scalar("series", "book.series", "MIN(book.series)", ColumnType::Text),
        ColumnDef::scalar(
            "physDesc",
            "book.phys_desc",
            "MIN(book.phys_desc)",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "bbks",
            "string_agg(DISTINCT bbk.bbk_abb, ',')",
            "string_agg(DISTINCT bbk.bbk_abb, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "udcs",
            "string_agg(DISTINCT udc.udc_abb, ',')",
            "string_agg(DISTINCT udc.udc_abb, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "grntis",
            "string_agg(DISTINCT grnti.grnti_code, ',')",
            "string_agg(DISTINCT grnti.grnti_code, ',')",
            ColumnType::Text,
        ),
        // Legacy alias kept for the client's column naming.
        ColumnDef::aggregate(
            "grntiAbbs",
            "string_agg(DISTINCT grnti.grnti_code, ',')",
            "string_agg(DISTINCT grnti.grnti_code, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "bbkRaws",
            "string_agg(DISTINCT bbr.bbk_code, ',')",
            "string_agg(DISTINCT bbr.bbk_code, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "udcRaws",
            "string_agg(DISTINCT udr.udc_code, ',')",
            "string_agg(DISTINCT udr.udc_code, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "grntiRaws",
            "string_agg(DISTINCT grr.grnti_code, ',')",
            "string_agg(DISTINCT grr.grnti_code, ',')",
            ColumnType::Text,
        ),
        ColumnDef::aggregate(
            "publicationPlaces",
            &format!("string_agg(DISTINCT {PUB_PLACE}, ',')"),
            &format!("string_agg(DISTINCT {PUB_PLACE}, ',')"),
            ColumnType::Text,
        ),
        ColumnDef::scalar("id", "CAST(book.id AS TEXT)", "book.id", ColumnType::Number),
    ],
    default_search: &[
        "book.title",
        "book.description",
        "book.phys_desc",
        "book.series",
        "book.edit",
        "a.last_name",
        "a.first_name",
        "a.patronymic",
    ],
});

/// Copies joined to their book, its authors/publication places, and loans.
pub static COPY_LIST: Lazy<ListSpec> = Lazy::new(|| ListSpec {
    id_expr: "copy.id",
    from_clause: "book_copy copy \
         LEFT JOIN book ON book.id = copy.book_id \
         LEFT JOIN book_author ba ON ba.book_id = book.id \
         LEFT JOIN author a ON a.id = ba.author_id \
         LEFT JOIN book_pub_place pp ON pp.book_id = book.id \
         LEFT JOIN publisher pub ON pub.id = pp.publisher_id \
         LEFT JOIN borrow_record br ON br.book_copy_id = copy.id",
    group_by: true,
    columns: vec![
        ColumnDef::scalar(
            "inventoryNo",
            "copy.inventory_no",
            "MIN(copy.inventory_no)",
            ColumnType::Text,
        ),
        ColumnDef::scalar("title", "book.title", "MIN(book.title)", ColumnType::Text),
        ColumnDef::scalar(
            "authors",
            FULL_NAME,
            "string_agg(DISTINCT a.last_name, ',')",
            ColumnType::Text,
        ),
        // Derived pseudo-column; both forms come from the canonical predicate.
        ColumnDef::aggregate(
            "status",
            &status::status_label("br"),
            &status::status_flag("br"),
            ColumnType::Number,
        ),
        ColumnDef::scalar("id", "CAST(copy.id AS TEXT)", "copy.id", ColumnType::Number),
    ],
    default_search: &[
        "copy.inventory_no",
        "book.title",
        "a.last_name",
        "a.first_name",
        "a.patronymic",
    ],
});

/// Borrow records join only many-to-one relations, so no fan-out and no
/// GROUP BY; every column stays scalar.
pub static BORROW_LIST: Lazy<ListSpec> = Lazy::new(|| ListSpec {
    id_expr: "record.id",
    from_clause: "borrow_record record \
         LEFT JOIN book_copy copy ON copy.id = record.book_copy_id \
         LEFT JOIN book ON book.id = copy.book_id \
         LEFT JOIN person p ON p.id = record.person_id \
         LEFT JOIN app_user iu ON iu.id = record.issued_by_user_id \
         LEFT JOIN app_user au ON au.id = record.accepted_by_user_id",
    group_by: false,
    columns: vec![
        ColumnDef::scalar("title", "book.title", "book.title", ColumnType::Text),
        ColumnDef::scalar(
            "inventoryNo",
            "copy.inventory_no",
            "copy.inventory_no",
            ColumnType::Text,
        ),
        ColumnDef::scalar("person", PERSON_NAME, PERSON_NAME, ColumnType::Text),
        ColumnDef::scalar(
            "borrowDate",
            "record.borrow_date::text",
            "record.borrow_date",
            ColumnType::Date,
        ),
        ColumnDef::scalar(
            "dueDate",
            "record.due_date::text",
            "record.due_date",
            ColumnType::Date,
        ),
        ColumnDef::scalar(
            "expectedReturnDate",
            "record.expected_return_date::text",
            "record.expected_return_date",
            ColumnType::Date,
        ),
        ColumnDef::scalar(
            "returnDate",
            "record.return_date::text",
            "record.return_date",
            ColumnType::Date,
        ),
        ColumnDef::scalar("issuedByUser", "iu.username", "iu.username", ColumnType::Text),
        ColumnDef::scalar("acceptedByUser", "au.username", "au.username", ColumnType::Text),
        ColumnDef::scalar("id", "CAST(record.id AS TEXT)", "record.id", ColumnType::Number),
    ],
    default_search: &[
        "book.title",
        "copy.inventory_no",
        "concat_ws(' ', p.last_name, p.first_name, p.patronymic)",
        "record.borrow_date::text",
        "record.expected_return_date::text",
        "record.return_date::text",
        "iu.username",
        "au.username",
    ],
});

/// Validate every registry once at startup; a bad expression is a programming
/// error and should prevent the server from serving queries at all.
pub fn validate_all() -> Result<()> {
    BOOK_LIST.validate()?;
    COPY_LIST.validate()?;
    BORROW_LIST.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_pass_validation() {
        validate_all().unwrap();
    }

    #[test]
    fn multi_valued_book_columns_are_aggregate() {
        for key in ["bbks", "udcs", "grntis", "bbkRaws", "udcRaws", "grntiRaws", "publicationPlaces"] {
            assert!(BOOK_LIST.column(key).unwrap().aggregate, "{key} must be aggregate");
        }
        for key in ["title", "authors", "physDesc"] {
            assert!(!BOOK_LIST.column(key).unwrap().aggregate, "{key} must be scalar");
        }
    }

    #[test]
    fn copy_status_is_an_aggregate_pseudo_column() {
        let status = COPY_LIST.column("status").unwrap();
        assert!(status.aggregate);
        assert!(status.sort_expr.starts_with("MAX(CASE WHEN"));
        assert_eq!(status.column_type, ColumnType::Number);
    }

    #[test]
    fn unknown_keys_resolve_to_none() {
        assert!(BOOK_LIST.column("nope").is_none());
        assert!(COPY_LIST.column("title; DROP TABLE book").is_none());
    }

    #[test]
    fn borrow_registry_is_scalar_and_ungrouped() {
        assert!(!BORROW_LIST.group_by);
        assert!(BORROW_LIST.columns.iter().all(|c| !c.aggregate));
    }
}
