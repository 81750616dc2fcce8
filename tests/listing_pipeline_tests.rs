//! Integration tests for the listing pipeline rules
//!
//! These tests verify the documented behavior of the paginated listings:
//! - Filter routing (scalar columns to WHERE, aggregates to HAVING)
//! - Pagination clamping and offset math
//! - Collation rules for text sorting (letters before everything else)
//! - Loan status and overdue derivation

// ============================================================================
// Filter Routing Tests
// ============================================================================

/// Which clause a filter on a given column must land in.
#[derive(Debug, PartialEq)]
enum Clause {
    Where,
    Having,
}

/// Routing rule: aggregate filter expressions cannot appear in WHERE, so any
/// column whose filter aggregates over a fan-out join goes to HAVING.
fn route(aggregate: bool) -> Clause {
    if aggregate {
        Clause::Having
    } else {
        Clause::Where
    }
}

mod filter_routing {
    use super::*;

    /// Book columns and whether their filter expression aggregates.
    const BOOK_COLUMNS: &[(&str, bool)] = &[
        ("title", false),
        ("description", false),
        ("authors", false), // filters on the joined row, sorts aggregated
        ("bookType", false),
        ("bbks", true),
        ("udcs", true),
        ("grntis", true),
        ("bbkRaws", true),
        ("udcRaws", true),
        ("grntiRaws", true),
        ("publicationPlaces", true),
        ("id", false),
    ];

    #[test]
    fn scalar_book_columns_filter_in_where() {
        for (key, aggregate) in BOOK_COLUMNS.iter().filter(|(_, agg)| !agg) {
            assert_eq!(route(*aggregate), Clause::Where, "{key}");
        }
    }

    #[test]
    fn multi_valued_book_columns_filter_in_having() {
        for (key, aggregate) in BOOK_COLUMNS.iter().filter(|(_, agg)| *agg) {
            assert_eq!(route(*aggregate), Clause::Having, "{key}");
        }
    }

    #[test]
    fn copy_status_filters_in_having() {
        // Status is derived from MAX over joined loan rows.
        assert_eq!(route(true), Clause::Having);
    }

    #[test]
    fn borrow_record_columns_all_filter_in_where() {
        // Borrow records only join many-to-one relations; nothing fans out.
        for key in [
            "title",
            "inventoryNo",
            "person",
            "borrowDate",
            "returnDate",
            "issuedByUser",
        ] {
            assert_eq!(route(false), Clause::Where, "{key}");
        }
    }
}

// ============================================================================
// Pagination Tests
// ============================================================================

mod pagination {
    fn clamp(page: i64, limit: i64) -> (i64, i64) {
        (page.max(1), limit.max(1))
    }

    fn offset(page: i64, limit: i64) -> i64 {
        (page - 1) * limit
    }

    #[test]
    fn page_and_limit_clamp_to_one() {
        assert_eq!(clamp(0, 0), (1, 1));
        assert_eq!(clamp(-5, -10), (1, 1));
        assert_eq!(clamp(3, 25), (3, 25));
    }

    #[test]
    fn first_page_starts_at_zero() {
        assert_eq!(offset(1, 10), 0);
    }

    #[test]
    fn offset_advances_by_whole_pages() {
        assert_eq!(offset(2, 10), 10);
        assert_eq!(offset(7, 25), 150);
    }

    #[test]
    fn last_partial_page_is_reachable() {
        // 23 rows at limit 10: page 3 holds rows 20..23.
        let total = 23_i64;
        let limit = 10_i64;
        let last_page = (total as u64).div_ceil(limit as u64) as i64;
        assert_eq!(last_page, 3);
        assert_eq!(offset(last_page, limit), 20);
        assert_eq!(total - offset(last_page, limit), 3);
    }

    #[test]
    fn availability_flags_are_mutually_exclusive() {
        fn check(only_available: bool, only_issued: bool) -> bool {
            !(only_available && only_issued)
        }
        assert!(!check(true, true));
        assert!(check(true, false));
        assert!(check(false, true));
        assert!(check(false, false));
    }
}

// ============================================================================
// Text Collation Tests
// ============================================================================

mod text_collation {
    /// Bucket 0 for values starting with a letter (Latin or Cyrillic),
    /// bucket 1 for digits, punctuation, and NULL-ish empties. Mirrors the
    /// `CASE WHEN expr ~* '^[a-zа-яё]'` prefix used in ORDER BY.
    fn bucket(value: &str) -> u8 {
        match value.chars().next() {
            Some(c) if c.is_alphabetic() => 0,
            _ => 1,
        }
    }

    fn sort_key(value: &str) -> (u8, String) {
        (bucket(value), value.to_lowercase())
    }

    #[test]
    fn letters_sort_before_digits_and_punctuation() {
        let mut titles = vec!["1984", "Anna Karenina", "#hashtag", "war and peace"];
        titles.sort_by_key(|t| sort_key(t));
        assert_eq!(titles, vec!["Anna Karenina", "war and peace", "#hashtag", "1984"]);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let mut titles = vec!["banana", "Apple", "cherry"];
        titles.sort_by_key(|t| sort_key(t));
        assert_eq!(titles, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn cyrillic_counts_as_lettered() {
        assert_eq!(bucket("Война и мир"), 0);
        assert_eq!(bucket("12 стульев"), 1);
    }
}

// ============================================================================
// Loan Status Tests
// ============================================================================

mod loan_status {
    /// A copy is issued while any of its loans has no return date.
    fn is_issued(return_dates: &[Option<&str>]) -> bool {
        return_dates.iter().any(|d| d.is_none())
    }

    /// Overdue when the loan is open and its deadline has passed. The due
    /// date wins over the expected return date when both are set.
    fn is_overdue(
        return_date: Option<&str>,
        due_date: Option<&str>,
        expected_return_date: Option<&str>,
        today: &str,
    ) -> bool {
        if return_date.is_some() {
            return false;
        }
        match due_date.or(expected_return_date) {
            Some(deadline) => deadline < today,
            None => false,
        }
    }

    #[test]
    fn copy_with_no_loans_is_available() {
        assert!(!is_issued(&[]));
    }

    #[test]
    fn copy_with_only_closed_loans_is_available() {
        assert!(!is_issued(&[Some("2024-01-10"), Some("2024-03-02")]));
    }

    #[test]
    fn one_open_loan_makes_the_copy_issued() {
        assert!(is_issued(&[Some("2024-01-10"), None]));
    }

    #[test]
    fn returned_loans_are_never_overdue() {
        assert!(!is_overdue(
            Some("2024-02-01"),
            Some("2024-01-15"),
            None,
            "2024-06-01"
        ));
    }

    #[test]
    fn open_loan_past_due_date_is_overdue() {
        assert!(is_overdue(None, Some("2024-01-15"), None, "2024-06-01"));
    }

    #[test]
    fn due_date_takes_precedence_over_expected_return() {
        // Due date in the future, expected return in the past: not overdue.
        assert!(!is_overdue(
            None,
            Some("2099-01-01"),
            Some("2024-01-01"),
            "2024-06-01"
        ));
    }

    #[test]
    fn expected_return_applies_when_no_due_date() {
        assert!(is_overdue(None, None, Some("2024-01-01"), "2024-06-01"));
        assert!(!is_overdue(None, None, Some("2099-01-01"), "2024-06-01"));
    }

    #[test]
    fn open_loan_without_any_deadline_is_not_overdue() {
        assert!(!is_overdue(None, None, None, "2024-06-01"));
    }
}
