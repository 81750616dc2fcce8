//! Loan status derivation
//!
//! A borrow record with a null `return_date` is the single source of truth for
//! "this copy is out on loan". Every SQL form of that rule (availability
//! filters, the sortable status flag, the overdue check) is generated from the
//! one predicate here so the filter and sort paths cannot drift apart.

use chrono::NaiveDate;

/// The canonical on-loan predicate for a borrow-record alias.
pub fn on_loan(record: &str) -> String {
    format!("{record}.return_date IS NULL")
}

/// Correlated existence check: the copy referenced by `copy_ref` has an open
/// loan. Usable in WHERE without disturbing the pagination GROUP BY.
pub fn copy_issued(copy_ref: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM borrow_record br2 WHERE br2.book_copy_id = {copy_ref} AND {})",
        on_loan("br2")
    )
}

/// Negation of [`copy_issued`]: the copy has zero open loans.
pub fn copy_available(copy_ref: &str) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM borrow_record br2 WHERE br2.book_copy_id = {copy_ref} AND {})",
        on_loan("br2")
    )
}

/// Some copy of the book referenced by `book_ref` is currently out.
pub fn book_issued(book_ref: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM book_copy bc2 JOIN borrow_record br2 \
         ON br2.book_copy_id = bc2.id AND {} WHERE bc2.book_id = {book_ref})",
        on_loan("br2")
    )
}

/// No copy of the book is currently out.
pub fn book_available(book_ref: &str) -> String {
    format!(
        "NOT EXISTS (SELECT 1 FROM book_copy bc2 JOIN borrow_record br2 \
         ON br2.book_copy_id = bc2.id AND {} WHERE bc2.book_id = {book_ref})",
        on_loan("br2")
    )
}

/// 0/1 aggregate over the joined borrow-record alias, for sorting copies by
/// status despite the join fan-out.
pub fn status_flag(record: &str) -> String {
    format!("MAX(CASE WHEN {} THEN 1 ELSE 0 END)", on_loan(record))
}

/// Text form of the status flag, so `status` is also searchable.
pub fn status_label(record: &str) -> String {
    format!(
        "CASE WHEN {} = 1 THEN 'issued' ELSE 'available' END",
        status_flag(record)
    )
}

/// Overdue: still out and past the due (or, failing that, expected-return) date.
pub fn overdue(record: &str) -> String {
    format!(
        "{} AND COALESCE({record}.due_date, {record}.expected_return_date) < CURRENT_DATE",
        on_loan(record)
    )
}

/// In-process counterpart of the canonical predicate: a copy is on loan iff
/// any of its records has no return date yet.
pub fn is_on_loan<'a, I>(return_dates: I) -> bool
where
    I: IntoIterator<Item = &'a Option<NaiveDate>>,
{
    return_dates.into_iter().any(|d| d.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn on_loan_means_null_return_date() {
        assert_eq!(on_loan("br"), "br.return_date IS NULL");
    }

    #[test]
    fn issued_and_available_are_negations() {
        let issued = copy_issued("copy.id");
        let available = copy_available("copy.id");
        assert_eq!(available, format!("NOT {issued}"));
    }

    #[test]
    fn overdue_falls_back_to_expected_return_date() {
        let expr = overdue("record");
        assert!(expr.contains("record.return_date IS NULL"));
        assert!(expr.contains("COALESCE(record.due_date, record.expected_return_date)"));
    }

    #[test]
    fn status_flag_wraps_the_canonical_predicate() {
        assert!(status_flag("br").contains(&on_loan("br")));
        assert!(status_label("br").contains(&status_flag("br")));
    }

    #[test]
    fn is_on_loan_checks_for_open_records() {
        let returned = Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let open: Option<NaiveDate> = None;
        assert!(!is_on_loan(Vec::<&Option<NaiveDate>>::new()));
        assert!(!is_on_loan(vec![&returned]));
        assert!(is_on_loan(vec![&returned, &open]));
    }
}
