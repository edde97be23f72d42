use banward_core::{check_argument, BanLedger};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::warn;

/// Subjects whose ban is over on `today`.
///
/// An expiry equal to `today` counts as elapsed. Entries whose expiry did
/// not parse are never returned, and neither are subjects that cannot be
/// sent as a console argument; those stay in the ledger until fixed by hand.
#[must_use]
pub fn scan(ledger: &BanLedger, today: NaiveDate) -> BTreeSet<String> {
    ledger
        .iter()
        .filter(|(_, entry)| entry.expiry.has_elapsed(today))
        .filter(|(subject, _)| match check_argument("subject", subject) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "skipping expired ledger entry");
                false
            }
        })
        .map(|(subject, _)| subject.to_string())
        .collect()
}

/// The local calendar date, which ledger expiries are compared against
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use banward_core::{BanEntry, Expiry};

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn ledger(entries: &[(&str, &str)]) -> BanLedger {
        entries
            .iter()
            .map(|(subject, expiry)| {
                (
                    (*subject).to_string(),
                    BanEntry::new(Expiry::from((*expiry).to_string()), "test"),
                )
            })
            .collect()
    }

    #[test]
    fn test_past_and_today_are_expired() {
        let ledger = ledger(&[
            ("alice", "2024-01-01"),
            ("bob", "2024-06-01"),
            ("carol", "2024-06-02"),
        ]);

        let expired = scan(&ledger, date("2024-06-01"));
        assert_eq!(
            expired.into_iter().collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn test_every_accepted_format_is_compared() {
        let ledger = ledger(&[
            ("iso", "2024-01-01"),
            ("dmy", "01-01-2024"),
            ("slash", "2024/01/01"),
        ]);

        assert_eq!(scan(&ledger, date("2024-01-01")).len(), 3);
        assert!(scan(&ledger, date("2023-12-31")).is_empty());
    }

    #[test]
    fn test_unparsed_expiry_never_expires() {
        let ledger = ledger(&[("dave", "forever"), ("erin", "")]);
        assert!(scan(&ledger, date("2999-01-01")).is_empty());
    }

    #[test]
    fn test_subject_unfit_for_console_is_skipped() {
        let ledger = ledger(&[
            ("alice", "2024-01-01"),
            ("bob smith", "2024-01-01"),
            ("carol\nunban dave", "2024-01-01"),
        ]);

        let expired = scan(&ledger, date("2024-06-01"));
        assert_eq!(expired.into_iter().collect::<Vec<_>>(), vec!["alice"]);
    }

    #[test]
    fn test_empty_ledger() {
        assert!(scan(&BanLedger::new(), date("2024-01-01")).is_empty());
    }
}
