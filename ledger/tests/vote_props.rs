//! Property tests for ledger vote accounting.

use std::sync::Arc;

use proptest::prelude::*;
use tally_ledger::{EventDefinition, Ledger};
use tally_nullables::NullEventStore;
use tally_types::{EventCode, TxHash, UserId};

fn fresh(options: usize) -> (Ledger, EventCode) {
    let ledger = Ledger::new(Arc::new(NullEventStore::new()));
    let code = EventCode::new("prop").unwrap();
    let def = EventDefinition::new(code.clone(), UserId::new("organizer").unwrap())
        .with_options((0..options).map(|i| format!("option-{i}")))
        .secure();
    ledger.create_event(&def, None).unwrap();
    (ledger, code)
}

proptest! {
    /// N distinct voters produce sum(tally) == N == |voters|.
    #[test]
    fn distinct_votes_are_all_counted(
        options in 1usize..6,
        choices in proptest::collection::vec(0usize..6, 0..40),
    ) {
        let (ledger, code) = fresh(options);
        let mut accepted = 0u64;
        for (i, choice) in choices.iter().enumerate() {
            let user = UserId::new(format!("voter-{i}")).unwrap();
            if ledger.record_vote(&code, &user, *choice).is_ok() {
                accepted += 1;
            }
        }
        let record = ledger.get_by_code(&code).unwrap();
        let expected = choices.iter().filter(|c| **c < options).count() as u64;
        prop_assert_eq!(accepted, expected);
        prop_assert_eq!(record.total_votes(), expected);
        prop_assert_eq!(record.voted_users.len() as u64, expected);
    }

    /// Retrying the same user's vote never changes the record after the first success.
    #[test]
    fn repeated_votes_are_idempotent(
        first in 0usize..3,
        retries in proptest::collection::vec(0usize..3, 1..10),
    ) {
        let (ledger, code) = fresh(3);
        let user = UserId::new("alice").unwrap();
        ledger.record_vote(&code, &user, first).unwrap();
        let after_first = ledger.get_by_code(&code).unwrap();
        for choice in retries {
            prop_assert!(ledger.record_vote(&code, &user, choice).is_err());
        }
        prop_assert_eq!(ledger.get_by_code(&code).unwrap(), after_first);
    }

    /// Replaying a committed receipt any number of times counts once.
    #[test]
    fn receipt_replays_count_once(replays in 1usize..8, byte in any::<u8>()) {
        let (ledger, code) = fresh(2);
        let user = UserId::new("alice").unwrap();
        let receipt = TxHash::new([byte; 32]);
        for _ in 0..replays {
            ledger.commit_vote(&code, &user, 1, &receipt).unwrap();
        }
        prop_assert_eq!(ledger.get_by_code(&code).unwrap().tallies(), vec![0, 1]);
    }
}
