// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use ades_validation_model::ObjectRef;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Proofs of existence known for the objects of one signature.
///
/// Each object maps to the earliest instant at which its existence is proven. Times only
/// ever move earlier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoeSet {
    entries: BTreeMap<ObjectRef, DateTime<Utc>>,
}

impl PoeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// POE set where every object in `objects` is proven to exist at `at`.
    pub fn seeded(objects: impl IntoIterator<Item = ObjectRef>, at: DateTime<Utc>) -> Self {
        let mut set = Self::new();
        for obj in objects {
            set.prove(obj, at);
        }
        set
    }

    /// Record that `obj` existed at `at`. Returns true when this lowered (or created) the
    /// object's proof-of-existence time.
    pub fn prove(&mut self, obj: ObjectRef, at: DateTime<Utc>) -> bool {
        match self.entries.get_mut(&obj) {
            Some(existing) if *existing <= at => false,
            Some(existing) => {
                *existing = at;
                true
            }
            None => {
                self.entries.insert(obj, at);
                true
            }
        }
    }

    pub fn get(&self, obj: &ObjectRef) -> Option<DateTime<Utc>> {
        self.entries.get(obj).copied()
    }

    /// POE time of `obj`, or `default` when nothing is known.
    pub fn get_or(&self, obj: &ObjectRef, default: DateTime<Utc>) -> DateTime<Utc> {
        self.get(obj).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &DateTime<Utc>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn later_proof_does_not_replace_earlier_one() {
        let sig = ObjectRef::signature("S");
        let mut set = PoeSet::seeded([sig.clone()], base());

        assert!(!set.prove(sig.clone(), base() + Duration::days(1)));
        assert_eq!(set.get(&sig), Some(base()));

        assert!(set.prove(sig.clone(), base() - Duration::days(1)));
        assert_eq!(set.get(&sig), Some(base() - Duration::days(1)));
    }

    #[test]
    fn unknown_object_falls_back() {
        let set = PoeSet::new();
        assert_eq!(set.get_or(&ObjectRef::certificate("C"), base()), base());
        assert!(set.is_empty());
    }

    fn arb_proof() -> impl Strategy<Value = (u8, i64)> {
        (0u8..4, -1000i64..1000)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every recorded time equals the minimum of all proofs offered for that object.
        #[test]
        fn prop_poe_is_minimum_of_proofs(proofs in prop::collection::vec(arb_proof(), 1..64)) {
            let mut set = PoeSet::new();
            let mut history: BTreeMap<ObjectRef, DateTime<Utc>> = BTreeMap::new();

            for (obj, offset) in proofs {
                let obj = ObjectRef::certificate(format!("C{obj}"));
                let at = base() + Duration::hours(offset);
                let before = set.get(&obj);
                set.prove(obj.clone(), at);
                let after = set.get(&obj);

                // never moves later
                if let (Some(b), Some(a)) = (before, after) {
                    prop_assert!(a <= b);
                }

                let min = history.entry(obj.clone()).or_insert(at);
                if at < *min {
                    *min = at;
                }
                prop_assert_eq!(after, Some(*min));
            }
        }
    }
}
