//! Duplicate collapsing and bounded random sampling.
//!
//! Dedup policy: a later record with an already-seen key replaces the earlier
//! one, but keeps the position where that key first appeared. This is the
//! behaviour of inserting into an insertion-ordered map, so the output order
//! is fully determined by the input order. Records without a key are never
//! merged; each one keeps its own position.

use std::collections::HashMap;
use std::hash::Hash;

use rand::seq::index;
use rand::Rng;
use serde_json::Value;

/// Collapse records sharing a key, last-wins, in first-occurrence order.
/// Records whose key is `None` pass through unchanged.
pub fn dedupe<T, K, F>(records: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> Option<K>,
{
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<T> = Vec::with_capacity(records.len());
    for record in records {
        match key(&record) {
            Some(k) => match slots.get(&k) {
                Some(&i) => out[i] = record,
                None => {
                    slots.insert(k, out.len());
                    out.push(record);
                }
            },
            None => out.push(record),
        }
    }
    out
}

/// Key function for raw upstream records: the first non-empty string (or
/// number) among `fields`, or `None` when the record has none of them.
pub fn raw_key<'a>(fields: &'a [&'a str]) -> impl Fn(&Value) -> Option<String> + 'a {
    move |raw: &Value| {
        fields.iter().find_map(|f| match raw.get(*f) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Draw `min(n, records.len())` records uniformly at random without
/// replacement.
pub fn sample_with<T, R>(records: Vec<T>, n: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    let n = n.min(records.len());
    let picked = index::sample(rng, records.len(), n);
    let mut pool: Vec<Option<T>> = records.into_iter().map(Some).collect();
    picked.into_iter().filter_map(|i| pool[i].take()).collect()
}

/// [`sample_with`] using the thread-local RNG.
pub fn sample<T>(records: Vec<T>, n: usize) -> Vec<T> {
    sample_with(records, n, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn albums() -> Vec<Value> {
        vec![
            json!({"id": "a", "title": "First A"}),
            json!({"id": "b", "title": "B"}),
            json!({"id": "a", "title": "Second A"}),
            json!({"id": "c", "title": "C"}),
        ]
    }

    #[test]
    fn later_duplicate_wins_in_first_position() {
        let out = dedupe(albums(), raw_key(&["id"]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0]["title"], "Second A");
        assert_eq!(out[1]["title"], "B");
        assert_eq!(out[2]["title"], "C");
    }

    #[test]
    fn two_records_same_id_yield_the_later_one() {
        let input = vec![
            json!({"id": "9", "title": "Old"}),
            json!({"id": "9", "title": "New"}),
        ];
        let out = dedupe(input.clone(), raw_key(&["id"]));
        assert_eq!(out, vec![input[1].clone()]);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let once = dedupe(albums(), raw_key(&["id"]));
        let twice = dedupe(once.clone(), raw_key(&["id"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn raw_key_falls_back_across_fields() {
        let key = raw_key(&["id", "artistid"]);
        assert_eq!(key(&json!({"artistid": "459320"})).as_deref(), Some("459320"));
        assert_eq!(key(&json!({"id": "", "artistid": 7})).as_deref(), Some("7"));
        assert_eq!(key(&json!({"name": "x"})), None);
    }

    #[test]
    fn keyless_records_are_kept_apart() {
        let input = vec![
            json!({"albumid": "1", "title": "One"}),
            json!({"id": "a", "title": "First A"}),
            json!({"albumid": "2", "title": "Two"}),
            json!({"id": "a", "title": "Second A"}),
            json!({"title": "Three"}),
        ];
        let out = dedupe(input, raw_key(&["id"]));
        let titles: Vec<_> = out.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["One", "Second A", "Two", "Three"]);
    }

    #[test]
    fn sample_len_is_min_of_n_and_len() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 0..8usize {
            for n in 0..10usize {
                let xs: Vec<usize> = (0..len).collect();
                assert_eq!(sample_with(xs, n, &mut rng).len(), n.min(len));
            }
        }
    }

    #[test]
    fn sample_of_empty_is_empty() {
        assert!(sample(Vec::<Value>::new(), 12).is_empty());
    }

    #[test]
    fn sample_draws_without_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut out = sample_with((0..50).collect::<Vec<u32>>(), 20, &mut rng);
        out.sort_unstable();
        out.dedup();
        assert_eq!(out.len(), 20);
        assert!(out.iter().all(|x| *x < 50));
    }
}
