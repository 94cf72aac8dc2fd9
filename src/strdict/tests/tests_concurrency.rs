#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use crate::strdict::{SpinLock, StringDict};

    #[test]
    fn test_spinlock_counts_under_contention() {
        let lock = Arc::new(SpinLock::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    *lock.lock() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 40_000);
    }

    #[test]
    fn test_concurrent_insert_shares_ids() {
        let dict = Arc::new(StringDict::with_capacity(64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let dict = Arc::clone(&dict);
            handles.push(thread::spawn(move || {
                let strings: Vec<String> = (0..200).map(|i| format!("key{i}")).collect();
                let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
                dict.insert(&refs)
            }));
        }
        let results: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every thread inserted the same strings, so all must agree on ids.
        for ids in &results[1..] {
            assert_eq!(ids, &results[0]);
        }
        assert_eq!(dict.num_distinct(), 200);
    }

    #[test]
    fn test_concurrent_insert_disjoint_sets() {
        let dict = Arc::new(StringDict::with_capacity(16));
        let mut handles = Vec::new();
        for t in 0..4 {
            let dict = Arc::clone(&dict);
            handles.push(thread::spawn(move || {
                let strings: Vec<String> = (0..100).map(|i| format!("t{t}-{i}")).collect();
                let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
                dict.insert(&refs)
            }));
        }
        let mut all_ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        // Disjoint inputs must receive pairwise distinct ids.
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 400);
        assert_eq!(dict.num_distinct(), 400);
    }
}
