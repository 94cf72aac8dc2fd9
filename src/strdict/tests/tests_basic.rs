#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::strdict::{NULL_STRING_ID, StringDict};

    #[test]
    fn test_insert_and_extract_round_trip() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["alpha", "beta", "gamma"]);
        assert_eq!(ids.len(), 3);

        let strings = dict.extract(&ids).unwrap();
        assert_eq!(strings, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_insert_deduplicates_within_call() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["alpha", "beta", "alpha", "gamma"]);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[3]);
        assert_eq!(dict.num_distinct(), 3);
    }

    #[test]
    fn test_insert_deduplicates_across_calls() {
        let dict = StringDict::with_capacity(8);
        let first = dict.insert(&["x"]);
        let second = dict.insert(&["x"]);
        assert_eq!(first, second);
        assert_eq!(dict.num_distinct(), 1);
    }

    #[test]
    fn test_locate_safe_reports_misses() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["here"]);

        let (found, mask, not_found) = dict.locate_safe(&["here", "gone"]);
        assert_eq!(found[0], ids[0]);
        assert_eq!(found[1], NULL_STRING_ID);
        assert_eq!(mask, vec![true, false]);
        assert_eq!(not_found, 1);
    }

    #[test]
    fn test_locate_fast_on_present_keys() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["a", "b"]);
        assert_eq!(dict.locate_fast(&["b", "a"]), vec![ids[1], ids[0]]);
    }

    #[test]
    fn test_extract_dead_id_fails() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["x"]);
        dict.remove(&ids).unwrap();
        let err = dict.extract(&ids).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArg);
    }

    #[test]
    fn test_remove_twice_fails() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["x"]);
        dict.remove(&ids).unwrap();
        let err = dict.remove(&ids).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalArg);
    }

    #[test]
    fn test_counters_track_hits_and_misses() {
        let dict = StringDict::with_capacity(8);
        dict.insert(&["a"]); // one miss
        dict.insert(&["a"]); // one hit
        dict.locate_safe(&["a", "b"]); // one hit, one miss

        let counters = dict.counters();
        assert_eq!(counters.hits, 2);
        assert_eq!(counters.misses, 2);

        dict.reset_counters();
        assert_eq!(dict.counters().hits, 0);
        assert_eq!(dict.counters().misses, 0);
    }

    #[test]
    fn test_contents_ordered_by_id() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["c", "a", "b"]);
        let contents = dict.contents();
        assert_eq!(contents.len(), 3);
        for window in contents.windows(2) {
            assert!(window[0].0 < window[1].0);
        }
        for (id, s) in contents {
            let pos = ids.iter().position(|&i| i == id).unwrap();
            assert_eq!(s, ["c", "a", "b"][pos]);
        }
    }

    #[test]
    fn test_grow_beyond_initial_capacity() {
        let dict = StringDict::with_capacity(2);
        let strings: Vec<String> = (0..100).map(|i| format!("s{i}")).collect();
        let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
        let ids = dict.insert(&refs);
        assert_eq!(dict.num_distinct(), 100);
        assert_eq!(dict.extract(&ids).unwrap(), strings);
    }
}
