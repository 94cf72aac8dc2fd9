#[cfg(test)]
mod tests {
    use crate::strdict::StringDict;

    #[test]
    fn test_removed_id_is_reissued() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["alpha", "beta", "gamma"]);
        assert_eq!(dict.num_distinct(), 3);

        dict.remove(&[ids[1]]).unwrap();
        assert_eq!(dict.num_distinct(), 2);

        let new_ids = dict.insert(&["delta"]);
        assert_eq!(new_ids[0], ids[1]);
        assert_eq!(dict.extract(&new_ids).unwrap(), vec!["delta"]);
    }

    #[test]
    fn test_reissue_order_is_lifo() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["a", "b", "c", "d"]);

        dict.remove(&[ids[0], ids[2]]).unwrap();

        let reissued = dict.insert(&["e", "f"]);
        assert_eq!(reissued[0], ids[2]);
        assert_eq!(reissued[1], ids[0]);
    }

    #[test]
    fn test_reinsert_same_string_after_remove_gets_freed_id() {
        let dict = StringDict::with_capacity(8);
        let ids = dict.insert(&["alpha", "beta", "alpha", "gamma"]);
        assert_eq!(ids[0], ids[2]);
        assert_eq!(dict.num_distinct(), 3);

        dict.remove(&[ids[1]]).unwrap();
        let again = dict.insert(&["beta"]);
        assert_eq!(again[0], ids[1]);
    }

    #[test]
    fn test_remove_all_then_reinsert() {
        let dict = StringDict::with_capacity(4);
        let ids = dict.insert(&["p", "q"]);
        dict.remove(&ids).unwrap();
        assert_eq!(dict.num_distinct(), 0);

        let fresh = dict.insert(&["r", "s"]);
        assert_eq!(dict.num_distinct(), 2);
        // Ids come back from the free-list, newest removal first.
        assert_eq!(fresh[0], ids[1]);
        assert_eq!(fresh[1], ids[0]);
    }
}
