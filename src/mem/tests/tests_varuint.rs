#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::mem::file::{decode_varuint, varuint_len};
    use crate::mem::{AccessMode, MemBlock, MemFile};
    use rand::Rng;

    fn round_trip(v: u64) -> usize {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        let written = file.write_varuint(v).unwrap();
        file.rewind();
        let (decoded, consumed) = file.read_varuint().unwrap();
        assert_eq!(decoded, v);
        assert_eq!(consumed, written);
        written
    }

    #[test]
    fn test_varuint_boundaries() {
        assert_eq!(round_trip(0), 1);
        assert_eq!(round_trip(127), 1);
        assert_eq!(round_trip(128), 2);
        assert_eq!(round_trip(16_383), 2);
        assert_eq!(round_trip(16_384), 3);
        assert_eq!(round_trip(u64::MAX), 10);
    }

    #[test]
    fn test_varuint_length_formula() {
        for v in [0u64, 1, 127, 128, 300, 1 << 20, 1 << 35, u64::MAX] {
            let bits = (64 - v.leading_zeros() as usize).max(1);
            assert_eq!(varuint_len(v), bits.div_ceil(7), "v = {v}");
            assert_eq!(round_trip(v), varuint_len(v));
        }
    }

    #[test]
    fn test_varuint_random_round_trip() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            round_trip(rng.random::<u64>());
        }
    }

    #[test]
    fn test_varuint_truncated_fails() {
        // Continuation bit set but buffer ends.
        let err = decode_varuint(&[0x80, 0x80]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_varuint_unterminated_fails() {
        let err = decode_varuint(&[0x80; 12]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn test_rewrite_varuint_same_width() {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.write_varuint(100).unwrap();
        file.write(b"tail").unwrap();

        file.rewind();
        file.rewrite_varuint(90).unwrap();
        let (v, _) = {
            file.rewind();
            file.read_varuint().unwrap()
        };
        assert_eq!(v, 90);
        assert_eq!(file.read(4).unwrap(), b"tail");
    }

    #[test]
    fn test_rewrite_varuint_wider_shifts_tail() {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.write_varuint(5).unwrap();
        file.write(b"tail").unwrap();

        file.rewind();
        file.rewrite_varuint(1_000_000).unwrap();
        file.rewind();
        let (v, n) = file.read_varuint().unwrap();
        assert_eq!(v, 1_000_000);
        assert_eq!(n, 3);
        assert_eq!(file.read(4).unwrap(), b"tail");
    }

    #[test]
    fn test_rewrite_varuint_narrower_shifts_tail() {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.write_varuint(1_000_000).unwrap();
        file.write(b"tail").unwrap();

        file.rewind();
        file.rewrite_varuint(3).unwrap();
        file.rewind();
        let (v, n) = file.read_varuint().unwrap();
        assert_eq!(v, 3);
        assert_eq!(n, 1);
        assert_eq!(file.read(4).unwrap(), b"tail");
    }
}
