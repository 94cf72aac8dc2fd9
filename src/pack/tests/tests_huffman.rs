#[cfg(test)]
mod tests {
    use crate::mem::{AccessMode, MemBlock, MemFile};
    use crate::pack::{Packer, PackerKind};

    /// Serializes the extra with one packer, restores it into a second, and
    /// round-trips every corpus string through encode → decode.
    fn round_trip_corpus(corpus: &[&str]) {
        let mut extra_block = MemBlock::with_capacity(256);
        let mut writer = Packer::new(PackerKind::Huffman);
        let extra_size = {
            let mut extra = MemFile::open(&mut extra_block, AccessMode::ReadWrite);
            writer.write_extra(&mut extra, corpus).unwrap()
        };

        let mut reader = Packer::new(PackerKind::Huffman);
        {
            let mut extra = MemFile::open_read(&extra_block);
            reader.read_extra(&mut extra, extra_size).unwrap();
        }

        for s in corpus {
            let mut data_block = MemBlock::with_capacity(64);
            {
                let mut data = MemFile::open(&mut data_block, AccessMode::ReadWrite);
                writer.encode_string(&mut data, s).unwrap();
            }
            let mut data = MemFile::open_read(&data_block);
            let decoded = reader.decode_string(&mut data, s.len()).unwrap();
            assert_eq!(&decoded, s);
        }
    }

    #[test]
    fn test_huffman_round_trip_simple() {
        round_trip_corpus(&["alpha", "beta", "gamma", "alphabet", "banana"]);
    }

    #[test]
    fn test_huffman_round_trip_single_symbol() {
        round_trip_corpus(&["aaaa", "aa"]);
    }

    #[test]
    fn test_huffman_round_trip_empty_string() {
        round_trip_corpus(&["", "x"]);
    }

    #[test]
    fn test_huffman_empty_corpus_uses_equal_frequencies() {
        // With no learned frequencies every byte still gets a code, so
        // arbitrary strings encode after the fallback.
        let mut extra_block = MemBlock::with_capacity(4096);
        let mut packer = Packer::new(PackerKind::Huffman);
        {
            let mut extra = MemFile::open(&mut extra_block, AccessMode::ReadWrite);
            packer.write_extra(&mut extra, &[]).unwrap();
        }

        let mut data_block = MemBlock::with_capacity(64);
        {
            let mut data = MemFile::open(&mut data_block, AccessMode::ReadWrite);
            packer.encode_string(&mut data, "anything at all").unwrap();
        }
        let mut data = MemFile::open_read(&data_block);
        assert_eq!(
            packer.decode_string(&mut data, 15).unwrap(),
            "anything at all"
        );
    }

    #[test]
    fn test_huffman_compresses_skewed_corpus() {
        // A corpus dominated by one symbol should encode it in few bits.
        let dominant = "a".repeat(1000);
        let corpus: Vec<&str> = vec![&dominant, "b", "c"];

        let mut extra_block = MemBlock::with_capacity(256);
        let mut packer = Packer::new(PackerKind::Huffman);
        {
            let mut extra = MemFile::open(&mut extra_block, AccessMode::ReadWrite);
            packer.write_extra(&mut extra, &corpus).unwrap();
        }

        let mut data_block = MemBlock::with_capacity(1024);
        {
            let mut data = MemFile::open(&mut data_block, AccessMode::ReadWrite);
            packer.encode_string(&mut data, &dominant).unwrap();
        }
        // 1000 one-bit codes pack into 125 bytes.
        assert!(data_block.size() < 200, "size = {}", data_block.size());
    }

    #[test]
    fn test_huffman_encode_without_table_fails() {
        let packer = Packer::new(PackerKind::Huffman);
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        assert!(packer.encode_string(&mut file, "x").is_err());
    }

    #[test]
    fn test_huffman_extra_is_deterministic() {
        let corpus = ["one", "two", "three"];
        let mut first = MemBlock::with_capacity(256);
        let mut second = MemBlock::with_capacity(256);
        {
            let mut f = MemFile::open(&mut first, AccessMode::ReadWrite);
            Packer::new(PackerKind::Huffman)
                .write_extra(&mut f, &corpus)
                .unwrap();
        }
        {
            let mut f = MemFile::open(&mut second, AccessMode::ReadWrite);
            Packer::new(PackerKind::Huffman)
                .write_extra(&mut f, &corpus)
                .unwrap();
        }
        assert_eq!(first.raw_data(), second.raw_data());
    }
}
