#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::mem::{AccessMode, MemBlock, MemFile};
    use crate::pack::{Packer, PackerKind};

    #[test]
    fn test_identity_has_empty_extra() {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        let mut packer = Packer::new(PackerKind::Identity);
        let written = packer.write_extra(&mut file, &["a", "b"]).unwrap();
        assert_eq!(written, 0);
        assert_eq!(file.tell(), 0);
    }

    #[test]
    fn test_identity_round_trip() {
        let mut block = MemBlock::with_capacity(64);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        let packer = Packer::new(PackerKind::Identity);

        packer.encode_string(&mut file, "hello world").unwrap();
        file.rewind();
        let decoded = packer.decode_string(&mut file, 11).unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn test_identity_rejects_nonempty_extra() {
        let mut block = MemBlock::from_bytes(b"junk");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        let mut packer = Packer::new(PackerKind::Identity);
        let err = packer.read_extra(&mut file, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn test_flag_byte_mapping() {
        for kind in [PackerKind::Identity, PackerKind::Huffman, PackerKind::Prefix] {
            assert_eq!(PackerKind::from_flags(kind.flags()).unwrap(), kind);
        }
        assert!(PackerKind::from_flags(0x03).is_err());
        assert!(PackerKind::from_flags(0x00).is_err());
    }
}
