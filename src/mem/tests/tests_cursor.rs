#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::mem::{AccessMode, MemBlock, MemFile, SAVE_STACK_DEPTH};

    #[test]
    fn test_cursor_read_write_round_trip() {
        let mut block = MemBlock::with_capacity(16);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);

        file.write_u8(0xAB).unwrap();
        file.write_u16(0xBEEF).unwrap();
        file.write_u32(0xDEAD_BEEF).unwrap();
        file.write_u64(0x0123_4567_89AB_CDEF).unwrap();
        file.write_i64(-42).unwrap();
        file.write_f32(1.5).unwrap();

        file.rewind();
        assert_eq!(file.read_u8().unwrap(), 0xAB);
        assert_eq!(file.read_u16().unwrap(), 0xBEEF);
        assert_eq!(file.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(file.read_u64().unwrap(), 0x0123_4567_89AB_CDEF);
        assert_eq!(file.read_i64().unwrap(), -42);
        assert_eq!(file.read_f32().unwrap(), 1.5);
        assert_eq!(file.remain(), 0);
    }

    #[test]
    fn test_cursor_peek_does_not_advance() {
        let mut block = MemBlock::from_bytes(b"abcdef");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);

        assert_eq!(file.peek(3).unwrap(), b"abc");
        assert_eq!(file.tell(), 0);
        assert_eq!(file.read(3).unwrap(), b"abc");
        assert_eq!(file.tell(), 3);
    }

    #[test]
    fn test_cursor_read_past_end_fails() {
        let block = MemBlock::from_bytes(b"ab");
        let mut file = MemFile::open_read(&block);
        let err = file.read(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_cursor_write_on_read_only_fails() {
        let mut block = MemBlock::from_bytes(b"ab");
        let mut file = MemFile::open(&mut block, AccessMode::ReadOnly);
        let err = file.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalOp);
    }

    #[test]
    fn test_cursor_write_grows_block() {
        let mut block = MemBlock::with_capacity(2);
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.write(&[1u8; 100]).unwrap();
        assert_eq!(file.size(), 100);
        assert!(file.capacity() >= 100);
    }

    #[test]
    fn test_cursor_write_zero() {
        let mut block = MemBlock::from_bytes(b"\xFF\xFF\xFF\xFF");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.seek(1).unwrap();
        file.write_zero(2).unwrap();
        assert_eq!(file.tell(), 3);
        assert_eq!(block.raw_data(), b"\xFF\0\0\xFF");
    }

    #[test]
    fn test_cursor_move_right_opens_window() {
        let mut block = MemBlock::from_bytes(b"abcdef");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.seek(2).unwrap();
        file.move_right(3).unwrap();
        file.write(b"XYZ").unwrap();
        assert_eq!(block.raw_data(), b"abXYZcdef");
    }

    #[test]
    fn test_cursor_move_left_closes_gap() {
        let mut block = MemBlock::from_bytes(b"abXYZcdef");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.seek(2).unwrap();
        file.move_left(3).unwrap();
        assert_eq!(block.raw_data(), b"abcdef");
    }

    #[test]
    fn test_cursor_move_left_past_end_fails() {
        let mut block = MemBlock::from_bytes(b"abc");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        file.seek(2).unwrap();
        let err = file.move_left(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_cursor_save_restore_stack() {
        let mut block = MemBlock::from_bytes(b"abcdef");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);

        file.seek(2).unwrap();
        file.save_position().unwrap();
        file.seek(5).unwrap();
        file.save_position().unwrap();
        file.seek(0).unwrap();

        file.restore_position().unwrap();
        assert_eq!(file.tell(), 5);
        file.restore_position().unwrap();
        assert_eq!(file.tell(), 2);

        let err = file.restore_position().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn test_cursor_save_stack_bounded() {
        let mut block = MemBlock::from_bytes(b"abcdef");
        let mut file = MemFile::open(&mut block, AccessMode::ReadWrite);
        for _ in 0..SAVE_STACK_DEPTH {
            file.save_position().unwrap();
        }
        let err = file.save_position().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_cursor_seek_bounds() {
        let block = MemBlock::from_bytes(b"abcd");
        let mut file = MemFile::open_read(&block);
        file.seek(4).unwrap();
        let err = file.seek(5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_cursor_slice_at_ignores_position() {
        let block = MemBlock::from_bytes(b"abcdef");
        let mut file = MemFile::open_read(&block);
        file.seek(5).unwrap();
        assert_eq!(file.slice_at(1, 3).unwrap(), b"bcd");
        assert_eq!(file.tell(), 5);
    }
}
