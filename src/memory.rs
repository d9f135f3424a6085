//! Fault-tolerant reads from the traced process's address space.
//!
//! Every read is a single bounded attempt: an inaccessible address makes the
//! read report failure, never panic or retry. All multi-byte values are
//! assumed little-endian.

use nix::sys::ptrace;
use nix::unistd::Pid;

use crate::types::WORD_SIZE;

/// Longest C string preview, in bytes.
pub(crate) const CSTRING_LIMIT: usize = 4096;

/// Read access to a foreign address space.
pub(crate) trait ForeignMemory {
    /// Fill `buf` from `addr`. Returns false if any byte is inaccessible,
    /// in which case the contents of `buf` are unspecified.
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool;
}

/// Memory of a ptrace-stopped thread, read with `PTRACE_PEEKDATA`.
pub(crate) struct PtraceMemory {
    pid: Pid,
}

impl PtraceMemory {
    pub(crate) fn new(pid: Pid) -> Self {
        PtraceMemory { pid }
    }
}

impl ForeignMemory for PtraceMemory {
    fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
        if buf.is_empty() {
            return true;
        }
        let Some(end) = addr.checked_add(buf.len() as u64) else {
            return false;
        };

        // Aligned words only, so a read ending just before an unmapped page
        // never touches that page.
        let mut word_addr = addr & !(WORD_SIZE as u64 - 1);
        while word_addr < end {
            let word = match ptrace::read(self.pid, word_addr as ptrace::AddressType) {
                Ok(w) => (w as u64).to_le_bytes(),
                Err(_) => return false,
            };
            for (i, byte) in word.iter().enumerate() {
                let at = word_addr + i as u64;
                if at >= addr && at < end {
                    buf[(at - addr) as usize] = *byte;
                }
            }
            word_addr += WORD_SIZE as u64;
        }
        true
    }
}

/// Read a scalar of `size` bytes at `addr`, zero-extended to a word.
///
/// # Panics
///
/// If `size` exceeds one machine word; callers only dereference scalars.
pub(crate) fn read_word(mem: &dyn ForeignMemory, addr: u64, size: usize) -> Option<u64> {
    assert!(size <= WORD_SIZE, "too-big simple type: {size} bytes");
    let mut buf = [0u8; WORD_SIZE];
    mem.read(addr, &mut buf[..size])
        .then(|| u64::from_le_bytes(buf))
}

/// Read a buffer of known size.
pub(crate) fn read_buffer(mem: &dyn ForeignMemory, addr: u64, len: usize) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; len];
    mem.read(addr, &mut buf).then_some(buf)
}

/// Read a fixed-size block, for the structured layouts.
pub(crate) fn read_array<const N: usize>(mem: &dyn ForeignMemory, addr: u64) -> Option<[u8; N]> {
    let mut buf = [0u8; N];
    mem.read(addr, &mut buf).then_some(buf)
}

/// Read a NUL-terminated string, one word at a time.
///
/// Keeps at most [`CSTRING_LIMIT`] bytes and marks a longer string with `...`.
/// Any unreadable chunk before the terminator fails the whole read.
pub(crate) fn read_string(mem: &dyn ForeignMemory, addr: u64) -> Option<String> {
    let mut result = Vec::new();
    let mut current_addr = addr;

    'read: while result.len() <= CSTRING_LIMIT {
        let mut word = [0u8; WORD_SIZE];
        // Never straddle into the next page on the first, unaligned chunk.
        let chunk = WORD_SIZE - (current_addr as usize % WORD_SIZE);
        if !mem.read(current_addr, &mut word[..chunk]) {
            return None;
        }

        for &byte in &word[..chunk] {
            if byte == 0 {
                break 'read;
            }
            result.push(byte);
        }

        current_addr = current_addr.checked_add(chunk as u64)?;
    }

    if result.len() > CSTRING_LIMIT {
        result.truncate(CSTRING_LIMIT);
        return Some(String::from_utf8_lossy(&result).into_owned() + "...");
    }
    Some(String::from_utf8_lossy(&result).into_owned())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ForeignMemory;

    /// A contiguous mapped range; everything else is unmapped.
    pub(crate) struct FakeMemory {
        pub(crate) base: u64,
        pub(crate) bytes: Vec<u8>,
    }

    impl FakeMemory {
        pub(crate) fn new(base: u64, bytes: Vec<u8>) -> Self {
            FakeMemory { base, bytes }
        }

        pub(crate) fn empty() -> Self {
            FakeMemory::new(0x1000, Vec::new())
        }
    }

    impl ForeignMemory for FakeMemory {
        fn read(&self, addr: u64, buf: &mut [u8]) -> bool {
            let Some(start) = addr.checked_sub(self.base) else {
                return false;
            };
            let start = start as usize;
            match start.checked_add(buf.len()) {
                Some(end) if end <= self.bytes.len() => {
                    buf.copy_from_slice(&self.bytes[start..end]);
                    true
                }
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeMemory;
    use super::*;

    #[test]
    fn read_word_zero_extends_little_endian() {
        let mem = FakeMemory::new(0x1000, vec![0x78, 0x56, 0x34, 0x12, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(read_word(&mem, 0x1000, 4), Some(0x1234_5678));
        assert_eq!(read_word(&mem, 0x1000, 8), Some(0xffff_ffff_1234_5678));
        assert_eq!(read_word(&mem, 0x1000, 0), Some(0));
    }

    #[test]
    fn read_word_fails_on_unmapped() {
        let mem = FakeMemory::new(0x1000, vec![0; 4]);
        assert_eq!(read_word(&mem, 0x2000, 4), None);
        // Partially mapped is still a failure.
        assert_eq!(read_word(&mem, 0x1000, 8), None);
    }

    #[test]
    #[should_panic(expected = "too-big simple type")]
    fn read_word_rejects_oversized() {
        let mem = FakeMemory::new(0x1000, vec![0; 16]);
        let _ = read_word(&mem, 0x1000, 16);
    }

    #[test]
    fn read_string_stops_at_nul() {
        let mem = FakeMemory::new(0x1000, b"/etc/hosts\0garbage".to_vec());
        assert_eq!(read_string(&mem, 0x1000).as_deref(), Some("/etc/hosts"));
    }

    #[test]
    fn read_string_unaligned_start_at_end_of_mapping() {
        // Terminator is the last mapped byte and the start is unaligned.
        let mut bytes = vec![b'x'; 13];
        bytes.extend_from_slice(b"ab\0");
        let mem = FakeMemory::new(0x1000, bytes);
        assert_eq!(read_string(&mem, 0x100d).as_deref(), Some("ab"));
    }

    #[test]
    fn read_string_without_terminator_fails() {
        let mem = FakeMemory::new(0x1000, b"abcdefgh".to_vec());
        assert_eq!(read_string(&mem, 0x1000), None);
    }

    #[test]
    fn read_string_caps_long_strings() {
        let mut bytes = vec![b'a'; CSTRING_LIMIT + 64];
        bytes.push(0);
        let mem = FakeMemory::new(0x1000, bytes);
        let s = read_string(&mem, 0x1000).unwrap();
        assert!(s.ends_with("..."));
        assert_eq!(s.len(), CSTRING_LIMIT + 3);
    }

    #[test]
    fn read_string_at_the_limit_is_complete() {
        let mut bytes = vec![b'a'; CSTRING_LIMIT];
        bytes.resize(CSTRING_LIMIT + WORD_SIZE, 0);
        let mem = FakeMemory::new(0x1000, bytes);
        let s = read_string(&mem, 0x1000).unwrap();
        assert!(!s.ends_with("..."));
        assert_eq!(s.len(), CSTRING_LIMIT);
    }

    #[test]
    fn read_string_one_past_the_limit_is_capped() {
        let mut bytes = vec![b'a'; CSTRING_LIMIT + 1];
        bytes.resize(CSTRING_LIMIT + 2 * WORD_SIZE, 0);
        let mem = FakeMemory::new(0x1000, bytes);
        let s = read_string(&mem, 0x1000).unwrap();
        assert!(s.ends_with("..."));
        assert_eq!(s.len(), CSTRING_LIMIT + 3);
    }

    #[test]
    fn read_buffer_exact() {
        let mem = FakeMemory::new(0x1000, vec![1, 2, 3, 4]);
        assert_eq!(read_buffer(&mem, 0x1001, 2), Some(vec![2, 3]));
        assert_eq!(read_buffer(&mem, 0x1003, 2), None);
        assert_eq!(read_array::<4>(&mem, 0x1000), Some([1, 2, 3, 4]));
    }
}
