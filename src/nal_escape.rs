#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

/// Largest escaped size of an RBSP of `len` bytes.
pub fn escaped_size_bound(len: usize) -> usize {
    len + len / 2 + 1
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EscapeBackend {
    Scalar,
    /// 8 bytes at a time in a general purpose register.
    Swar,
    Sse2,
}

impl EscapeBackend {
    /// Fastest backend the running cpu supports.
    pub fn detect() -> EscapeBackend {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            if is_x86_feature_detected!("sse2") {
                return EscapeBackend::Sse2;
            }
            EscapeBackend::Swar
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        {
            if cfg!(target_pointer_width = "64") {
                EscapeBackend::Swar
            } else {
                EscapeBackend::Scalar
            }
        }
    }

    pub fn from_name(name: &str) -> Option<EscapeBackend> {
        match name {
            "auto" => Some(EscapeBackend::detect()),
            "scalar" => Some(EscapeBackend::Scalar),
            "swar" => Some(EscapeBackend::Swar),
            "sse2" => Some(EscapeBackend::Sse2),
            _ => None,
        }
    }

    /// Escapes `src` into `dst` and returns the number of bytes written.
    pub fn escape(self, dst: &mut [u8], src: &[u8]) -> usize {
        match self {
            EscapeBackend::Scalar => escape_scalar(dst, src),
            EscapeBackend::Swar => escape_swar(dst, src),
            EscapeBackend::Sse2 => {
                #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
                {
                    if is_x86_feature_detected!("sse2") {
                        return unsafe { escape_sse2(dst, src) };
                    }
                }
                escape_swar(dst, src)
            }
        }
    }
}

#[inline(always)]
fn escape_byte(dst: &mut [u8], pos: usize, byte: u8) -> usize {
    if byte <= 0x03 && dst[pos - 2] == 0 && dst[pos - 1] == 0 {
        dst[pos] = 0x03;
        dst[pos + 1] = byte;
        pos + 2
    } else {
        dst[pos] = byte;
        pos + 1
    }
}

/// Copies the first two bytes, which have no history to match against.
#[inline(always)]
fn escape_head(dst: &mut [u8], src: &[u8]) -> usize {
    let head = src.len().min(2);
    dst[..head].copy_from_slice(&src[..head]);
    head
}

/// A chunk without zero bytes can be copied as is unless its first byte
/// completes a `00 00 0x` pattern with the output so far.
#[inline(always)]
fn chunk_is_plain(dst: &[u8], pos: usize, first: u8) -> bool {
    !(first <= 0x03 && dst[pos - 2] == 0 && dst[pos - 1] == 0)
}

pub fn escape_scalar(dst: &mut [u8], src: &[u8]) -> usize {
    let mut pos = escape_head(dst, src);
    for &byte in &src[pos..] {
        pos = escape_byte(dst, pos, byte);
    }
    pos
}

#[inline(always)]
fn has_zero_byte(x: u64) -> bool {
    x.wrapping_sub(0x0101_0101_0101_0101) & !x & 0x8080_8080_8080_8080 != 0
}

pub fn escape_swar(dst: &mut [u8], src: &[u8]) -> usize {
    let mut pos = escape_head(dst, src);
    let mut i = pos;
    while i + 8 <= src.len() {
        let chunk = &src[i..i + 8];
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        if !has_zero_byte(u64::from_ne_bytes(word)) && chunk_is_plain(dst, pos, chunk[0]) {
            dst[pos..pos + 8].copy_from_slice(chunk);
            pos += 8;
        } else {
            for &byte in chunk {
                pos = escape_byte(dst, pos, byte);
            }
        }
        i += 8;
    }
    for &byte in &src[i..] {
        pos = escape_byte(dst, pos, byte);
    }
    pos
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse2")]
unsafe fn escape_sse2(dst: &mut [u8], src: &[u8]) -> usize {
    let mut pos = escape_head(dst, src);
    let mut i = pos;
    let zero = _mm_setzero_si128();
    while i + 16 <= src.len() {
        let chunk = &src[i..i + 16];
        let v = _mm_loadu_si128(chunk.as_ptr() as *const __m128i);
        let zeros = _mm_movemask_epi8(_mm_cmpeq_epi8(v, zero));
        if zeros == 0 && chunk_is_plain(dst, pos, chunk[0]) {
            dst[pos..pos + 16].copy_from_slice(chunk);
            pos += 16;
        } else {
            for &byte in chunk {
                pos = escape_byte(dst, pos, byte);
            }
        }
        i += 16;
    }
    for &byte in &src[i..] {
        pos = escape_byte(dst, pos, byte);
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{prelude::StdRng, Rng, SeedableRng};

    #[test]
    fn has_zero_byte_works() {
        assert!(!has_zero_byte(0x0101_0101_0101_0101));
        assert!(has_zero_byte(0x0101_0101_0001_0101));
        assert!(has_zero_byte(0x8000_0000_0000_0000));
        assert!(!has_zero_byte(0xffff_ffff_ffff_ffff));
        assert!(has_zero_byte(0x0000_0000_0000_0100));
    }

    #[test]
    fn from_name_works() {
        assert_eq!(EscapeBackend::from_name("scalar"), Some(EscapeBackend::Scalar));
        assert_eq!(EscapeBackend::from_name("swar"), Some(EscapeBackend::Swar));
        assert_eq!(EscapeBackend::from_name("sse2"), Some(EscapeBackend::Sse2));
        assert_eq!(EscapeBackend::from_name("auto"), Some(EscapeBackend::detect()));
        assert_eq!(EscapeBackend::from_name("neon"), None);
    }

    #[test]
    fn backends_match_scalar() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(3);
        for round in 0..400 {
            let len = rng.gen_range(0..600);
            // alternate between sparse and dense zero runs
            let zero_rate = [0.02, 0.3, 0.7][round % 3];
            let src: Vec<u8> = (0..len)
                .map(|_| {
                    if rng.gen_bool(zero_rate) {
                        0
                    } else if rng.gen_bool(0.3) {
                        rng.gen_range(1..4)
                    } else {
                        rng.gen()
                    }
                })
                .collect();
            let mut expected = vec![0u8; escaped_size_bound(len)];
            let n = escape_scalar(&mut expected, &src);
            for backend in [EscapeBackend::Swar, EscapeBackend::Sse2, EscapeBackend::detect()] {
                let mut dst = vec![0u8; escaped_size_bound(len)];
                let m = backend.escape(&mut dst, &src);
                assert_eq!(&dst[..m], &expected[..n], "{backend:?} round {round}");
            }
        }
    }

    #[test]
    fn chunk_boundary_works() {
        // a zero pair ending one chunk followed by a small byte starting the next
        for split in 2..40 {
            let mut src = vec![0x55u8; 48];
            src[split - 2] = 0;
            src[split - 1] = 0;
            src[split] = 0x01;
            let mut expected = vec![0u8; escaped_size_bound(src.len())];
            let n = escape_scalar(&mut expected, &src);
            assert_eq!(n, src.len() + 1);
            for backend in [EscapeBackend::Swar, EscapeBackend::Sse2] {
                let mut dst = vec![0u8; escaped_size_bound(src.len())];
                let m = backend.escape(&mut dst, &src);
                assert_eq!(&dst[..m], &expected[..n], "{backend:?} split {split}");
            }
        }
    }

    #[test]
    fn worst_case_fits_bound() {
        for len in 0..64 {
            let src = vec![0u8; len];
            let mut dst = vec![0u8; escaped_size_bound(len)];
            let n = escape_scalar(&mut dst, &src);
            assert!(n <= escaped_size_bound(len));
        }
    }
}
