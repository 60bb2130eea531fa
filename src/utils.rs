use std::ops::BitXorAssign;

pub(crate) fn xor_inplace<T: Copy + BitXorAssign>(a: &mut [T], b: &[T]) {
    a.iter_mut().zip(b).for_each(|(a, b)| {
        *a ^= *b;
    });
}

/// Number of bytes needed to hold `bits` bits.
#[inline]
pub(crate) const fn num_bytes(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// `ceil(log2(x))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
pub(crate) const fn ceil_log2(x: usize) -> u32 {
    if x <= 1 {
        0
    } else {
        usize::BITS - (x - 1).leading_zeros()
    }
}

/// Returns bit `i` of a byte string, where bit 0 is the most significant bit of the first byte.
#[inline]
pub(crate) fn get_bit(bytes: &[u8], i: usize) -> bool {
    (bytes[i / 8] >> (7 - i % 8)) & 1 == 1
}

/// Sets bit `i` of a byte string, using the same bit order as [`get_bit`].
#[inline]
pub(crate) fn set_bit(bytes: &mut [u8], i: usize, bit: bool) {
    let mask = 1 << (7 - i % 8);
    if bit {
        bytes[i / 8] |= mask;
    } else {
        bytes[i / 8] &= !mask;
    }
}

/// XOR of all bits of a word, i.e. the value encoded by a word of party shares.
#[inline]
pub(crate) fn parity(word: u64) -> bool {
    word.count_ones() & 1 == 1
}

/// Broadcasts a bit into every lane of a word.
#[inline]
pub(crate) fn extend(bit: bool) -> u64 {
    (bit as u64).wrapping_neg()
}

/// Checks that all bits at positions `>= bits` are zero.
pub(crate) fn padding_bits_zero(bytes: &[u8], bits: usize) -> bool {
    (bits..bytes.len() * 8).all(|i| !get_bit(bytes, i))
}

/// Maps `f` over `0..n`, on the rayon thread pool if the `parallel` feature is enabled.
///
/// The output order always matches the input order.
pub(crate) fn map_rounds<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..n).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_log2() {
        assert_eq!(0, ceil_log2(1));
        assert_eq!(1, ceil_log2(2));
        assert_eq!(2, ceil_log2(3));
        assert_eq!(4, ceil_log2(16));
        assert_eq!(9, ceil_log2(343));
        assert_eq!(10, ceil_log2(570));
        assert_eq!(10, ceil_log2(803));
    }

    #[test]
    fn test_bit_order() {
        let mut bytes = [0_u8; 2];
        set_bit(&mut bytes, 0, true);
        set_bit(&mut bytes, 9, true);
        assert_eq!([0b1000_0000, 0b0100_0000], bytes);
        assert!(get_bit(&bytes, 0));
        assert!(!get_bit(&bytes, 1));
        assert!(get_bit(&bytes, 9));
        set_bit(&mut bytes, 0, false);
        assert_eq!([0, 0b0100_0000], bytes);
    }

    #[test]
    fn test_padding_bits() {
        assert!(padding_bits_zero(&[0xff, 0b1110_0000], 11));
        assert!(!padding_bits_zero(&[0xff, 0b1111_0000], 11));
        assert!(padding_bits_zero(&[], 0));
    }

    #[test]
    fn test_parity_extend() {
        assert!(parity(0b1011));
        assert!(!parity(0b1001));
        assert_eq!(u64::MAX, extend(true));
        assert_eq!(0, extend(false));
    }
}
