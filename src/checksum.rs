//! Ones'-complement checksum verification
//!
//! [`Checksum`] accumulates words of one width into an accumulator at least twice as wide and checks whether the sum
//! folds to all ones. Appending every word of a header (checksum field included) and calling [`Checksum::verify`] is
//! the standard Internet checksum validation.

use std::marker::PhantomData;

/// Accumulator arithmetic for a given word width
///
/// Implemented for the accumulator type, parameterized by the word type it sums.
pub trait Accumulator<W>: Copy + Default {
    /// Add a word, letting carries spill into the upper half
    fn add_word(self, word: W) -> Self;
    /// Fold the upper half into the lower half once
    fn fold(self) -> Self;
    /// Whether the value equals the all-ones word
    fn is_all_ones(self) -> bool;
}

macro_rules! impl_accumulator {
    ($word:ty, $acc:ty) => {
        impl Accumulator<$word> for $acc {
            #[inline]
            fn add_word(self, word: $word) -> Self {
                self.wrapping_add(<$acc>::from(word))
            }

            #[inline]
            fn fold(self) -> Self {
                (self >> <$word>::BITS) + (self & <$acc>::from(<$word>::MAX))
            }

            #[inline]
            fn is_all_ones(self) -> bool {
                self == <$acc>::from(<$word>::MAX)
            }
        }
    };
}

impl_accumulator!(u8, u16);
impl_accumulator!(u16, u32);
impl_accumulator!(u32, u64);

/// Running ones'-complement sum of `W` words held in an `A` accumulator
#[derive(Debug, Clone, Copy, Default)]
pub struct Checksum<W, A> {
    acc: A,
    word: PhantomData<W>,
}

impl<W, A: Accumulator<W>> Checksum<W, A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            acc: A::default(),
            word: PhantomData,
        }
    }

    pub fn append(&mut self, word: W) {
        self.acc = self.acc.add_word(word);
    }

    /// Fold the carries once and check the complement of the sum is zero
    #[must_use]
    pub fn verify(&self) -> bool {
        self.acc.fold().is_all_ones()
    }
}

impl<A: Accumulator<u8>> Checksum<u8, A> {
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.append(byte);
        }
    }
}

impl<A: Accumulator<u16>> Checksum<u16, A> {
    /// Append big-endian 16 bit words. An odd trailing byte is padded with a zero low byte.
    pub fn append_be_words(&mut self, bytes: &[u8]) {
        let mut words = bytes.chunks_exact(2);
        for pair in &mut words {
            self.append(u16::from_be_bytes([pair[0], pair[1]]));
        }
        if let [last] = words.remainder() {
            self.append(u16::from(*last) << 8);
        }
    }

    /// Append both 16 bit halves of a 32 bit value
    pub fn append_u32(&mut self, value: u32) {
        self.append((value >> 16) as u16);
        self.append((value & 0xFFFF) as u16);
    }
}

#[cfg(test)]
mod checksum_testing {
    use super::*;
    use crate::testing::{ipv4_header, IPPROTO_TCP};

    #[test]
    fn correct_ipv4_header() {
        let header = ipv4_header(40, IPPROTO_TCP, [10, 0, 0, 1], [10, 0, 0, 2]);
        let mut sum = Checksum::<u16, u32>::new();
        sum.append_be_words(&header);
        assert!(sum.verify());

        let mut sum = Checksum::<u8, u16>::new();
        sum.append_bytes(&header);
        assert!(sum.verify());
    }

    #[test]
    fn flipped_checksum_bit() {
        let mut header = ipv4_header(40, IPPROTO_TCP, [10, 0, 0, 1], [10, 0, 0, 2]);
        header[11] ^= 0x01;
        let mut sum = Checksum::<u16, u32>::new();
        sum.append_be_words(&header);
        assert!(!sum.verify());

        let mut sum = Checksum::<u8, u16>::new();
        sum.append_bytes(&header);
        assert!(!sum.verify());
    }

    #[test]
    fn empty_sum_is_not_valid() {
        assert!(!Checksum::<u16, u32>::new().verify());
    }

    #[test]
    fn single_fold_carries() {
        // 0xFFFF + 0xFFFF + 0x0001 = 0x1_FFFF, folds to 0x1 + 0xFFFF
        let mut sum = Checksum::<u16, u32>::new();
        sum.append(0xFFFF);
        sum.append(0xFFFF);
        sum.append(0x0001);
        assert!(!sum.verify());

        let mut sum = Checksum::<u16, u32>::new();
        sum.append(0xF000);
        sum.append(0x1000);
        sum.append(0xFFFE);
        assert!(sum.verify());
    }

    #[test]
    fn odd_trailing_byte() {
        let mut odd = Checksum::<u16, u32>::new();
        odd.append_be_words(&[0x12, 0x34, 0x56]);
        let mut padded = Checksum::<u16, u32>::new();
        padded.append(0x1234);
        padded.append(0x5600);
        assert_eq!(odd.acc, padded.acc);
    }

    #[test]
    fn wide_words() {
        let mut sum = Checksum::<u32, u64>::new();
        sum.append(0x8000_0000);
        sum.append(0x7FFF_FFFF);
        assert!(sum.verify());
    }

    #[test]
    fn u32_halves() {
        let mut sum = Checksum::<u16, u32>::new();
        sum.append_u32(0xC0A8_0001);
        assert_eq!(sum.acc, 0xC0A8 + 0x0001);
    }
}
