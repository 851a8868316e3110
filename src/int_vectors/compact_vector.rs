//! Updatable compact vector in which each integer is represented in a fixed number of bits.
#![cfg(target_pointer_width = "64")]

use anyhow::{anyhow, Result};

use crate::bit_region;
use crate::bit_vectors::BitVector;
use crate::broadword;
use crate::int_vectors::IntGetter;
use crate::utils;

/// Updatable compact vector in which each integer is represented in a fixed
/// number of bits, changeable at runtime.
///
/// The `pos`-th integer occupies the bit region
/// `[pos * width, (pos + 1) * width)` of the backing [`BitVector`]. The
/// element width can be re-chosen at any time with [`Self::convert()`],
/// which preserves the stored sequence (lossily when narrowing).
///
/// # Memory usage
///
/// $`n w`$ bits for $`n`$ integers of `width` $`w`$.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use sucdyn::int_vectors::CompactVector;
///
/// // Can store integers within 3 bits each.
/// let mut cv = CompactVector::new(3)?;
///
/// cv.push_int(7)?;
/// cv.push_int(2)?;
///
/// assert_eq!(cv.len(), 2);
/// assert_eq!(cv.get_int(0), Some(7));
///
/// cv.set_int(0, 5)?;
/// assert_eq!(cv.get_int(0), Some(5));
/// # Ok(())
/// # }
/// ```
#[derive(Default, Clone, PartialEq, Eq)]
pub struct CompactVector {
    chunks: BitVector,
    len: usize,
    width: usize,
}

impl CompactVector {
    /// Creates a new empty vector storing integers within `width` bits each.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64`.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::new(3)?;
    /// assert_eq!(cv.len(), 0);
    /// assert_eq!(cv.width(), 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(anyhow!("width must be in 1..=64, but got {width}."));
        }
        Ok(Self {
            chunks: BitVector::default(),
            len: 0,
            width,
        })
    }

    /// Creates a new empty vector of `width`-bit integers, reserving space
    /// for at least `capa` of them.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64`.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::with_capacity(10, 3)?;
    /// assert_eq!(cv.len(), 0);
    ///
    /// // Space for storing 21 integers is reserved due to the word rounding.
    /// assert_eq!(cv.capacity(), 21);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_capacity(capa: usize, width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(anyhow!("width must be in 1..=64, but got {width}."));
        }
        Ok(Self {
            chunks: BitVector::with_capacity(capa * width),
            len: 0,
            width,
        })
    }

    /// Creates a new vector of `width`-bit integers, storing `len` copies of
    /// `val`.
    ///
    /// # Errors
    ///
    /// An error is returned if `width` is not in `1..=64` or `val` cannot be
    /// represented in `width` bits.
    pub fn from_int(val: u64, len: usize, width: usize) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(anyhow!("width must be in 1..=64, but got {width}."));
        }
        if width < 64 && val >> width != 0 {
            return Err(anyhow!("val must fit in width={width} bits, but got {val}."));
        }
        let mut cv = Self::with_capacity(len, width).unwrap();
        for _ in 0..len {
            cv.push_int(val).unwrap();
        }
        Ok(cv)
    }

    /// Creates a new vector from a slice of integers `vals`, fitting the
    /// element width to the maximum value.
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_slice(&[7u32, 2]);
    /// assert_eq!(cv.len(), 2);
    /// assert_eq!(cv.width(), 3);
    /// assert_eq!(cv.get_int(0), Some(7));
    /// ```
    pub fn from_slice<T>(vals: &[T]) -> Self
    where
        T: Into<u64> + Copy,
    {
        if vals.is_empty() {
            return Self::default();
        }
        let mut max_int = 0u64;
        for x in vals {
            max_int = max_int.max((*x).into());
        }
        // unwrap should be safe, as needed_bits is in 1..=64.
        let mut cv = Self::with_capacity(vals.len(), utils::needed_bits(max_int)).unwrap();
        for x in vals {
            cv.push_int((*x).into()).unwrap();
        }
        cv
    }

    /// Returns the `pos`-th integer, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_slice(&[5u32, 256, 0]);
    /// assert_eq!(cv.get_int(0), Some(5));
    /// assert_eq!(cv.get_int(1), Some(256));
    /// assert_eq!(cv.get_int(3), None);
    /// ```
    #[inline(always)]
    pub fn get_int(&self, pos: usize) -> Option<u64> {
        self.chunks.get_bits(pos * self.width, self.width)
    }

    /// Sets the `pos`-th integer to `val`.
    ///
    /// # Errors
    ///
    /// An error is returned if `pos` is out of bounds or `val` cannot be
    /// represented in `self.width()` bits.
    ///
    /// # Complexity
    ///
    /// Constant
    #[inline(always)]
    pub fn set_int(&mut self, pos: usize, val: u64) -> Result<()> {
        if self.len() <= pos {
            return Err(anyhow!(
                "pos must be no greater than self.len()={}, but got {pos}.",
                self.len()
            ));
        }
        if self.width() != 64 && val >> self.width() != 0 {
            return Err(anyhow!(
                "val must fit in self.width()={} bits, but got {val}.",
                self.width()
            ));
        }
        // NOTE: in-bounds by the checks above.
        self.chunks
            .set_bits(pos * self.width, val, self.width)
            .unwrap();
        Ok(())
    }

    /// Pushes integer `val` at the end.
    ///
    /// # Errors
    ///
    /// An error is returned if `val` cannot be represented in `self.width()`
    /// bits.
    ///
    /// # Complexity
    ///
    /// Constant (amortized)
    #[inline(always)]
    pub fn push_int(&mut self, val: u64) -> Result<()> {
        if self.width() != 64 && val >> self.width() != 0 {
            return Err(anyhow!(
                "val must fit in self.width()={} bits, but got {val}.",
                self.width()
            ));
        }
        self.chunks.push_bits(val, self.width).unwrap();
        self.len += 1;
        Ok(())
    }

    /// Appends integers at the end.
    ///
    /// # Errors
    ///
    /// An error is returned if a value in `vals` cannot be represented in
    /// `self.width()` bits.
    pub fn extend<I>(&mut self, vals: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
    {
        for x in vals {
            self.push_int(x)?;
        }
        Ok(())
    }

    /// Grows the number of elements to `new_len`, expanding the capacity
    /// exactly when needed. Newly exposed elements are unspecified until
    /// written; shrinking only reduces the length.
    pub fn resize(&mut self, new_len: usize) {
        self.chunks.resize(new_len * self.width);
        self.len = new_len;
    }

    /// Variant of [`Self::resize()`] that never reallocates: returns `false`
    /// and leaves the vector unchanged if `new_len` exceeds the capacity.
    pub fn resize_without_reserve(&mut self, new_len: usize) -> bool {
        if self.chunks.resize_without_reserve(new_len * self.width) {
            self.len = new_len;
            true
        } else {
            false
        }
    }

    /// Clears the vector. It only changes the length to zero.
    pub fn clear(&mut self) {
        self.resize(0);
    }

    /// Adjusts the capacity to `max(self.len(), capa)` elements (rounded up
    /// by the word granularity of the backing store). Passing 0 shrinks the
    /// vector to fit its length.
    pub fn change_capacity(&mut self, capa: usize) {
        self.chunks.change_capacity(capa.max(self.len) * self.width);
    }

    /// Changes the element width to `new_width` while preserving the logical
    /// value sequence.
    ///
    /// Narrowing (`new_width < self.width()`) truncates every value to its
    /// lowest `new_width` bits; this is lossy by contract, and callers that
    /// require losslessness must check value ranges themselves. Widening is
    /// always lossless.
    ///
    /// Reallocation follows the capacity rules: when `do_shrink` is set the
    /// backing array is resized to exactly `max(self.len(), min_capacity)`
    /// elements; otherwise it is only grown, and only when the new layout
    /// needs more words than are allocated. The resulting capacity is
    /// derived from the word count, i.e. `words * 64 / new_width`.
    ///
    /// # Errors
    ///
    /// An error is returned if `new_width` is not in `1..=64`.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let mut cv = CompactVector::from_slice(&[300u32, 4, 27]);
    /// assert_eq!(cv.width(), 9);
    ///
    /// cv.convert(12, 0, false)?;
    /// assert_eq!(cv.get_int(0), Some(300));
    ///
    /// cv.convert(4, 0, true)?;
    /// assert_eq!(cv.get_int(0), Some(300 % 16));
    /// assert_eq!(cv.get_int(2), Some(11));
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert(&mut self, new_width: usize, min_capacity: usize, do_shrink: bool) -> Result<()> {
        if !(1..=64).contains(&new_width) {
            return Err(anyhow!("new_width must be in 1..=64, but got {new_width}."));
        }
        let old_width = self.width;
        let len = self.len;
        let min_capacity = min_capacity.max(len);
        let min_words = BitVector::words_for(min_capacity * new_width);

        if new_width <= old_width {
            if new_width < old_width {
                // Low-to-high: the write cursor never passes the read cursor.
                let words = self.chunks.words_mut();
                for i in 0..len {
                    let val = bit_region::get_bits(words, i * old_width, old_width)
                        & broadword::lo_mask(new_width);
                    bit_region::set_bits(words, i * new_width, val, new_width);
                }
            }
            let fitted = self.chunks.resize_without_reserve(len * new_width);
            debug_assert!(fitted);
            if do_shrink || min_words > self.chunks.num_words() {
                self.chunks.change_capacity(min_capacity * new_width);
            }
        } else {
            if do_shrink || min_words > self.chunks.num_words() {
                self.chunks.change_capacity(min_capacity * new_width);
            }
            {
                // High-to-low: source values are read before being overwritten.
                let words = self.chunks.words_mut();
                for i in (0..len).rev() {
                    let val = bit_region::get_bits(words, i * old_width, old_width);
                    bit_region::set_bits(words, i * new_width, val, new_width);
                }
            }
            let fitted = self.chunks.resize_without_reserve(len * new_width);
            debug_assert!(fitted);
        }
        self.width = new_width;
        Ok(())
    }

    /// Creates an iterator for enumerating integers.
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::int_vectors::CompactVector;
    ///
    /// let cv = CompactVector::from_slice(&[5u32, 256, 0]);
    /// let mut it = cv.iter();
    ///
    /// assert_eq!(it.next(), Some(5));
    /// assert_eq!(it.next(), Some(256));
    /// assert_eq!(it.next(), Some(0));
    /// assert_eq!(it.next(), None);
    /// ```
    pub const fn iter(&self) -> Iter {
        Iter::new(self)
    }

    /// Gets the number of integers.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the total number of integers it can hold without reallocating.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.chunks.capacity() / self.width()
    }

    /// Gets the number of bits used to store an integer.
    #[inline(always)]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Returns the approximate heap-plus-inline footprint in bytes.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<BitVector>()
            + self.chunks.size_in_bytes()
    }
}

impl IntGetter for CompactVector {
    /// Returns the `pos`-th integer, or [`None`] if out of bounds
    /// (just wrapping [`Self::get_int()`]).
    fn get_int(&self, pos: usize) -> Option<u64> {
        self.get_int(pos)
    }
}

/// Iterator for enumerating integers, created by [`CompactVector::iter()`].
///
/// The handle carries an index into the borrowed vector rather than a raw
/// position in the backing array, so it cannot dangle across reallocation;
/// mutation requires the borrow to end first.
pub struct Iter<'a> {
    cv: &'a CompactVector,
    pos: usize,
}

impl<'a> Iter<'a> {
    /// Creates a new iterator.
    pub const fn new(cv: &'a CompactVector) -> Self {
        Self { cv, pos: 0 }
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.cv.len() {
            let x = self.cv.get_int(self.pos).unwrap();
            self.pos += 1;
            Some(x)
        } else {
            None
        }
    }

    #[inline(always)]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.pos += n;
        self.next()
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.cv.len() - self.pos.min(self.cv.len());
        (rem, Some(rem))
    }
}

impl std::fmt::Debug for CompactVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ints: Vec<u64> = self.iter().collect();
        f.debug_struct("CompactVector")
            .field("ints", &ints)
            .field("len", &self.len)
            .field("width", &self.width)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_new_oob_width() {
        for w in [0, 65] {
            let e = CompactVector::new(w);
            assert_eq!(
                e.err().map(|x| x.to_string()),
                Some(format!("width must be in 1..=64, but got {w}."))
            );
        }
    }

    #[test]
    fn test_from_int_unfit() {
        let e = CompactVector::from_int(4, 0, 2);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must fit in width=2 bits, but got 4.".to_string())
        );
    }

    #[test]
    fn test_set_int_oob() {
        let mut cv = CompactVector::from_int(0, 1, 2).unwrap();
        let e = cv.set_int(1, 1);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("pos must be no greater than self.len()=1, but got 1.".to_string())
        );
    }

    #[test]
    fn test_push_int_unfit() {
        let mut cv = CompactVector::new(2).unwrap();
        let e = cv.push_int(4);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("val must fit in self.width()=2 bits, but got 4.".to_string())
        );
    }

    #[test]
    fn test_64b() {
        let mut cv = CompactVector::new(64).unwrap();
        cv.push_int(42).unwrap();
        assert_eq!(cv.get_int(0), Some(42));
        cv.set_int(0, u64::MAX).unwrap();
        assert_eq!(cv.get_int(0), Some(u64::MAX));
    }

    #[test]
    fn test_write_read_7bit() {
        // Powers of two folded into 7 bits over 2000 slots.
        let mut cv = CompactVector::with_capacity(2000, 7).unwrap();
        cv.resize(2000);
        for i in 0..2000 {
            cv.set_int(i, (1u64 << (i % 64)) % 128).unwrap();
        }
        for i in 0..2000 {
            assert_eq!(cv.get_int(i), Some((1u64 << (i % 64)) % 128), "i={i}");
        }
    }

    #[test]
    fn test_roundtrip_all_widths() {
        let mut rng = StdRng::seed_from_u64(99);
        for width in 1..=64 {
            let mut cv = CompactVector::new(width).unwrap();
            let vals: Vec<u64> = (0..200)
                .map(|_| rng.gen::<u64>() & broadword::lo_mask(width))
                .collect();
            cv.extend(vals.iter().copied()).unwrap();
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(cv.get_int(i), Some(v), "width={width} i={i}");
            }
        }
    }

    #[test]
    fn test_convert_lossless_widening() {
        let mut rng = StdRng::seed_from_u64(5);
        for (w, new_w) in [(1, 2), (7, 12), (12, 13), (31, 64), (63, 64)] {
            let vals: Vec<u64> = (0..300)
                .map(|_| rng.gen::<u64>() & broadword::lo_mask(w))
                .collect();
            let mut cv = CompactVector::new(w).unwrap();
            cv.extend(vals.iter().copied()).unwrap();
            cv.convert(new_w, 0, false).unwrap();
            assert_eq!(cv.width(), new_w);
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(cv.get_int(i), Some(v), "w={w}->{new_w} i={i}");
            }
        }
    }

    #[test]
    fn test_convert_lossy_narrowing() {
        let mut rng = StdRng::seed_from_u64(6);
        for (w, new_w) in [(2, 1), (12, 7), (13, 12), (64, 31), (64, 63)] {
            let vals: Vec<u64> = (0..300)
                .map(|_| rng.gen::<u64>() & broadword::lo_mask(w))
                .collect();
            let mut cv = CompactVector::new(w).unwrap();
            cv.extend(vals.iter().copied()).unwrap();
            cv.convert(new_w, 0, false).unwrap();
            assert_eq!(cv.width(), new_w);
            for (i, &v) in vals.iter().enumerate() {
                assert_eq!(
                    cv.get_int(i),
                    Some(v & broadword::lo_mask(new_w)),
                    "w={w}->{new_w} i={i}"
                );
            }
        }
    }

    #[test]
    fn test_convert_capacity_rules() {
        let mut cv = CompactVector::with_capacity(100, 8).unwrap();
        cv.extend(0..50u64).unwrap();
        // 100 * 8 bits = 13 words; converting to 4 bits without shrinking
        // keeps the word count, so the capacity doubles.
        let words = 13;
        cv.convert(4, 0, false).unwrap();
        assert_eq!(cv.capacity(), words * 64 / 4);
        // Shrinking reallocates to max(len, min_capacity) elements, with the
        // capacity derived back from the resulting word count.
        cv.convert(4, 60, true).unwrap();
        assert_eq!(cv.capacity(), BitVector::words_for(60 * 4) * 64 / 4);
        for i in 0..50 {
            assert_eq!(cv.get_int(i), Some(i as u64 & 0xf));
        }
    }

    #[test]
    fn test_convert_same_width_shrink() {
        let mut cv = CompactVector::with_capacity(1000, 9).unwrap();
        cv.extend(0..10u64).unwrap();
        cv.convert(9, 0, true).unwrap();
        assert_eq!(cv.capacity(), BitVector::words_for(10 * 9) * 64 / 9);
        for i in 0..10 {
            assert_eq!(cv.get_int(i), Some(i as u64));
        }
    }

    #[test]
    fn test_resize_without_reserve() {
        let mut cv = CompactVector::with_capacity(10, 6).unwrap();
        assert!(cv.resize_without_reserve(10));
        assert_eq!(cv.len(), 10);
        assert!(!cv.resize_without_reserve(cv.capacity() + 1));
        assert_eq!(cv.len(), 10);
    }

    #[test]
    fn test_iter_nth_jump() {
        let cv = CompactVector::from_slice(&[10u32, 20, 30, 40, 50]);
        let mut it = cv.iter();
        assert_eq!(it.nth(3), Some(40));
        assert_eq!(it.next(), Some(50));
        assert_eq!(it.next(), None);
    }
}
