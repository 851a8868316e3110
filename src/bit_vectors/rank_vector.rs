//! Appendable bit vector with constant-time rank via a two-level block summary.
#![cfg(target_pointer_width = "64")]

use anyhow::{anyhow, Result};

use crate::bit_region;
use crate::bit_vectors::bit_vector::WORD_LEN;
use crate::bit_vectors::{Access, BitVector, NumBits, Rank, Select};
use crate::utils;

/// Appendable bit vector with constant-time rank and logarithmic select.
///
/// The vector keeps two summary arrays over the bit store: `block_t[t]`
/// holds the number of ones in the first `t + 1` *top* blocks of
/// `BLOCK_T` bits (cumulative over the whole vector), and `block_m[m]`
/// holds in-top-block cumulative counts per *middle* block of `BLOCK_M`
/// bits. The final middle block of each top block is implicit (derivable
/// from `block_t`) and never stored. Both summaries are maintained on every
/// [`Self::push_bit()`], so rank and select are defined and correct on any
/// intermediate length; [`Self::shorten()`] truncates while rebuilding the
/// affected summary tail.
///
/// Block sizes are compile-time parameters: powers of two with
/// `64 <= BLOCK_M < BLOCK_T < 2^16`.
///
/// # Complexity
///
/// Rank is a constant number of memory accesses plus one popcount over at
/// most `BLOCK_M` bits; select is a binary search over the top summary plus
/// a scan of at most `BLOCK_T / BLOCK_M - 1` middle counters plus one
/// word-level select.
///
/// # Examples
///
/// ```
/// use sucdyn::bit_vectors::{RankVector, Rank, Select};
///
/// let mut rv = RankVector::<256, 4096>::new();
/// for b in [true, false, false, true, true] {
///     rv.push_bit(b);
/// }
///
/// assert_eq!(rv.rank1(2), Some(1));
/// assert_eq!(rv.rank1(4), Some(3));
/// assert_eq!(rv.select1(2), Some(3));
/// assert_eq!(rv.num_ones(), 3);
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RankVector<const BLOCK_M: usize = 256, const BLOCK_T: usize = 4096> {
    bv: BitVector,
    block_m: Vec<u16>,
    block_t: Vec<u64>,
}

impl<const BLOCK_M: usize, const BLOCK_T: usize> RankVector<BLOCK_M, BLOCK_T> {
    const PARAMS_OK: () = assert!(
        BLOCK_M.is_power_of_two()
            && BLOCK_T.is_power_of_two()
            && WORD_LEN <= BLOCK_M
            && BLOCK_M < BLOCK_T
            && BLOCK_T < (1 << 16)
    );

    /// Creates a new empty vector.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::PARAMS_OK;
        Self {
            bv: BitVector::new(),
            block_m: vec![],
            block_t: vec![],
        }
    }

    /// Creates a new empty vector with at least `capa` bits of capacity,
    /// including summary space.
    pub fn with_capacity(capa: usize) -> Self {
        let mut this = Self::new();
        this.change_capacity(capa);
        this
    }

    /// Appends one bit, maintaining both summaries.
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::bit_vectors::RankVector;
    ///
    /// let mut rv = RankVector::<256, 4096>::new();
    /// rv.push_bit(true);
    /// rv.push_bit(false);
    /// assert_eq!(rv.len(), 2);
    /// assert_eq!(rv.num_ones(), 1);
    /// ```
    pub fn push_bit(&mut self, bit: bool) {
        let pos = self.bv.len();
        self.bv.push_bit(bit);
        let b = bit as u64;
        if pos == 0 {
            self.block_t.push(b);
            self.block_m.push(b as u16);
            return;
        }

        let idx_t = pos / BLOCK_T;
        let rem_t = pos % BLOCK_T;
        let idx_m = pos / BLOCK_M - idx_t;
        if pos % BLOCK_M == 0 {
            if rem_t == 0 {
                let carried = self.block_t[idx_t - 1];
                self.block_t.push(carried);
                self.block_m.push(0);
            } else if rem_t < BLOCK_T - BLOCK_M {
                let carried = self.block_m[idx_m - 1];
                self.block_m.push(carried);
            }
        }
        self.block_t[idx_t] += b;
        if rem_t < BLOCK_T - BLOCK_M {
            self.block_m[idx_m] += b as u16;
        }
    }

    /// Truncates the vector to `new_len` bits, recomputing the summary
    /// entries that cover the new final top and middle blocks.
    ///
    /// For every surviving position `p`, `rank1(p)` is unchanged. The
    /// dropped tail bits are cleared so that later appends and scans start
    /// from a clean slate.
    ///
    /// # Errors
    ///
    /// An error is returned if `self.len() < new_len`.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sucdyn::bit_vectors::{RankVector, Rank};
    ///
    /// let mut rv = RankVector::<256, 4096>::new();
    /// for i in 0..600 {
    ///     rv.push_bit(i % 2 == 0);
    /// }
    /// rv.shorten(300)?;
    /// assert_eq!(rv.len(), 300);
    /// assert_eq!(rv.rank1(299), Some(150));
    /// # Ok(())
    /// # }
    /// ```
    pub fn shorten(&mut self, new_len: usize) -> Result<()> {
        if self.len() < new_len {
            return Err(anyhow!(
                "new_len must be no greater than self.len()={}, but got {new_len}.",
                self.len()
            ));
        }
        let old_len = self.len();
        if new_len == old_len {
            return Ok(());
        }

        // Clear the dropped tail so word-level scans stay exact.
        {
            let words = self.bv.words_mut();
            let mut pos = new_len;
            if pos % WORD_LEN != 0 {
                let head = (WORD_LEN - pos % WORD_LEN).min(old_len - pos);
                bit_region::set_bits(words, pos, 0, head);
                pos += head;
            }
            for w in &mut words[BitVector::words_for(pos)..BitVector::words_for(old_len)] {
                *w = 0;
            }
        }
        self.bv.resize(new_len);

        if new_len == 0 {
            self.block_t.clear();
            self.block_m.clear();
            return Ok(());
        }

        let last = new_len - 1;
        let idx_t = last / BLOCK_T;
        let idx_m = last / BLOCK_M - idx_t;
        let mid_stored = last % BLOCK_T < BLOCK_T - BLOCK_M;
        self.block_t.truncate(idx_t + 1);
        self.block_m.truncate(if mid_stored { idx_m + 1 } else { idx_m });

        let in_top = bit_region::count_ones(
            &self.bv.words()[idx_t * BLOCK_T / WORD_LEN..],
            new_len - idx_t * BLOCK_T,
        );
        let carried = if idx_t > 0 { self.block_t[idx_t - 1] } else { 0 };
        self.block_t[idx_t] = carried + in_top as u64;
        if mid_stored {
            self.block_m[idx_m] = in_top as u16;
        }
        Ok(())
    }

    /// Returns the largest position `pred <= pos` whose bit is set, or
    /// [`None`] if none exists.
    ///
    /// A fast path scans up to two words directly; on a miss the query
    /// falls back to a rank followed by a select.
    pub fn predecessor1(&self, pos: usize) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let pos = pos.min(self.len() - 1);
        let scan = 2.min(pos / WORD_LEN + 1);
        if let Some(p) = bit_region::predecessor1(self.bv.words(), pos, scan) {
            return Some(p);
        }
        match self.rank1(pos).unwrap() {
            0 => None,
            r => self.select1(r),
        }
    }

    /// Returns the largest position `pred <= pos` whose bit is unset, or
    /// [`None`] if none exists.
    pub fn predecessor0(&self, pos: usize) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let pos = pos.min(self.len() - 1);
        let scan = 2.min(pos / WORD_LEN + 1);
        if let Some(p) = bit_region::predecessor0(self.bv.words(), pos, scan) {
            return Some(p);
        }
        match self.rank0(pos).unwrap() {
            0 => None,
            r => self.select0(r),
        }
    }

    /// Returns the smallest position `succ >= pos` whose bit is set, or
    /// [`None`] if none exists or `self.len() <= pos`.
    pub fn successor1(&self, pos: usize) -> Option<usize> {
        if self.len() <= pos {
            return None;
        }
        let scan = 2.min((self.len() - pos - 1) / WORD_LEN + 1);
        if let Some(p) =
            bit_region::successor1(self.bv.words(), pos, scan).filter(|&p| p < self.len())
        {
            return Some(p);
        }
        let r = self.rank1(pos).unwrap();
        if r < self.num_ones() {
            self.select1(r + 1)
        } else {
            None
        }
    }

    /// Returns the smallest position `succ >= pos` whose bit is unset, or
    /// [`None`] if none exists or `self.len() <= pos`.
    pub fn successor0(&self, pos: usize) -> Option<usize> {
        if self.len() <= pos {
            return None;
        }
        let scan = 2.min((self.len() - pos - 1) / WORD_LEN + 1);
        if let Some(p) =
            bit_region::successor0(self.bv.words(), pos, scan).filter(|&p| p < self.len())
        {
            return Some(p);
        }
        let r = self.rank0(pos).unwrap();
        if r < self.num_zeros() {
            self.select0(r + 1)
        } else {
            None
        }
    }

    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    #[inline(always)]
    pub fn get_bit(&self, pos: usize) -> Option<bool> {
        self.bv.get_bit(pos)
    }

    /// Returns the number of bits set, in constant time.
    #[inline(always)]
    pub fn num_ones(&self) -> usize {
        self.block_t.last().map_or(0, |&x| x as usize)
    }

    /// Returns the number of bits unset, in constant time.
    #[inline(always)]
    pub fn num_zeros(&self) -> usize {
        self.len() - self.num_ones()
    }

    /// Returns the number of bits stored.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bv.len()
    }

    /// Checks if the vector is empty.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bit capacity of the underlying store.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.bv.capacity()
    }

    /// Adjusts the bit capacity to `max(self.len(), capa)` and reserves the
    /// matching summary space. Passing 0 shrinks to fit.
    pub fn change_capacity(&mut self, capa: usize) {
        self.bv.change_capacity(capa);
        let cap = self.bv.capacity();
        let len_t = utils::ceiled_divide(cap, BLOCK_T);
        let len_m = utils::ceiled_divide(cap, BLOCK_M).saturating_sub(len_t);
        self.block_t
            .reserve(len_t.saturating_sub(self.block_t.len()));
        self.block_m
            .reserve(len_m.saturating_sub(self.block_m.len()));
        if capa == 0 {
            self.block_t.shrink_to_fit();
            self.block_m.shrink_to_fit();
        }
    }

    /// Returns the approximate heap-plus-inline footprint in bytes.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<BitVector>()
            + self.bv.size_in_bytes()
            + self.block_m.len() * std::mem::size_of::<u16>()
            + self.block_t.len() * std::mem::size_of::<u64>()
    }
}

impl<const BLOCK_M: usize, const BLOCK_T: usize> NumBits for RankVector<BLOCK_M, BLOCK_T> {
    /// Returns the number of bits stored.
    fn num_bits(&self) -> usize {
        self.len()
    }

    /// Returns the number of bits set, in constant time.
    fn num_ones(&self) -> usize {
        self.block_t.last().map_or(0, |&x| x as usize)
    }
}

impl<const BLOCK_M: usize, const BLOCK_T: usize> Access for RankVector<BLOCK_M, BLOCK_T> {
    /// Returns the `pos`-th bit, or [`None`] if out of bounds.
    fn access(&self, pos: usize) -> Option<bool> {
        self.get_bit(pos)
    }
}

impl<const BLOCK_M: usize, const BLOCK_T: usize> Rank for RankVector<BLOCK_M, BLOCK_T> {
    /// Returns the number of ones in positions `0..=pos`, or [`None`] if
    /// `pos` is out of bounds.
    ///
    /// # Complexity
    ///
    /// Constant
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::bit_vectors::{RankVector, Rank};
    ///
    /// let mut rv = RankVector::<256, 4096>::new();
    /// for b in [true, false, false, true] {
    ///     rv.push_bit(b);
    /// }
    /// assert_eq!(rv.rank1(0), Some(1));
    /// assert_eq!(rv.rank1(2), Some(1));
    /// assert_eq!(rv.rank1(3), Some(2));
    /// assert_eq!(rv.rank1(4), None);
    /// ```
    fn rank1(&self, pos: usize) -> Option<usize> {
        if self.len() <= pos {
            return None;
        }
        let idx_t = pos / BLOCK_T;
        let rem_t = pos % BLOCK_T;
        let idx_m = pos / BLOCK_M - idx_t;
        let mut rank = if idx_t > 0 {
            self.block_t[idx_t - 1] as usize
        } else {
            0
        };
        if rem_t >= BLOCK_M {
            rank += self.block_m[idx_m - 1] as usize;
        }
        let base = pos / BLOCK_M * BLOCK_M;
        Some(rank + bit_region::count_ones(&self.bv.words()[base / WORD_LEN..], pos - base + 1))
    }

    /// Returns the number of zeros in positions `0..=pos`, or [`None`] if
    /// `pos` is out of bounds.
    fn rank0(&self, pos: usize) -> Option<usize> {
        Some(pos + 1 - self.rank1(pos)?)
    }
}

impl<const BLOCK_M: usize, const BLOCK_T: usize> Select for RankVector<BLOCK_M, BLOCK_T> {
    /// Returns the position of the `k`-th set bit, or [`None`] if `k == 0`
    /// or `self.num_ones() < k`.
    ///
    /// # Complexity
    ///
    /// $`O(\lg (n / \textrm{BLOCK\_T}))`$
    ///
    /// # Examples
    ///
    /// ```
    /// use sucdyn::bit_vectors::{RankVector, Select};
    ///
    /// let mut rv = RankVector::<256, 4096>::new();
    /// for b in [true, false, false, true] {
    ///     rv.push_bit(b);
    /// }
    /// assert_eq!(rv.select1(1), Some(0));
    /// assert_eq!(rv.select1(2), Some(3));
    /// assert_eq!(rv.select1(3), None);
    /// ```
    fn select1(&self, k: usize) -> Option<usize> {
        if k == 0 || self.num_ones() < k {
            return None;
        }
        let (mut lo, mut hi) = (0, self.block_t.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if (self.block_t[mid] as usize) < k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let idx_t = lo;
        let skipped = if idx_t > 0 {
            self.block_t[idx_t - 1] as usize
        } else {
            0
        };
        let mut k = k - skipped;

        let pos_t = idx_t * BLOCK_T;
        let idx_m = pos_t / BLOCK_M - idx_t;
        let mut i = 0;
        while i < BLOCK_T / BLOCK_M - 1
            && idx_m + i < self.block_m.len()
            && (self.block_m[idx_m + i] as usize) < k
        {
            i += 1;
        }
        if i > 0 {
            k -= self.block_m[idx_m + i - 1] as usize;
        }
        let pos_m = pos_t + i * BLOCK_M;
        Some(pos_m + bit_region::select1(&self.bv.words()[pos_m / WORD_LEN..], k))
    }

    /// Returns the position of the `k`-th unset bit, or [`None`] if `k == 0`
    /// or `self.num_zeros() < k`.
    ///
    /// The zeros-side summaries are derived from the ones side as
    /// `(t + 1) * BLOCK_T - block_t[t]`.
    fn select0(&self, k: usize) -> Option<usize> {
        if k == 0 || self.num_zeros() < k {
            return None;
        }
        let len = self.len();
        let zeros_top = |t: usize| ((t + 1) * BLOCK_T).min(len) - self.block_t[t] as usize;
        let (mut lo, mut hi) = (0, self.block_t.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if zeros_top(mid) < k {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let idx_t = lo;
        let skipped = if idx_t > 0 { zeros_top(idx_t - 1) } else { 0 };
        let mut k = k - skipped;

        let pos_t = idx_t * BLOCK_T;
        let idx_m = pos_t / BLOCK_M - idx_t;
        let mut i = 0;
        while i < BLOCK_T / BLOCK_M - 1
            && idx_m + i < self.block_m.len()
            && (i + 1) * BLOCK_M - (self.block_m[idx_m + i] as usize) < k
        {
            i += 1;
        }
        if i > 0 {
            k -= i * BLOCK_M - self.block_m[idx_m + i - 1] as usize;
        }
        let pos_m = pos_t + i * BLOCK_M;
        Some(pos_m + bit_region::select0(&self.bv.words()[pos_m / WORD_LEN..], k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleaved(groups: usize) -> RankVector<64, 256> {
        // For group j, j % 13 zeros then a one; small blocks stress the
        // boundary bookkeeping.
        let mut rv = RankVector::<64, 256>::new();
        for j in 0..groups {
            for _ in 0..j % 13 {
                rv.push_bit(false);
            }
            rv.push_bit(true);
        }
        rv
    }

    #[test]
    fn test_rank_matches_running_count() {
        let rv = interleaved(700);
        let mut ones = 0;
        for p in 0..rv.len() {
            if rv.get_bit(p).unwrap() {
                ones += 1;
            }
            assert_eq!(rv.rank1(p), Some(ones), "p={p}");
            assert_eq!(rv.rank0(p), Some(p + 1 - ones), "p={p}");
        }
        assert_eq!(rv.rank1(rv.len()), None);
        assert_eq!(rv.num_ones(), 700);
    }

    #[test]
    fn test_select_duality() {
        let rv = interleaved(700);
        for k in 1..=rv.num_ones() {
            let p = rv.select1(k).unwrap();
            assert!(rv.get_bit(p).unwrap());
            assert_eq!(rv.rank1(p), Some(k));
        }
        for k in 1..=rv.num_zeros() {
            let p = rv.select0(k).unwrap();
            assert!(!rv.get_bit(p).unwrap());
            assert_eq!(rv.rank0(p), Some(k));
        }
        assert_eq!(rv.select1(0), None);
        assert_eq!(rv.select1(rv.num_ones() + 1), None);
        assert_eq!(rv.select0(rv.num_zeros() + 1), None);
    }

    #[test]
    fn test_predecessor_successor() {
        let rv = interleaved(300);
        let mut last_one: Option<usize> = None;
        for p in 0..rv.len() {
            if rv.get_bit(p).unwrap() {
                last_one = Some(p);
            }
            assert_eq!(rv.predecessor1(p), last_one, "p={p}");
        }
        let mut next_one: Option<usize> = None;
        for p in (0..rv.len()).rev() {
            if rv.get_bit(p).unwrap() {
                next_one = Some(p);
            }
            assert_eq!(rv.successor1(p), next_one, "p={p}");
        }
        // Queries past the end clamp (predecessor) or miss (successor).
        assert_eq!(rv.predecessor1(rv.len() + 100), last_one_of(&rv));
        assert_eq!(rv.successor1(rv.len()), None);
    }

    fn last_one_of(rv: &RankVector<64, 256>) -> Option<usize> {
        rv.select1(rv.num_ones())
    }

    #[test]
    fn test_predecessor_successor_zero() {
        let rv = interleaved(300);
        let mut last_zero: Option<usize> = None;
        for p in 0..rv.len() {
            if !rv.get_bit(p).unwrap() {
                last_zero = Some(p);
            }
            assert_eq!(rv.predecessor0(p), last_zero, "p={p}");
        }
        let mut next_zero: Option<usize> = None;
        for p in (0..rv.len()).rev() {
            if !rv.get_bit(p).unwrap() {
                next_zero = Some(p);
            }
            assert_eq!(rv.successor0(p), next_zero, "p={p}");
        }
    }

    #[test]
    fn test_all_ones_and_all_zeros() {
        let mut ones = RankVector::<64, 256>::new();
        let mut zeros = RankVector::<64, 256>::new();
        for _ in 0..1000 {
            ones.push_bit(true);
            zeros.push_bit(false);
        }
        assert_eq!(ones.num_ones(), 1000);
        assert_eq!(ones.select1(1000), Some(999));
        assert_eq!(ones.select0(1), None);
        assert_eq!(zeros.num_ones(), 0);
        assert_eq!(zeros.select0(1000), Some(999));
        assert_eq!(zeros.select1(1), None);
        assert_eq!(zeros.predecessor1(999), None);
        assert_eq!(ones.successor0(0), None);
    }

    #[test]
    fn test_append_and_rank_select_large() {
        // 8200 groups of (j % 1000) zeros followed by a one.
        let mut rv = RankVector::<256, 4096>::new();
        let mut expected_len = 0;
        for j in 0..8200 {
            for _ in 0..j % 1000 {
                rv.push_bit(false);
            }
            rv.push_bit(true);
            expected_len += j % 1000 + 1;
        }
        assert_eq!(rv.len(), expected_len);
        assert_eq!(rv.num_ones(), 8200);

        let mut prev = 0;
        for k in 1..=8200 {
            let s = rv.select1(k).unwrap();
            assert!(k == 1 || s > prev);
            prev = s;
        }

        let mut last_rank = 0;
        for p in 0..rv.len() {
            let r = rv.rank1(p).unwrap();
            assert_eq!(r - last_rank, rv.get_bit(p).unwrap() as usize, "p={p}");
            last_rank = r;
        }
    }

    #[test]
    fn test_shorten_preserves_rank() {
        let mut rv = RankVector::<256, 4096>::new();
        for j in 0..8200 {
            for _ in 0..j % 1000 {
                rv.push_bit(false);
            }
            rv.push_bit(true);
        }
        let size = rv.len();
        let pre: Vec<usize> = (0..size).map(|p| rv.rank1(p).unwrap()).collect();

        let mut targets = vec![0, 1, 32, 256, 1024, size - 1, size];
        targets.sort_unstable_by(|a, b| b.cmp(a));
        for n in targets {
            rv.shorten(n).unwrap();
            assert_eq!(rv.len(), n);
            for p in 0..n {
                assert_eq!(rv.rank1(p), Some(pre[p]), "n={n} p={p}");
            }
            if n > 0 {
                assert_eq!(rv.num_ones(), pre[n - 1]);
            } else {
                assert_eq!(rv.num_ones(), 0);
            }
        }
    }

    #[test]
    fn test_shorten_then_append() {
        let mut rv = RankVector::<64, 256>::new();
        for i in 0..777 {
            rv.push_bit(i % 3 == 0);
        }
        rv.shorten(500).unwrap();
        for i in 500..777 {
            rv.push_bit(i % 3 == 0);
        }
        let mut ones = 0;
        for p in 0..777 {
            ones += (p % 3 == 0) as usize;
            assert_eq!(rv.rank1(p), Some(ones), "p={p}");
        }
    }

    #[test]
    fn test_shorten_oob() {
        let mut rv = RankVector::<64, 256>::new();
        rv.push_bit(true);
        let e = rv.shorten(2);
        assert_eq!(
            e.err().map(|x| x.to_string()),
            Some("new_len must be no greater than self.len()=1, but got 2.".to_string())
        );
    }

    #[test]
    fn test_change_capacity_roundtrip() {
        let mut rv = RankVector::<64, 256>::with_capacity(4096);
        assert!(rv.capacity() >= 4096);
        for i in 0..100 {
            rv.push_bit(i % 2 == 0);
        }
        rv.change_capacity(0);
        assert_eq!(rv.capacity(), 128);
        assert_eq!(rv.rank1(99), Some(50));
    }
}
