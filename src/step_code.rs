//! Small-capacity container of uintegers stored at individual 4-bit-stepped widths.
#![cfg(target_pointer_width = "64")]

use anyhow::{anyhow, Result};

use crate::bit_region;
use crate::bit_vectors::BitVector;
use crate::broadword::lo_mask;
use crate::utils;

/// Bits of each width step.
pub const STEP: usize = 4;

/// Bits of each width code.
pub const CODE_BITS: usize = 4;

/// Number of width codes packed in a 64-bit word.
pub const CODES_PER_WORD: usize = 16;

/// Returns the smallest multiple of 4 in `4..=64` that fits `val`.
///
/// # Examples
///
/// ```
/// use sucdyn::step_code::stepped_width;
///
/// assert_eq!(stepped_width(0), 4);
/// assert_eq!(stepped_width(15), 4);
/// assert_eq!(stepped_width(16), 8);
/// assert_eq!(stepped_width(u64::MAX), 64);
/// ```
pub fn stepped_width(val: u64) -> usize {
    (utils::needed_bits(val) + STEP - 1) / STEP * STEP
}

/// Returns the width code of `val`, i.e. `stepped_width(val) / 4 - 1`.
pub fn w_code(val: u64) -> u64 {
    ((utils::needed_bits(val) - 1) / STEP) as u64
}

/// Returns the width encoded by `code`, i.e. `(code + 1) * 4`.
pub const fn width_of_code(code: u64) -> usize {
    (code as usize + 1) * STEP
}

/// Reads the `idx`-th 4-bit width code from a packed code array.
#[inline(always)]
pub fn read_w_code(codes: &[u64], idx: usize) -> u64 {
    bit_region::get_bits(codes, idx * CODE_BITS, CODE_BITS)
}

/// Writes the `idx`-th 4-bit width code into a packed code array.
#[inline(always)]
pub fn write_w_code(codes: &mut [u64], idx: usize, code: u64) {
    debug_assert!(code < 16);
    bit_region::set_bits(codes, idx * CODE_BITS, code, CODE_BITS);
}

/// Sums the sixteen 4-bit width codes packed in `word`.
///
/// # Examples
///
/// ```
/// use sucdyn::step_code::sum_w_codes;
///
/// assert_eq!(sum_w_codes(0), 0);
/// assert_eq!(sum_w_codes(0x21), 3);
/// assert_eq!(sum_w_codes(u64::MAX), 240);
/// ```
#[inline(always)]
pub fn sum_w_codes(word: u64) -> usize {
    let mut w = ((word & 0xf0f0_f0f0_f0f0_f0f0) >> 4) + (word & 0x0f0f_0f0f_0f0f_0f0f);
    w += w >> 8;
    w += w >> 16;
    w += w >> 32;
    (w & 0xff) as usize
}

/// Container of up to `CAPACITY` uintegers, each stored in the smallest
/// multiple-of-4 bit width that fits it.
///
/// The chosen width of the `i`-th value is recorded as a 4-bit code
/// (`width / 4 - 1`) in a fixed code array of `CAPACITY / 16` words, and the
/// values themselves are packed back to back in a dynamic bit store. The
/// bit offset of value `i` is therefore `4 * (i + sum of codes before i)`,
/// a prefix sum that [`Self::enable_width_cache()`] reduces to a loop over
/// whole code words.
///
/// There is no constant-time random access; the container is intended for
/// small `CAPACITY` (a compile-time bound divisible by 16).
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use sucdyn::step_code::StepCode;
///
/// let mut sc = StepCode::<64>::new();
/// sc.push(3)?;
/// sc.push(256)?;
///
/// assert_eq!(sc.len(), 2);
/// assert_eq!(sc.width(0), Some(4));
/// assert_eq!(sc.width(1), Some(12));
/// assert_eq!(sc.get(1), Some(256));
/// assert_eq!(sc.bit_len(), 16);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StepCode<const CAPACITY: usize> {
    w_codes: Vec<u64>,
    width_cache: Option<Vec<u8>>,
    vals: BitVector,
    len: usize,
}

impl<const CAPACITY: usize> StepCode<CAPACITY> {
    const PARAMS_OK: () = assert!(CAPACITY != 0 && CAPACITY % CODES_PER_WORD == 0);

    /// Creates a new empty container.
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::PARAMS_OK;
        Self {
            w_codes: vec![0; CAPACITY / CODES_PER_WORD],
            width_cache: None,
            vals: BitVector::new(),
            len: 0,
        }
    }

    /// Creates a new empty container with at least `bits` of value capacity
    /// reserved.
    pub fn with_bit_capacity(bits: usize) -> Self {
        let mut this = Self::new();
        this.vals.change_capacity(bits);
        this
    }

    /// Pushes `val` at the end, stored in `stepped_width(val)` bits.
    ///
    /// # Errors
    ///
    /// An error is returned if the container already stores `CAPACITY`
    /// values.
    pub fn push(&mut self, val: u64) -> Result<()> {
        self.push_with_width(val, stepped_width(val))
    }

    /// Pushes `val` at the end, stored in exactly `width` bits.
    ///
    /// # Errors
    ///
    /// An error is returned if the container is full, `width` is not a
    /// multiple of 4 in `4..=64`, or `val` does not fit in `width` bits.
    pub fn push_with_width(&mut self, val: u64, width: usize) -> Result<()> {
        if self.len == CAPACITY {
            return Err(anyhow!(
                "the number of stored integers must not exceed CAPACITY={CAPACITY}."
            ));
        }
        if width == 0 || width > 64 || width % STEP != 0 {
            return Err(anyhow!(
                "width must be a multiple of 4 in 4..=64, but got {width}."
            ));
        }
        if utils::needed_bits(val) > width {
            return Err(anyhow!("val must fit in width={width} bits, but got {val}."));
        }
        self.vals.push_bits(val, width).unwrap();
        write_w_code(&mut self.w_codes, self.len, (width / STEP - 1) as u64);
        if let Some(cache) = self.width_cache.as_mut() {
            let word = self.len / CODES_PER_WORD;
            cache[word] = sum_w_codes(self.w_codes[word]) as u8;
        }
        self.len += 1;
        Ok(())
    }

    /// Returns the `idx`-th value, or [`None`] if out of bounds.
    ///
    /// # Complexity
    ///
    /// Linear in `idx / 16` (prefix sum over whole code words), constant per
    /// word with the width cache enabled.
    pub fn get(&self, idx: usize) -> Option<u64> {
        if self.len <= idx {
            return None;
        }
        let pos = self.prefix_bits(idx);
        let width = width_of_code(read_w_code(&self.w_codes, idx));
        self.vals.get_bits(pos, width)
    }

    /// Returns the stored width of the `idx`-th value, or [`None`] if out of
    /// bounds.
    pub fn width(&self, idx: usize) -> Option<usize> {
        if self.len <= idx {
            return None;
        }
        Some(width_of_code(read_w_code(&self.w_codes, idx)))
    }

    /// Returns the bit offset of the `idx`-th value, or [`None`] if out of
    /// bounds.
    pub fn bit_pos(&self, idx: usize) -> Option<usize> {
        if self.len <= idx {
            return None;
        }
        Some(self.prefix_bits(idx))
    }

    /// Returns the total width in bits of the values in `beg..end`, or
    /// [`None`] unless `beg <= end <= self.len()`.
    pub fn sum_widths(&self, beg: usize, end: usize) -> Option<usize> {
        if end < beg || self.len < end {
            return None;
        }
        let mut sum = 0;
        for i in beg..end {
            sum += width_of_code(read_w_code(&self.w_codes, i));
        }
        Some(sum)
    }

    /// Rewrites the `idx`-th value in place without changing its width.
    ///
    /// # Errors
    ///
    /// An error is returned if `idx` is out of bounds or `val` does not fit
    /// in the stored width.
    pub fn rewrite(&mut self, idx: usize, val: u64) -> Result<()> {
        if self.len <= idx {
            return Err(anyhow!(
                "idx must be no greater than self.len()={}, but got {idx}.",
                self.len
            ));
        }
        let width = width_of_code(read_w_code(&self.w_codes, idx));
        if utils::needed_bits(val) > width {
            return Err(anyhow!("val must fit in width={width} bits, but got {val}."));
        }
        let pos = self.prefix_bits(idx);
        self.vals.set_bits(pos, val, width).unwrap();
        Ok(())
    }

    /// Reads `width` bits at the raw bit offset `pos` of the value store.
    pub fn get_bits(&self, pos: usize, width: usize) -> Option<u64> {
        self.vals.get_bits(pos, width)
    }

    /// Writes `val` in `width` bits at the raw bit offset `pos` of the value
    /// store, e.g. to fill the hole opened by [`Self::splice()`].
    ///
    /// # Errors
    ///
    /// An error is returned if the window is out of bounds.
    pub fn write_bits(&mut self, pos: usize, val: u64, width: usize) -> Result<()> {
        self.vals.set_bits(pos, val, width)
    }

    /// Splices width codes and shifts the value store in one step.
    ///
    /// `src_len` codes taken from `src_codes` starting at `src_idx` replace
    /// the `tgt_len` codes starting at `tgt_idx`: the code tail shifts by
    /// `src_len - tgt_len` slots and the new codes are copied in. In the
    /// value store, the tail starting at `bit_pos + del_bit_len` moves to
    /// `bit_pos + ins_bit_len` and the bit length changes accordingly. The
    /// caller is responsible for filling `[bit_pos, bit_pos + ins_bit_len)`
    /// with the new values via [`Self::write_bits()`].
    ///
    /// # Errors
    ///
    /// An error is returned if the code or bit windows are out of bounds, or
    /// the resulting size would exceed `CAPACITY`.
    #[allow(clippy::too_many_arguments)]
    pub fn splice(
        &mut self,
        src_codes: &[u64],
        src_idx: usize,
        src_len: usize,
        tgt_idx: usize,
        tgt_len: usize,
        bit_pos: usize,
        ins_bit_len: usize,
        del_bit_len: usize,
    ) -> Result<()> {
        if self.len < tgt_idx + tgt_len {
            return Err(anyhow!(
                "tgt_idx+tgt_len must be no greater than self.len()={}, but got {}.",
                self.len,
                tgt_idx + tgt_len
            ));
        }
        if CAPACITY < self.len - tgt_len + src_len {
            return Err(anyhow!(
                "the number of stored integers must not exceed CAPACITY={CAPACITY}."
            ));
        }
        if self.vals.len() < bit_pos + del_bit_len {
            return Err(anyhow!(
                "bit_pos+del_bit_len must be no greater than self.bit_len()={}, but got {}.",
                self.vals.len(),
                bit_pos + del_bit_len
            ));
        }

        let tail_num = self.len - (tgt_idx + tgt_len);
        if src_len != tgt_len && tail_num != 0 {
            bit_region::move_bits(
                &mut self.w_codes,
                (tgt_idx + tgt_len) * CODE_BITS,
                (tgt_idx + src_len) * CODE_BITS,
                tail_num * CODE_BITS,
            );
        }
        if src_len != 0 {
            bit_region::copy_bits(
                src_codes,
                src_idx * CODE_BITS,
                &mut self.w_codes,
                tgt_idx * CODE_BITS,
                src_len * CODE_BITS,
            );
        }
        self.len = self.len - tgt_len + src_len;

        let old_bits = self.vals.len();
        let new_bits = old_bits + ins_bit_len - del_bit_len;
        let tail_bits = old_bits - (bit_pos + del_bit_len);
        if ins_bit_len >= del_bit_len {
            self.vals.resize(new_bits);
            if ins_bit_len > del_bit_len {
                self.vals
                    .move_bits(bit_pos + del_bit_len, bit_pos + ins_bit_len, tail_bits)
                    .unwrap();
            }
        } else {
            self.vals
                .move_bits(bit_pos + del_bit_len, bit_pos + ins_bit_len, tail_bits)
                .unwrap();
            self.vals.resize(new_bits);
        }

        if self.width_cache.is_some() {
            self.update_width_cache();
        }
        Ok(())
    }

    /// Builds (and from then on maintains) the per-word cache of code sums,
    /// making [`Self::bit_pos()`] a loop over whole code words.
    pub fn enable_width_cache(&mut self) {
        self.width_cache = Some(vec![]);
        self.update_width_cache();
    }

    fn update_width_cache(&mut self) {
        if let Some(cache) = self.width_cache.as_mut() {
            cache.clear();
            cache.extend(self.w_codes.iter().map(|&w| sum_w_codes(w) as u8));
        }
    }

    /// Gets the number of stored values.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the container is empty.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the total bit length of the value store.
    #[inline(always)]
    pub fn bit_len(&self) -> usize {
        self.vals.len()
    }

    /// Returns the bit capacity of the value store.
    #[inline(always)]
    pub fn bit_capacity(&self) -> usize {
        self.vals.capacity()
    }

    /// Adjusts the bit capacity of the value store to
    /// `max(self.bit_len(), bits)`; 0 shrinks to fit.
    pub fn change_bit_capacity(&mut self, bits: usize) {
        self.vals.change_capacity(bits);
    }

    /// Returns the approximate heap-plus-inline footprint in bytes.
    pub fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() - std::mem::size_of::<BitVector>()
            + self.vals.size_in_bytes()
            + self.w_codes.len() * 8
            + self.width_cache.as_ref().map_or(0, |c| c.len())
    }

    fn prefix_bits(&self, idx: usize) -> usize {
        let mut sum = idx;
        if let Some(cache) = self.width_cache.as_ref() {
            for &c in &cache[..idx / CODES_PER_WORD] {
                sum += c as usize;
            }
        } else {
            for &w in &self.w_codes[..idx / CODES_PER_WORD] {
                sum += sum_w_codes(w);
            }
        }
        let rem = idx % CODES_PER_WORD;
        if rem != 0 {
            sum += sum_w_codes(self.w_codes[idx / CODES_PER_WORD] & lo_mask(rem * CODE_BITS));
        }
        sum * STEP
    }
}

impl<const CAPACITY: usize> Default for StepCode<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> std::fmt::Debug for StepCode<CAPACITY> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let vals: Vec<u64> = (0..self.len).map(|i| self.get(i).unwrap()).collect();
        f.debug_struct("StepCode")
            .field("vals", &vals)
            .field("len", &self.len)
            .field("bit_len", &self.bit_len())
            .finish()
    }
}
