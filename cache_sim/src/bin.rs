use std::ops::Range;

/// mask covering the lowest `width` bits. `width` may be 32.
#[inline]
pub const fn mask_lower(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

/// extracts `bin[r.start..r.end)`, shifted down to bit 0.
#[inline]
pub const fn extract(bin: u32, r: Range<u32>) -> u32 {
    if r.start >= 32 {
        0
    } else {
        (bin >> r.start) & mask_lower(r.end - r.start)
    }
}

/// `v << amount`, where shifting by 32 or more yields 0.
#[inline]
pub const fn shl(v: u32, amount: u32) -> u32 {
    if amount >= 32 {
        0
    } else {
        v << amount
    }
}
