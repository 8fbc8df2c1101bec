//! Inverse quantization for the MPEG family.
//!
//! Scalar reference kernels operating on one 8x8 coefficient block in
//! scan-permutated layout. MPEG-1 forces every reconstructed level odd
//! (oddification), MPEG-2 instead applies mismatch control by flipping the
//! parity of the last coefficient, and H.263 uses a flat multiply-add with
//! no weighting matrix.

// ─── Scan tables ─────────────────────────────────────────────────────

/// Canonical zigzag scan order.
pub const ZIGZAG_DIRECT: [u8; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27,
    20, 13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Alternate vertical scan used by MPEG-2 interlaced content.
pub const ALTERNATE_VERTICAL_SCAN: [u8; 64] = [
    0, 8, 16, 24, 1, 9, 2, 10, 17, 25, 32, 40, 48, 56, 57, 49, 41, 33, 26, 18, 3, 11, 4, 12, 19,
    27, 34, 42, 50, 58, 35, 43, 51, 59, 20, 28, 5, 13, 6, 14, 21, 29, 36, 44, 52, 60, 37, 45, 53,
    61, 22, 30, 7, 15, 23, 31, 38, 46, 54, 62, 39, 47, 55, 63,
];

/// A scan order combined with the coefficient permutation the IDCT wants,
/// plus the raster-order end positions used when walking a block in
/// memory order rather than scan order.
#[derive(Clone, Debug)]
pub struct ScanTable {
    pub scantable: [u8; 64],
    pub permutated: [u8; 64],
    /// `raster_end[i]` is the highest permutated position among the first
    /// `i + 1` scan entries.
    pub raster_end: [u8; 64],
}

impl ScanTable {
    pub fn new(src: &[u8; 64], permutation: &[u8; 64]) -> Self {
        let mut permutated = [0u8; 64];
        for i in 0..64 {
            permutated[i] = permutation[src[i] as usize];
        }

        let mut raster_end = [0u8; 64];
        let mut end: i32 = -1;
        for i in 0..64 {
            let j = permutated[i] as i32;
            if j > end {
                end = j;
            }
            raster_end[i] = end as u8;
        }

        Self {
            scantable: *src,
            permutated,
            raster_end,
        }
    }

    /// Scan table with the identity permutation (no IDCT reordering).
    pub fn from_scan(src: &[u8; 64]) -> Self {
        let identity = std::array::from_fn(|i| i as u8);
        Self::new(src, &identity)
    }
}

impl Default for ScanTable {
    fn default() -> Self {
        Self::from_scan(&ZIGZAG_DIRECT)
    }
}

// ─── Quantizer tables ────────────────────────────────────────────────

/// MPEG-2 non-linear quantizer scale, indexed by the coded qscale code.
pub const MPEG2_NON_LINEAR_QSCALE: [u8; 32] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 14, 16, 18, 20, 22, 24, 28, 32, 36, 40, 44, 48, 52, 56,
    64, 72, 80, 88, 96, 104, 112,
];

/// Default intra weighting matrix shared by MPEG-1/2 and MPEG-4 Part 2.
pub const DEFAULT_INTRA_MATRIX: [u16; 64] = [
    8, 16, 19, 22, 26, 27, 29, 34, 16, 16, 22, 24, 27, 29, 34, 37, 19, 22, 26, 27, 29, 34, 34,
    38, 22, 22, 26, 27, 29, 34, 37, 40, 22, 26, 27, 29, 32, 35, 40, 48, 26, 27, 29, 32, 35, 40,
    48, 58, 26, 27, 29, 34, 38, 46, 56, 69, 27, 29, 35, 38, 46, 56, 69, 83,
];

/// Default inter matrix: flat 16.
pub const DEFAULT_NON_INTRA_MATRIX: [u16; 64] = [16; 64];

// ─── Dequantizer ─────────────────────────────────────────────────────

/// Per-picture inverse-quantization state.
///
/// Matrices are stored in permutated order so kernels index them with the
/// same `j` they index the block with.
#[derive(Clone, Debug)]
pub struct Dequantizer {
    pub intra_matrix: [u16; 64],
    pub inter_matrix: [u16; 64],
    pub intra_scantable: ScanTable,
    pub inter_scantable: ScanTable,
    pub y_dc_scale: i32,
    pub c_dc_scale: i32,
    /// MPEG-2: use the non-linear qscale mapping.
    pub q_scale_type: bool,
    /// MPEG-2: alternate scan in use, so every position may be coded.
    pub alternate_scan: bool,
    /// H.263 advanced intra coding: DC is left alone and no rounding
    /// offset is applied to intra blocks.
    pub h263_aic: bool,
    /// AC prediction in use, so every position may be coded.
    pub ac_pred: bool,
    /// Select the bit-exact MPEG-2 intra kernel.
    pub bitexact: bool,
}

impl Default for Dequantizer {
    fn default() -> Self {
        Self {
            intra_matrix: DEFAULT_INTRA_MATRIX,
            inter_matrix: DEFAULT_NON_INTRA_MATRIX,
            intra_scantable: ScanTable::default(),
            inter_scantable: ScanTable::default(),
            y_dc_scale: 8,
            c_dc_scale: 8,
            q_scale_type: false,
            alternate_scan: false,
            h263_aic: false,
            ac_pred: false,
            bitexact: false,
        }
    }
}

impl Dequantizer {
    fn dc_scale(&self, n: usize) -> i32 {
        if n < 4 {
            self.y_dc_scale
        } else {
            self.c_dc_scale
        }
    }

    /// Map the coded qscale to the MPEG-2 effective scale.
    fn mpeg2_qscale(&self, qscale: i32) -> i32 {
        if self.q_scale_type {
            MPEG2_NON_LINEAR_QSCALE[qscale as usize] as i32
        } else {
            qscale << 1
        }
    }

    pub fn mpeg1_intra(&self, block: &mut [i16; 64], n: usize, qscale: i32, last_index: i32) {
        block[0] = (block[0] as i32 * self.dc_scale(n)) as i16;
        for i in 1..=last_index.max(0) as usize {
            let j = self.intra_scantable.permutated[i] as usize;
            let mut level = block[j] as i32;
            if level != 0 {
                let neg = level < 0;
                if neg {
                    level = -level;
                }
                level = (level * qscale * self.intra_matrix[j] as i32) >> 3;
                level = (level - 1) | 1;
                block[j] = (if neg { -level } else { level }) as i16;
            }
        }
    }

    pub fn mpeg1_inter(&self, block: &mut [i16; 64], qscale: i32, last_index: i32) {
        if last_index < 0 {
            return;
        }
        for i in 0..=last_index as usize {
            let j = self.intra_scantable.permutated[i] as usize;
            let mut level = block[j] as i32;
            if level != 0 {
                let neg = level < 0;
                if neg {
                    level = -level;
                }
                level = (((level << 1) + 1) * qscale * self.inter_matrix[j] as i32) >> 4;
                level = (level - 1) | 1;
                block[j] = (if neg { -level } else { level }) as i16;
            }
        }
    }

    pub fn mpeg2_intra(&self, block: &mut [i16; 64], n: usize, qscale: i32, last_index: i32) {
        if self.bitexact {
            self.mpeg2_intra_bitexact(block, n, qscale, last_index);
            return;
        }
        let qscale = self.mpeg2_qscale(qscale);
        let n_coeffs = if self.alternate_scan { 63 } else { last_index.max(0) as usize };

        block[0] = (block[0] as i32 * self.dc_scale(n)) as i16;
        for i in 1..=n_coeffs {
            let j = self.intra_scantable.permutated[i] as usize;
            let mut level = block[j] as i32;
            if level != 0 {
                let neg = level < 0;
                if neg {
                    level = -level;
                }
                level = (level * qscale * self.intra_matrix[j] as i32) >> 4;
                block[j] = (if neg { -level } else { level }) as i16;
            }
        }
    }

    /// Bit-exact variant: tracks the coefficient sum and flips the parity
    /// of position 63 (mismatch control applied to intra blocks too).
    fn mpeg2_intra_bitexact(&self, block: &mut [i16; 64], n: usize, qscale: i32, last_index: i32) {
        let qscale = self.mpeg2_qscale(qscale);
        let n_coeffs = if self.alternate_scan { 63 } else { last_index.max(0) as usize };
        let mut sum: i32 = -1;

        block[0] = (block[0] as i32 * self.dc_scale(n)) as i16;
        sum += block[0] as i32;
        for i in 1..=n_coeffs {
            let j = self.intra_scantable.permutated[i] as usize;
            let mut level = block[j] as i32;
            if level != 0 {
                let neg = level < 0;
                if neg {
                    level = -level;
                }
                level = (level * qscale * self.intra_matrix[j] as i32) >> 4;
                if neg {
                    level = -level;
                }
                block[j] = level as i16;
                sum += level;
            }
        }
        block[63] ^= (sum & 1) as i16;
    }

    pub fn mpeg2_inter(&self, block: &mut [i16; 64], qscale: i32, last_index: i32) {
        let qscale = self.mpeg2_qscale(qscale);
        // Empty range when the block has no coefficients; the parity
        // fixup below still runs.
        let n_coeffs: i32 = if self.alternate_scan { 63 } else { last_index };
        let mut sum: i32 = -1;

        for i in 0..=n_coeffs {
            let j = self.intra_scantable.permutated[i as usize] as usize;
            let mut level = block[j] as i32;
            if level != 0 {
                let neg = level < 0;
                if neg {
                    level = -level;
                }
                level = (((level << 1) + 1) * qscale * self.inter_matrix[j] as i32) >> 5;
                if neg {
                    level = -level;
                }
                block[j] = level as i16;
                sum += level;
            }
        }
        block[63] ^= (sum & 1) as i16;
    }

    pub fn h263_intra(&self, block: &mut [i16; 64], n: usize, qscale: i32, last_index: i32) {
        let qmul = qscale << 1;
        let qadd = if self.h263_aic {
            0
        } else {
            block[0] = (block[0] as i32 * self.dc_scale(n)) as i16;
            (qscale - 1) | 1
        };
        let n_coeffs = if self.ac_pred {
            63
        } else {
            self.intra_scantable.raster_end[last_index.max(0) as usize] as usize
        };

        // Raster order: the block is walked in memory order up to the last
        // position the scan could have touched.
        for i in 1..=n_coeffs {
            let level = block[i] as i32;
            if level != 0 {
                let level = if level < 0 {
                    level * qmul - qadd
                } else {
                    level * qmul + qadd
                };
                block[i] = level as i16;
            }
        }
    }

    pub fn h263_inter(&self, block: &mut [i16; 64], qscale: i32, last_index: i32) {
        if last_index < 0 {
            return;
        }
        let qmul = qscale << 1;
        let qadd = (qscale - 1) | 1;
        let n_coeffs = self.inter_scantable.raster_end[last_index as usize] as usize;

        for i in 0..=n_coeffs {
            let level = block[i] as i32;
            if level != 0 {
                let level = if level < 0 {
                    level * qmul - qadd
                } else {
                    level * qmul + qadd
                };
                block[i] = level as i16;
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
