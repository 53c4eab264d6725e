//! Fixed-width shape/stride metadata, shared by every multiply invocation.

/// Maximum supported transform rank. The packed table is always this wide;
/// unused slots are zero.
pub const STRIDE_TABLE_WIDTH: usize = 16;

/// One flat table of three rows: per-dimension extents, input strides and
/// output strides, with the batch (outermost) distances placed immediately
/// after the last populated stride entries.
///
/// Built once per plan and treated as read-only afterwards. The `wgpu`
/// backend uploads the same words as a single device copy; see
/// `backend::wgpu::params::stride_table_words`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrideTable {
    rank: usize,
    words: [usize; 3 * STRIDE_TABLE_WIDTH],
}

impl StrideTable {
    /// Assemble the table. Mismatched vector lengths are a planner bug and
    /// abort; rank beyond the fixed width is likewise unsupported.
    pub fn pack(
        lengths: &[usize],
        in_strides: &[usize],
        out_strides: &[usize],
        in_dist: usize,
        out_dist: usize,
    ) -> StrideTable {
        assert_eq!(
            lengths.len(),
            in_strides.len(),
            "shape and input stride ranks differ"
        );
        assert_eq!(
            lengths.len(),
            out_strides.len(),
            "shape and output stride ranks differ"
        );
        let rank = lengths.len();
        // The batch distances occupy one slot past the strides.
        assert!(
            rank < STRIDE_TABLE_WIDTH,
            "rank {rank} exceeds the stride table width"
        );

        let mut words = [0usize; 3 * STRIDE_TABLE_WIDTH];
        for d in 0..rank {
            words[d] = lengths[d];
            words[STRIDE_TABLE_WIDTH + d] = in_strides[d];
            words[2 * STRIDE_TABLE_WIDTH + d] = out_strides[d];
        }
        words[STRIDE_TABLE_WIDTH + rank] = in_dist;
        words[2 * STRIDE_TABLE_WIDTH + rank] = out_dist;

        StrideTable { rank, words }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Extent of dimension `d`.
    pub fn length(&self, d: usize) -> usize {
        self.words[d]
    }

    /// Input stride of dimension `d`; `d == rank` is the batch distance.
    pub fn stride_in(&self, d: usize) -> usize {
        self.words[STRIDE_TABLE_WIDTH + d]
    }

    /// Output stride of dimension `d`; `d == rank` is the batch distance.
    pub fn stride_out(&self, d: usize) -> usize {
        self.words[2 * STRIDE_TABLE_WIDTH + d]
    }

    /// All `3 * STRIDE_TABLE_WIDTH` words, row-major.
    pub fn words(&self) -> &[usize; 3 * STRIDE_TABLE_WIDTH] {
        &self.words
    }

    /// Resolve a batch counter (work-item index divided by the innermost
    /// element count) into input/output offsets, most-significant dimension
    /// first. Dimension 0 is the transform axis and is handled by the caller
    /// through `stride_in(0)`/`stride_out(0)`.
    pub fn batch_offsets(&self, mut counter: usize) -> (usize, usize) {
        let mut i_off = 0usize;
        let mut o_off = 0usize;
        for d in (2..=self.rank).rev() {
            let current: usize = (1..d).map(|j| self.length(j)).product();
            i_off += (counter / current) * self.stride_in(d);
            o_off += (counter / current) * self.stride_out(d);
            counter %= current;
        }
        i_off += counter * self.stride_in(1);
        o_off += counter * self.stride_out(1);
        (i_off, o_off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rows_and_batch_distances() {
        let table = StrideTable::pack(&[8, 3], &[1, 8], &[2, 16], 24, 48);
        assert_eq!(table.rank(), 2);
        assert_eq!(table.length(0), 8);
        assert_eq!(table.length(1), 3);
        assert_eq!(table.stride_in(0), 1);
        assert_eq!(table.stride_in(1), 8);
        assert_eq!(table.stride_in(2), 24, "in dist follows the last stride");
        assert_eq!(table.stride_out(2), 48, "out dist follows the last stride");
        // Everything past the distances stays zero.
        for d in 3..STRIDE_TABLE_WIDTH {
            assert_eq!(table.stride_in(d), 0);
            assert_eq!(table.stride_out(d), 0);
        }
        for d in 2..STRIDE_TABLE_WIDTH {
            assert_eq!(table.length(d), 0);
        }
    }

    #[test]
    fn rank_zero_is_all_distances() {
        let table = StrideTable::pack(&[], &[], &[], 5, 7);
        assert_eq!(table.rank(), 0);
        assert_eq!(table.stride_in(0), 5);
        assert_eq!(table.stride_out(0), 7);
        assert!(table.words()[..STRIDE_TABLE_WIDTH].iter().all(|&w| w == 0));
    }

    #[test]
    fn rank_one_batch_offsets_use_distance_slot() {
        let table = StrideTable::pack(&[13], &[1], &[1], 13, 20);
        assert_eq!(table.batch_offsets(0), (0, 0));
        assert_eq!(table.batch_offsets(2), (26, 40));
    }

    #[test]
    fn rank_three_batch_offsets_decompose_msd_first() {
        // lengths[1] = 4, lengths[2] = 5; counter covers 4*5 inner batches,
        // then the batch distance takes over.
        let table = StrideTable::pack(&[8, 4, 5], &[1, 10, 40], &[1, 12, 50], 200, 240);
        // counter = 7 -> dim2 coord 1 (7/4), dim1 coord 3 (7%4)
        assert_eq!(table.batch_offsets(7), (40 + 30, 50 + 36));
        // counter = 20 -> dim3 (batch) coord 1, remainder 0
        assert_eq!(table.batch_offsets(20), (200, 240));
        assert_eq!(table.batch_offsets(27), (200 + 40 + 30, 240 + 50 + 36));
    }

    #[test]
    #[should_panic(expected = "stride ranks differ")]
    fn mismatched_ranks_abort() {
        let _ = StrideTable::pack(&[4, 2], &[1], &[1, 4], 8, 8);
    }
}
