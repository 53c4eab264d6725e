use anyhow::{ensure, Result};
use bytemuck::{Pod, Zeroable};

use crate::kargs::{StrideTable, STRIDE_TABLE_WIDTH};

/// Words in the device copy of a stride table: three rows of fixed width.
pub const DEVICE_STRIDE_WORDS: usize = 3 * STRIDE_TABLE_WIDTH;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ChirpParams {
    pub n: u32,
    pub m: u32,
    pub twl: u32,
    pub dir: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MultiplyParams {
    pub numof: u32,
    pub total: u32,
    pub n: u32,
    pub m: u32,
    pub rank: u32,
    pub scheme: u32,
    pub dir: i32,
    pub _pad: u32,
}

/// Flatten a host stride table into the device word layout. The device ABI
/// is 32-bit; extents or strides beyond `u32` cannot be launched.
pub fn stride_table_words(table: &StrideTable) -> Result<[u32; DEVICE_STRIDE_WORDS]> {
    let mut words = [0u32; DEVICE_STRIDE_WORDS];
    for (slot, &word) in words.iter_mut().zip(table.words().iter()) {
        ensure!(
            word <= u32::MAX as usize,
            "stride table entry {word} exceeds the 32-bit device ABI"
        );
        *slot = word as u32;
    }
    Ok(words)
}
