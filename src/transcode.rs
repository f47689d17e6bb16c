//! 像素深度转码
//!
//! 缓存中每个像素占一个字节；后备存储中按 `pixelshift` 把 `2^k` 个像素
//! 打包进一个字节，像素 0 占最高位。
//!
//! | pixelshift | 每字节像素数 | 位深 |
//! |------------|--------------|------|
//! | 0          | 1            | 8    |
//! | 1          | 2            | 4    |
//! | 2          | 4            | 2    |
//! | 3          | 8            | 1    |

use crate::consts::MAX_PIXEL_SHIFT;
use crate::error::{Error, ErrorKind, Result};

/// 每个后备存储字节打包像素数的 log2
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PixelShift(u8);

impl PixelShift {
    /// 每像素 8 位，不打包
    pub const BYTE: Self = Self(0);

    /// 创建 pixelshift（0..=3）
    pub fn new(shift: u8) -> Result<Self> {
        if shift > MAX_PIXEL_SHIFT {
            return Err(Error::new(ErrorKind::InvalidInput, "pixelshift must be in 0..=3"));
        }
        Ok(Self(shift))
    }

    /// 根据颜色数选择 pixelshift
    ///
    /// 从 1 位开始，位深每次翻倍直到能容纳 `colors` 种颜色；
    /// 超过 256 色时截断为 8 位。
    pub fn for_colors(colors: u32) -> Self {
        let mut shift = MAX_PIXEL_SHIFT;
        let mut reach: u64 = 2;
        while reach < colors as u64 && shift > 0 {
            reach *= reach;
            shift -= 1;
        }
        Self(shift)
    }

    /// 原始值
    pub const fn get(self) -> u8 {
        self.0
    }

    /// 每个后备字节的像素数
    pub const fn pixels_per_byte(self) -> usize {
        1 << self.0
    }

    /// 每像素位数
    pub const fn bits_per_pixel(self) -> u32 {
        8 >> self.0
    }

    /// 单个像素值的有效位掩码
    pub const fn mask(self) -> u8 {
        ((1u16 << self.bits_per_pixel()) - 1) as u8
    }

    /// `pixels` 个像素打包后的字节数
    pub const fn packed_len(self, pixels: usize) -> usize {
        pixels >> self.0
    }

    /// 缓存偏移换算为后备存储中的字节偏移
    pub const fn packed_offset(self, offset: u64) -> u64 {
        offset >> self.0
    }
}

/// 解包：后备字节 -> 每像素一字节
///
/// `pixels.len()` 必须等于 `packed.len() << shift`
pub fn unpack(shift: PixelShift, packed: &[u8], pixels: &mut [u8]) {
    debug_assert_eq!(pixels.len(), packed.len() << shift.get());

    if shift == PixelShift::BYTE {
        pixels.copy_from_slice(packed);
        return;
    }

    let bits = shift.bits_per_pixel();
    let mask = shift.mask();
    for (&byte, out) in packed.iter().zip(pixels.chunks_exact_mut(shift.pixels_per_byte())) {
        for (i, px) in out.iter_mut().enumerate() {
            let pos = 8 - bits * (i as u32 + 1);
            *px = (byte >> pos) & mask;
        }
    }
}

/// 打包：每像素一字节 -> 后备字节
///
/// 超出位深的像素值被截断。`packed.len()` 必须等于 `pixels.len() >> shift`
pub fn pack(shift: PixelShift, pixels: &[u8], packed: &mut [u8]) {
    debug_assert_eq!(packed.len(), pixels.len() >> shift.get());

    if shift == PixelShift::BYTE {
        packed.copy_from_slice(pixels);
        return;
    }

    let bits = shift.bits_per_pixel();
    let mask = shift.mask();
    for (out, chunk) in packed.iter_mut().zip(pixels.chunks_exact(shift.pixels_per_byte())) {
        *out = chunk
            .iter()
            .fold(0u32, |acc, &px| (acc << bits) | (px & mask) as u32) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn test_shift_for_colors() {
        assert_eq!(PixelShift::for_colors(2).get(), 3);
        assert_eq!(PixelShift::for_colors(4).get(), 2);
        assert_eq!(PixelShift::for_colors(16).get(), 1);
        assert_eq!(PixelShift::for_colors(256).get(), 0);
        // 非 2 的幂向上取整
        assert_eq!(PixelShift::for_colors(3).get(), 2);
        assert_eq!(PixelShift::for_colors(17).get(), 0);
        // 超过 256 色截断为 8 位
        assert_eq!(PixelShift::for_colors(65536).get(), 0);
        assert_eq!(PixelShift::for_colors(0).get(), 3);
    }

    #[test]
    fn test_shift_geometry() {
        let s = PixelShift::new(2).unwrap();
        assert_eq!(s.pixels_per_byte(), 4);
        assert_eq!(s.bits_per_pixel(), 2);
        assert_eq!(s.mask(), 0x03);
        assert_eq!(s.packed_len(2048), 512);
        assert_eq!(s.packed_offset(4096), 1024);
        assert_eq!(PixelShift::BYTE.mask(), 0xff);
        assert!(PixelShift::new(4).is_err());
    }

    #[test]
    fn test_unpack_high_bits_first() {
        let mut px = [0u8; 8];
        unpack(PixelShift::new(3).unwrap(), &[0b1010_0001], &mut px);
        assert_eq!(px, [1, 0, 1, 0, 0, 0, 0, 1]);

        let mut px = [0u8; 4];
        unpack(PixelShift::new(2).unwrap(), &[0b11_01_00_10], &mut px);
        assert_eq!(px, [3, 1, 0, 2]);

        let mut px = [0u8; 2];
        unpack(PixelShift::new(1).unwrap(), &[0xA5], &mut px);
        assert_eq!(px, [0xA, 0x5]);
    }

    #[test]
    fn test_round_trip_full_block() {
        const BLOCK: usize = 2048;
        for k in 0..=MAX_PIXEL_SHIFT {
            let shift = PixelShift::new(k).unwrap();
            let values: Vec<u8> = (0..BLOCK)
                .map(|i| (i as u8).wrapping_mul(37) & shift.mask())
                .collect();
            let mut packed = vec![0u8; shift.packed_len(BLOCK)];
            pack(shift, &values, &mut packed);
            let mut back = vec![0u8; BLOCK];
            unpack(shift, &packed, &mut back);
            assert_eq!(back, values, "pixelshift {}", k);
        }
    }

    #[test]
    fn test_pack_truncates_wide_values() {
        let shift = PixelShift::new(1).unwrap();
        let mut packed = [0u8; 1];
        pack(shift, &[0x1F, 0xF2], &mut packed);
        assert_eq!(packed[0], 0xF2);

        let mut back = [0u8; 2];
        unpack(shift, &packed, &mut back);
        assert_eq!(back, [0x0F, 0x02]);
    }
}
