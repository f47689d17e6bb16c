//! 像素与原始字节访问
//!
//! 越界的像素访问是空操作：读返回 0，写被丢弃。会话关闭后同样如此。
//! 原始字节访问必须落在单个块内，否则直接拒绝。

use super::DiskVideo;
use crate::error::{Error, ErrorKind, Result};
use crate::status::{Status, StatusSink};
use crate::store::BackingStore;
use crate::types::SessionFlags;
use byteorder::{BigEndian, ByteOrder};

impl<S: BackingStore, T: StatusSink> DiskVideo<S, T> {
    /// 读取 (col, row) 处的像素
    ///
    /// # 错误
    ///
    /// 只有后备存储 I/O 失败会返回错误，此后会话不应继续使用。
    pub fn read_pixel(&mut self, col: u32, row: u32) -> Result<u8> {
        if !self.active {
            return Ok(0);
        }
        self.tick(row, false);

        let Some(offset) = self.pixel_offset(col, row) else {
            return Ok(0);
        };
        let (block, sub) = self.split(offset);
        let id = self.locate(block)?;
        Ok(self.pool.pixels(id)[sub])
    }

    /// 写入 (col, row) 处的像素
    ///
    /// 超出位深的高位被截断；值不变时不标脏。
    pub fn write_pixel(&mut self, col: u32, row: u32, value: u8) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.tick(row, true);

        let Some(offset) = self.pixel_offset(col, row) else {
            return Ok(());
        };
        let (block, sub) = self.split(offset);
        let id = self.locate(block)?;
        self.pool.store_pixel(id, sub, value & self.shift.mask());
        Ok(())
    }

    /// 从逻辑偏移 `offset` 读取 `buf.len()` 字节
    ///
    /// # 错误
    ///
    /// - `InvalidState` - 会话已关闭
    /// - `InvalidInput` - 跨越块边界或超出图像容量
    pub fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (block, sub) = self.raw_range(offset, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        let id = self.locate(block)?;
        buf.copy_from_slice(&self.pool.pixels(id)[sub..sub + buf.len()]);
        Ok(())
    }

    /// 向逻辑偏移 `offset` 写入 `data`
    ///
    /// 与 [`read_bytes`](Self::read_bytes) 的限制相同。块总是被标脏。
    pub fn write_bytes(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let (block, sub) = self.raw_range(offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }
        let id = self.locate(block)?;
        self.pool.store_bytes(id, sub, data, self.shift.mask());
        Ok(())
    }

    /// 读取 Targa 像素，返回 `[r, g, b]`
    pub fn read_rgb(&mut self, col: u32, row: u32) -> Result<[u8; 3]> {
        self.require(SessionFlags::TARGA)?;
        let Some(base) = col.checked_mul(3) else {
            return Ok([0; 3]);
        };
        let blue = self.read_pixel(base, row)?;
        let green = self.read_pixel(base.saturating_add(1), row)?;
        let red = self.read_pixel(base.saturating_add(2), row)?;
        Ok([red, green, blue])
    }

    /// 写入 Targa 像素，按蓝、绿、红顺序存放
    pub fn write_rgb(&mut self, col: u32, row: u32, rgb: [u8; 3]) -> Result<()> {
        self.require(SessionFlags::TARGA)?;
        let Some(base) = col.checked_mul(3) else {
            return Ok(());
        };
        let [red, green, blue] = rgb;
        self.write_pixel(base, row, blue)?;
        self.write_pixel(base.saturating_add(1), row, green)?;
        self.write_pixel(base.saturating_add(2), row, red)
    }

    /// 读取 16 位势能值
    ///
    /// 高字节在 `row` 行，低字节在 `row + height` 行。
    pub fn read_potential(&mut self, col: u32, row: u32) -> Result<u16> {
        self.require(SessionFlags::POTENTIAL)?;
        let height = self.geometry.row_count / 2;
        if row >= height {
            return Ok(0);
        }
        let bytes = [self.read_pixel(col, row)?, self.read_pixel(col, row + height)?];
        Ok(BigEndian::read_u16(&bytes))
    }

    /// 写入 16 位势能值
    pub fn write_potential(&mut self, col: u32, row: u32, value: u16) -> Result<()> {
        self.require(SessionFlags::POTENTIAL)?;
        let height = self.geometry.row_count / 2;
        if row >= height {
            return Ok(());
        }
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.write_pixel(col, row, bytes[0])?;
        self.write_pixel(col, row + height, bytes[1])
    }

    fn require(&self, mode: SessionFlags) -> Result<()> {
        if self.flags.contains(mode) {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::InvalidState, "operation not available in this session mode"))
        }
    }

    /// 每次像素访问递减计数，到零时报告当前行
    fn tick(&mut self, row: u32, writing: bool) {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return;
        }
        self.countdown = self.config.status_interval;

        let height = self.geometry.row_count / 2;
        let line = if self.flags.contains(SessionFlags::POTENTIAL) && row >= height {
            row - height
        } else {
            row
        };
        let status = if writing {
            Status::Writing { line }
        } else {
            Status::Reading { line }
        };
        self.status.status(&status);
    }

    /// 像素的线性偏移，越界返回 `None`
    fn pixel_offset(&mut self, col: u32, row: u32) -> Option<u64> {
        if row >= self.geometry.row_count || col >= self.geometry.row_size {
            return None;
        }
        let start = match self.current_row {
            Some((current, start)) if current == row => start,
            _ => {
                let start = row as u64 * self.geometry.row_size as u64;
                self.current_row = Some((row, start));
                start
            }
        };
        Some(start + col as u64)
    }

    /// 偏移拆成块起点和块内位置
    fn split(&self, offset: u64) -> (u64, usize) {
        let mask = self.config.block_len as u64 - 1;
        (offset & !mask, (offset & mask) as usize)
    }

    fn raw_range(&self, offset: u64, len: usize) -> Result<(u64, usize)> {
        self.ensure_active()?;
        let (block, sub) = self.split(offset);
        if sub + len > self.config.block_len {
            return Err(Error::new(ErrorKind::InvalidInput, "raw access crosses a block boundary"));
        }
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.capacity => Ok((block, sub)),
            _ => Err(Error::new(ErrorKind::InvalidInput, "raw access beyond image")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::status::{NoStatus, Status};
    use crate::store::mock::CountingStore;
    use crate::store::BackingStore;
    use crate::types::{DiskVideoConfig, OpenRequest};
    use crate::video::fixtures::{config, Recorder};
    use crate::video::DiskVideo;

    fn open(slots: usize, colors: u32) -> DiskVideo<CountingStore> {
        DiskVideo::open(CountingStore::new(4), config(4, slots), 10, 10, colors).unwrap()
    }

    #[test]
    fn test_out_of_bounds_pixels() {
        let mut video = open(2, 256);
        assert_eq!(video.read_pixel(10, 0).unwrap(), 0);
        assert_eq!(video.read_pixel(0, 10).unwrap(), 0);
        video.write_pixel(10, 0, 5).unwrap();
        video.write_pixel(u32::MAX, u32::MAX, 5).unwrap();

        // 越界访问不触碰缓存
        assert_eq!(video.stats().misses, 0);
        assert_eq!(video.dirty_count(), 0);
        assert_eq!(video.read_pixel(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_write_if_changed() {
        let mut video = open(2, 256);
        video.write_pixel(4, 4, 0).unwrap();
        assert_eq!(video.dirty_count(), 0);

        video.write_pixel(4, 4, 5).unwrap();
        assert_eq!(video.dirty_count(), 1);
        video.flush().unwrap();

        video.write_pixel(4, 4, 5).unwrap();
        assert_eq!(video.dirty_count(), 0);
    }

    #[test]
    fn test_raw_bytes_round_trip() {
        let mut video = open(2, 256);
        video.write_bytes(8, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        video.read_bytes(8, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        // 原始写与像素访问看到同一份数据
        assert_eq!(video.read_pixel(9, 0).unwrap(), 2);

        // 写入相同内容仍然标脏
        video.flush().unwrap();
        video.write_bytes(8, &[1, 2]).unwrap();
        assert_eq!(video.dirty_count(), 1);
    }

    #[test]
    fn test_raw_rejects_block_crossing() {
        let mut video = open(2, 256);
        let mut buf = [0u8; 4];
        assert_eq!(video.read_bytes(2, &mut buf).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(video.write_bytes(3, &[1, 2]).unwrap_err().kind(), ErrorKind::InvalidInput);

        // 被拒绝的写没有任何部分生效
        let mut one = [0u8; 1];
        video.read_bytes(3, &mut one).unwrap();
        assert_eq!(one, [0]);
        assert_eq!(video.dirty_count(), 0);
    }

    #[test]
    fn test_raw_rejects_beyond_image() {
        let mut video = open(2, 256);
        let mut one = [0u8; 1];
        assert_eq!(video.read_bytes(100, &mut one).unwrap_err().kind(), ErrorKind::InvalidInput);
        assert!(video.write_bytes(u64::MAX, &[1]).is_err());
        video.read_bytes(99, &mut one).unwrap();
    }

    #[test]
    fn test_one_bit_pixels_pack_into_store() {
        // 2 色：8 个像素一个字节，一个存储块装 8 个缓存块
        let mut video = DiskVideo::open(CountingStore::new(8), config(8, 1), 16, 2, 2).unwrap();
        assert_eq!(video.pixel_shift().get(), 3);
        assert_eq!(video.store().capacity(), 1);

        for row in 0..2 {
            for col in 0..16 {
                video.write_pixel(col, row, ((col + row) % 2) as u8).unwrap();
            }
        }
        video.flush().unwrap();
        assert_eq!(video.store().bytes(), &[0x55, 0x55, 0xAA, 0xAA, 0, 0, 0, 0]);

        for row in 0..2 {
            for col in 0..16 {
                assert_eq!(video.read_pixel(col, row).unwrap(), ((col + row) % 2) as u8);
            }
        }
        assert!(video.stream_stats().merge_reads > 0);
    }

    #[test]
    fn test_four_bit_pixels_survive_eviction() {
        let mut video = open(1, 16);
        for i in 0..100u32 {
            video.write_pixel(i % 10, i / 10, (i % 16) as u8).unwrap();
        }
        for i in 0..100u32 {
            assert_eq!(video.read_pixel(i % 10, i / 10).unwrap(), (i % 16) as u8, "pixel {}", i);
        }
    }

    #[test]
    fn test_values_masked_to_depth() {
        let mut video = open(2, 16);
        video.write_pixel(0, 0, 0x1F).unwrap();
        assert_eq!(video.read_pixel(0, 0).unwrap(), 0x0F);

        video.write_bytes(4, &[0xFF, 0x02]).unwrap();
        let mut buf = [0u8; 2];
        video.read_bytes(4, &mut buf).unwrap();
        assert_eq!(buf, [0x0F, 0x02]);
    }

    #[test]
    fn test_status_every_interval() {
        let mut sink = Recorder::default();
        let cfg = DiskVideoConfig { status_interval: 3, zero_fill: false, ..config(4, 2) };
        {
            let mut video = DiskVideo::open_with_status(
                CountingStore::new(4),
                cfg,
                OpenRequest::indexed(10, 10, 256),
                &mut sink,
            )
            .unwrap();
            for col in 0..7 {
                video.read_pixel(col, 2).unwrap();
            }
            video.write_pixel(0, 4, 1).unwrap();
            video.write_pixel(1, 4, 1).unwrap();
        }
        assert_eq!(
            sink.messages,
            [
                Status::Reading { line: 2 },
                Status::Reading { line: 2 },
                Status::Writing { line: 4 },
            ]
        );
    }

    #[test]
    fn test_potential_round_trip() {
        let mut sink = Recorder::default();
        let cfg = DiskVideoConfig { status_interval: 1, ..config(4, 2) };
        {
            let mut video = DiskVideo::open_with_status(
                CountingStore::new(4),
                cfg,
                OpenRequest::potential(4, 3),
                &mut sink,
            )
            .unwrap();
            assert_eq!(video.geometry().row_count, 6);

            video.write_potential(1, 2, 0xABCD).unwrap();
            assert_eq!(video.read_potential(1, 2).unwrap(), 0xABCD);
            assert_eq!(video.read_pixel(1, 2).unwrap(), 0xAB);
            assert_eq!(video.read_pixel(1, 5).unwrap(), 0xCD);

            // 低字节平面之外的行不可寻址
            assert_eq!(video.read_potential(1, 3).unwrap(), 0);
            video.write_potential(0, 3, 0xFFFF).unwrap();
            assert_eq!(video.read_pixel(0, 3).unwrap(), 0);
        }
        // 低字节平面报告的是图像行号
        assert_eq!(sink.messages[0], Status::Clearing);
        assert_eq!(sink.messages[1..3], [Status::Writing { line: 2 }, Status::Writing { line: 2 }]);
    }

    #[test]
    fn test_targa_rgb() {
        let mut video = DiskVideo::open_with_status(
            CountingStore::new(4),
            config(4, 2),
            OpenRequest::targa(4, 2),
            NoStatus,
        )
        .unwrap();
        video.write_rgb(2, 1, [10, 20, 30]).unwrap();
        assert_eq!(video.read_rgb(2, 1).unwrap(), [10, 20, 30]);
        assert_eq!(video.read_pixel(6, 1).unwrap(), 30);
        assert_eq!(video.read_rgb(4, 0).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn test_mode_mismatch() {
        let mut video = open(2, 256);
        assert_eq!(video.read_rgb(0, 0).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(video.write_potential(0, 0, 1).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_targa_file_keeps_header() {
        use crate::store::FileStore;
        use std::fs::{self, OpenOptions};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fract.tga");
        fs::write(&path, b"HEADER").unwrap();
        let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();

        let mut video = DiskVideo::open_with_status(
            FileStore::with_header(file, 4, 6),
            config(4, 2),
            OpenRequest::targa(2, 2),
            NoStatus,
        )
        .unwrap();
        video.write_rgb(0, 0, [1, 2, 3]).unwrap();
        video.write_rgb(1, 1, [4, 5, 6]).unwrap();
        video.close().unwrap();
        drop(video);

        let contents = fs::read(&path).unwrap();
        assert_eq!(&contents[..6], b"HEADER");
        assert_eq!(&contents[6..], &[3, 2, 1, 0, 0, 0, 0, 0, 0, 6, 5, 4]);
    }
}
