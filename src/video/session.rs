//! 会话的打开、关闭与访问器

use super::DiskVideo;
use crate::cache::{CacheStats, SlotPool};
use crate::consts::PLACEHOLDER_BASE;
use crate::error::{Error, ErrorKind, Result};
use crate::status::{InitControl, NoStatus, Status, StatusSink};
use crate::store::{BackingStore, BlockStream, StreamStats};
use crate::transcode::PixelShift;
use crate::types::{DiskVideoConfig, Geometry, OpenRequest, SessionFlags};
use alloc::vec;

/// 打开前根据请求算出的布局
struct Layout {
    geometry: Geometry,
    shift: PixelShift,
    /// 块对齐的逻辑容量
    capacity: u64,
    /// 后备存储需要的块数
    store_blocks: u64,
}

impl Layout {
    fn new<S: BackingStore>(
        store: &S,
        config: &DiskVideoConfig,
        request: &OpenRequest,
    ) -> Result<Self> {
        config.validate()?;
        let geometry = request.geometry()?;
        let shift = request.pixel_shift();

        if config.block_len < shift.pixels_per_byte() {
            return Err(Error::new(ErrorKind::InvalidInput, "block too small for pixel depth"));
        }
        if store.block_len() != config.block_len {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "store block length differs from configuration",
            ));
        }

        let block_len = config.block_len as u64;
        let capacity = geometry.image_len().div_ceil(block_len) * block_len;
        if capacity >= PLACEHOLDER_BASE {
            return Err(Error::new(ErrorKind::InvalidInput, "image too large for disk video"));
        }
        let store_blocks = shift.packed_offset(capacity).div_ceil(block_len);

        Ok(Self { geometry, shift, capacity, store_blocks })
    }
}

/// 打开失败：释放存储后原样返回错误
fn abandon<S: BackingStore>(store: &mut S, err: Error) -> Error {
    log::warn!("[DISKVID] open failed: {}", err);
    if let Err(e) = store.release() {
        log::error!("[DISKVID] failed to release store: {}", e);
    }
    err
}

impl<S: BackingStore> DiskVideo<S, NoStatus> {
    /// 打开调色板索引图像会话
    ///
    /// # 参数
    ///
    /// * `store` - 后备存储，块长度必须等于 `config.block_len`
    /// * `config` - 会话配置
    /// * `row_size` - 每行像素数
    /// * `row_count` - 行数
    /// * `colors` - 颜色数，决定后备存储的位深
    ///
    /// # 错误
    ///
    /// - `InvalidInput` - 配置或尺寸非法
    /// - `OutOfMemory` - 缓存池低于最小预算
    /// - `NoSpace` - 后备存储容量不足
    pub fn open(
        store: S,
        config: DiskVideoConfig,
        row_size: u32,
        row_count: u32,
        colors: u32,
    ) -> Result<Self> {
        Self::open_with_status(store, config, OpenRequest::indexed(row_size, row_count, colors), NoStatus)
    }
}

impl<S: BackingStore, T: StatusSink> DiskVideo<S, T> {
    /// 按请求打开会话，并向 `status` 报告进度
    ///
    /// 除 Targa 模式外，打开时会清零整个后备存储；`status` 的
    /// [`init_progress`](StatusSink::init_progress) 返回
    /// [`InitControl::Cancel`] 时打开失败并返回 `Cancelled`。
    /// 任何失败都会先释放后备存储。
    pub fn open_with_status(
        mut store: S,
        config: DiskVideoConfig,
        request: OpenRequest,
        status: T,
    ) -> Result<Self> {
        let layout = match Layout::new(&store, &config, &request) {
            Ok(layout) => layout,
            Err(e) => return Err(abandon(&mut store, e)),
        };
        let pool = match SlotPool::allocate(&config) {
            Ok(pool) => pool,
            Err(e) => return Err(abandon(&mut store, e)),
        };
        if let Err(e) = store.reserve(layout.store_blocks) {
            return Err(abandon(&mut store, e));
        }

        let flags = request.flags();
        let targa = flags.contains(SessionFlags::TARGA);
        let mut video = Self {
            store,
            status,
            stream: BlockStream::new(config.block_len),
            pool,
            config,
            geometry: layout.geometry,
            shift: layout.shift,
            flags,
            capacity: layout.capacity,
            packed: vec![0u8; layout.shift.packed_len(config.block_len)],
            // Targa 文件内容未知，不能假设为零
            high_water: if targa { Some(u64::MAX) } else { None },
            seek_offset: None,
            current: None,
            current_row: None,
            countdown: config.status_interval,
            stats: CacheStats::default(),
            active: true,
        };

        if config.zero_fill && !targa {
            video.clear_store(layout.store_blocks)?;
        }

        log::info!(
            "[DISKVID] opened {}x{} image: {} slots of {} bytes, pixelshift {}, {} store blocks ({:?})",
            video.geometry.row_size,
            video.geometry.row_count,
            video.pool.len(),
            config.block_len,
            video.shift.get(),
            layout.store_blocks,
            video.store.kind()
        );
        Ok(video)
    }

    /// 清零后备存储，每个块之后询问是否取消
    fn clear_store(&mut self, blocks: u64) -> Result<()> {
        self.status.status(&Status::Clearing);
        let zeros = vec![0u8; self.config.block_len];
        for index in 0..blocks {
            self.store.write_block(index, &zeros)?;
            if self.status.init_progress(index + 1, blocks) == InitControl::Cancel {
                log::info!("[DISKVID] initialization cancelled at block {}/{}", index + 1, blocks);
                return Err(Error::new(ErrorKind::Cancelled, "disk video initialization interrupted"));
            }
        }
        Ok(())
    }

    /// 关闭会话
    ///
    /// Targa 模式先写回所有脏块；随后释放后备存储和缓存。
    /// 对已关闭的会话调用不做任何事。
    pub fn close(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        let flushed = if self.flags.contains(SessionFlags::TARGA) {
            self.flush().map(|_| ())
        } else {
            Ok(())
        };

        self.active = false;
        self.current = None;
        self.current_row = None;
        self.seek_offset = None;
        self.pool.release();
        let released = self.store.release();

        log::info!(
            "[DISKVID] closed: {} hits, {} misses, {} blocks written in {} runs",
            self.stats.hits,
            self.stats.misses,
            self.stats.blocks_written,
            self.stats.write_runs
        );
        flushed.and(released)
    }

    pub(super) fn ensure_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::InvalidState, "disk video session is closed"))
        }
    }

    /// 会话是否仍然打开
    pub fn is_open(&self) -> bool {
        self.active
    }

    /// 逻辑图像几何
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// 后备存储的打包宽度
    pub fn pixel_shift(&self) -> PixelShift {
        self.shift
    }

    /// 模式标志
    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    /// 会话配置
    pub fn config(&self) -> &DiskVideoConfig {
        &self.config
    }

    /// 块对齐的逻辑容量（字节）
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// 高水位
    pub fn high_water(&self) -> Option<u64> {
        self.high_water
    }

    /// 缓存槽数
    pub fn slot_count(&self) -> usize {
        self.pool.len()
    }

    /// 当前脏槽数
    pub fn dirty_count(&self) -> usize {
        self.pool.dirty_count()
    }

    /// 缓存统计
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// 暂存层统计
    pub fn stream_stats(&self) -> StreamStats {
        self.stream.stats()
    }

    /// 后备存储
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 后备存储（可变）
    ///
    /// 绕过缓存直接改动介质会让已装载的块与介质不一致。
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// 状态接收者
    pub fn status_sink(&self) -> &T {
        &self.status
    }
}

impl<S: BackingStore, T: StatusSink> Drop for DiskVideo<S, T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("[DISKVID] failed to close session: {}", e);
        }
    }
}
