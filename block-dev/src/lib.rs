//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、镜像文件等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 块编号从0开始，越界检查由驱动负责，文件系统不做检查。

#![no_std]

use core::any::Any;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读取编号为 `block_id` 的块，填满 `buf`
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    /// 以 `buf` 覆盖编号为 `block_id` 的块
    fn write_block(&self, block_id: usize, buf: &[u8]);
}
