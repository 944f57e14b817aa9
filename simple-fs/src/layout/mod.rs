//! # 磁盘数据结构层
//!
//! simple-fs 的磁盘布局：
//! 超级块 | 索引节点区域 | 目录区域 | 数据块区域 | 位图区域
//!
//! 位图位于卷的末尾，格式化时连同前面的元数据区域一并标记为已用。

use core::mem;

use crate::{BLOCK_BITS, BLOCK_SIZE, DIRECT_COUNT, INODE_COUNT};

mod super_block;
pub use super_block::SuperBlock;

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DiskInode, IndirectBlock, StatKind};

/// 文件项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::{DiskDirEntry, validate_name};

pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / mem::size_of::<DiskInode>();
pub const INODE_AREA_START: usize = 1;
pub const INODE_AREA_BLOCKS: usize = INODE_COUNT.div_ceil(INODES_PER_BLOCK);

pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / mem::size_of::<DiskDirEntry>();
pub const DIRECTORY_AREA_START: usize = INODE_AREA_START + INODE_AREA_BLOCKS;
/// 目录项与索引节点一一对应
pub const DIRECTORY_AREA_BLOCKS: usize = INODE_COUNT.div_ceil(DIR_ENTRIES_PER_BLOCK);

/// 数据块区域的起始块
pub const DATA_AREA_START: usize = DIRECTORY_AREA_START + DIRECTORY_AREA_BLOCKS;

// 根目录以直接索引指向目录区域
const _: () = assert!(DIRECTORY_AREA_BLOCKS <= DIRECT_COUNT);

/// 记录 `total_blocks` 个块的分配情况需要多少个位图块
#[inline]
pub const fn bitmap_blocks(total_blocks: usize) -> usize {
    total_blocks.div_ceil(BLOCK_BITS)
}
