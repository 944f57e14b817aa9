#![cfg_attr(not(test), no_std)]

extern crate alloc;

/* simple-fs 的整体架构，自上而下 */

// 文件层：打开文件表以及读写、定位、删除等操作
mod file;

// 磁盘块管理器层：格式化、挂载，持有全部元数据的内存镜像
mod sfs;

// 内存镜像层：索引节点表、目录，均为按槽位编号的表
mod directory;
mod inode;
mod inode_table;
mod table;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;

// 块缓存层：内存上的磁盘块数据缓存
mod block_cache;

pub use self::{
    file::FileHandle,
    layout::StatKind,
    sfs::SimpleFileSystem,
};
pub use block_dev::BlockDevice;
pub use vfs::{DirEntry, DirEntryType, Error, Stat};

pub const MAGIC: u64 = 0x5346_5330_0000_0001;
pub const BLOCK_SIZE: usize = 1024;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

/// 索引节点表长度，0号为根目录
pub const INODE_COUNT: usize = 50;
/// 文件名的最大字节数
pub const NAME_MAX_LEN: usize = 20;
/// 未指定大小时的卷块数
pub const DEFAULT_TOTAL_BLOCKS: usize = 100_000;

/// 直接索引个数
pub const DIRECT_COUNT: usize = 12;
/// 间接索引块的编号容量：一个块能存放的块编号个数
pub const INDIRECT_COUNT: usize = BLOCK_SIZE / 4;
/// 文件的最大字节数，也是读写指针的上限
pub const MAX_FILE_SIZE: usize = (DIRECT_COUNT + INDIRECT_COUNT) * BLOCK_SIZE;

pub const ROOT_INODE: u32 = 0;

type DataBlock = [u8; BLOCK_SIZE];

#[cfg(any(test, feature = "ram-disk"))]
mod ram_disk;
#[cfg(any(test, feature = "ram-disk"))]
pub use ram_disk::RamDisk;
