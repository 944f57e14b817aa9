use enumflags2::bitflags;

use crate::{DIRECT_COUNT, INDIRECT_COUNT};

/// 间接索引块：整个块连续存储**块编号**，编号0表示空
pub type IndirectBlock = [u32; INDIRECT_COUNT];

/// 索引节点的磁盘格式。
///
/// 块编号0始终是超级块，不会成为数据块，因此用0表示未分配。
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct DiskInode {
    pub used: u32,
    /// 类型位与权限位
    pub mode: u32,
    /// 硬链接个数
    pub link_cnt: u32,
    pub uid: u32,
    pub gid: u32,
    // 不用usize是为了严控布局
    pub size: u32,
    /// 直接索引块，存储容量：DIRECT_COUNT * BLOCK_SIZE 字节
    pub direct: [u32; DIRECT_COUNT],
    /// 指向一个一级索引块
    pub indirect: u32,
}

#[allow(clippy::upper_case_acronyms)]
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatKind {
    DIR = 0o040000,
    #[default]
    FILE = 0o100000,
}
