use crate::{BLOCK_SIZE, INODE_COUNT, MAGIC, ROOT_INODE};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录卷的几何信息
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SuperBlock {
    /// 魔数：用于校验文件系统合法性
    magic: u64,
    pub block_size: u64,
    /// 文件系统占据块数
    pub fs_size: u64,
    pub inode_table_len: u64,
    pub root_dir_inode: u64,
}

impl SuperBlock {
    #[inline]
    pub fn init(&mut self, fs_size: u64, root_dir_inode: u64) {
        *self = Self {
            magic: MAGIC,
            block_size: BLOCK_SIZE as u64,
            fs_size,
            inode_table_len: INODE_COUNT as u64,
            root_dir_inode,
        };
    }

    /// 魔数与几何常量都须与本实现一致
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
            && self.block_size == BLOCK_SIZE as u64
            && self.inode_table_len == INODE_COUNT as u64
            && self.root_dir_inode == ROOT_INODE as u64
    }
}
