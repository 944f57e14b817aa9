use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    /// Inode number
    pub inode: u64,
    pub kind: DirEntryType,
    /// 类型位与权限位，仅作记录，不做检查
    pub mode: u32,
    pub links: u32,
    pub uid: u32,
    pub gid: u32,
    /// File size
    pub size: u64,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks, including the indirect block
    pub blocks: u64,
}
