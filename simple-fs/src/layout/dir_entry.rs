use alloc::string::String;

use vfs::Error;

use crate::NAME_MAX_LEN;

/// 名字区的容量，NUL 填充，凑整到4字节
const NAME_CAP: usize = 24;

/// 目录项的磁盘格式，恒为32字节
#[derive(Debug, Default, Clone, Copy)]
#[repr(C)]
pub struct DiskDirEntry {
    pub used: u32,
    pub inode: u32,
    name: [u8; NAME_CAP],
}

impl DiskDirEntry {
    #[inline]
    pub fn new(name: &str, inode: u32) -> Self {
        let bytes = name.as_bytes();
        let mut buf = [0; NAME_CAP];
        buf[..bytes.len()].copy_from_slice(bytes);

        Self {
            used: 1,
            inode,
            name: buf,
        }
    }

    pub fn name(&self) -> String {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_CAP);
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

/// 名字须非空、不含 NUL，且不超过 [`NAME_MAX_LEN`] 字节
pub fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > NAME_MAX_LEN || name.contains('\0') {
        return Err(Error::InvalidName);
    }
    Ok(())
}
