//! # 文件层
//!
//! 打开文件表以及建立在它之上的读写、定位、删除。
//! 每个句柄只有一个读写指针，读与写共用。

use alloc::vec;
use alloc::vec::Vec;

use vfs::Error;

use crate::inode::Inode;
use crate::layout::{StatKind, validate_name};
use crate::table::{self, Slot};
use crate::{MAX_FILE_SIZE, SimpleFileSystem};

/// 新建文件的权限位
const FILE_PERMISSIONS: u32 = 0o644;

/// 打开文件表中的句柄：槽位编号加上打开时的代数。
///
/// 槽位关闭后会被复用，代数不同的旧句柄一律视为 [`Error::InvalidHandle`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenFile {
    pub inode: u32,
    /// 读写指针
    pub cursor: usize,
    generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct OpenFileTable {
    slots: Vec<Slot<OpenFile>>,
    /// 下一次打开使用的代数，单调递增
    next_generation: u64,
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self {
            slots: vec![],
            next_generation: 0,
        }
    }

    /// 复用编号最小的空槽位，没有则扩展表
    pub fn open(&mut self, inode: u32, cursor: usize) -> FileHandle {
        let generation = self.next_generation;
        self.next_generation += 1;

        let file = Slot::Occupied(OpenFile {
            inode,
            cursor,
            generation,
        });
        let index = match table::first_free(&self.slots) {
            Some(index) => {
                self.slots[index] = file;
                index
            }
            None => {
                self.slots.push(file);
                self.slots.len() - 1
            }
        };

        FileHandle { index, generation }
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<(), Error> {
        self.get(handle)?;
        self.slots[handle.index] = Slot::Free;
        Ok(())
    }

    pub fn get(&self, handle: FileHandle) -> Result<&OpenFile, Error> {
        self.slots
            .get(handle.index)
            .and_then(Slot::as_ref)
            .filter(|file| file.generation == handle.generation)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> Result<&mut OpenFile, Error> {
        self.slots
            .get_mut(handle.index)
            .and_then(Slot::as_mut)
            .filter(|file| file.generation == handle.generation)
            .ok_or(Error::InvalidHandle)
    }

    /// 关闭所有指向 `inode` 的句柄，返回关闭的个数
    pub fn close_all_on(&mut self, inode: u32) -> usize {
        let mut closed = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|file| file.inode == inode) {
                *slot = Slot::Free;
                closed += 1;
            }
        }
        closed
    }
}

impl SimpleFileSystem {
    /// 打开文件，不存在时创建。读写指针位于文件末尾。
    pub fn open(&mut self, name: &str) -> Result<FileHandle, Error> {
        if let Some(inode_id) = self.directory.lookup(name) {
            let size = self.inode(inode_id)?.size as usize;
            return Ok(self.open_files.open(inode_id, size));
        }

        let inode_id = self.create_inode(name)?;
        Ok(self.open_files.open(inode_id, 0))
    }

    /// 新建空文件，返回其 inode 编号
    pub fn create(&mut self, name: &str) -> Result<u32, Error> {
        if self.directory.lookup(name).is_some() {
            return Err(Error::NameAlreadyExists);
        }
        self.create_inode(name)
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<(), Error> {
        self.open_files.close(handle)
    }

    /// 从读写指针处读出数据填充 `buf`，到文件末尾为止，指针随之前进
    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize, Error> {
        let file = self.open_files.get(handle)?;
        let inode = self.inode(file.inode)?;
        let read_size = inode.read_at(file.cursor, buf, &self.cache);

        self.open_files.get_mut(handle)?.cursor += read_size;
        Ok(read_size)
    }

    /// 读出至多 `len` 个字节
    pub fn read_vec(&mut self, handle: FileHandle, len: usize) -> Result<Vec<u8>, Error> {
        let file = self.open_files.get(handle)?;
        let size = self.inode(file.inode)?.size as usize;
        let mut buf = vec![0; size.saturating_sub(file.cursor).min(len)];
        let read_size = self.read(handle, &mut buf)?;
        buf.truncate(read_size);
        Ok(buf)
    }

    /// 在读写指针处写入 `buf`，越过末尾时文件增长。
    ///
    /// 先分配全部所需的块；块不足时不写入任何数据，`size` 与指针不变，
    /// 已分配的块仍归属该文件。
    pub fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize, Error> {
        let file = self.open_files.get(handle)?;
        let (inode_id, cursor) = (file.inode, file.cursor);
        if buf.is_empty() {
            return Ok(0);
        }

        let end = cursor + buf.len();
        let inode = self
            .inodes
            .get_mut(inode_id)
            .ok_or(Error::InvalidHandle)?;
        if let Err(err) = inode.expand_to(end, &mut self.bitmap, &self.cache) {
            log::debug!("write of {} bytes to inode {inode_id} failed: {err}", buf.len());
            self.sync();
            return Err(err);
        }

        let written_size = inode.write_at(cursor, buf, &self.cache);
        self.open_files.get_mut(handle)?.cursor = end;
        self.sync();
        Ok(written_size)
    }

    pub fn seek_read(&mut self, handle: FileHandle, pos: usize) -> Result<(), Error> {
        self.seek(handle, pos)
    }

    pub fn seek_write(&mut self, handle: FileHandle, pos: usize) -> Result<(), Error> {
        self.seek(handle, pos)
    }

    /// 删除文件：归还全部块与 inode，关闭指向它的句柄
    pub fn remove(&mut self, name: &str) -> Result<(), Error> {
        let inode_id = self.directory.unbind(name).ok_or(Error::NameNotFound)?;

        let freed_blocks = match self.inodes.free(inode_id) {
            Some(mut inode) => {
                let blocks = inode.clear(&self.cache);
                for &block_id in &blocks {
                    self.bitmap.dealloc(block_id);
                }
                blocks.len()
            }
            None => {
                log::warn!("directory entry {name:?} points at free inode {inode_id}");
                0
            }
        };
        let closed = self.open_files.close_all_on(inode_id);
        self.sync();

        log::debug!(
            "removed {name:?} (inode {inode_id}): {freed_blocks} blocks freed, {closed} handles closed"
        );
        Ok(())
    }
}

impl SimpleFileSystem {
    fn create_inode(&mut self, name: &str) -> Result<u32, Error> {
        validate_name(name)?;
        if self.directory.is_full() {
            return Err(Error::DirectoryFull);
        }
        if !self.inodes.has_free() {
            return Err(Error::NoFreeInode);
        }

        let inode_id = self
            .inodes
            .alloc(Inode::new(StatKind::FILE, FILE_PERMISSIONS))
            .ok_or(Error::NoFreeInode)?;
        self.directory
            .bind(name, inode_id)
            .ok_or(Error::DirectoryFull)?;
        self.sync();

        log::debug!("created {name:?} as inode {inode_id}");
        Ok(inode_id)
    }

    fn seek(&mut self, handle: FileHandle, pos: usize) -> Result<(), Error> {
        let file = self.open_files.get_mut(handle)?;
        if pos > MAX_FILE_SIZE {
            return Err(Error::SeekOutOfRange);
        }
        file.cursor = pos;
        Ok(())
    }

    #[inline]
    fn inode(&self, inode_id: u32) -> Result<&Inode, Error> {
        self.inodes.get(inode_id).ok_or(Error::InvalidHandle)
    }
}
