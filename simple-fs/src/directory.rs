//! 扁平目录：文件名到 inode 的绑定表，没有子目录。
//!
//! 目录项与索引节点表等长，持久化在目录区域，按槽位编号一一对应磁盘位置。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::mem;

use crate::block_cache::BlockCacheManager;
use crate::layout::{DIR_ENTRIES_PER_BLOCK, DIRECTORY_AREA_START, DiskDirEntry};
use crate::table::{self, Slot};
use crate::INODE_COUNT;

const DIR_ENTRY_SIZE: usize = mem::size_of::<DiskDirEntry>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u32,
    pub name: String,
}

pub struct Directory {
    slots: Vec<Slot<DirEntry>>,
    dirty: Vec<bool>,
    /// [`Directory::next_name`] 的遍历位置
    cursor: usize,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Free; INODE_COUNT],
            dirty: vec![true; INODE_COUNT],
            cursor: 0,
        }
    }

    pub fn load(cache: &BlockCacheManager) -> Self {
        let slots = (0..INODE_COUNT)
            .map(|index| {
                let (block_id, block_offset) = Self::disk_entry_pos(index);
                let entry = cache
                    .get(block_id)
                    .lock()
                    .map(block_offset, |entry: &DiskDirEntry| {
                        (entry.used != 0).then(|| DirEntry {
                            inode: entry.inode,
                            name: entry.name(),
                        })
                    });
                Slot::from(entry)
            })
            .collect();

        Self {
            slots,
            dirty: vec![false; INODE_COUNT],
            cursor: 0,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.entries()
            .find_map(|entry| (entry.name == name).then_some(entry.inode))
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        table::first_free(&self.slots).is_none()
    }

    /// 绑定到第一个空槽位，返回槽位号。名字的唯一性由调用者保证。
    pub fn bind(&mut self, name: &str, inode: u32) -> Option<usize> {
        debug_assert!(self.lookup(name).is_none());
        let index = table::first_free(&self.slots)?;
        self.slots[index] = Slot::Occupied(DirEntry {
            inode,
            name: name.into(),
        });
        self.dirty[index] = true;
        Some(index)
    }

    /// 解除绑定，返回原先绑定的 inode
    pub fn unbind(&mut self, name: &str) -> Option<u32> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entry| entry.name == name))?;
        self.dirty[index] = true;
        self.slots[index].take().map(|entry| entry.inode)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.slots.iter().filter_map(Slot::as_ref)
    }

    /// 从上次的位置继续，返回下一个已用目录项的名字；
    /// 一趟遍历结束后始终返回空，直到 [`Directory::rewind`]
    pub fn next_name(&mut self) -> Option<String> {
        while self.cursor < self.slots.len() {
            let slot = &self.slots[self.cursor];
            self.cursor += 1;
            if let Some(entry) = slot.as_ref() {
                return Some(entry.name.clone());
            }
        }
        None
    }

    #[inline]
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn flush(&mut self, cache: &BlockCacheManager) {
        for (index, dirty) in self.dirty.iter_mut().enumerate() {
            if !*dirty {
                continue;
            }
            let (block_id, block_offset) = Self::disk_entry_pos(index);
            let disk_entry = match &self.slots[index] {
                Slot::Free => DiskDirEntry::default(),
                Slot::Occupied(entry) => DiskDirEntry::new(&entry.name, entry.inode),
            };
            cache
                .get(block_id)
                .lock()
                .map_mut(block_offset, |dest: &mut DiskDirEntry| *dest = disk_entry);
            *dirty = false;
        }
    }

    #[inline]
    fn disk_entry_pos(index: usize) -> (usize, usize) {
        let block_id = DIRECTORY_AREA_START + index / DIR_ENTRIES_PER_BLOCK;
        let block_offset = index % DIR_ENTRIES_PER_BLOCK * DIR_ENTRY_SIZE;

        (block_id, block_offset)
    }
}
