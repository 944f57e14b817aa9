//! # 磁盘块管理器层
//!
//! 构建出磁盘的布局并使用：格式化或挂载卷，持有位图、索引节点表、目录、
//! 打开文件表的内存镜像。每个修改性操作结束时调用 [`SimpleFileSystem::sync`]，
//! 把镜像写回块缓存并同步到块设备。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;
use vfs::{DirEntryType, Error, Stat};

use crate::block_cache::BlockCacheManager;
use crate::directory::Directory;
use crate::file::OpenFileTable;
use crate::inode::Inode;
use crate::inode_table::InodeTable;
use crate::layout::*;
use crate::{BLOCK_SIZE, INODE_COUNT, ROOT_INODE};

pub struct SimpleFileSystem {
    pub(crate) cache: BlockCacheManager,
    super_block: SuperBlock,
    pub(crate) bitmap: Bitmap,
    pub(crate) inodes: InodeTable,
    pub(crate) directory: Directory,
    pub(crate) open_files: OpenFileTable,
}

impl SimpleFileSystem {
    /// 在块设备上建立新卷，原有内容作废
    pub fn format(block_device: Arc<dyn BlockDevice>, total_blocks: usize) -> Result<Self, Error> {
        assert!(total_blocks <= u32::MAX as usize, "block ids are 32 bits wide");

        let bitmap_blocks = bitmap_blocks(total_blocks);
        if total_blocks <= DATA_AREA_START + bitmap_blocks {
            return Err(Error::VolumeTooSmall);
        }
        let bitmap_start = total_blocks - bitmap_blocks;

        let cache = BlockCacheManager::new(block_device);
        let super_block = cache.get(0).lock().map_mut(0, |super_block: &mut SuperBlock| {
            super_block.init(total_blocks as u64, ROOT_INODE as u64);
            *super_block
        });

        // 元数据区域与位图自身不参与分配
        let mut bitmap = Bitmap::new(bitmap_start, total_blocks);
        for block_id in (0..DATA_AREA_START).chain(bitmap.area()) {
            bitmap.force_set(block_id as u32);
        }

        let mut inodes = InodeTable::new();
        let root = Inode::new(StatKind::DIR, 0o755)
            .with_blocks(DIRECTORY_AREA_START as u32, DIRECTORY_AREA_BLOCKS);
        assert_eq!(inodes.alloc(root), Some(ROOT_INODE));

        let mut fs = Self {
            cache,
            super_block,
            bitmap,
            inodes,
            directory: Directory::new(),
            open_files: OpenFileTable::new(),
        };
        fs.sync();

        log::debug!(
            "formatted {total_blocks} blocks: data area {DATA_AREA_START}..{bitmap_start}, {} free",
            fs.bitmap.free_count()
        );
        Ok(fs)
    }

    /// 挂载已有的卷，魔数或几何常量不符时拒绝
    pub fn mount(block_device: Arc<dyn BlockDevice>) -> Result<Self, Error> {
        let cache = BlockCacheManager::new(block_device);
        let super_block = cache
            .get(0)
            .lock()
            .map(0, |super_block: &SuperBlock| *super_block);
        if !super_block.is_valid() {
            log::error!("bad superblock: {super_block:?}");
            return Err(Error::VolumeFormatMismatch);
        }

        let total_blocks = super_block.fs_size as usize;
        let bitmap_start = total_blocks - bitmap_blocks(total_blocks);
        let bitmap = Bitmap::load(bitmap_start, total_blocks, &cache);
        let inodes = InodeTable::load(&cache);
        let directory = Directory::load(&cache);

        log::debug!(
            "mounted {total_blocks} blocks, {} free",
            bitmap.free_count()
        );
        Ok(Self {
            cache,
            super_block,
            bitmap,
            inodes,
            directory,
            open_files: OpenFileTable::new(),
        })
    }

    /// `fresh` 为真时格式化，否则挂载
    pub fn format_or_mount(
        block_device: Arc<dyn BlockDevice>,
        total_blocks: usize,
        fresh: bool,
    ) -> Result<Self, Error> {
        if fresh {
            Self::format(block_device, total_blocks)
        } else {
            Self::mount(block_device)
        }
    }

    #[inline]
    pub fn total_blocks(&self) -> usize {
        self.super_block.fs_size as usize
    }

    #[inline]
    pub fn free_blocks(&self) -> usize {
        self.bitmap.free_count()
    }

    #[inline]
    pub fn is_block_free(&self, block_id: u32) -> bool {
        self.bitmap.is_free(block_id)
    }

    #[inline]
    pub fn bitmap_snapshot(&self) -> Vec<u8> {
        self.bitmap.snapshot()
    }

    pub fn file_size(&self, name: &str) -> Result<usize, Error> {
        Ok(self.find(name)?.1.size as usize)
    }

    pub fn stat(&self, name: &str) -> Result<Stat, Error> {
        let (inode_id, inode) = self.find(name)?;
        let kind = inode.kind();

        Ok(Stat {
            inode: inode_id as u64,
            kind: if kind == StatKind::DIR {
                DirEntryType::Directory
            } else {
                DirEntryType::Regular
            },
            mode: inode.mode,
            links: inode.links,
            uid: inode.uid,
            gid: inode.gid,
            size: inode.size as u64,
            block_size: BLOCK_SIZE as u64,
            blocks: inode.block_ids(&self.cache).len() as u64,
        })
    }

    /// 文件占用的全部块，包括间接索引块
    pub fn file_blocks(&self, name: &str) -> Result<Vec<u32>, Error> {
        Ok(self.find(name)?.1.block_ids(&self.cache))
    }

    /// 列出目录中的全部文件
    pub fn list(&self) -> Vec<vfs::DirEntry> {
        self.directory
            .entries()
            .map(|entry| vfs::DirEntry {
                inode: entry.inode as u64,
                ty: DirEntryType::Regular,
                name: entry.name.clone(),
            })
            .collect()
    }

    /// 目录遍历：每次返回下一个文件名，一趟结束后返回空
    #[inline]
    pub fn next_directory_name(&mut self) -> Option<String> {
        self.directory.next_name()
    }

    #[inline]
    pub fn rewind_directory(&mut self) {
        self.directory.rewind();
    }

    /// 可以用来建立新文件的 inode 个数，根目录占用一个
    pub fn free_inodes(&self) -> usize {
        INODE_COUNT - self.inodes.iter().count()
    }
}

impl SimpleFileSystem {
    fn find(&self, name: &str) -> Result<(u32, &Inode), Error> {
        let inode_id = self.directory.lookup(name).ok_or(Error::NameNotFound)?;
        let inode = self.inodes.get(inode_id).ok_or(Error::NameNotFound)?;
        Ok((inode_id, inode))
    }

    /// 同步点：镜像写回块缓存，再把脏块写回设备
    pub(crate) fn sync(&mut self) {
        self.inodes.flush(&self.cache);
        self.directory.flush(&self.cache);
        self.bitmap.flush(&self.cache);
        self.cache.sync_all();
    }
}
