use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use simple_fs::*;

use crate::BlockFile;

fn format(total_blocks: usize) -> SimpleFileSystem {
    SimpleFileSystem::format_or_mount(RamDisk::new(total_blocks), total_blocks, true).unwrap()
}

/// 元数据区域：超级块、索引节点区域、目录区域、位图区域
fn reserved_blocks(total_blocks: usize) -> usize {
    7 + total_blocks.div_ceil(BLOCK_SIZE * 8)
}

/// 已用的块恰好是元数据区域加上各文件占用的块，且文件之间互不重叠
fn assert_consistent(fs: &SimpleFileSystem) {
    let mut owned = HashSet::new();
    for entry in fs.list() {
        for block_id in fs.file_blocks(&entry.name).unwrap() {
            assert!(!fs.is_block_free(block_id), "{block_id} of {:?} is free", entry.name);
            assert!(owned.insert(block_id), "{block_id} is shared");
        }
    }

    let used = fs.total_blocks() - fs.free_blocks();
    assert_eq!(used, reserved_blocks(fs.total_blocks()) + owned.len());
}

fn write_file(fs: &mut SimpleFileSystem, name: &str, data: &[u8]) {
    let handle = fs.open(name).unwrap();
    assert_eq!(fs.write(handle, data).unwrap(), data.len());
    fs.close(handle).unwrap();
}

fn read_file(fs: &mut SimpleFileSystem, name: &str) -> Vec<u8> {
    let size = fs.file_size(name).unwrap();
    let handle = fs.open(name).unwrap();
    fs.seek_read(handle, 0).unwrap();
    let data = fs.read_vec(handle, size + 16).unwrap();
    fs.close(handle).unwrap();
    data
}

fn temp_image(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sfs-{}-{name}.img", std::process::id()))
}

#[test]
fn fresh_volume() {
    let mut fs = format(DEFAULT_TOTAL_BLOCKS);
    assert_eq!(fs.total_blocks(), 100_000);
    assert_eq!(fs.free_blocks(), 100_000 - reserved_blocks(100_000));
    assert_eq!(fs.file_size("missing"), Err(Error::NameNotFound));
    assert_eq!(fs.next_directory_name(), None);
    assert_eq!(fs.free_inodes(), INODE_COUNT - 1);

    // 元数据区域与位图区域都不可分配
    for block_id in (0..7).chain(100_000 - 13..100_000) {
        assert!(!fs.is_block_free(block_id));
    }
    assert!(fs.is_block_free(7));
    assert!(fs.is_block_free(100_000 - 14));

    for i in 1..INODE_COUNT {
        fs.open(&format!("file{i}")).unwrap();
    }
    assert_eq!(fs.open("one-too-many"), Err(Error::NoFreeInode));
    assert_eq!(fs.free_inodes(), 0);
    assert_consistent(&fs);
}

#[test]
fn hello_round_trip() {
    let mut fs = format(DEFAULT_TOTAL_BLOCKS);
    let handle = fs.open("a.txt").unwrap();
    assert_eq!(fs.write(handle, b"hello").unwrap(), 5);
    fs.close(handle).unwrap();

    assert_eq!(fs.file_size("a.txt").unwrap(), 5);
    let handle = fs.open("a.txt").unwrap();
    fs.seek_read(handle, 0).unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(fs.read(handle, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"hello");
    // 文件末尾：短读，不报错
    assert_eq!(fs.read(handle, &mut buf).unwrap(), 0);

    let stat = fs.stat("a.txt").unwrap();
    assert_eq!(stat.kind, DirEntryType::Regular);
    assert_eq!(stat.mode, 0o100644);
    assert_eq!(stat.links, 1);
    assert_eq!(stat.size, 5);
    assert_eq!(stat.blocks, 1);
    assert_consistent(&fs);
}

#[test]
fn write_spans_indirect_block() {
    let mut fs = format(DEFAULT_TOTAL_BLOCKS);
    let free_before = fs.free_blocks();
    let data: Vec<u8> = (0..20_000).map(|i| (i % 253) as u8).collect();

    write_file(&mut fs, "big.bin", &data);
    assert_eq!(fs.file_size("big.bin").unwrap(), 20_000);

    // 20个数据块加上间接索引块
    let blocks = fs.file_blocks("big.bin").unwrap();
    assert_eq!(blocks.len(), 21);
    assert_eq!(fs.free_blocks(), free_before - 21);
    for &block_id in &blocks {
        assert!(!fs.is_block_free(block_id));
    }

    assert_eq!(read_file(&mut fs, "big.bin"), data);
    assert_consistent(&fs);
}

#[test]
fn exhaustion_keeps_contents() {
    let mut fs = format(128);
    let free_before = fs.free_blocks();
    assert_eq!(free_before, 120);

    let handle = fs.open("fill").unwrap();
    let chunk = |i: usize| vec![(i % 256) as u8; BLOCK_SIZE];
    let mut written = 0;
    let err = loop {
        match fs.write(handle, &chunk(written)) {
            Ok(size) => {
                assert_eq!(size, BLOCK_SIZE);
                written += 1;
            }
            Err(err) => break err,
        }
    };

    // 间接索引块占去一块
    assert_eq!(err, Error::NoFreeBlocks);
    assert_eq!(written, free_before - 1);
    assert_eq!(fs.free_blocks(), 0);
    assert_eq!(fs.file_size("fill").unwrap(), written * BLOCK_SIZE);

    // 失败的写入不移动指针
    assert_eq!(fs.write(handle, b"x"), Err(Error::NoFreeBlocks));
    fs.close(handle).unwrap();

    let data = read_file(&mut fs, "fill");
    assert_eq!(data.len(), written * BLOCK_SIZE);
    for (i, block) in data.chunks(BLOCK_SIZE).enumerate() {
        assert_eq!(block, &chunk(i)[..]);
    }
    assert_consistent(&fs);
}

#[test]
fn remove_then_reopen_reuses_resources() {
    let mut fs = format(DEFAULT_TOTAL_BLOCKS);
    write_file(&mut fs, "keep", b"kept");
    write_file(&mut fs, "a.txt", &[7; 3000]);

    let inode = fs.stat("a.txt").unwrap().inode;
    let blocks = fs.file_blocks("a.txt").unwrap();
    let free_before = fs.free_blocks();

    fs.remove("a.txt").unwrap();
    assert_eq!(fs.free_blocks(), free_before + 3);
    for &block_id in &blocks {
        assert!(fs.is_block_free(block_id));
    }
    assert_eq!(fs.file_size("a.txt"), Err(Error::NameNotFound));
    assert_eq!(fs.remove("a.txt"), Err(Error::NameNotFound));

    let handle = fs.open("a.txt").unwrap();
    assert_eq!(fs.file_size("a.txt").unwrap(), 0);
    assert_eq!(fs.stat("a.txt").unwrap().inode, inode);

    fs.write(handle, &[9; 3000]).unwrap();
    assert_eq!(fs.file_blocks("a.txt").unwrap(), blocks);
    assert_eq!(read_file(&mut fs, "keep"), b"kept");
    assert_consistent(&fs);
}

#[test]
fn remove_frees_indirect_blocks() {
    let mut fs = format(DEFAULT_TOTAL_BLOCKS);
    let free_before = fs.free_blocks();
    write_file(&mut fs, "big.bin", &[3; 20_000]);

    let blocks = fs.file_blocks("big.bin").unwrap();
    assert_eq!(blocks.len(), 21);
    fs.remove("big.bin").unwrap();

    for &block_id in &blocks {
        assert!(fs.is_block_free(block_id), "{block_id} still in use");
    }
    assert_eq!(fs.free_blocks(), free_before);
    assert_consistent(&fs);
}

#[test]
fn read_vec_clips_to_file_size() {
    let mut fs = format(1000);
    write_file(&mut fs, "small", b"abc");

    let handle = fs.open("small").unwrap();
    fs.seek_read(handle, 0).unwrap();
    assert_eq!(fs.read_vec(handle, usize::MAX >> 2).unwrap(), b"abc");
    assert_eq!(fs.read_vec(handle, usize::MAX).unwrap(), b"");

    // 指针越过末尾时读出空
    fs.seek_read(handle, 10).unwrap();
    assert_eq!(fs.read_vec(handle, 5).unwrap(), b"");
}

#[test]
fn stale_handle_after_reuse() {
    let mut fs = format(1000);
    write_file(&mut fs, "old", b"old");
    write_file(&mut fs, "new", b"new");

    let stale = fs.open("old").unwrap();
    fs.close(stale).unwrap();
    let fresh = fs.open("new").unwrap();

    assert_ne!(stale, fresh);
    assert_eq!(fs.seek_read(stale, 0), Err(Error::InvalidHandle));
    assert_eq!(fs.read_vec(stale, 3), Err(Error::InvalidHandle));
    assert_eq!(fs.write(stale, b"x"), Err(Error::InvalidHandle));
    assert_eq!(fs.close(stale), Err(Error::InvalidHandle));

    fs.seek_read(fresh, 0).unwrap();
    assert_eq!(fs.read_vec(fresh, 3).unwrap(), b"new");
    assert_eq!(read_file(&mut fs, "old"), b"old");
}

#[test]
fn remove_invalidates_handles() {
    let mut fs = format(1000);
    let first = fs.open("doomed").unwrap();
    let second = fs.open("doomed").unwrap();
    let other = fs.open("other").unwrap();
    fs.write(first, b"data").unwrap();

    fs.remove("doomed").unwrap();
    assert_eq!(fs.write(first, b"more"), Err(Error::InvalidHandle));
    assert_eq!(fs.read(second, &mut [0; 4]), Err(Error::InvalidHandle));
    assert_eq!(fs.close(second), Err(Error::InvalidHandle));
    assert_eq!(fs.write(other, b"fine").unwrap(), 4);
}

#[test]
fn closed_handle_is_invalid() {
    let mut fs = format(1000);
    let handle = fs.open("a").unwrap();
    fs.close(handle).unwrap();

    assert_eq!(fs.close(handle), Err(Error::InvalidHandle));
    assert_eq!(fs.write(handle, b"x"), Err(Error::InvalidHandle));
    assert_eq!(fs.read(handle, &mut [0; 1]), Err(Error::InvalidHandle));
    assert_eq!(fs.seek_read(handle, 0), Err(Error::InvalidHandle));
}

#[test]
fn shared_cursor() {
    let mut fs = format(1000);
    let handle = fs.open("a").unwrap();
    fs.write(handle, b"hello world").unwrap();

    fs.seek_read(handle, 0).unwrap();
    assert_eq!(fs.read_vec(handle, 5).unwrap(), b"hello");
    // 写入从读停下的位置开始
    fs.write(handle, b"!!").unwrap();
    assert_eq!(fs.read_vec(handle, 100).unwrap(), b"orld");

    fs.seek_write(handle, 0).unwrap();
    assert_eq!(fs.read_vec(handle, 100).unwrap(), b"hello!!orld");
    assert_eq!(fs.file_size("a").unwrap(), 11);
}

#[test]
fn open_appends() {
    let mut fs = format(1000);
    write_file(&mut fs, "log", b"abc");
    write_file(&mut fs, "log", b"def");
    assert_eq!(read_file(&mut fs, "log"), b"abcdef");

    // 各句柄的指针互相独立
    let first = fs.open("log").unwrap();
    let second = fs.open("log").unwrap();
    fs.seek_read(first, 1).unwrap();
    assert_eq!(fs.read_vec(first, 2).unwrap(), b"bc");
    assert_eq!(fs.read_vec(second, 2).unwrap(), b"");
}

#[test]
fn gap_reads_as_zeros() {
    let mut fs = format(1000);
    let handle = fs.open("sparse").unwrap();
    fs.seek_write(handle, 5000).unwrap();
    fs.write(handle, b"x").unwrap();

    assert_eq!(fs.file_size("sparse").unwrap(), 5001);
    assert_eq!(fs.file_blocks("sparse").unwrap().len(), 5);

    let data = read_file(&mut fs, "sparse");
    assert!(data[..5000].iter().all(|&byte| byte == 0));
    assert_eq!(data[5000], b'x');
    assert_consistent(&fs);
}

#[test]
fn size_limits() {
    let mut fs = format(1000);
    let handle = fs.open("edge").unwrap();

    assert_eq!(
        fs.seek_write(handle, MAX_FILE_SIZE + 1),
        Err(Error::SeekOutOfRange)
    );
    fs.seek_write(handle, MAX_FILE_SIZE).unwrap();
    assert_eq!(fs.write(handle, b"x"), Err(Error::FileTooLarge));
    assert_eq!(fs.file_size("edge").unwrap(), 0);

    fs.seek_write(handle, MAX_FILE_SIZE - 1).unwrap();
    assert_eq!(fs.write(handle, b"x").unwrap(), 1);
    assert_eq!(fs.file_size("edge").unwrap(), MAX_FILE_SIZE);
    assert_eq!(
        fs.file_blocks("edge").unwrap().len(),
        MAX_FILE_SIZE / BLOCK_SIZE + 1
    );
    assert_consistent(&fs);
}

#[test]
fn names() {
    let mut fs = format(1000);
    assert_eq!(fs.open(""), Err(Error::InvalidName));
    assert_eq!(fs.open(&"n".repeat(NAME_MAX_LEN + 1)), Err(Error::InvalidName));
    assert_eq!(fs.open("nul\0byte"), Err(Error::InvalidName));

    let longest = "n".repeat(NAME_MAX_LEN);
    write_file(&mut fs, &longest, b"ok");
    assert_eq!(fs.list()[0].name, longest);

    assert_eq!(fs.create(&longest), Err(Error::NameAlreadyExists));
    assert_eq!(fs.create("fresh").unwrap(), 2);
    assert_eq!(fs.file_size("fresh").unwrap(), 0);
}

#[test]
fn directory_iteration() {
    let mut fs = format(1000);
    for name in ["a", "b", "c"] {
        fs.create(name).unwrap();
    }
    fs.remove("b").unwrap();

    assert_eq!(fs.next_directory_name().as_deref(), Some("a"));
    assert_eq!(fs.next_directory_name().as_deref(), Some("c"));
    assert_eq!(fs.next_directory_name(), None);
    assert_eq!(fs.next_directory_name(), None);

    fs.rewind_directory();
    let names: Vec<_> = std::iter::from_fn(|| fs.next_directory_name()).collect();
    assert_eq!(names, ["a", "c"]);

    let listed: Vec<_> = fs.list().into_iter().map(|entry| entry.name).collect();
    assert_eq!(listed, ["a", "c"]);
}

#[test]
fn blank_device_is_rejected() {
    let result = SimpleFileSystem::format_or_mount(RamDisk::new(1000), 1000, false);
    assert!(matches!(result, Err(Error::VolumeFormatMismatch)));
}

#[test]
fn volume_too_small() {
    let result = SimpleFileSystem::format(RamDisk::new(8), 8);
    assert!(matches!(result, Err(Error::VolumeTooSmall)));
}

#[test]
fn remount_from_image() {
    const BLOCKS: usize = 2048;
    let path = temp_image("remount");
    let open = || {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .unwrap();
        fd.set_len((BLOCKS * BLOCK_SIZE) as u64).unwrap();
        Arc::new(BlockFile::new(fd))
    };
    let data: Vec<u8> = (0..40_000).map(|i| (i * 7 % 256) as u8).collect();

    let free_blocks = {
        let mut fs = SimpleFileSystem::format(open(), BLOCKS).unwrap();
        write_file(&mut fs, "first", b"persisted");
        write_file(&mut fs, "second", &data);
        write_file(&mut fs, "gone", b"removed");
        fs.remove("gone").unwrap();
        fs.free_blocks()
    };

    let mut fs = SimpleFileSystem::mount(open()).unwrap();
    assert_eq!(fs.total_blocks(), BLOCKS);
    assert_eq!(fs.free_blocks(), free_blocks);
    assert_eq!(fs.bitmap_snapshot().len(), BLOCK_SIZE);
    assert_eq!(read_file(&mut fs, "first"), b"persisted");
    assert_eq!(read_file(&mut fs, "second"), data);
    assert_eq!(fs.file_size("gone"), Err(Error::NameNotFound));
    assert_consistent(&fs);

    fs::remove_file(&path).unwrap();
}
