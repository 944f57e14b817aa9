mod cli;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use simple_fs::{BLOCK_SIZE, BlockDevice, SimpleFileSystem};
use simple_fs_fuse::BlockFile;

use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("image={:?}", cli.image);

    match cli.command {
        Command::Format { blocks } => {
            let block_dev = open_image(&cli.image, Some(blocks))?;
            let fs = SimpleFileSystem::format(block_dev, blocks).map_err(io::Error::other)?;
            println!(
                "formatted {} blocks, {} free",
                fs.total_blocks(),
                fs.free_blocks()
            );
        }
        Command::Pack { files } => {
            let mut fs = mount(&cli.image)?;
            for path in files {
                let name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| io::Error::other(format!("bad file name: {path:?}")))?;
                let data = fs::read(&path)?;

                match fs.remove(name) {
                    Ok(()) => log::info!("replacing {name:?}"),
                    Err(simple_fs::Error::NameNotFound) => {}
                    Err(err) => return Err(io::Error::other(err)),
                }
                let handle = fs.open(name).map_err(io::Error::other)?;
                fs.write(handle, &data).map_err(io::Error::other)?;
                fs.close(handle).map_err(io::Error::other)?;
                println!("packed {name} ({} bytes)", data.len());
            }
        }
        Command::Ls => {
            let fs = mount(&cli.image)?;
            for entry in fs.list() {
                let stat = fs.stat(&entry.name).map_err(io::Error::other)?;
                println!(
                    "{:>3} {:o} {:>8} {:>4} {}",
                    stat.inode, stat.mode, stat.size, stat.blocks, entry.name
                );
            }
            println!("{} of {} blocks free", fs.free_blocks(), fs.total_blocks());
        }
        Command::Cat { name } => {
            let mut fs = mount(&cli.image)?;
            let size = fs.file_size(&name).map_err(io::Error::other)?;
            let handle = fs.open(&name).map_err(io::Error::other)?;
            fs.seek_read(handle, 0).map_err(io::Error::other)?;
            let data = fs.read_vec(handle, size).map_err(io::Error::other)?;
            io::stdout().write_all(&data)?;
        }
        Command::Rm { name } => {
            let mut fs = mount(&cli.image)?;
            fs.remove(&name).map_err(io::Error::other)?;
        }
    }

    Ok(())
}

fn mount(image: &Path) -> io::Result<SimpleFileSystem> {
    SimpleFileSystem::mount(open_image(image, None)?).map_err(io::Error::other)
}

/// 传入块数时截断并重设镜像大小
fn open_image(image: &Path, blocks: Option<usize>) -> io::Result<Arc<dyn BlockDevice>> {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(blocks.is_some())
        .truncate(blocks.is_some())
        .open(image)?;
    if let Some(blocks) = blocks {
        fd.set_len((blocks * BLOCK_SIZE) as u64)?;
    }

    Ok(Arc::new(BlockFile::new(fd)))
}
