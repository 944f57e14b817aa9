use std::path::PathBuf;

use clap::{Parser, Subcommand};
use simple_fs::DEFAULT_TOTAL_BLOCKS;

#[derive(Parser)]
pub struct Cli {
    /// Volume image on the host
    #[arg(long, short, default_value = "sfs.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty volume, discarding the image's contents
    Format {
        /// Volume size in blocks
        #[arg(long, short, default_value_t = DEFAULT_TOTAL_BLOCKS)]
        blocks: usize,
    },
    /// Copy host files into the volume, replacing files of the same name
    Pack {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the files in the volume
    Ls,
    /// Print a file's contents to stdout
    Cat { name: String },
    /// Remove a file from the volume
    Rm { name: String },
}
