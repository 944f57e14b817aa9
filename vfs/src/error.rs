use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 超级块魔数或块大小不符，不是本文件系统格式化的卷
    VolumeFormatMismatch,
    /// 卷太小，放不下元数据区域
    VolumeTooSmall,
    NameNotFound,
    NameAlreadyExists,
    /// 文件名为空、过长或含有 NUL
    InvalidName,
    NoFreeBlocks,
    NoFreeInode,
    DirectoryFull,
    /// 句柄已关闭或从未打开
    InvalidHandle,
    SeekOutOfRange,
    /// 写入会越过文件的最大可寻址长度
    FileTooLarge,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::VolumeFormatMismatch => "volume format mismatch",
            Self::VolumeTooSmall => "volume too small",
            Self::NameNotFound => "no such file",
            Self::NameAlreadyExists => "file already exists",
            Self::InvalidName => "invalid file name",
            Self::NoFreeBlocks => "no free blocks left on volume",
            Self::NoFreeInode => "no free inode left",
            Self::DirectoryFull => "directory is full",
            Self::InvalidHandle => "invalid file handle",
            Self::SeekOutOfRange => "seek position out of range",
            Self::FileTooLarge => "file too large",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
