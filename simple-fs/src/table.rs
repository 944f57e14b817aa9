//! 以槽位编号为下标的定长表：索引节点表、目录、打开文件表都建立在它之上。

/// 表中的一个槽位
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Free,
    Occupied(T),
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Self::Free => None,
            Self::Occupied(value) => Some(value),
        }
    }

    #[inline]
    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Free => None,
            Self::Occupied(value) => Some(value),
        }
    }

    /// 取出记录，槽位变为空闲
    #[inline]
    pub fn take(&mut self) -> Option<T> {
        match core::mem::replace(self, Self::Free) {
            Self::Free => None,
            Self::Occupied(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Free, Self::Occupied)
    }
}

/// 编号最小的空闲槽位
#[inline]
pub fn first_free<T>(slots: &[Slot<T>]) -> Option<usize> {
    slots.iter().position(Slot::is_free)
}
