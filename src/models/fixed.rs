use serde::de::{Deserialize, Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

/// 容量固定的顺序缓冲区
///
/// 超出容量的写入被拒绝而不是报错；反序列化时只保留前 `N` 个元素，
/// 其余元素以 `IgnoredAny` 跳过，不占用内存。
#[derive(Debug, Clone, PartialEq)]
pub struct FixedVec<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> FixedVec<T, N> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(N),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= N
    }

    /// 追加一个元素，缓冲区已满时返回 false
    pub fn push(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// 清空内容，保留已分配的空间
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T, const N: usize> Default for FixedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for FixedVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T, const N: usize> FromIterator<T> for FixedVec<T, N> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new();
        for item in iter.into_iter().take(N) {
            out.items.push(item);
        }
        out
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a FixedVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T, const N: usize> IntoIterator for FixedVec<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T: Serialize, const N: usize> Serialize for FixedVec<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

struct FixedVecVisitor<T, const N: usize>(PhantomData<T>);

impl<'de, T: Deserialize<'de>, const N: usize> Visitor<'de> for FixedVecVisitor<T, N> {
    type Value = FixedVec<T, N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a sequence (first {} elements kept)", N)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = FixedVec::new();
        while !out.is_full() {
            match seq.next_element::<T>()? {
                Some(item) => {
                    out.items.push(item);
                }
                None => return Ok(out),
            }
        }
        // 截断：剩余元素只扫描不保存
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(out)
    }

    // 非数组一律视为空序列
    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_bool<E>(self, _: bool) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_i64<E>(self, _: i64) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_u64<E>(self, _: u64) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_f64<E>(self, _: f64) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_str<E>(self, _: &str) -> Result<Self::Value, E> {
        Ok(FixedVec::new())
    }

    fn visit_map<A: serde::de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(FixedVec::new())
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for FixedVec<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FixedVecVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_refuses_past_capacity() {
        let mut buf: FixedVec<u32, 2> = FixedVec::new();
        assert!(buf.push(1));
        assert!(buf.push(2));
        assert!(!buf.push(3));
        assert_eq!(buf.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_deserialize_truncates_without_error() {
        let buf: FixedVec<u32, 3> = serde_json::from_str("[1, 2, 3, 4, 5]").unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_deserialize_skipped_tail_may_be_heterogeneous() {
        let buf: FixedVec<u32, 1> =
            serde_json::from_str(r#"[7, {"long": "text"}, "x", [1, 2]]"#).unwrap();
        assert_eq!(buf.as_slice(), &[7]);
    }

    #[test]
    fn test_deserialize_non_array_is_empty() {
        let buf: FixedVec<u32, 4> = serde_json::from_str("null").unwrap();
        assert!(buf.is_empty());
        let buf: FixedVec<u32, 4> = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf: FixedVec<u8, 8> = (0..8).collect();
        assert!(buf.is_full());
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 8);
    }
}
