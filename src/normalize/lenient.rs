//! 宽松的字段解码
//!
//! 业务字段缺失、为 null 或类型不符时都回落为默认值，不让整个解析失败。

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// 任意数值，非数值读作 0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Num(pub f64);

impl Num {
    pub fn f32(self) -> f32 {
        self.0 as f32
    }

    pub fn i32(self) -> i32 {
        self.0 as i32
    }

    pub fn i64(self) -> i64 {
        self.0 as i64
    }
}

struct NumVisitor;

impl<'de> Visitor<'de> for NumVisitor {
    type Value = Num;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_i64<E>(self, v: i64) -> Result<Num, E> {
        Ok(Num(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Num, E> {
        Ok(Num(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Num, E> {
        Ok(Num(v))
    }

    fn visit_bool<E>(self, _: bool) -> Result<Num, E> {
        Ok(Num::default())
    }

    fn visit_str<E>(self, v: &str) -> Result<Num, E> {
        Ok(Num(v.trim().parse().unwrap_or_default()))
    }

    fn visit_unit<E>(self) -> Result<Num, E> {
        Ok(Num::default())
    }

    fn visit_none<E>(self) -> Result<Num, E> {
        Ok(Num::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Num, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Num::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Num, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Num::default())
    }
}

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumVisitor)
    }
}

/// 最多保留 `N` 个字符的文本，非字符串读作空串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text<const N: usize>(pub String);

impl<const N: usize> Text<N> {
    pub fn into_string(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct TextVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for TextVisitor<N> {
    type Value = Text<N>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_str<E>(self, v: &str) -> Result<Text<N>, E> {
        Ok(Text(v.chars().take(N).collect()))
    }

    fn visit_i64<E>(self, _: i64) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_u64<E>(self, _: u64) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_f64<E>(self, _: f64) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_bool<E>(self, _: bool) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_unit<E>(self) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_none<E>(self) -> Result<Text<N>, E> {
        Ok(Text::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Text<N>, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Text::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Text<N>, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Text::default())
    }
}

impl<'de, const N: usize> Deserialize<'de> for Text<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TextVisitor::<N>)
    }
}

/// 对象字段，非对象读作默认值
///
/// 用于 `rain: {"1h": ..}` 这类可能缺失或类型不符的嵌套对象。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Obj<T>(pub T);

impl<'de, T> Deserialize<'de> for Obj<T>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de> + Default> Visitor<'de> for ObjVisitor<T> {
            type Value = Obj<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("any JSON value")
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Obj<T>, A::Error> {
                T::deserialize(serde::de::value::MapAccessDeserializer::new(map)).map(Obj)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Obj<T>, A::Error> {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(Obj(T::default()))
            }

            fn visit_i64<E>(self, _: i64) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }

            fn visit_u64<E>(self, _: u64) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }

            fn visit_f64<E>(self, _: f64) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }

            fn visit_bool<E>(self, _: bool) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }

            fn visit_str<E>(self, _: &str) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }

            fn visit_unit<E>(self) -> Result<Obj<T>, E> {
                Ok(Obj(T::default()))
            }
        }

        deserializer.deserialize_any(ObjVisitor(PhantomData))
    }
}

/// 只保留最后 `N` 个元素的数组，非数组读作空
///
/// 时间序列按时间升序排列，超长时丢弃最旧的点，保证最新数据总在末尾。
#[derive(Debug, Clone, PartialEq)]
pub struct Tail<T, const N: usize>(VecDeque<T>);

impl<T, const N: usize> Default for Tail<T, N> {
    fn default() -> Self {
        Tail(VecDeque::new())
    }
}

impl<T, const N: usize> Tail<T, N> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.0.iter()
    }
}

impl<'de, T, const N: usize> Deserialize<'de> for Tail<T, N>
where
    T: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TailVisitor<T, const N: usize>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>, const N: usize> Visitor<'de> for TailVisitor<T, N> {
            type Value = Tail<T, N>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("any JSON value")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tail<T, N>, A::Error> {
                let mut items = VecDeque::with_capacity(N.min(seq.size_hint().unwrap_or(0)));
                while let Some(item) = seq.next_element::<T>()? {
                    if N == 0 {
                        continue;
                    }
                    if items.len() == N {
                        items.pop_front();
                    }
                    items.push_back(item);
                }
                Ok(Tail(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tail<T, N>, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(Tail::default())
            }

            fn visit_i64<E>(self, _: i64) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }

            fn visit_u64<E>(self, _: u64) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }

            fn visit_f64<E>(self, _: f64) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }

            fn visit_bool<E>(self, _: bool) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }

            fn visit_str<E>(self, _: &str) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }

            fn visit_unit<E>(self) -> Result<Tail<T, N>, E> {
                Ok(Tail::default())
            }
        }

        deserializer.deserialize_any(TailVisitor::<T, N>(PhantomData))
    }
}
