// Tue Jan 13 2026 - Alex

use crate::output::buffer::ShardBuffer;
use ahash::AHashMap;
use std::any::Any;

pub trait ShardLogic: Send + Sync + 'static {
    type Shard: Send + 'static;
    type Data: Send + 'static;
    type Output: Send + 'static;

    fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn map(&self, ctx: &mut ShardContext<'_, Self::Shard, Self::Data>) -> anyhow::Result<Self::Output>;

    /// The cross-shard combine step. Logic that returns `None` cannot be run
    /// by the hierarchical scheduler.
    fn tree_reducible(&self) -> Option<&dyn TreeReducible<Self::Output>>;

    fn on_done(&self, result: Option<&Self::Output>) {
        let _ = result;
    }
}

/// `lhs` always covers shards that precede those covered by `rhs`, so the
/// operator need not be commutative.
pub trait TreeReducible<T>: Send + Sync {
    fn tree_reduce(&self, lhs: T, rhs: T) -> anyhow::Result<T>;
}

pub trait DataProvider<S>: Send + Sync + 'static {
    type Data: Send + 'static;

    fn provide(&self, shard: &S) -> anyhow::Result<Self::Data>;
}

impl<S, D, F> DataProvider<S> for F
where
    F: Fn(&S) -> anyhow::Result<D> + Send + Sync + 'static,
    D: Send + 'static,
{
    type Data = D;

    fn provide(&self, shard: &S) -> anyhow::Result<D> {
        self(shard)
    }
}

pub struct ShardContext<'a, S, D> {
    index: usize,
    shard: &'a S,
    data: D,
    output: &'a mut ShardBuffer,
    memo: &'a mut TaskMemo,
}

impl<'a, S, D> ShardContext<'a, S, D> {
    pub fn new(
        index: usize,
        shard: &'a S,
        data: D,
        output: &'a mut ShardBuffer,
        memo: &'a mut TaskMemo,
    ) -> Self {
        Self {
            index,
            shard,
            data,
            output,
            memo,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn shard(&self) -> &S {
        self.shard
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    pub fn output(&mut self) -> &mut ShardBuffer {
        self.output
    }

    pub fn memo(&mut self) -> &mut TaskMemo {
        self.memo
    }

    pub fn parts(&mut self) -> (&D, &mut ShardBuffer, &mut TaskMemo) {
        (&self.data, &mut *self.output, &mut *self.memo)
    }
}

#[derive(Default)]
pub struct TaskMemo {
    entries: AHashMap<u64, Box<dyn Any + Send>>,
    hits: u64,
    misses: u64,
}

impl TaskMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<V: Any + Send>(&self, key: u64) -> Option<&V> {
        self.entries.get(&key).and_then(|v| v.downcast_ref::<V>())
    }

    pub fn insert<V: Any + Send>(&mut self, key: u64, value: V) {
        self.entries.insert(key, Box::new(value));
    }

    /// Returns the cached value for `key`, computing it on first use.
    /// A cached value of a different type is replaced.
    pub fn get_or_insert_with<V, F>(&mut self, key: u64, compute: F) -> &V
    where
        V: Any + Send,
        F: FnOnce() -> V,
    {
        let cached = self
            .entries
            .get(&key)
            .map(|v| v.is::<V>())
            .unwrap_or(false);

        if cached {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries.insert(key, Box::new(compute()));
        }

        self.entries
            .get(&key)
            .and_then(|v| v.downcast_ref::<V>())
            .expect("memo entry inserted above with matching type")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_computes_once() {
        let mut memo = TaskMemo::new();
        let mut calls = 0;

        for _ in 0..3 {
            let value = *memo.get_or_insert_with(9, || {
                calls += 1;
                81u32
            });
            assert_eq!(value, 81);
        }

        assert_eq!(calls, 1);
        assert_eq!(memo.hits(), 2);
        assert_eq!(memo.misses(), 1);
    }

    #[test]
    fn test_memo_type_mismatch_replaces_entry() {
        let mut memo = TaskMemo::new();
        memo.insert(1, "text");
        assert_eq!(memo.get::<u32>(1), None);

        assert_eq!(*memo.get_or_insert_with(1, || 5u32), 5);
        assert_eq!(memo.get::<u32>(1), Some(&5));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_closure_data_provider() {
        let provider = |shard: &usize| -> anyhow::Result<Vec<usize>> { Ok(vec![*shard; 2]) };
        assert_eq!(provider.provide(&4).unwrap(), vec![4, 4]);
    }

    #[test]
    fn test_context_accessors() {
        let mut output = ShardBuffer::new();
        let mut memo = TaskMemo::new();
        let shard = "chr1";
        let mut ctx = ShardContext::new(2, &shard, 10u32, &mut output, &mut memo);

        assert_eq!(ctx.index(), 2);
        assert_eq!(*ctx.shard(), "chr1");
        *ctx.data_mut() += 1;

        let (data, out, memo) = ctx.parts();
        out.push_str(&data.to_string());
        memo.insert(0, ());

        assert_eq!(output.as_bytes(), b"11");
    }
}
