//! Append-only growable buffer reused across rebuild cycles.
//!
//! [`GrowBuffer`] is a thin wrapper over `Vec<T>` with an explicit
//! reservation policy: [`set_capacity`](GrowBuffer::set_capacity) sizes it
//! once per rebuild, [`reset`](GrowBuffer::reset) empties it without giving
//! memory back, and [`push`](GrowBuffer::push) only grows (by doubling) when
//! a cycle outruns the reservation. The backing allocation survives every
//! reset, so steady-state cycles never touch the heap.

use std::ops::Index;

/// Amortized-growth append-only sequence.
#[derive(Clone, Debug)]
pub struct GrowBuffer<T> {
    items: Vec<T>,
}

impl<T> GrowBuffer<T> {
    /// Default reservation when none is given.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Create an empty buffer with [`DEFAULT_CAPACITY`](Self::DEFAULT_CAPACITY).
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty buffer with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Append an item, doubling the reservation if it is exhausted.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.items.capacity() {
            let target = self.items.capacity().max(1).saturating_mul(2);
            self.items.reserve_exact(target - self.items.len());
        }
        self.items.push(item);
    }

    /// Re-size the reservation to exactly `capacity` items.
    ///
    /// Items beyond `capacity` are dropped; surviving items keep their order.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.items.truncate(capacity);
        if self.items.capacity() > capacity {
            self.items.shrink_to(capacity);
        } else {
            self.items.reserve_exact(capacity - self.items.len());
        }
    }

    /// Drop every item but keep the backing allocation.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Number of items currently stored.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reserved slot count.
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Item at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Most recently pushed item.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Iterate items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Stored items as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for GrowBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for GrowBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a GrowBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut buf = GrowBuffer::with_capacity(2);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
        assert_eq!(buf[1], 2);
        assert_eq!(buf.last(), Some(&3));
    }

    #[test]
    fn grows_by_doubling_when_full() {
        let mut buf = GrowBuffer::with_capacity(4);
        for i in 0..5 {
            buf.push(i);
        }
        assert!(buf.capacity() >= 8);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn zero_capacity_still_grows() {
        let mut buf = GrowBuffer::with_capacity(0);
        buf.push('a');
        assert_eq!(buf.len(), 1);
        assert!(buf.capacity() >= 1);
    }

    #[test]
    fn reset_keeps_allocation() {
        let mut buf = GrowBuffer::with_capacity(32);
        for i in 0..20 {
            buf.push(i);
        }
        let cap = buf.capacity();
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), cap);
    }

    #[test]
    fn set_capacity_truncates_and_reserves() {
        let mut buf = GrowBuffer::with_capacity(2);
        buf.push(10);
        buf.push(20);
        buf.push(30);
        buf.set_capacity(2);
        assert_eq!(buf.as_slice(), &[10, 20]);

        buf.set_capacity(64);
        assert!(buf.capacity() >= 64);
        assert_eq!(buf.as_slice(), &[10, 20]);
    }

    #[test]
    fn steady_state_push_does_not_reallocate() {
        let mut buf = GrowBuffer::with_capacity(0);
        buf.set_capacity(8);
        let cap = buf.capacity();
        for _ in 0..3 {
            for i in 0..8 {
                buf.push(i);
            }
            buf.reset();
        }
        assert_eq!(buf.capacity(), cap);
    }
}
