use std::collections::VecDeque;

/// Unbounded FIFO carrying one element per transfer, the software stand-in for a
/// hardware stream channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream<T> {
    fifo: VecDeque<T>,
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Self { fifo: VecDeque::new() }
    }
}

impl<T> Stream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self { fifo: VecDeque::with_capacity(n) }
    }

    pub fn write(&mut self, value: T) {
        self.fifo.push_back(value);
    }

    /// Pops the oldest element, `None` when empty.
    pub fn read(&mut self) -> Option<T> {
        self.fifo.pop_front()
    }

    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// Removes and returns the `n` oldest elements, or nothing if fewer are queued.
    pub fn read_n(&mut self, n: usize) -> Option<Vec<T>> {
        if self.fifo.len() < n { return None; }
        Some(self.fifo.drain(..n).collect())
    }
}

impl<T> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { fifo: iter.into_iter().collect() }
    }
}

impl<T> Extend<T> for Stream<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.fifo.extend(iter);
    }
}

impl<T> IntoIterator for Stream<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.fifo.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_and_partial_reads() {
        let mut s: Stream<u8> = (1..=3).collect();
        assert_eq!(s.read_n(4), None);
        assert_eq!(s.len(), 3);
        assert_eq!(s.read(), Some(1));
        s.write(9);
        assert_eq!(s.read_n(3), Some(vec![2, 3, 9]));
        assert!(s.is_empty());
        assert_eq!(s.read(), None);
    }
}
