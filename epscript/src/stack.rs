use crate::{MachineError, MachineResult};

/// LIFO stack used for operands, dictionaries and graphics states.
#[derive(Debug, Clone)]
pub struct Stack<T> {
    items: Vec<T>,
    underflow: MachineError,
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self::with_underflow(MachineError::StackUnderflow)
    }

    /// Create a stack that reports `underflow` when popped or peeked empty.
    pub fn with_underflow(underflow: MachineError) -> Self {
        Self {
            items: Vec::new(),
            underflow,
        }
    }

    pub fn push(&mut self, v: T) {
        self.items.push(v);
    }

    pub fn pop(&mut self) -> MachineResult<T> {
        self.items.pop().ok_or_else(|| self.underflow.clone())
    }

    pub fn top(&self) -> MachineResult<&T> {
        self.items.last().ok_or_else(|| self.underflow.clone())
    }

    pub fn top_mut(&mut self) -> MachineResult<&mut T> {
        let underflow = &self.underflow;
        self.items.last_mut().ok_or_else(|| underflow.clone())
    }

    /// Peek item at `index` counting from top, 0 is the top item.
    pub fn peek(&self, index: usize) -> MachineResult<&T> {
        self.items
            .len()
            .checked_sub(index + 1)
            .and_then(|i| self.items.get(i))
            .ok_or_else(|| self.underflow.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drop items above `len`.
    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Remove the top `n` items, returned in stack order (bottom first).
    pub fn pop_n(&mut self, n: usize) -> MachineResult<Vec<T>> {
        let start = self
            .items
            .len()
            .checked_sub(n)
            .ok_or_else(|| self.underflow.clone())?;
        Ok(self.items.drain(start..).collect())
    }

    /// Keep only items matching `f`, preserving relative order.
    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
    }

    /// Iterate from bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}
