// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// A node of the list. Free slots keep no value and are chained through `next`.
#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A doubly linked list stored in a slab, ordered from most to least recently
/// used.
///
/// Handles returned by [`push_front`](Self::push_front) stay valid until the
/// value is removed. Removed slots are reused before the slab grows.
#[derive(Debug)]
pub(crate) struct LruList<T> {
    nodes: Vec<Node<T>>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Option<usize>,
    len: usize,
}

impl<T> Default for LruList<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
            free: None,
            len: 0,
        }
    }
}

impl<T> LruList<T> {
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, handle: usize) -> Option<&T> {
        self.nodes.get(handle)?.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self, handle: usize) -> Option<&mut T> {
        self.nodes.get_mut(handle)?.value.as_mut()
    }

    /// Inserts `value` as the most recently used entry.
    pub(crate) fn push_front(&mut self, value: T) -> usize {
        self.insert_before(self.head, value)
    }

    /// Inserts `value` just ahead of `next` in recency, or as the least recently
    /// used entry when `next` is `None`.
    pub(crate) fn insert_before(&mut self, next: Option<usize>, value: T) -> usize {
        let next = next.filter(|&handle| self.get(handle).is_some());
        let prev = match next {
            Some(next) => self.nodes[next].prev,
            None => self.tail,
        };
        let node = Node {
            value: Some(value),
            prev,
            next,
        };
        let handle = match self.free {
            Some(handle) => {
                self.free = self.nodes[handle].next;
                self.nodes[handle] = node;
                handle
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        match prev {
            Some(prev) => self.nodes[prev].next = Some(handle),
            None => self.head = Some(handle),
        }
        match next {
            Some(next) => self.nodes[next].prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.len += 1;
        handle
    }

    /// Removes the entry at `handle`.
    pub(crate) fn remove(&mut self, handle: usize) -> Option<T> {
        let value = self.nodes.get_mut(handle)?.value.take()?;
        self.unlink(handle);
        self.nodes[handle].next = self.free;
        self.free = Some(handle);
        self.len -= 1;
        Some(value)
    }

    /// Marks the entry at `handle` as the most recently used.
    pub(crate) fn touch(&mut self, handle: usize) {
        if self.head == Some(handle) || self.get(handle).is_none() {
            return;
        }
        self.unlink(handle);
        let node = &mut self.nodes[handle];
        node.prev = None;
        node.next = self.head;
        if let Some(head) = self.head {
            self.nodes[head].prev = Some(handle);
        }
        self.head = Some(handle);
        if self.tail.is_none() {
            self.tail = Some(handle);
        }
    }

    /// Removes the most recently used entry.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        self.remove(self.head?)
    }

    /// The least recently used entry.
    pub(crate) fn back(&self) -> Option<(usize, &T)> {
        let tail = self.tail?;
        Some((tail, self.get(tail)?))
    }

    /// Entries from most to least recently used.
    pub(crate) fn iter_mru(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let handle = cursor?;
            let node = &self.nodes[handle];
            cursor = node.next;
            Some((handle, node.value.as_ref()?))
        })
    }

    /// Entries from least to most recently used.
    #[cfg(test)]
    pub(crate) fn iter_lru(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let mut cursor = self.tail;
        core::iter::from_fn(move || {
            let handle = cursor?;
            let node = &self.nodes[handle];
            cursor = node.prev;
            Some((handle, node.value.as_ref()?))
        })
    }

    fn unlink(&mut self, handle: usize) {
        let (prev, next) = (self.nodes[handle].prev, self.nodes[handle].next);
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
    }
}
