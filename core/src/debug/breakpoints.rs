use std::collections::BTreeMap;

/// A breakpoint record. Only `execution` breakpoints stop the engine; the
/// access flags are carried for tools that display or edit them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub address: u16,
    /// Memory partition the address must be paged from; `None` matches any.
    pub partition: Option<i32>,
    pub execution: bool,
    pub read: bool,
    pub write: bool,
    pub io_read: bool,
    pub io_write: bool,
    /// Cached disassembly text for display.
    pub disassembly: Option<String>,
}

impl Breakpoint {
    /// Execution breakpoint at `address` in any partition.
    pub fn execution(address: u16) -> Self {
        Self {
            address,
            partition: None,
            execution: true,
            read: false,
            write: false,
            io_read: false,
            io_write: false,
            disassembly: None,
        }
    }

    pub fn in_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn key(&self) -> (u16, Option<i32>) {
        (self.address, self.partition)
    }
}

/// Breakpoints keyed by (address, partition); at most one record per key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BreakpointSet {
    map: BTreeMap<(u16, Option<i32>), Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns false when an identical record was already present.
    pub fn insert(&mut self, breakpoint: Breakpoint) -> bool {
        match self.map.insert(breakpoint.key(), breakpoint.clone()) {
            Some(previous) => previous != breakpoint,
            None => true,
        }
    }

    /// Returns false when nothing was stored under the key.
    pub fn remove(&mut self, address: u16, partition: Option<i32>) -> bool {
        self.map.remove(&(address, partition)).is_some()
    }

    /// Returns false when the set was already empty.
    pub fn clear(&mut self) -> bool {
        let changed = !self.map.is_empty();
        self.map.clear();
        changed
    }

    pub fn get(&self, address: u16, partition: Option<i32>) -> Option<&Breakpoint> {
        self.map.get(&(address, partition))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.map.values()
    }

    /// True if an execution breakpoint matches `address` while `partition` is paged in.
    pub fn should_break(&self, address: u16, partition: i32) -> bool {
        if self.map.is_empty() {
            return false;
        }
        [None, Some(partition)]
            .iter()
            .any(|p| self.map.get(&(address, *p)).is_some_and(|bp| bp.execution))
    }
}
