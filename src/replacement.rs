//! Image cache replacement policies.
//!
//! A [`ReplacementPolicy`] decides which cached image is evicted next. The
//! policies only encode ordering rules; storage of the `(id, size)` records
//! is delegated to a [`ReplacementManager`], so the same policy can run over
//! different list representations.
//!
//! | Policy | add | remove |
//! |--------|-----|--------|
//! | Dummy  | front | never evicts |
//! | Greedy | sorted by size, ascending | back (largest) |
//! | FIFO   | front | back (oldest) |
//! | LRU    | front, `bump` moves to front | back (least recently used) |

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Identifier of an image resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Storage services used by the replacement policies.
pub trait ReplacementManager {
    /// Add an image as the first item.
    fn add_at_front(&mut self, id: ImageId, size: usize) -> bool;

    /// Add an image before the first item that is strictly larger.
    fn add_sorted_by_size(&mut self, id: ImageId, size: usize) -> bool;

    /// Move an image to the front.
    fn bring_to_front(&mut self, id: ImageId) -> bool;

    fn contains(&self, id: ImageId) -> bool;

    /// Accumulated size of all items.
    fn size(&self) -> usize;

    /// Number of items.
    fn quantity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.quantity() == 0
    }

    /// Remove a specific image.
    fn remove(&mut self, id: ImageId) -> bool;

    /// Remove the last item.
    fn remove_from_end(&mut self) -> Option<ImageId>;

    /// Items from front to back.
    fn entries(&self) -> Vec<(ImageId, usize)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    id: ImageId,
    size: usize,
}

/// [`ReplacementManager`] over a double-ended list.
///
/// An optional record limit models a fixed pool of list nodes: once it is
/// reached, adds fail.
#[derive(Debug, Clone, Default)]
pub struct ListReplacementManager {
    items: VecDeque<CacheEntry>,
    total: usize,
    limit: Option<usize>,
}

impl ListReplacementManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            items: VecDeque::new(),
            total: 0,
            limit: Some(limit),
        }
    }

    fn position(&self, id: ImageId) -> Option<usize> {
        self.items.iter().position(|e| e.id == id)
    }

    fn reserve_one(&mut self, id: ImageId) -> bool {
        if self.position(id).is_some() {
            log::warn!("image {} is already in the replacement list", id);
            return false;
        }
        if self.limit.map_or(false, |limit| self.items.len() >= limit) {
            log::warn!("replacement list is full, image {} refused", id);
            return false;
        }
        if self.items.try_reserve(1).is_err() {
            log::warn!("out of memory for replacement list entry {}", id);
            return false;
        }
        true
    }
}

impl ReplacementManager for ListReplacementManager {
    fn add_at_front(&mut self, id: ImageId, size: usize) -> bool {
        if !self.reserve_one(id) {
            return false;
        }
        self.items.push_front(CacheEntry { id, size });
        self.total += size;
        true
    }

    fn add_sorted_by_size(&mut self, id: ImageId, size: usize) -> bool {
        if !self.reserve_one(id) {
            return false;
        }
        let at = self
            .items
            .iter()
            .position(|e| e.size > size)
            .unwrap_or(self.items.len());
        self.items.insert(at, CacheEntry { id, size });
        self.total += size;
        true
    }

    fn bring_to_front(&mut self, id: ImageId) -> bool {
        match self.position(id) {
            Some(0) => true,
            Some(i) => match self.items.remove(i) {
                Some(entry) => {
                    self.items.push_front(entry);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn contains(&self, id: ImageId) -> bool {
        self.position(id).is_some()
    }

    fn size(&self) -> usize {
        self.total
    }

    fn quantity(&self) -> usize {
        self.items.len()
    }

    fn remove(&mut self, id: ImageId) -> bool {
        match self.position(id).and_then(|i| self.items.remove(i)) {
            Some(entry) => {
                self.total -= entry.size;
                true
            }
            None => false,
        }
    }

    fn remove_from_end(&mut self) -> Option<ImageId> {
        let entry = self.items.pop_back()?;
        self.total -= entry.size;
        Some(entry.id)
    }

    fn entries(&self) -> Vec<(ImageId, usize)> {
        self.items.iter().map(|e| (e.id, e.size)).collect()
    }
}

// ============================================================================
// Policies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum ReplacementPolicyType {
    /// Images can be added but are never evicted.
    Dummy = 0,
    /// Largest image first.
    Greedy = 1,
    /// First in, first out.
    Fifo = 2,
    /// Least recently used.
    #[default]
    Lru = 3,
}

impl ReplacementPolicyType {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Dummy),
            1 => Some(Self::Greedy),
            2 => Some(Self::Fifo),
            3 => Some(Self::Lru),
            _ => None,
        }
    }
}

impl fmt::Display for ReplacementPolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dummy => "dummy",
            Self::Greedy => "greedy",
            Self::Fifo => "fifo",
            Self::Lru => "lru",
        };
        f.write_str(name)
    }
}

/// Eviction strategy over a [`ReplacementManager`].
pub trait ReplacementPolicy {
    /// Add an image in the order this policy keeps.
    fn add(&mut self, id: ImageId, size: usize) -> bool;

    /// Remove and return the image to evict next, `None` if there is none.
    fn remove(&mut self) -> Option<ImageId>;

    /// Mark an image as recently used. Only LRU does anything here.
    fn bump(&mut self, _id: ImageId) -> bool {
        false
    }

    fn policy_type(&self) -> ReplacementPolicyType;

    fn manager(&self) -> &dyn ReplacementManager;

    fn manager_mut(&mut self) -> &mut dyn ReplacementManager;
}

impl fmt::Debug for dyn ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplacementPolicy")
            .field("type", &self.policy_type())
            .field("quantity", &self.manager().quantity())
            .field("size", &self.manager().size())
            .finish()
    }
}

macro_rules! policy_manager_access {
    () => {
        fn manager(&self) -> &dyn ReplacementManager {
            self.manager.as_ref()
        }

        fn manager_mut(&mut self) -> &mut dyn ReplacementManager {
            self.manager.as_mut()
        }
    };
}

pub struct DummyPolicy {
    manager: Box<dyn ReplacementManager>,
}

impl DummyPolicy {
    pub fn new(manager: Box<dyn ReplacementManager>) -> Self {
        Self { manager }
    }
}

impl ReplacementPolicy for DummyPolicy {
    fn add(&mut self, id: ImageId, size: usize) -> bool {
        self.manager.add_at_front(id, size)
    }

    fn remove(&mut self) -> Option<ImageId> {
        None
    }

    fn policy_type(&self) -> ReplacementPolicyType {
        ReplacementPolicyType::Dummy
    }

    policy_manager_access!();
}

pub struct GreedyPolicy {
    manager: Box<dyn ReplacementManager>,
}

impl GreedyPolicy {
    pub fn new(manager: Box<dyn ReplacementManager>) -> Self {
        Self { manager }
    }
}

impl ReplacementPolicy for GreedyPolicy {
    fn add(&mut self, id: ImageId, size: usize) -> bool {
        self.manager.add_sorted_by_size(id, size)
    }

    fn remove(&mut self) -> Option<ImageId> {
        self.manager.remove_from_end()
    }

    fn policy_type(&self) -> ReplacementPolicyType {
        ReplacementPolicyType::Greedy
    }

    policy_manager_access!();
}

pub struct FifoPolicy {
    manager: Box<dyn ReplacementManager>,
}

impl FifoPolicy {
    pub fn new(manager: Box<dyn ReplacementManager>) -> Self {
        Self { manager }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn add(&mut self, id: ImageId, size: usize) -> bool {
        self.manager.add_at_front(id, size)
    }

    fn remove(&mut self) -> Option<ImageId> {
        self.manager.remove_from_end()
    }

    fn policy_type(&self) -> ReplacementPolicyType {
        ReplacementPolicyType::Fifo
    }

    policy_manager_access!();
}

pub struct LruPolicy {
    manager: Box<dyn ReplacementManager>,
}

impl LruPolicy {
    pub fn new(manager: Box<dyn ReplacementManager>) -> Self {
        Self { manager }
    }
}

impl ReplacementPolicy for LruPolicy {
    fn add(&mut self, id: ImageId, size: usize) -> bool {
        self.manager.add_at_front(id, size)
    }

    fn remove(&mut self) -> Option<ImageId> {
        self.manager.remove_from_end()
    }

    fn bump(&mut self, id: ImageId) -> bool {
        self.manager.bring_to_front(id)
    }

    fn policy_type(&self) -> ReplacementPolicyType {
        ReplacementPolicyType::Lru
    }

    policy_manager_access!();
}

/// Build the policy selected by `ty` over `manager`.
pub fn create_replacement_policy(
    ty: ReplacementPolicyType,
    manager: Box<dyn ReplacementManager>,
) -> Box<dyn ReplacementPolicy> {
    match ty {
        ReplacementPolicyType::Dummy => Box::new(DummyPolicy::new(manager)),
        ReplacementPolicyType::Greedy => Box::new(GreedyPolicy::new(manager)),
        ReplacementPolicyType::Fifo => Box::new(FifoPolicy::new(manager)),
        ReplacementPolicyType::Lru => Box::new(LruPolicy::new(manager)),
    }
}

// ============================================================================
// Tests
// ============================================================================
