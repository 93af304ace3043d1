//! Image cache with a byte budget.
//!
//! The cache tracks images currently in use (used list) and loaded images
//! that nobody references right now (free list). Images are loaded until the
//! size limit is reached; after that, room is made by unloading images from
//! the free list in the order chosen by its [`ReplacementPolicy`]. Used
//! images are never evicted.
//!
//! The cache owns only the bookkeeping. Pixel data belongs to the
//! [`ImageLoader`].

use crate::config::{ImageCacheSettings, DEFAULT_CACHE_SIZE};
use crate::error::CacheError;
use crate::replacement::{
    create_replacement_policy, ImageId, ListReplacementManager, ReplacementPolicy,
    ReplacementPolicyType,
};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Backend that brings image data in and out of memory.
pub trait ImageLoader {
    /// Bytes the image occupies once loaded.
    fn image_size(&self, path: &Path, id: ImageId) -> Result<usize, CacheError>;

    fn load(&mut self, path: &Path, id: ImageId) -> Result<(), CacheError>;

    fn unload(&mut self, id: ImageId);
}

fn new_policy(ty: ReplacementPolicyType) -> Box<dyn ReplacementPolicy> {
    create_replacement_policy(ty, Box::new(ListReplacementManager::new()))
}

pub struct ImageCache<L: ImageLoader> {
    loader: L,
    size_limit: usize,
    used: Box<dyn ReplacementPolicy>,
    free: Box<dyn ReplacementPolicy>,
    sizes: HashMap<ImageId, usize>,
    last_accessed: Option<ImageId>,
}

impl<L: ImageLoader> fmt::Debug for ImageCache<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("size_limit", &self.size_limit)
            .field("used", &self.used)
            .field("free", &self.free)
            .finish()
    }
}

impl<L: ImageLoader> ImageCache<L> {
    /// 100 MiB cache with LRU for both lists.
    pub fn new(loader: L) -> Self {
        Self::with_policies(
            loader,
            DEFAULT_CACHE_SIZE,
            ReplacementPolicyType::Lru,
            ReplacementPolicyType::Lru,
        )
    }

    pub fn with_policies(
        loader: L,
        size_limit: usize,
        used: ReplacementPolicyType,
        free: ReplacementPolicyType,
    ) -> Self {
        Self {
            loader,
            size_limit,
            used: new_policy(used),
            free: new_policy(free),
            sizes: HashMap::new(),
            last_accessed: None,
        }
    }

    pub fn from_settings(loader: L, settings: &ImageCacheSettings) -> Self {
        log::info!(
            "image cache for {}: {} bytes, used {}, free {}",
            settings.resolution,
            settings.cache_size,
            settings.replacement_used,
            settings.replacement_free
        );
        Self::with_policies(
            loader,
            settings.cache_size,
            settings.replacement_used,
            settings.replacement_free,
        )
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn cache_size_limit(&self) -> usize {
        self.size_limit
    }

    /// Bytes held by loaded images, used and free.
    pub fn current_memory_usage(&self) -> usize {
        self.used.manager().size() + self.free.manager().size()
    }

    pub fn used_list_size(&self) -> usize {
        self.used.manager().quantity()
    }

    pub fn free_list_size(&self) -> usize {
        self.free.manager().quantity()
    }

    /// Size of a loaded image, `None` if it is not in the cache.
    pub fn image_size(&self, id: ImageId) -> Option<usize> {
        self.sizes.get(&id).copied()
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.sizes.contains_key(&id)
    }

    pub fn is_used(&self, id: ImageId) -> bool {
        self.used.manager().contains(id)
    }

    pub fn used_policy_type(&self) -> ReplacementPolicyType {
        self.used.policy_type()
    }

    pub fn free_policy_type(&self) -> ReplacementPolicyType {
        self.free.policy_type()
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Load an image for immediate use, evicting free images if needed.
    pub fn load_image(&mut self, path: &Path, id: ImageId) -> Result<(), CacheError> {
        if self.contains(id) {
            self.mark_as_used(id);
            return Ok(());
        }

        let size = self.loader.image_size(path, id)?;
        if size > self.size_limit {
            return Err(CacheError::ImageTooLarge {
                id,
                size,
                limit: self.size_limit,
            });
        }

        let needed = (self.current_memory_usage() + size).saturating_sub(self.size_limit);
        if needed > 0 && !self.free_space(needed) {
            return Err(CacheError::CacheFull { id, needed });
        }

        self.loader.load(path, id)?;
        if !self.used.add(id, size) {
            self.loader.unload(id);
            return Err(CacheError::PolicyRefused(id));
        }
        self.sizes.insert(id, size);
        log::debug!("loaded image {} ({} bytes)", id, size);
        Ok(())
    }

    /// Load an image into the free list for later use. Never evicts.
    pub fn preload_image(&mut self, path: &Path, id: ImageId) -> Result<(), CacheError> {
        if self.contains(id) {
            return Ok(());
        }

        let size = self.loader.image_size(path, id)?;
        let usage = self.current_memory_usage();
        if usage + size > self.size_limit {
            return Err(CacheError::CacheFull {
                id,
                needed: usage + size - self.size_limit,
            });
        }

        self.loader.load(path, id)?;
        if !self.free.add(id, size) {
            self.loader.unload(id);
            return Err(CacheError::PolicyRefused(id));
        }
        self.sizes.insert(id, size);
        log::debug!("preloaded image {} ({} bytes)", id, size);
        Ok(())
    }

    /// Unload free images until `bytes` have been released.
    ///
    /// Returns `false` if the free list ran out first; whatever was evicted
    /// up to that point stays evicted.
    pub fn free_space(&mut self, bytes: usize) -> bool {
        let mut freed = 0;
        while freed < bytes {
            let Some(id) = self.free.remove() else {
                log::debug!("freed {} of {} requested bytes", freed, bytes);
                return false;
            };
            let size = self.sizes.remove(&id).unwrap_or(0);
            self.loader.unload(id);
            if self.last_accessed == Some(id) {
                self.last_accessed = None;
            }
            freed += size;
            log::debug!("evicted image {} ({} bytes)", id, size);
        }
        true
    }

    /// Move an image from the free list to the used list.
    pub fn mark_as_used(&mut self, id: ImageId) -> bool {
        if self.used.manager().contains(id) {
            return true;
        }
        self.transfer(id, true)
    }

    /// Move an image from the used list to the free list, making it
    /// evictable.
    pub fn mark_as_free(&mut self, id: ImageId) -> bool {
        if self.free.manager().contains(id) {
            return true;
        }
        self.transfer(id, false)
    }

    /// Move `id` between the lists. An image that fits in neither list
    /// afterwards is unloaded.
    fn transfer(&mut self, id: ImageId, to_used: bool) -> bool {
        let Some(&size) = self.sizes.get(&id) else {
            return false;
        };
        let (from, to) = if to_used {
            (&mut self.free, &mut self.used)
        } else {
            (&mut self.used, &mut self.free)
        };
        if !from.manager_mut().remove(id) {
            return false;
        }
        if to.add(id, size) {
            return true;
        }
        log::warn!("image {} could not change lists", id);
        // Restore the previous list.
        if from.add(id, size) {
            return false;
        }
        log::warn!("image {} dropped from the replacement lists, unloading", id);
        self.sizes.remove(&id);
        self.loader.unload(id);
        if self.last_accessed == Some(id) {
            self.last_accessed = None;
        }
        false
    }

    /// Unload an image regardless of the list it is in.
    pub fn unload_specific_image(&mut self, id: ImageId) -> bool {
        let removed = self.used.manager_mut().remove(id) || self.free.manager_mut().remove(id);
        if !removed {
            return false;
        }
        self.sizes.remove(&id);
        self.loader.unload(id);
        if self.last_accessed == Some(id) {
            self.last_accessed = None;
        }
        log::debug!("unloaded image {}", id);
        true
    }

    /// Unload every image.
    pub fn clear(&mut self) {
        let ids: Vec<ImageId> = self.sizes.keys().copied().collect();
        for id in ids {
            self.unload_specific_image(id);
        }
    }

    /// Record an access to a used image. Repeated accesses to the same image
    /// are not forwarded to the policy.
    pub fn notify_image_access(&mut self, id: ImageId) {
        if self.last_accessed == Some(id) {
            return;
        }
        self.last_accessed = Some(id);
        self.used.bump(id);
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Change the size limit, evicting free images when shrinking.
    ///
    /// If not enough can be evicted the limit becomes the lowest achievable
    /// value and `false` is returned.
    pub fn set_cache_size_limit(&mut self, limit: usize) -> bool {
        let usage = self.current_memory_usage();
        if limit < usage && !self.free_space(usage - limit) {
            self.size_limit = self.current_memory_usage();
            log::warn!(
                "cache limit {} not reachable, limited to {}",
                limit,
                self.size_limit
            );
            return false;
        }
        self.size_limit = limit;
        true
    }

    /// Replace the used-list policy, keeping its images.
    pub fn set_used_replacement_policy(&mut self, ty: ReplacementPolicyType) -> bool {
        let (policy, complete) = Self::migrate(self.used.as_ref(), ty);
        self.used = policy;
        complete
    }

    /// Replace the free-list policy, keeping its images.
    pub fn set_free_replacement_policy(&mut self, ty: ReplacementPolicyType) -> bool {
        let (policy, complete) = Self::migrate(self.free.as_ref(), ty);
        self.free = policy;
        complete
    }

    /// Build a policy of type `ty` holding the images of `old`, oldest first.
    fn migrate(
        old: &dyn ReplacementPolicy,
        ty: ReplacementPolicyType,
    ) -> (Box<dyn ReplacementPolicy>, bool) {
        let mut policy = new_policy(ty);
        let mut complete = true;
        for (id, size) in old.manager().entries().into_iter().rev() {
            if !policy.add(id, size) {
                log::warn!("image {} lost while switching to {}", id, ty);
                complete = false;
            }
        }
        log::debug!("switched replacement policy {} -> {}", old.policy_type(), ty);
        (policy, complete)
    }
}

impl<L: ImageLoader> Drop for ImageCache<L> {
    fn drop(&mut self) {
        self.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replacement::ReplacementManager;
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[derive(Default)]
    struct TestLoader {
        sizes: HashMap<ImageId, usize>,
        loaded: HashSet<ImageId>,
        loads: usize,
    }

    impl TestLoader {
        fn with(images: &[(u32, usize)]) -> Self {
            Self {
                sizes: images.iter().map(|&(id, s)| (ImageId(id), s)).collect(),
                ..Self::default()
            }
        }
    }

    impl ImageLoader for TestLoader {
        fn image_size(&self, path: &Path, id: ImageId) -> Result<usize, CacheError> {
            self.sizes.get(&id).copied().ok_or(CacheError::NotFound {
                id,
                path: path.to_path_buf(),
            })
        }

        fn load(&mut self, _path: &Path, id: ImageId) -> Result<(), CacheError> {
            self.loads += 1;
            self.loaded.insert(id);
            Ok(())
        }

        fn unload(&mut self, id: ImageId) {
            self.loaded.remove(&id);
        }
    }

    fn path() -> PathBuf {
        PathBuf::from("img.png")
    }

    /// Policy whose list accepts no further images.
    struct RefusingPolicy {
        manager: Box<dyn ReplacementManager>,
    }

    impl RefusingPolicy {
        fn holding(images: &[(ImageId, usize)]) -> Box<dyn ReplacementPolicy> {
            let mut manager = ListReplacementManager::new();
            for &(id, size) in images {
                assert!(manager.add_at_front(id, size));
            }
            Box::new(Self {
                manager: Box::new(manager),
            })
        }
    }

    impl ReplacementPolicy for RefusingPolicy {
        fn add(&mut self, _id: ImageId, _size: usize) -> bool {
            false
        }

        fn remove(&mut self) -> Option<ImageId> {
            None
        }

        fn policy_type(&self) -> ReplacementPolicyType {
            ReplacementPolicyType::Dummy
        }

        fn manager(&self) -> &dyn ReplacementManager {
            self.manager.as_ref()
        }

        fn manager_mut(&mut self) -> &mut dyn ReplacementManager {
            self.manager.as_mut()
        }
    }

    fn cache(limit: usize, images: &[(u32, usize)]) -> ImageCache<TestLoader> {
        ImageCache::with_policies(
            TestLoader::with(images),
            limit,
            ReplacementPolicyType::Lru,
            ReplacementPolicyType::Lru,
        )
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    #[test]
    fn test_load_and_account() {
        let mut c = cache(100, &[(1, 30), (2, 40)]);
        c.load_image(&path(), ImageId(1)).expect("fits");
        c.load_image(&path(), ImageId(2)).expect("fits");
        assert_eq!(c.current_memory_usage(), 70);
        assert_eq!(c.used_list_size(), 2);
        assert_eq!(c.image_size(ImageId(2)), Some(40));
        assert!(c.loader().loaded.contains(&ImageId(1)));

        // Loading again does not hit the loader.
        c.load_image(&path(), ImageId(1)).expect("cached");
        assert_eq!(c.loader().loads, 2);
    }

    #[test]
    fn test_load_too_large() {
        let mut c = cache(100, &[(1, 101)]);
        let err = c.load_image(&path(), ImageId(1)).unwrap_err();
        assert!(matches!(err, CacheError::ImageTooLarge { size: 101, limit: 100, .. }));
        assert_eq!(c.current_memory_usage(), 0);
    }

    #[test]
    fn test_unknown_image() {
        let mut c = cache(100, &[]);
        assert!(matches!(
            c.load_image(&path(), ImageId(9)),
            Err(CacheError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_evicts_free_images() {
        let mut c = cache(100, &[(1, 40), (2, 40), (3, 40)]);
        c.load_image(&path(), ImageId(1)).expect("fits");
        c.load_image(&path(), ImageId(2)).expect("fits");
        assert!(c.mark_as_free(ImageId(1)));
        assert!(c.mark_as_free(ImageId(2)));
        c.load_image(&path(), ImageId(3)).expect("evicts one");
        // LRU free list: image 1 was freed first.
        assert!(!c.contains(ImageId(1)));
        assert!(c.contains(ImageId(2)));
        assert!(!c.loader().loaded.contains(&ImageId(1)));
        assert_eq!(c.current_memory_usage(), 80);
    }

    #[test]
    fn test_used_images_are_never_evicted() {
        let mut c = cache(100, &[(1, 60), (2, 60)]);
        c.load_image(&path(), ImageId(1)).expect("fits");
        let err = c.load_image(&path(), ImageId(2)).unwrap_err();
        assert!(matches!(err, CacheError::CacheFull { needed: 20, .. }));
        assert!(c.contains(ImageId(1)));
    }

    #[test]
    fn test_preload_never_evicts() {
        let mut c = cache(100, &[(1, 60), (2, 60)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        assert_eq!(c.free_list_size(), 1);
        assert!(matches!(
            c.preload_image(&path(), ImageId(2)),
            Err(CacheError::CacheFull { .. })
        ));
        assert!(c.contains(ImageId(1)));

        // A real load may evict the preloaded image.
        c.load_image(&path(), ImageId(2)).expect("evicts preloaded");
        assert!(!c.contains(ImageId(1)));
        assert_eq!(c.used_list_size(), 1);
    }

    #[test]
    fn test_load_of_preloaded_marks_used() {
        let mut c = cache(100, &[(1, 10)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        c.load_image(&path(), ImageId(1)).expect("cached");
        assert!(c.is_used(ImageId(1)));
        assert_eq!(c.free_list_size(), 0);
        assert_eq!(c.loader().loads, 1);
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    #[test]
    fn test_free_space_partial() {
        let mut c = cache(100, &[(1, 10), (2, 20)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        c.load_image(&path(), ImageId(2)).expect("fits");
        assert!(!c.free_space(25));
        assert!(!c.contains(ImageId(1)));
        assert_eq!(c.current_memory_usage(), 20);
        assert!(c.free_space(0));
    }

    #[test]
    fn test_mark_unknown_image() {
        let mut c = cache(100, &[]);
        assert!(!c.mark_as_used(ImageId(5)));
        assert!(!c.mark_as_free(ImageId(5)));
        assert!(!c.unload_specific_image(ImageId(5)));
    }

    #[test]
    fn test_refused_move_restores_previous_list() {
        let mut c = cache(100, &[(1, 10)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        c.used = RefusingPolicy::holding(&[]);
        assert!(!c.mark_as_used(ImageId(1)));
        assert!(c.contains(ImageId(1)));
        assert_eq!(c.free_list_size(), 1);
        assert!(c.loader().loaded.contains(&ImageId(1)));
    }

    #[test]
    fn test_image_in_no_list_is_unloaded() {
        let mut c = cache(100, &[(1, 10), (2, 20)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        c.preload_image(&path(), ImageId(2)).expect("fits");
        c.notify_image_access(ImageId(1));
        c.free = RefusingPolicy::holding(&[(ImageId(1), 10), (ImageId(2), 20)]);
        c.used = RefusingPolicy::holding(&[]);

        assert!(!c.mark_as_used(ImageId(1)));
        assert!(!c.contains(ImageId(1)));
        assert_eq!(c.image_size(ImageId(1)), None);
        assert!(!c.loader().loaded.contains(&ImageId(1)));
        assert_eq!(c.current_memory_usage(), 20);
        assert!(c.contains(ImageId(2)));
        assert!(!c.unload_specific_image(ImageId(1)));
    }

    #[test]
    fn test_unload_specific_image() {
        let mut c = cache(100, &[(1, 10), (2, 20)]);
        c.load_image(&path(), ImageId(1)).expect("fits");
        c.preload_image(&path(), ImageId(2)).expect("fits");
        assert!(c.unload_specific_image(ImageId(2)));
        assert!(c.unload_specific_image(ImageId(1)));
        assert_eq!(c.current_memory_usage(), 0);
        assert!(c.loader().loaded.is_empty());
    }

    #[test]
    fn test_notify_access_bumps_used_policy() {
        let mut c = cache(100, &[(1, 10), (2, 10), (3, 10)]);
        for id in 1..=3 {
            c.load_image(&path(), ImageId(id)).expect("fits");
        }
        c.notify_image_access(ImageId(1));
        c.notify_image_access(ImageId(1));
        assert_eq!(
            c.used.manager().entries(),
            vec![(ImageId(1), 10), (ImageId(3), 10), (ImageId(2), 10)]
        );
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    #[test]
    fn test_shrink_limit() {
        let mut c = cache(100, &[(1, 30), (2, 30), (3, 30)]);
        c.preload_image(&path(), ImageId(1)).expect("fits");
        c.preload_image(&path(), ImageId(2)).expect("fits");
        c.load_image(&path(), ImageId(3)).expect("fits");

        assert!(c.set_cache_size_limit(60));
        assert_eq!(c.cache_size_limit(), 60);
        assert_eq!(c.current_memory_usage(), 60);

        // Image 3 is used and cannot go.
        assert!(!c.set_cache_size_limit(10));
        assert_eq!(c.cache_size_limit(), 30);
        assert_eq!(c.free_list_size(), 0);

        assert!(c.set_cache_size_limit(1000));
    }

    #[test]
    fn test_switch_policy_keeps_order() {
        let mut c = cache(100, &[(1, 10), (2, 30), (3, 20)]);
        for id in 1..=3 {
            c.preload_image(&path(), ImageId(id)).expect("fits");
        }
        assert!(c.set_free_replacement_policy(ReplacementPolicyType::Fifo));
        assert_eq!(c.free_policy_type(), ReplacementPolicyType::Fifo);
        assert_eq!(c.free_list_size(), 3);
        assert!(c.free_space(1));
        assert!(!c.contains(ImageId(1)));

        assert!(c.set_free_replacement_policy(ReplacementPolicyType::Greedy));
        assert!(c.free_space(1));
        assert!(!c.contains(ImageId(2)));
        assert_eq!(c.current_memory_usage(), 20);
    }

    #[test]
    fn test_dummy_free_policy_blocks_eviction() {
        let mut c = ImageCache::with_policies(
            TestLoader::with(&[(1, 60), (2, 60)]),
            100,
            ReplacementPolicyType::Lru,
            ReplacementPolicyType::Dummy,
        );
        c.preload_image(&path(), ImageId(1)).expect("fits");
        assert!(c.load_image(&path(), ImageId(2)).is_err());
        assert!(c.contains(ImageId(1)));
    }

    #[test]
    fn test_from_settings() {
        let settings = ImageCacheSettings {
            resolution: "240x320".into(),
            cache_size: 4096,
            replacement_free: ReplacementPolicyType::Fifo,
            replacement_used: ReplacementPolicyType::Greedy,
        };
        let c = ImageCache::from_settings(TestLoader::default(), &settings);
        assert_eq!(c.cache_size_limit(), 4096);
        assert_eq!(c.used_policy_type(), ReplacementPolicyType::Greedy);
        assert_eq!(c.free_policy_type(), ReplacementPolicyType::Fifo);

        let d = ImageCache::new(TestLoader::default());
        assert_eq!(d.cache_size_limit(), DEFAULT_CACHE_SIZE);
        assert_eq!(d.used_policy_type(), ReplacementPolicyType::Lru);
    }

    #[test]
    fn test_clear_unloads_everything() {
        let mut c = cache(100, &[(1, 10)]);
        c.load_image(&path(), ImageId(1)).expect("fits");
        c.clear();
        assert!(c.loader().loaded.is_empty());
        assert_eq!(c.current_memory_usage(), 0);
    }
}
