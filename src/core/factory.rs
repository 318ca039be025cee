//! State core creation, sharing and reclamation.
//!
//! The factory owns every live core. Cores requested with an explicit id are
//! deduplicated by `(kind, id)`: a second request for the same pair returns
//! the existing core with its use count incremented, which is how many nodes
//! come to share one bundle of GPU state. A core with no explicit id is
//! private to its single owner.
//!
//! State ids are minted monotonically and recycled on release; the draw
//! list's state-sort keys are built from them.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::core::{CoreData, CoreId, CoreKind, CoreStatus, StateCore};

/// Creates, stores, shares and reclaims [`StateCore`]s.
pub struct CoreFactory {
    cores: SlotMap<CoreId, StateCore>,
    /// Sharing registry: `(kind, explicit id)` of every live shared core.
    shared: FxHashMap<(CoreKind, String), CoreId>,
    next_state_id: u64,
    free_state_ids: Vec<u64>,
}

impl CoreFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cores: SlotMap::with_key(),
            shared: FxHashMap::default(),
            next_state_id: 0,
            free_state_ids: Vec::new(),
        }
    }

    /// Returns an existing core matching `(kind, explicit_id)` with its use
    /// count incremented, or builds a new one from `init`.
    ///
    /// `init` is only invoked when no matching core is live, so callers can
    /// defer payload construction (and any resource loads it implies) to the
    /// first owner.
    pub fn get_or_create(
        &mut self,
        kind: CoreKind,
        explicit_id: Option<&str>,
        init: impl FnOnce() -> crate::errors::Result<CoreData>,
    ) -> crate::errors::Result<CoreId> {
        if let Some(explicit) = explicit_id
            && let Some(&id) = self.shared.get(&(kind, explicit.to_string()))
        {
            let core = &mut self.cores[id];
            core.use_count += 1;
            log::trace!(
                "sharing {kind:?} core {explicit:?} (use count {})",
                core.use_count
            );
            return Ok(id);
        }

        let data = init()?;
        let state_id = self.free_state_ids.pop().unwrap_or_else(|| {
            let id = self.next_state_id;
            self.next_state_id += 1;
            id
        });

        let id = self.cores.insert(StateCore {
            kind,
            data,
            state_id,
            core_id: explicit_id.map(str::to_string),
            use_count: 1,
            status: CoreStatus::Ready,
        });

        if let Some(explicit) = explicit_id {
            self.shared.insert((kind, explicit.to_string()), id);
        }

        Ok(id)
    }

    /// Releases one reference on a core. When the use count reaches zero the
    /// core is removed from the registry, its state id recycled, and `true`
    /// is returned so the caller can stage backend disposal.
    pub fn release(&mut self, id: CoreId) -> bool {
        let Some(core) = self.cores.get_mut(id) else {
            log::warn!("release of unknown core {id:?} ignored");
            return false;
        };
        if core.use_count == 0 {
            // Excess puts are tolerated, matching node destruction batching.
            log::warn!("excess release of core {id:?} ignored");
            return false;
        }
        core.use_count -= 1;
        if core.use_count > 0 {
            return false;
        }

        let Some(core) = self.cores.remove(id) else {
            return false;
        };
        if let Some(explicit) = &core.core_id {
            self.shared.remove(&(core.kind, explicit.clone()));
        }
        self.free_state_ids.push(core.state_id);
        log::debug!("released {:?} core (state id {})", core.kind, core.state_id);
        true
    }

    /// Tests whether a shared core of the given kind and explicit id is live.
    #[must_use]
    pub fn has_core(&self, kind: CoreKind, explicit_id: &str) -> bool {
        self.shared.contains_key(&(kind, explicit_id.to_string()))
    }

    /// Looks up the id of a live shared core.
    #[must_use]
    pub fn find(&self, kind: CoreKind, explicit_id: &str) -> Option<CoreId> {
        self.shared.get(&(kind, explicit_id.to_string())).copied()
    }

    /// Returns a core by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: CoreId) -> Option<&StateCore> {
        self.cores.get(id)
    }

    /// Returns a core by id, mutably.
    #[inline]
    pub fn get_mut(&mut self, id: CoreId) -> Option<&mut StateCore> {
        self.cores.get_mut(id)
    }

    /// Whether the core is still live (not released).
    #[inline]
    #[must_use]
    pub fn contains(&self, id: CoreId) -> bool {
        self.cores.contains_key(id)
    }

    /// Current use count of a core, or 0 when released.
    #[must_use]
    pub fn use_count(&self, id: CoreId) -> u32 {
        self.cores.get(id).map_or(0, |c| c.use_count)
    }

    /// Number of live cores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether no cores are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}

impl Default for CoreFactory {
    fn default() -> Self {
        Self::new()
    }
}
