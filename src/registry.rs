use crate::model::{BodyPart, PartId, SlotType};
use rand::seq::SliceRandom;
use rand::Rng;

/// Indexes the parts arena by slot type and owns the six tray cells the
/// player drops parts from. Pools are shuffled once at startup so the same
/// variants do not always lead.
pub(crate) struct PartRegistry {
    pools: [Vec<PartId>; 6],
    tray: [Option<PartId>; 6],
}

impl PartRegistry {
    pub(crate) fn new(parts: &[BodyPart], rng: &mut impl Rng) -> Self {
        let mut pools: [Vec<PartId>; 6] = std::array::from_fn(|_| Vec::new());
        for (i, part) in parts.iter().enumerate() {
            pools[part.slot.index()].push(PartId(i));
        }
        for pool in &mut pools {
            pool.shuffle(rng);
        }
        Self {
            pools,
            tray: [None; 6],
        }
    }

    /// Uniform pick from the slot's pool, never returning `excluding`.
    ///
    /// Panics if the pool is empty after exclusion: a slot needs at least
    /// two interchangeable parts for replacement offers to make sense, and
    /// a mis-built inventory should fail loudly rather than hang.
    pub(crate) fn random_candidate(
        &self,
        slot: SlotType,
        excluding: Option<PartId>,
        rng: &mut impl Rng,
    ) -> PartId {
        let pool = &self.pools[slot.index()];
        let valid: Vec<PartId> = pool
            .iter()
            .copied()
            .filter(|id| Some(*id) != excluding)
            .collect();
        *valid
            .choose(rng)
            .unwrap_or_else(|| panic!("no candidate parts left for slot {:?}", slot))
    }

    /// Places a candidate in the slot's tray cell. Food and Oil cells are
    /// left alone while occupied; equip-slot cells always take the new offer.
    pub(crate) fn offer(
        &mut self,
        slot: SlotType,
        excluding: Option<PartId>,
        rng: &mut impl Rng,
    ) {
        let consumable = slot.as_equip().is_none();
        if consumable && self.tray[slot.index()].is_some() {
            return;
        }
        let part = self.random_candidate(slot, excluding, rng);
        self.tray[slot.index()] = Some(part);
    }

    pub(crate) fn offered(&self, slot: SlotType) -> Option<PartId> {
        self.tray[slot.index()]
    }

    /// The drop surface: removes and returns the offered part, exactly once
    /// per offer.
    pub(crate) fn take_offer(&mut self, slot: SlotType) -> Option<PartId> {
        self.tray[slot.index()].take()
    }
}
