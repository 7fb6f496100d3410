use crate::model::{
    AnimTrigger, EquipSlot, MeterKind, PartId, Rules, SlotType, SoundEvent, METER_MAX,
};
use crate::queue::{ActionId, ActionQueue};
use crate::registry::PartRegistry;
use crate::stage::Stage;
use rand::seq::SliceRandom;
use rand::Rng;

const SEVERITY_CAP: u8 = 3;

/// Phase machine for the food/oil decay processes. `Waiting` counts down the
/// randomized interval, `Draining` parks on the action queue, `Settling` is
/// the short pause before a replacement part may be offered.
#[derive(Clone, Copy, Debug)]
enum DecayPhase {
    Waiting { remaining: f32 },
    Draining { action: ActionId },
    Settling { remaining: f32 },
}

#[derive(Clone, Copy, Debug)]
enum FailurePhase {
    Waiting { remaining: f32 },
    Draining { action: ActionId },
    Settling { remaining: f32, slot: EquipSlot, old: PartId },
}

/// A Food/Oil drop the player already made, parked on the queue until the
/// drainer lets its refill reaction play. Several can be outstanding.
#[derive(Clone, Copy, Debug)]
struct ReplenishOp {
    kind: MeterKind,
    action: ActionId,
}

/// The pet's whole mutable state. All periodic processes live inside and are
/// stepped by `tick`, so dropping the sim tears everything down with it and
/// nothing can outlive the state it mutates.
pub(crate) struct PetSim {
    pub(crate) food: i32,
    pub(crate) oil: i32,
    pub(crate) active: [Option<PartId>; 4],
    pub(crate) game_over: bool,
    pub(crate) queue: ActionQueue,

    food_phase: DecayPhase,
    oil_phase: DecayPhase,
    part_phase: FailurePhase,
    replenish: Vec<ReplenishOp>,

    idle_timer: f32,
    drain_pause: f32,
}

impl PetSim {
    /// Builds a running pet: every equip slot gets a random part, enabled
    /// without a transition, and all process timers are armed.
    pub(crate) fn new(
        rules: &Rules,
        registry: &mut PartRegistry,
        stage: &mut dyn Stage,
        rng: &mut impl Rng,
    ) -> Self {
        let mut active = [None; 4];
        for slot in EquipSlot::ALL {
            let part = registry.random_candidate(slot.slot_type(), None, rng);
            stage.part_shown(part, false);
            active[slot.index()] = Some(part);
        }

        stage.food_changed(METER_MAX);
        stage.oil_changed(METER_MAX);
        stage.severity_changed(0);

        Self {
            food: METER_MAX,
            oil: METER_MAX,
            active,
            game_over: false,
            queue: ActionQueue::default(),
            food_phase: DecayPhase::Waiting {
                remaining: rng.gen_range(rules.food_wait_min..rules.food_wait_max),
            },
            oil_phase: DecayPhase::Waiting {
                remaining: rng.gen_range(rules.oil_wait_min..rules.oil_wait_max),
            },
            part_phase: FailurePhase::Waiting {
                remaining: rules.part_grace
                    + rng.gen_range(rules.part_wait_min..rules.part_wait_max),
            },
            replenish: Vec::new(),
            idle_timer: 0.0,
            drain_pause: 0.0,
        }
    }

    /// One fixed simulation step. Order matters only in that the drainer
    /// runs first, so a process parked on the queue resumes the same tick
    /// its action is drained. A finished game never mutates again.
    pub(crate) fn tick(
        &mut self,
        dt: f32,
        rules: &Rules,
        registry: &mut PartRegistry,
        stage: &mut dyn Stage,
        rng: &mut impl Rng,
    ) {
        if self.game_over {
            return;
        }
        self.step_drainer(dt, rules, stage, rng);
        self.step_decay(MeterKind::Food, dt, rules, registry, stage, rng);
        self.step_decay(MeterKind::Oil, dt, rules, registry, stage, rng);
        self.step_failure(dt, rules, registry, stage, rng);
        self.step_replenish(stage);
    }

    /// Player dropped a replacement onto an equip slot.
    pub(crate) fn set_slot(&mut self, part: PartId, slot: EquipSlot, stage: &mut dyn Stage) {
        if self.game_over {
            return;
        }
        stage.part_shown(part, true);
        self.active[slot.index()] = Some(part);
        self.push_severity(stage);
        stage.play_sound(SoundEvent::Fixing);
    }

    /// Player dropped food or oil; the refill itself waits its turn on the
    /// action queue.
    pub(crate) fn replenish(&mut self, kind: MeterKind) {
        if self.game_over {
            return;
        }
        let action = self.queue.enqueue();
        self.replenish.push(ReplenishOp { kind, action });
    }

    fn step_drainer(&mut self, dt: f32, rules: &Rules, stage: &mut dyn Stage, rng: &mut impl Rng) {
        if self.drain_pause > 0.0 {
            self.drain_pause -= dt;
            return;
        }

        if !self.queue.is_empty() {
            self.idle_timer = 0.0;
            if stage.is_idle() {
                self.queue.drain_one();
                self.drain_pause = rules.drain_pause;
            }
        } else {
            self.idle_timer += dt;
            if self.idle_timer >= rules.idle_after {
                self.idle_timer = 0.0;
                let flavor = rng.gen_range(0..4u8);
                stage.play_sound(SoundEvent::IdleChirp(flavor));
                stage.play_trigger(AnimTrigger::Idle(flavor));
            }
        }
    }

    fn step_decay(
        &mut self,
        kind: MeterKind,
        dt: f32,
        rules: &Rules,
        registry: &mut PartRegistry,
        stage: &mut dyn Stage,
        rng: &mut impl Rng,
    ) {
        if self.game_over {
            return;
        }
        let phase = match kind {
            MeterKind::Food => self.food_phase,
            MeterKind::Oil => self.oil_phase,
        };

        let next = match phase {
            DecayPhase::Waiting { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    DecayPhase::Waiting { remaining }
                } else {
                    match kind {
                        MeterKind::Food => {
                            self.food = (self.food - rules.food_step).max(0);
                            stage.food_changed(self.food);
                        }
                        MeterKind::Oil => {
                            self.oil = (self.oil - rules.oil_step).max(0);
                            stage.oil_changed(self.oil);
                        }
                    }
                    DecayPhase::Draining {
                        action: self.queue.enqueue(),
                    }
                }
            }
            DecayPhase::Draining { action } => {
                if self.queue.take_handled(action) {
                    self.check_game_over(stage);
                    DecayPhase::Settling {
                        remaining: rules.settle_wait,
                    }
                } else {
                    phase
                }
            }
            DecayPhase::Settling { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    DecayPhase::Settling { remaining }
                } else {
                    let (grant_pct, slot, min, max) = match kind {
                        MeterKind::Food => (
                            rules.food_grant_pct,
                            SlotType::Food,
                            rules.food_wait_min,
                            rules.food_wait_max,
                        ),
                        MeterKind::Oil => (
                            rules.oil_grant_pct,
                            SlotType::Oil,
                            rules.oil_wait_min,
                            rules.oil_wait_max,
                        ),
                    };
                    if rng.gen_range(0.0..100.0) < grant_pct {
                        registry.offer(slot, None, rng);
                    }
                    DecayPhase::Waiting {
                        remaining: rng.gen_range(min..max),
                    }
                }
            }
        };

        match kind {
            MeterKind::Food => self.food_phase = next,
            MeterKind::Oil => self.oil_phase = next,
        }
    }

    fn step_failure(
        &mut self,
        dt: f32,
        rules: &Rules,
        registry: &mut PartRegistry,
        stage: &mut dyn Stage,
        rng: &mut impl Rng,
    ) {
        if self.game_over {
            return;
        }
        let phase = self.part_phase;
        self.part_phase = match phase {
            FailurePhase::Waiting { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    FailurePhase::Waiting { remaining }
                } else {
                    FailurePhase::Draining {
                        action: self.queue.enqueue(),
                    }
                }
            }
            FailurePhase::Draining { action } => {
                if self.queue.take_handled(action) {
                    match self.random_occupied_slot(rng) {
                        Some(slot) => {
                            let old = self.fail_slot(slot, stage);
                            FailurePhase::Settling {
                                remaining: rules.settle_wait,
                                slot,
                                old,
                            }
                        }
                        None => {
                            // Nothing left to break: occupancy-of-none means
                            // the game-over check has already fired (or fires
                            // here) and the sim freezes.
                            self.check_game_over(stage);
                            phase
                        }
                    }
                } else {
                    phase
                }
            }
            FailurePhase::Settling {
                remaining,
                slot,
                old,
            } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    FailurePhase::Settling {
                        remaining,
                        slot,
                        old,
                    }
                } else {
                    registry.offer(slot.slot_type(), Some(old), rng);
                    FailurePhase::Waiting {
                        remaining: rng.gen_range(rules.part_wait_min..rules.part_wait_max),
                    }
                }
            }
        };
    }

    /// Knocks the part out of `slot`: animated exit, breaking noise,
    /// severity update, then the game-over re-check.
    fn fail_slot(&mut self, slot: EquipSlot, stage: &mut dyn Stage) -> PartId {
        let old = self.active[slot.index()]
            .take()
            .unwrap_or_else(|| panic!("fail_slot on empty slot {:?}", slot));
        stage.part_hidden(old, true);
        stage.play_sound(SoundEvent::Breaking);
        self.push_severity(stage);
        self.check_game_over(stage);
        old
    }

    fn random_occupied_slot(&self, rng: &mut impl Rng) -> Option<EquipSlot> {
        let occupied: Vec<EquipSlot> = EquipSlot::ALL
            .into_iter()
            .filter(|slot| self.active[slot.index()].is_some())
            .collect();
        occupied.choose(rng).copied()
    }

    fn step_replenish(&mut self, stage: &mut dyn Stage) {
        if self.game_over {
            return;
        }
        let mut i = 0;
        while i < self.replenish.len() {
            let op = self.replenish[i];
            if !self.queue.take_handled(op.action) {
                i += 1;
                continue;
            }
            self.replenish.swap_remove(i);
            match op.kind {
                MeterKind::Food => {
                    self.food = METER_MAX;
                    stage.food_changed(self.food);
                    stage.play_trigger(AnimTrigger::Munch);
                    stage.play_sound(SoundEvent::Eating);
                }
                MeterKind::Oil => {
                    self.oil = METER_MAX;
                    stage.oil_changed(self.oil);
                    stage.play_trigger(AnimTrigger::Oiling);
                    stage.play_sound(SoundEvent::Oiling);
                }
            }
        }
    }

    /// Count of empty equip slots, clamped, pushed out to drive ambient
    /// presentation intensity.
    fn push_severity(&mut self, stage: &mut dyn Stage) {
        if self.game_over {
            return;
        }
        let empty = self.active.iter().filter(|s| s.is_none()).count() as u8;
        stage.severity_changed(empty.min(SEVERITY_CAP));
    }

    /// One-way transition: all four slots empty, or either meter at zero.
    fn check_game_over(&mut self, stage: &mut dyn Stage) {
        if self.game_over {
            return;
        }
        let all_empty = self.active.iter().all(Option::is_none);
        if all_empty || self.oil <= 0 || self.food <= 0 {
            self.game_over = true;
            stage.play_sound(SoundEvent::GameOver);
            stage.severity_changed(0);
            stage.game_over_shown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::starter_parts;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Clone, Debug, PartialEq)]
    enum Ev {
        Shown(PartId, bool),
        Hidden(PartId, bool),
        Trigger(AnimTrigger),
        Sound(SoundEvent),
        Food(i32),
        Oil(i32),
        Severity(u8),
        Over,
    }

    /// Recording stage with a scriptable idle flag; no timers, so reactions
    /// never block the drainer unless a test wants them to.
    struct TestStage {
        idle: bool,
        events: Vec<Ev>,
    }

    impl TestStage {
        fn new() -> Self {
            Self {
                idle: true,
                events: Vec::new(),
            }
        }

        fn count<F: Fn(&Ev) -> bool>(&self, f: F) -> usize {
            self.events.iter().filter(|e| f(e)).count()
        }
    }

    impl Stage for TestStage {
        fn part_shown(&mut self, part: PartId, animated: bool) {
            self.events.push(Ev::Shown(part, animated));
        }
        fn part_hidden(&mut self, part: PartId, animated: bool) {
            self.events.push(Ev::Hidden(part, animated));
        }
        fn is_idle(&self) -> bool {
            self.idle
        }
        fn play_trigger(&mut self, trigger: AnimTrigger) {
            self.events.push(Ev::Trigger(trigger));
        }
        fn play_sound(&mut self, sound: SoundEvent) {
            self.events.push(Ev::Sound(sound));
        }
        fn food_changed(&mut self, value: i32) {
            self.events.push(Ev::Food(value));
        }
        fn oil_changed(&mut self, value: i32) {
            self.events.push(Ev::Oil(value));
        }
        fn severity_changed(&mut self, level: u8) {
            self.events.push(Ev::Severity(level));
        }
        fn game_over_shown(&mut self) {
            self.events.push(Ev::Over);
        }
    }

    const DT: f32 = 1.0 / 60.0;
    const TICK_CAP: usize = 200_000;

    fn rules_without_failures() -> Rules {
        // Push part failures past any test horizon so meter behavior can be
        // observed in isolation.
        Rules {
            part_wait_min: 1.0e6,
            part_wait_max: 2.0e6,
            part_grace: 1.0e6,
            ..Rules::default()
        }
    }

    fn fixture(rules: &Rules) -> (PartRegistry, TestStage, StdRng, PetSim) {
        let mut rng = StdRng::seed_from_u64(42);
        let parts = starter_parts();
        let mut registry = PartRegistry::new(&parts, &mut rng);
        let mut stage = TestStage::new();
        let sim = PetSim::new(rules, &mut registry, &mut stage, &mut rng);
        (registry, stage, rng, sim)
    }

    #[test]
    fn starts_fully_equipped_and_running() {
        let rules = Rules::default();
        let (_, stage, _, sim) = fixture(&rules);

        assert!(!sim.game_over);
        assert_eq!(sim.food, METER_MAX);
        assert_eq!(sim.oil, METER_MAX);
        assert!(sim.active.iter().all(Option::is_some));
        // Initial equips come up without a transition.
        assert_eq!(stage.count(|e| matches!(e, Ev::Shown(_, false))), 4);
    }

    #[test]
    fn food_decays_in_fixed_steps() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);

        let mut ticks = 0;
        while stage.count(|e| matches!(e, Ev::Food(v) if *v < METER_MAX)) < 4 {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP, "food never decayed four times");
        }

        let seen: Vec<i32> = stage
            .events
            .iter()
            .filter_map(|e| match e {
                Ev::Food(v) if *v < METER_MAX => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(seen, vec![95, 90, 85, 80]);
    }

    #[test]
    fn food_hitting_zero_ends_the_game() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);
        sim.food = rules.food_step; // one decay cycle from death

        let mut ticks = 0;
        while !sim.game_over {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP, "game over never fired");
        }

        assert_eq!(sim.food, 0);
        assert_eq!(stage.count(|e| matches!(e, Ev::Over)), 1);
        assert_eq!(
            stage.count(|e| matches!(e, Ev::Sound(SoundEvent::GameOver))),
            1
        );
    }

    #[test]
    fn game_over_is_monotonic_and_freezes_the_sim() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);
        sim.food = rules.food_step;

        let mut ticks = 0;
        while !sim.game_over {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP);
        }

        let frozen_at = stage.events.len();
        let food_before = sim.food;
        let oil_before = sim.oil;
        for _ in 0..10_000 {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
        }
        sim.replenish(MeterKind::Food);
        sim.set_slot(PartId(0), EquipSlot::Leg, &mut stage);

        assert!(sim.game_over);
        assert_eq!(stage.events.len(), frozen_at);
        assert_eq!(sim.food, food_before);
        assert_eq!(sim.oil, oil_before);
    }

    #[test]
    fn losing_all_four_parts_ends_the_game() {
        let rules = rules_without_failures();
        let (_, mut stage, _, mut sim) = fixture(&rules);

        assert!(!sim.game_over);
        for (i, slot) in EquipSlot::ALL.into_iter().enumerate() {
            sim.fail_slot(slot, &mut stage);
            if i < 3 {
                assert!(!sim.game_over, "ended early with {} slots broken", i + 1);
            }
        }
        assert!(sim.game_over);
        assert_eq!(stage.count(|e| matches!(e, Ev::Over)), 1);
    }

    #[test]
    fn severity_tracks_empty_slots() {
        let rules = rules_without_failures();
        let (_, mut stage, _, mut sim) = fixture(&rules);

        sim.fail_slot(EquipSlot::Eye, &mut stage);
        sim.fail_slot(EquipSlot::Leg, &mut stage);
        let levels: Vec<u8> = stage
            .events
            .iter()
            .filter_map(|e| match e {
                Ev::Severity(level) => Some(*level),
                _ => None,
            })
            .collect();
        // Initial push, then one per failure.
        assert_eq!(levels, vec![0, 1, 2]);

        sim.set_slot(PartId(6), EquipSlot::Leg, &mut stage);
        assert_eq!(stage.events.iter().rev().find_map(|e| match e {
            Ev::Severity(level) => Some(*level),
            _ => None,
        }), Some(1));
    }

    #[test]
    fn drainer_waits_for_idle_and_drains_one() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);

        sim.replenish(MeterKind::Food);
        assert!(!sim.queue.is_empty());

        // Busy stage: the queued refill must stay parked.
        stage.idle = false;
        for _ in 0..120 {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
        }
        assert_eq!(stage.count(|e| matches!(e, Ev::Food(_))), 1); // init only
        assert!(!sim.queue.is_empty());

        // One idle tick drains exactly one action and completes the refill.
        stage.idle = true;
        sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
        assert!(sim.queue.is_empty());
        assert_eq!(sim.food, METER_MAX);
        assert_eq!(
            stage.count(|e| matches!(e, Ev::Trigger(AnimTrigger::Munch))),
            1
        );
        assert_eq!(stage.count(|e| matches!(e, Ev::Sound(SoundEvent::Eating))), 1);
    }

    #[test]
    fn queued_refills_resolve_in_fifo_order() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);

        sim.oil = 40;
        sim.food = 40;
        let start = stage.events.len();
        sim.replenish(MeterKind::Oil);
        sim.replenish(MeterKind::Food);

        // The drain pause rate-limits to one action per 0.1s; tick through
        // both and check the oil refill landed first.
        let mut ticks = 0;
        while !sim.queue.is_empty() {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP);
        }
        sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);

        let after = &stage.events[start..];
        let oil_at = after
            .iter()
            .position(|e| matches!(e, Ev::Oil(v) if *v == METER_MAX))
            .expect("oil refill event");
        let food_at = after
            .iter()
            .position(|e| matches!(e, Ev::Food(v) if *v == METER_MAX))
            .expect("food refill event");
        assert!(oil_at < food_at);
    }

    #[test]
    fn part_failure_breaks_an_occupied_slot_and_offers_a_replacement() {
        // Fast failures, no decay interference.
        let rules = Rules {
            food_wait_min: 1.0e6,
            food_wait_max: 2.0e6,
            oil_wait_min: 1.0e6,
            oil_wait_max: 2.0e6,
            part_grace: 0.0,
            ..Rules::default()
        };
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);

        let mut ticks = 0;
        while stage.count(|e| matches!(e, Ev::Hidden(_, true))) == 0 {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP, "no part ever failed");
        }
        assert_eq!(sim.active.iter().filter(|s| s.is_some()).count(), 3);
        assert_eq!(
            stage.count(|e| matches!(e, Ev::Sound(SoundEvent::Breaking))),
            1
        );

        let broken = stage
            .events
            .iter()
            .find_map(|e| match e {
                Ev::Hidden(id, true) => Some(*id),
                _ => None,
            })
            .expect("hidden event");

        // Ride out the settle delay; the replacement offer must exclude the
        // part that just failed.
        let broken_slot = EquipSlot::ALL
            .into_iter()
            .find(|slot| sim.active[slot.index()].is_none())
            .expect("one slot is empty");
        let mut ticks = 0;
        loop {
            if let Some(offered) = registry.offered(broken_slot.slot_type()) {
                assert_ne!(offered, broken);
                break;
            }
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < TICK_CAP, "no replacement was offered");
        }
    }

    #[test]
    fn idle_flavor_fires_after_quiet_threshold() {
        let rules = rules_without_failures();
        let (mut registry, mut stage, mut rng, mut sim) = fixture(&rules);

        // Stay under the first decay expiry (>= 5s) but past the idle
        // threshold of 5s: impossible directly, so shrink the threshold.
        let rules = Rules {
            idle_after: 1.0,
            ..rules
        };
        let mut ticks = 0;
        while stage.count(|e| matches!(e, Ev::Trigger(AnimTrigger::Idle(_)))) == 0 {
            sim.tick(DT, &rules, &mut registry, &mut stage, &mut rng);
            ticks += 1;
            assert!(ticks < 120, "idle flavor never triggered");
        }
        assert_eq!(
            stage.count(|e| matches!(e, Ev::Sound(SoundEvent::IdleChirp(_)))),
            1
        );
    }
}
