use crate::model::{AnimTrigger, PartId, SoundEvent, METER_MAX};

/// The sim's only outward surface. Everything here is fire-and-forget from
/// the sim's point of view; only `is_idle` flows back, and the drainer polls
/// it every tick.
pub(crate) trait Stage {
    fn part_shown(&mut self, part: PartId, animated: bool);
    fn part_hidden(&mut self, part: PartId, animated: bool);
    fn is_idle(&self) -> bool;
    fn play_trigger(&mut self, trigger: AnimTrigger);
    fn play_sound(&mut self, sound: SoundEvent);
    fn food_changed(&mut self, value: i32);
    fn oil_changed(&mut self, value: i32);
    fn severity_changed(&mut self, level: u8);
    fn game_over_shown(&mut self);
}

const DISSOLVE_TIME: f32 = 0.75;
const REACTION_TIME: f32 = 1.2;
const CAPTION_TIME: f32 = 2.0;

/// Per-part visual state. `dissolve` runs 0..=1 toward whatever `visible`
/// says, so parts fade in and out instead of popping.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PartVisual {
    pub(crate) visible: bool,
    pub(crate) dissolve: f32,
}

/// Terminal-side presentation state. Holds no game logic: the renderer reads
/// it, the sim writes it through the `Stage` trait, and `tick` just advances
/// timers.
pub(crate) struct TermStage {
    pub(crate) parts: Vec<PartVisual>,
    pub(crate) food: i32,
    pub(crate) oil: i32,
    pub(crate) severity: u8,
    pub(crate) overlay: bool,
    pub(crate) wobble: f32,
    reaction: Option<(AnimTrigger, f32)>,
    caption: Option<(&'static str, f32)>,
}

impl TermStage {
    pub(crate) fn new(part_count: usize) -> Self {
        Self {
            parts: vec![
                PartVisual {
                    visible: false,
                    dissolve: 0.0,
                };
                part_count
            ],
            food: METER_MAX,
            oil: METER_MAX,
            severity: 0,
            overlay: false,
            wobble: 0.0,
            reaction: None,
            caption: None,
        }
    }

    pub(crate) fn tick(&mut self, dt: f32) {
        self.wobble += dt;

        for p in &mut self.parts {
            let target = if p.visible { 1.0 } else { 0.0 };
            let step = dt / DISSOLVE_TIME;
            if p.dissolve < target {
                p.dissolve = (p.dissolve + step).min(target);
            } else if p.dissolve > target {
                p.dissolve = (p.dissolve - step).max(target);
            }
        }

        if let Some((_, t)) = &mut self.reaction {
            *t -= dt;
            if *t <= 0.0 {
                self.reaction = None;
            }
        }
        if let Some((_, t)) = &mut self.caption {
            *t -= dt;
            if *t <= 0.0 {
                self.caption = None;
            }
        }
    }

    pub(crate) fn reaction(&self) -> Option<AnimTrigger> {
        self.reaction.map(|(trigger, _)| trigger)
    }

    pub(crate) fn caption(&self) -> Option<&'static str> {
        self.caption.map(|(text, _)| text)
    }
}

fn caption_for(sound: SoundEvent) -> &'static str {
    match sound {
        SoundEvent::Eating => "*crunch crunch*",
        SoundEvent::Oiling => "*glug glug*",
        SoundEvent::Breaking => "*CLANK*",
        SoundEvent::Fixing => "*ratchet ratchet*",
        SoundEvent::GameOver => "*powering down...*",
        SoundEvent::IdleChirp(0) => "*beep*",
        SoundEvent::IdleChirp(1) => "*boop*",
        SoundEvent::IdleChirp(2) => "*whirr*",
        SoundEvent::IdleChirp(_) => "*bzzt*",
    }
}

impl Stage for TermStage {
    fn part_shown(&mut self, part: PartId, animated: bool) {
        let p = &mut self.parts[part.0];
        p.visible = true;
        if !animated {
            p.dissolve = 1.0;
        }
    }

    fn part_hidden(&mut self, part: PartId, animated: bool) {
        let p = &mut self.parts[part.0];
        p.visible = false;
        if !animated {
            p.dissolve = 0.0;
        }
    }

    fn is_idle(&self) -> bool {
        self.reaction.is_none()
    }

    fn play_trigger(&mut self, trigger: AnimTrigger) {
        self.reaction = Some((trigger, REACTION_TIME));
    }

    fn play_sound(&mut self, sound: SoundEvent) {
        self.caption = Some((caption_for(sound), CAPTION_TIME));
    }

    fn food_changed(&mut self, value: i32) {
        self.food = value;
    }

    fn oil_changed(&mut self, value: i32) {
        self.oil = value;
    }

    fn severity_changed(&mut self, level: u8) {
        self.severity = level;
    }

    fn game_over_shown(&mut self) {
        self.overlay = true;
    }
}
