pub(crate) const METER_MAX: i32 = 100;

/// Everything a part can be dropped onto. Food and Oil are consumable
/// triggers that refill a meter; the other four are persistent equip slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotType {
    Food,
    Oil,
    Leg,
    Eye,
    TopHeadPlate,
    BottomHeadPlate,
}

impl SlotType {
    pub(crate) const ALL: [SlotType; 6] = [
        SlotType::Food,
        SlotType::Oil,
        SlotType::Leg,
        SlotType::Eye,
        SlotType::TopHeadPlate,
        SlotType::BottomHeadPlate,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            SlotType::Food => 0,
            SlotType::Oil => 1,
            SlotType::Leg => 2,
            SlotType::Eye => 3,
            SlotType::TopHeadPlate => 4,
            SlotType::BottomHeadPlate => 5,
        }
    }

    pub(crate) fn as_equip(self) -> Option<EquipSlot> {
        match self {
            SlotType::Leg => Some(EquipSlot::Leg),
            SlotType::Eye => Some(EquipSlot::Eye),
            SlotType::TopHeadPlate => Some(EquipSlot::TopHeadPlate),
            SlotType::BottomHeadPlate => Some(EquipSlot::BottomHeadPlate),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            SlotType::Food => "Food",
            SlotType::Oil => "Oil",
            SlotType::Leg => "Leg",
            SlotType::Eye => "Eye",
            SlotType::TopHeadPlate => "Top plate",
            SlotType::BottomHeadPlate => "Jaw plate",
        }
    }

    pub(crate) fn hotkey(self) -> char {
        match self {
            SlotType::Food => 'f',
            SlotType::Oil => 'o',
            SlotType::Leg => 'l',
            SlotType::Eye => 'e',
            SlotType::TopHeadPlate => 't',
            SlotType::BottomHeadPlate => 'j',
        }
    }
}

/// The four slots whose occupancy drives game-over, usable as a dense index
/// into the active-part table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EquipSlot {
    Leg,
    Eye,
    TopHeadPlate,
    BottomHeadPlate,
}

impl EquipSlot {
    pub(crate) const ALL: [EquipSlot; 4] = [
        EquipSlot::Leg,
        EquipSlot::Eye,
        EquipSlot::TopHeadPlate,
        EquipSlot::BottomHeadPlate,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            EquipSlot::Leg => 0,
            EquipSlot::Eye => 1,
            EquipSlot::TopHeadPlate => 2,
            EquipSlot::BottomHeadPlate => 3,
        }
    }

    pub(crate) fn slot_type(self) -> SlotType {
        match self {
            EquipSlot::Leg => SlotType::Leg,
            EquipSlot::Eye => SlotType::Eye,
            EquipSlot::TopHeadPlate => SlotType::TopHeadPlate,
            EquipSlot::BottomHeadPlate => SlotType::BottomHeadPlate,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MeterKind {
    Food,
    Oil,
}

/// Index into the parts arena owned by the app. The sim and registry hold
/// ids, never the parts themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PartId(pub(crate) usize);

#[derive(Clone, Debug)]
pub(crate) struct BodyPart {
    pub(crate) slot: SlotType,
    pub(crate) name: &'static str,
    pub(crate) glyph: char,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AnimTrigger {
    Munch,
    Oiling,
    Idle(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SoundEvent {
    Eating,
    Oiling,
    Breaking,
    Fixing,
    GameOver,
    IdleChirp(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Playing,
    Help,
    Over,
}

/// Timing and balance constants for the whole sim, in seconds unless noted.
#[derive(Clone, Debug)]
pub(crate) struct Rules {
    pub(crate) food_wait_min: f32,
    pub(crate) food_wait_max: f32,
    pub(crate) food_step: i32,
    pub(crate) food_grant_pct: f32,

    pub(crate) oil_wait_min: f32,
    pub(crate) oil_wait_max: f32,
    pub(crate) oil_step: i32,
    pub(crate) oil_grant_pct: f32,

    pub(crate) part_wait_min: f32,
    pub(crate) part_wait_max: f32,
    pub(crate) part_grace: f32,

    pub(crate) settle_wait: f32,
    pub(crate) drain_pause: f32,
    pub(crate) idle_after: f32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            food_wait_min: 5.0,
            food_wait_max: 7.0,
            food_step: 5,
            food_grant_pct: 15.0,

            oil_wait_min: 8.0,
            oil_wait_max: 12.0,
            oil_step: 5,
            oil_grant_pct: 10.0,

            part_wait_min: 3.0,
            part_wait_max: 6.0,
            part_grace: 5.0,

            settle_wait: 0.5,
            drain_pause: 0.1,
            idle_after: 5.0,
        }
    }
}

/// The scene's part inventory: a few interchangeable variants per slot so
/// replacements never have to hand back the part that just failed.
pub(crate) fn starter_parts() -> Vec<BodyPart> {
    let mut parts = Vec::new();
    let mut add = |slot, name, glyph| {
        parts.push(BodyPart { slot, name, glyph });
    };

    add(SlotType::Food, "battery snack", '%');
    add(SlotType::Food, "scrap biscuit", '%');
    add(SlotType::Food, "bolt muffin", '%');

    add(SlotType::Oil, "oil can", '6');
    add(SlotType::Oil, "grease tube", '6');
    add(SlotType::Oil, "lube flask", '6');

    add(SlotType::Leg, "piston leg", 'A');
    add(SlotType::Leg, "spring leg", 'H');
    add(SlotType::Leg, "wheel leg", 'O');

    add(SlotType::Eye, "lamp eye", 'o');
    add(SlotType::Eye, "lens eye", '0');
    add(SlotType::Eye, "slit eye", '-');

    add(SlotType::TopHeadPlate, "dome plate", '_');
    add(SlotType::TopHeadPlate, "fin plate", '^');
    add(SlotType::TopHeadPlate, "flat plate", '=');

    add(SlotType::BottomHeadPlate, "round jaw", 'u');
    add(SlotType::BottomHeadPlate, "square jaw", 'L');
    add(SlotType::BottomHeadPlate, "grill jaw", 'w');

    parts
}
