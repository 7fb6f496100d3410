use crate::model::{Scene, SlotType};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub(crate) enum PlayerAction {
    Drop(SlotType),
    HelpToggle,
    NewGame,
    Back,
    Quit,
}

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    out.push(InputEvent {
                        key: k.code,
                        mods: k.modifiers,
                    });
                    if out.len() >= 32 {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: Scene, ev: InputEvent) -> Option<PlayerAction> {
    // Global. Raw mode eats the interrupt, so Ctrl+C quits by hand.
    if matches!(ev.key, KeyCode::Char('c') | KeyCode::Char('C'))
        && ev.mods.contains(KeyModifiers::CONTROL)
    {
        return Some(PlayerAction::Quit);
    }
    match ev.key {
        KeyCode::Char('h') | KeyCode::Char('H') => return Some(PlayerAction::HelpToggle),
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(PlayerAction::Quit),
        KeyCode::Esc => return Some(PlayerAction::Back),
        _ => {}
    }

    match scene {
        Scene::Playing => match ev.key {
            KeyCode::Char(ch) => {
                let ch = ch.to_ascii_lowercase();
                SlotType::ALL
                    .into_iter()
                    .find(|slot| slot.hotkey() == ch)
                    .map(PlayerAction::Drop)
            }
            _ => None,
        },
        Scene::Help => None,
        Scene::Over => match ev.key {
            KeyCode::Char('n') | KeyCode::Char('N') => Some(PlayerAction::NewGame),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> InputEvent {
        InputEvent { key: code, mods }
    }

    #[test]
    fn ctrl_c_quits_in_every_scene() {
        for scene in [Scene::Playing, Scene::Help, Scene::Over] {
            let action =
                map_event_to_action(scene, key(KeyCode::Char('c'), KeyModifiers::CONTROL));
            assert!(matches!(action, Some(PlayerAction::Quit)));
        }
    }

    #[test]
    fn plain_c_is_not_a_binding() {
        let action = map_event_to_action(Scene::Playing, key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(action.is_none());
    }

    #[test]
    fn tray_hotkeys_map_to_their_slots() {
        for slot in SlotType::ALL {
            let action = map_event_to_action(
                Scene::Playing,
                key(KeyCode::Char(slot.hotkey()), KeyModifiers::NONE),
            );
            assert!(matches!(action, Some(PlayerAction::Drop(s)) if s == slot));
        }
    }
}
