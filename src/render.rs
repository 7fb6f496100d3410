use crate::model::{AnimTrigger, BodyPart, EquipSlot, SlotType};
use crate::registry::PartRegistry;
use crate::sim::PetSim;
use crate::stage::TermStage;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: i32, y: i32, c: Cell) {
        if x >= 0 && y >= 0 && (x as u16) < self.w && (y as u16) < self.h {
            let i = self.idx(x as u16, y as u16);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
            c.bold = false;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: i32, y: i32, text: &str, fg: Color, bg: Color) {
    for (i, ch) in text.chars().enumerate() {
        buf.set(
            x + i as i32,
            y,
            Cell {
                ch,
                fg,
                bg,
                bold: false,
            },
        );
    }
}

fn tint(enable_color: bool, c: Color) -> Color {
    if enable_color {
        c
    } else {
        Color::White
    }
}

pub(crate) fn draw_meter(
    buf: &mut CellBuffer,
    x: i32,
    y: i32,
    label: &str,
    value: i32,
    enable_color: bool,
) {
    const WIDTH: i32 = 20;
    let filled = (value.clamp(0, 100) * WIDTH) / 100;
    let color = if value > 50 {
        Color::Green
    } else if value > 20 {
        Color::Yellow
    } else {
        Color::Red
    };
    let fg = tint(enable_color, color);

    draw_text(buf, x, y, label, Color::White, Color::Black);
    buf.set(
        x + 5,
        y,
        Cell {
            ch: '[',
            ..Cell::default()
        },
    );
    for i in 0..WIDTH {
        let ch = if i < filled { '=' } else { ' ' };
        buf.set(
            x + 6 + i,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
                bold: false,
            },
        );
    }
    buf.set(
        x + 6 + WIDTH,
        y,
        Cell {
            ch: ']',
            ..Cell::default()
        },
    );
    draw_text(
        buf,
        x + 8 + WIDTH,
        y,
        &format!("{:>3}", value),
        fg,
        Color::Black,
    );
}

pub(crate) fn draw_severity(buf: &mut CellBuffer, x: i32, y: i32, level: u8, enable_color: bool) {
    draw_text(buf, x, y, "alarm", Color::White, Color::Black);
    let fg = tint(enable_color, Color::Red);
    for i in 0..3i32 {
        let ch = if (i as u8) < level { '!' } else { '.' };
        buf.set(
            x + 6 + i,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
                bold: true,
            },
        );
    }
}

pub(crate) fn draw_tray(
    buf: &mut CellBuffer,
    x: i32,
    y: i32,
    registry: &PartRegistry,
    parts: &[BodyPart],
    enable_color: bool,
) {
    draw_text(buf, x, y, "spare parts", Color::White, Color::Black);
    for (row, slot) in SlotType::ALL.into_iter().enumerate() {
        let yy = y + 1 + row as i32;
        let key = format!("[{}]", slot.hotkey());
        draw_text(buf, x, yy, &key, tint(enable_color, Color::Cyan), Color::Black);
        draw_text(buf, x + 4, yy, slot.label(), Color::Grey, Color::Black);

        match registry.offered(slot) {
            Some(id) => {
                let part = &parts[id.0];
                let line = format!("{} {}", part.glyph, part.name);
                draw_text(
                    buf,
                    x + 15,
                    yy,
                    &line,
                    tint(enable_color, Color::Yellow),
                    Color::Black,
                );
            }
            None => {
                draw_text(buf, x + 15, yy, "-", Color::DarkGrey, Color::Black);
            }
        }
    }
}

/// Picks the character a dissolving part renders with. The shade ramp reads
/// as the part materializing or crumbling away.
fn dissolve_ch(glyph: char, dissolve: f32) -> Option<char> {
    if dissolve <= 0.05 {
        None
    } else if dissolve < 0.35 {
        Some('░')
    } else if dissolve < 0.7 {
        Some('▒')
    } else if dissolve < 1.0 {
        Some('▓')
    } else {
        Some(glyph)
    }
}

/// Every segment a slot's part occupies, relative to the robot center.
fn slot_cells(slot: EquipSlot) -> &'static [(i32, i32)] {
    match slot {
        EquipSlot::TopHeadPlate => &[(-3, -3), (-2, -3), (-1, -3), (0, -3), (1, -3), (2, -3), (3, -3)],
        EquipSlot::Eye => &[(-2, -2), (2, -2)],
        EquipSlot::BottomHeadPlate => &[(-3, -1), (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1), (3, -1)],
        EquipSlot::Leg => &[(-2, 2), (2, 2), (-2, 3), (2, 3)],
    }
}

pub(crate) fn draw_robot(
    buf: &mut CellBuffer,
    cx: i32,
    cy: i32,
    sim: &PetSim,
    parts: &[BodyPart],
    stage: &TermStage,
    enable_color: bool,
) {
    let bounce = if stage.overlay {
        0
    } else {
        ((stage.wobble * 2.0).sin() * 0.6).round() as i32
    };
    let cy = cy + bounce;

    let frame_fg = match stage.severity {
        0 => Color::White,
        1 => Color::Yellow,
        2 => Color::Rgb {
            r: 255,
            g: 150,
            b: 60,
        },
        _ => Color::Red,
    };
    let frame_fg = tint(enable_color, frame_fg);

    // chassis, always present
    draw_text(buf, cx - 4, cy - 4, ".=======.", frame_fg, Color::Black);
    draw_text(buf, cx - 4, cy - 3, "|       |", frame_fg, Color::Black);
    draw_text(buf, cx - 4, cy - 2, "|       |", frame_fg, Color::Black);
    draw_text(buf, cx - 4, cy - 1, "|       |", frame_fg, Color::Black);
    draw_text(buf, cx - 4, cy, "'==+=+=='", frame_fg, Color::Black);
    draw_text(buf, cx - 3, cy + 1, "[#####]", frame_fg, Color::Black);
    draw_text(buf, cx - 3, cy + 2, "[#####]", frame_fg, Color::Black);

    // empty sockets as faint dots
    for slot in EquipSlot::ALL {
        if sim.active[slot.index()].is_none() {
            for &(dx, dy) in slot_cells(slot) {
                buf.set(
                    cx + dx,
                    cy + dy,
                    Cell {
                        ch: '.',
                        fg: Color::DarkGrey,
                        bg: Color::Black,
                        bold: false,
                    },
                );
            }
        }
    }

    // parts, fading ones first so a live part draws over its predecessor
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|a, b| {
        stage.parts[*a]
            .visible
            .cmp(&stage.parts[*b].visible)
            .then(a.cmp(b))
    });
    for i in order {
        let part = &parts[i];
        let Some(slot) = part.slot.as_equip() else {
            continue;
        };
        let visual = stage.parts[i];
        let Some(ch) = dissolve_ch(part.glyph, visual.dissolve) else {
            continue;
        };
        let fg = if visual.dissolve < 1.0 {
            Color::DarkGrey
        } else {
            tint(enable_color, Color::Cyan)
        };
        for &(dx, dy) in slot_cells(slot) {
            buf.set(
                cx + dx,
                cy + dy,
                Cell {
                    ch,
                    fg,
                    bg: Color::Black,
                    bold: false,
                },
            );
        }
    }

    // reaction accents near the mouth
    if let Some(trigger) = stage.reaction() {
        let (accent, fg) = match trigger {
            AnimTrigger::Munch => ("* nom *", Color::Green),
            AnimTrigger::Oiling => ("~ glug ~", Color::Yellow),
            AnimTrigger::Idle(0) => ("  o/", Color::White),
            AnimTrigger::Idle(1) => ("  \\o", Color::White),
            AnimTrigger::Idle(2) => (" <o>", Color::White),
            AnimTrigger::Idle(_) => ("  o?", Color::White),
        };
        draw_text(
            buf,
            cx - accent.len() as i32 / 2,
            cy + 4,
            accent,
            tint(enable_color, fg),
            Color::Black,
        );
    }
}
