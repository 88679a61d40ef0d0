use minifb::{Key, Window};

pub const KEY_COUNT: usize = 16;

/// Left-hand QWERTY block mapped onto the 4x4 hex keypad:
///
/// ```text
/// 1 2 3 C      1 2 3 4
/// 4 5 6 D  <-  Q W E R
/// 7 8 9 E      A S D F
/// A 0 B F      Z X C V
/// ```
const KEYMAP: [(Key, usize); KEY_COUNT] = [
    (Key::Key1, 0x1),
    (Key::Key2, 0x2),
    (Key::Key3, 0x3),
    (Key::Key4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

/// Sample the current pressed state of all 16 keys. The machine wants level
/// state each poll, not edge events, so held keys stay reported until
/// released.
pub fn sample(window: &Window) -> [bool; KEY_COUNT] {
    let mut keys = [false; KEY_COUNT];
    for (key, index) in KEYMAP {
        if window.is_key_down(key) {
            keys[index] = true;
        }
    }
    keys
}
