use crate::core::machine::InputButton;

/// Keys of the 40-key matrix, numbered `half_row * 5 + bit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[rustfmt::skip]
pub enum SpectrumKey {
    CapsShift, Z, X, C, V,
    A, S, D, F, G,
    Q, W, E, R, T,
    N1, N2, N3, N4, N5,
    N0, N9, N8, N7, N6,
    P, O, I, U, Y,
    Enter, L, K, J, H,
    Space, SymbolShift, M, N, B,
}

impl SpectrumKey {
    pub const ALL: [SpectrumKey; 40] = {
        use SpectrumKey::*;
        [
            CapsShift, Z, X, C, V, A, S, D, F, G, Q, W, E, R, T, N1, N2, N3, N4, N5, N0, N9, N8,
            N7, N6, P, O, I, U, Y, Enter, L, K, J, H, Space, SymbolShift, M, N, B,
        ]
    };

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Address line (A8 + half_row) that selects this key.
    pub fn half_row(self) -> usize {
        self as usize / 5
    }

    pub fn bit(self) -> u8 {
        self as u8 % 5
    }
}

#[rustfmt::skip]
pub static KEYBOARD_INPUT_MAP: &[InputButton] = &[
    InputButton { id: 0, name: "Caps Shift" },
    InputButton { id: 1, name: "Z" },
    InputButton { id: 2, name: "X" },
    InputButton { id: 3, name: "C" },
    InputButton { id: 4, name: "V" },
    InputButton { id: 5, name: "A" },
    InputButton { id: 6, name: "S" },
    InputButton { id: 7, name: "D" },
    InputButton { id: 8, name: "F" },
    InputButton { id: 9, name: "G" },
    InputButton { id: 10, name: "Q" },
    InputButton { id: 11, name: "W" },
    InputButton { id: 12, name: "E" },
    InputButton { id: 13, name: "R" },
    InputButton { id: 14, name: "T" },
    InputButton { id: 15, name: "1" },
    InputButton { id: 16, name: "2" },
    InputButton { id: 17, name: "3" },
    InputButton { id: 18, name: "4" },
    InputButton { id: 19, name: "5" },
    InputButton { id: 20, name: "0" },
    InputButton { id: 21, name: "9" },
    InputButton { id: 22, name: "8" },
    InputButton { id: 23, name: "7" },
    InputButton { id: 24, name: "6" },
    InputButton { id: 25, name: "P" },
    InputButton { id: 26, name: "O" },
    InputButton { id: 27, name: "I" },
    InputButton { id: 28, name: "U" },
    InputButton { id: 29, name: "Y" },
    InputButton { id: 30, name: "Enter" },
    InputButton { id: 31, name: "L" },
    InputButton { id: 32, name: "K" },
    InputButton { id: 33, name: "J" },
    InputButton { id: 34, name: "H" },
    InputButton { id: 35, name: "Space" },
    InputButton { id: 36, name: "Symbol Shift" },
    InputButton { id: 37, name: "M" },
    InputButton { id: 38, name: "N" },
    InputButton { id: 39, name: "B" },
];

/// The keyboard matrix as seen through port 0xFE.
#[derive(Clone, Debug, Default)]
pub struct KeyboardDevice {
    // One byte per half-row, bit set = key down.
    pressed: [u8; 8],
}

impl KeyboardDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: SpectrumKey, pressed: bool) {
        let mask = 1 << key.bit();
        let line = &mut self.pressed[key.half_row()];
        if pressed {
            *line |= mask;
        } else {
            *line &= !mask;
        }
    }

    pub fn key_status(&self, key: SpectrumKey) -> bool {
        self.pressed[key.half_row()] & (1 << key.bit()) != 0
    }

    pub fn release_all(&mut self) {
        self.pressed = [0; 8];
    }

    /// Bits 0-4 of a port 0xFE read. Every half-row whose address line is low
    /// in `high_byte` is scanned; pressed keys read as 0.
    pub fn read(&self, high_byte: u8) -> u8 {
        let mut down = 0;
        for (row, &line) in self.pressed.iter().enumerate() {
            if high_byte & (1 << row) == 0 {
                down |= line;
            }
        }
        !down & 0x1F
    }
}
