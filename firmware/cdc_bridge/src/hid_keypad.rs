//! HID keypad with one bit per key, independent of the serial bridge.
//!
//! Keys are identified by their full 32 bit HID usage so keys from the keyboard,
//! consumer and generic desktop pages can be mixed in one report.

/// Usage page in the high half, usage id in the low half.
pub type KeyUsage = u32;

pub const GENERIC_DESKTOP_PAGE: u16 = 0x01;
pub const KEYBOARD_PAGE: u16 = 0x07;
pub const CONSUMER_PAGE: u16 = 0x0c;

/// Placeholder for a key position without a function.
pub const KEY_NONE: KeyUsage = !0;

pub const fn key_usage(page: u16, usage: u16) -> KeyUsage {
    (page as u32) << 16 | usage as u32
}

/// Letter `n` of the alphabet, 0 is A.
pub const fn key_alpha(n: u8) -> KeyUsage {
    key_usage(KEYBOARD_PAGE, 0x04 + n as u16)
}

/// Digit key `n`.
pub const fn key_number(n: u8) -> KeyUsage {
    key_usage(KEYBOARD_PAGE, 0x1e + (n as u16 + 9) % 10)
}

pub const KEY_RETURN: KeyUsage = key_usage(KEYBOARD_PAGE, 0x28);
pub const KEY_ESCAPE: KeyUsage = key_usage(KEYBOARD_PAGE, 0x29);
pub const KEY_BACKSPACE: KeyUsage = key_usage(KEYBOARD_PAGE, 0x2a);
pub const KEY_TAB: KeyUsage = key_usage(KEYBOARD_PAGE, 0x2b);
pub const KEY_SPACEBAR: KeyUsage = key_usage(KEYBOARD_PAGE, 0x2c);
pub const KEY_VOLUME_UP: KeyUsage = key_usage(CONSUMER_PAGE, 0xe9);
pub const KEY_VOLUME_DOWN: KeyUsage = key_usage(CONSUMER_PAGE, 0xea);
pub const KEY_MUTE: KeyUsage = key_usage(CONSUMER_PAGE, 0xe2);

/// Keys a report can hold.
pub const MAX_KEYS: usize = 255;

const PROLOGUE: [u8; 6] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x07, // Usage (Keypad)
    0xa1, 0x01, // Collection (Application)
];

fn mapped(keys: &[KeyUsage]) -> impl Iterator<Item = KeyUsage> + '_ {
    keys.iter().cloned().filter(|&k| k != KEY_NONE)
}

/// Size of the report descriptor for `n_keys` keys.
pub fn descriptor_len(n_keys: usize) -> usize {
    let mut len = PROLOGUE.len() + n_keys * 5 + 7;
    if n_keys & 7 != 0 {
        len += 6;
    }
    len
}

/// Bytes of an input report for `n_keys` keys.
pub fn report_len(n_keys: usize) -> usize {
    (n_keys + 7) >> 3
}

/// Writes the report descriptor for `keys` into `buf`, skipping `KEY_NONE`.
///
/// Returns the descriptor length, or `None` when there are too many keys or `buf`
/// is too small.
pub fn build_report_descriptor(keys: &[KeyUsage], buf: &mut [u8]) -> Option<usize> {
    let n_keys = mapped(keys).count();
    if n_keys > MAX_KEYS || buf.len() < descriptor_len(n_keys) {
        return None;
    }

    buf[..PROLOGUE.len()].copy_from_slice(&PROLOGUE);
    let mut off = PROLOGUE.len();
    for key in mapped(keys) {
        // long usage item with page
        buf[off] = 0x0b;
        buf[off + 1..off + 5].copy_from_slice(&key.to_le_bytes());
        off += 5;
    }

    let mut put = |items: &[u8]| {
        buf[off..off + items.len()].copy_from_slice(items);
        off += items.len();
    };
    put(&[0x75, 0x01]); // Report Size (1)
    put(&[0x95, n_keys as u8]); // Report Count
    put(&[0x81, 0x02]); // Input (Data, Variable, Absolute)
    if n_keys & 7 != 0 {
        put(&[0x75, (8 - (n_keys & 7)) as u8]); // padding to a whole byte
        put(&[0x95, 0x01]);
        put(&[0x81, 0x01]); // Input (Constant)
    }
    put(&[0xc0]); // End Collection
    Some(off)
}

pub struct KeypadReport<'a> {
    keys: &'a [KeyUsage],
    n_keys: usize,
    bits: [u8; 32],
    needs_update: bool,
}

impl<'a> KeypadReport<'a> {
    pub fn new(keys: &'a [KeyUsage]) -> Option<KeypadReport<'a>> {
        let n_keys = mapped(keys).count();
        if n_keys > MAX_KEYS {
            return None;
        }
        Some(KeypadReport {
            keys,
            n_keys,
            bits: [0; 32],
            // the host wants the idle state right after enumeration
            needs_update: true,
        })
    }

    pub fn n_keys(&self) -> usize {
        self.n_keys
    }

    fn index(&self, key: KeyUsage) -> Option<usize> {
        if key == KEY_NONE {
            return None;
        }
        mapped(self.keys).position(|k| k == key)
    }

    /// Unknown keys are ignored.
    pub fn key_down(&mut self, key: KeyUsage) {
        if let Some(ix) = self.index(key) {
            self.bits[ix >> 3] |= 1 << (ix & 7);
            self.needs_update = true;
        }
    }

    pub fn key_up(&mut self, key: KeyUsage) {
        if let Some(ix) = self.index(key) {
            self.bits[ix >> 3] &= !(1 << (ix & 7));
            self.needs_update = true;
        }
    }

    pub fn is_down(&self, key: KeyUsage) -> bool {
        match self.index(key) {
            Some(ix) => self.bits[ix >> 3] & (1 << (ix & 7)) != 0,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits[..report_len(self.n_keys)]
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// The current report reached the host.
    pub fn mark_sent(&mut self) {
        self.needs_update = false;
    }

    /// Forces the next poll to send the report again.
    pub fn invalidate(&mut self) {
        self.needs_update = true;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyEvent {
    Down(usize),
    Up(usize),
}

/// Ignores further changes of a key for a while after it changed.
pub struct Debouncer<const N: usize> {
    countdown: [u16; N],
    pressed: [bool; N],
    period: u16,
}

impl<const N: usize> Debouncer<N> {
    /// `period` is in ticks.
    pub fn new(period: u16) -> Debouncer<N> {
        Debouncer {
            countdown: [0; N],
            pressed: [false; N],
            period,
        }
    }

    /// One tick elapsed.
    pub fn tick(&mut self) {
        for c in self.countdown.iter_mut() {
            *c = c.saturating_sub(1);
        }
    }

    /// Feeds the raw level of key `index`, returns a change that passed the filter.
    pub fn update(&mut self, index: usize, pressed: bool) -> Option<KeyEvent> {
        if index >= N || self.countdown[index] > 0 || self.pressed[index] == pressed {
            return None;
        }
        self.pressed[index] = pressed;
        self.countdown[index] = self.period;
        Some(if pressed {
            KeyEvent::Down(index)
        } else {
            KeyEvent::Up(index)
        })
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        index < N && self.pressed[index]
    }
}
