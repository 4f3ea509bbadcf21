//! Fallback colors for labels that don't carry their own.

use crate::annotation::Label;

/// RGB colors, chosen to stay readable on both dark and bright footage.
const PALETTE: [[u8; 3]; 12] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [0, 194, 255],
    [52, 69, 147],
    [100, 115, 255],
    [203, 56, 255],
];

/// Color of a label: its own if set, else a palette entry derived from its name.
pub fn label_color(label: &Label) -> [u8; 3] {
    label.color.unwrap_or_else(|| name_color(&label.name))
}

/// Stable palette color for a name (FNV-1a over the name bytes).
pub fn name_color(name: &str) -> [u8; 3] {
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}
