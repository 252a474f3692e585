//! Fixed DNA code tables.
//!
//! Short or speed-sensitive DNA sequences skip code construction entirely and
//! reference one of these tables by id; containers then carry no codeword
//! table of their own. Ids 4..=7 are the complement palettes of ids 0..=3:
//! identical codes, complementary symbols, so complementing a fixed-code
//! sequence is a header-only operation (id XOR 4).

use std::sync::OnceLock;

use crate::codes::{bitmaps_for, CodeSet, Codeword};

/// Number of fixed DNA code sets.
pub const N_FIXED_DNA_CODES: usize = 8;

fn fixed(id: u8, has_equal_length: bool, ignore_case: bool, table: &[(u8, u8, u8)]) -> CodeSet {
    let words: Vec<Codeword> = table
        .iter()
        .map(|&(code, code_length, symbol)| Codeword {
            code,
            code_length,
            symbol,
        })
        .collect();
    let symbols: Vec<u8> = words.iter().map(|w| w.symbol).collect();
    let (ascii_bitmap_low, ascii_bitmap_high) = bitmaps_for(&symbols);
    let max_codeword_length = words.iter().map(|w| w.code_length).max().unwrap_or(0);
    CodeSet {
        words,
        n_swapped_symbols: 0,
        max_codeword_length,
        max_swapped_codeword_length: 0,
        has_equal_length,
        is_fixed: true,
        uses_rle: false,
        ignore_case,
        fixed_id: id,
        swap_savings: 0,
        ascii_bitmap_low,
        ascii_bitmap_high,
    }
}

/// The fixed DNA code sets, indexed by fixed id.
///
/// - 0: four-letter DNA, case-insensitive
/// - 1: four-letter DNA, case-sensitive (eight symbols)
/// - 2: IUPAC ambiguity codes, case-insensitive
/// - 3: IUPAC ambiguity codes, case-sensitive
/// - 4..=7: complement palettes of 0..=3
pub fn fixed_dna_codes() -> &'static [CodeSet; N_FIXED_DNA_CODES] {
    static CODES: OnceLock<[CodeSet; N_FIXED_DNA_CODES]> = OnceLock::new();
    CODES.get_or_init(|| {
        [
            fixed(
                0,
                true,
                true,
                &[(0, 2, b'A'), (64, 2, b'C'), (128, 2, b'G'), (192, 2, b'T')],
            ),
            fixed(
                1,
                true,
                false,
                &[
                    (0, 3, b'A'),
                    (32, 3, b'C'),
                    (64, 3, b'G'),
                    (96, 3, b'T'),
                    (128, 3, b'a'),
                    (160, 3, b'c'),
                    (192, 3, b'g'),
                    (224, 3, b't'),
                ],
            ),
            fixed(
                2,
                false,
                true,
                &[
                    (0, 2, b'A'),
                    (64, 2, b'C'),
                    (128, 2, b'G'),
                    (192, 3, b'T'),
                    (224, 4, b'N'),
                    (240, 7, b'M'),
                    (242, 7, b'R'),
                    (244, 7, b'Y'),
                    (246, 7, b'W'),
                    (248, 7, b'B'),
                    (250, 7, b'V'),
                    (252, 8, b'S'),
                    (253, 8, b'K'),
                    (254, 8, b'D'),
                    (255, 8, b'H'),
                ],
            ),
            fixed(
                3,
                false,
                false,
                &[
                    (0, 3, b'A'),
                    (64, 3, b'C'),
                    (128, 3, b'G'),
                    (192, 4, b'T'),
                    (224, 6, b'N'),
                    (232, 7, b'Y'),
                    (236, 7, b'R'),
                    (240, 8, b'M'),
                    (242, 8, b'W'),
                    (244, 8, b'B'),
                    (246, 8, b'V'),
                    (248, 8, b'S'),
                    (250, 8, b'K'),
                    (252, 8, b'D'),
                    (254, 8, b'H'),
                    (32, 3, b'a'),
                    (96, 3, b'c'),
                    (160, 3, b'g'),
                    (208, 4, b't'),
                    (228, 6, b'n'),
                    (234, 7, b'y'),
                    (238, 7, b'r'),
                    (241, 8, b'm'),
                    (243, 8, b'w'),
                    (245, 8, b'b'),
                    (247, 8, b'v'),
                    (249, 8, b's'),
                    (251, 8, b'k'),
                    (253, 8, b'd'),
                    (255, 8, b'h'),
                ],
            ),
            fixed(
                4,
                true,
                true,
                &[(0, 2, b'T'), (64, 2, b'G'), (128, 2, b'C'), (192, 2, b'A')],
            ),
            fixed(
                5,
                true,
                false,
                &[
                    (0, 3, b'T'),
                    (32, 3, b'G'),
                    (64, 3, b'C'),
                    (96, 3, b'A'),
                    (128, 3, b't'),
                    (160, 3, b'g'),
                    (192, 3, b'c'),
                    (224, 3, b'a'),
                ],
            ),
            fixed(
                6,
                false,
                true,
                &[
                    (0, 2, b'T'),
                    (64, 2, b'G'),
                    (128, 2, b'C'),
                    (192, 3, b'A'),
                    (224, 4, b'N'),
                    (240, 7, b'K'),
                    (242, 7, b'Y'),
                    (244, 7, b'R'),
                    (246, 7, b'W'),
                    (248, 7, b'V'),
                    (250, 7, b'B'),
                    (252, 8, b'S'),
                    (253, 8, b'M'),
                    (254, 8, b'H'),
                    (255, 8, b'D'),
                ],
            ),
            fixed(
                7,
                false,
                false,
                &[
                    (0, 3, b'T'),
                    (64, 3, b'G'),
                    (128, 3, b'C'),
                    (192, 4, b'A'),
                    (224, 6, b'N'),
                    (232, 7, b'R'),
                    (236, 7, b'Y'),
                    (240, 8, b'K'),
                    (242, 8, b'W'),
                    (244, 8, b'V'),
                    (246, 8, b'B'),
                    (248, 8, b'S'),
                    (250, 8, b'M'),
                    (252, 8, b'H'),
                    (254, 8, b'D'),
                    (32, 3, b't'),
                    (96, 3, b'g'),
                    (160, 3, b'c'),
                    (208, 4, b'a'),
                    (228, 6, b'n'),
                    (234, 7, b'r'),
                    (238, 7, b'y'),
                    (241, 8, b'k'),
                    (243, 8, b'w'),
                    (245, 8, b'v'),
                    (247, 8, b'b'),
                    (249, 8, b's'),
                    (251, 8, b'm'),
                    (253, 8, b'h'),
                    (255, 8, b'd'),
                ],
            ),
        ]
    })
}

/// IUPAC DNA complement, both cases; symbols without a complement map to
/// themselves.
pub fn complement_symbol(c: u8) -> u8 {
    match c {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'M' => b'K',
        b'K' => b'M',
        b'R' => b'Y',
        b'Y' => b'R',
        b'D' => b'H',
        b'H' => b'D',
        b'V' => b'B',
        b'B' => b'V',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'm' => b'k',
        b'k' => b'm',
        b'r' => b'y',
        b'y' => b'r',
        b'd' => b'h',
        b'h' => b'd',
        b'v' => b'b',
        b'b' => b'v',
        other => other,
    }
}
