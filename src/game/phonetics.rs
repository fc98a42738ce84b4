//! Script-aware phonetic normalization for chain matching.
//!
//! Everything here is pure: katakana folding, small-kana folding, reading
//! extraction from parenthetical annotations, and Korean initial-sound
//! (dueum) expansion.

/// Writing system of a submitted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Hangul,
    Japanese,
}

/// Detect the script of a token. Any Hangul codepoint wins; everything else
/// is treated as Japanese.
pub fn detect_script(token: &str) -> Script {
    if token.chars().any(is_hangul) {
        Script::Hangul
    } else {
        Script::Japanese
    }
}

fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // precomposed syllables
        | '\u{1100}'..='\u{11FF}' // jamo
        | '\u{3130}'..='\u{318F}' // compatibility jamo
    )
}

/// Convert katakana codepoints to their hiragana equivalents.
/// The two blocks are offset by a fixed 0x60.
pub fn to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{30A1}'..='\u{30F6}' => {
                char::from_u32(c as u32 - 0x60).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Fold a small kana to its full-size counterpart (ゃ → や). Small ka/ke
/// exist only as katakana in the wild but arrive here already folded to
/// their hiragana codepoints.
pub fn fold_small_kana(c: char) -> char {
    match c {
        'ぁ' => 'あ',
        'ぃ' => 'い',
        'ぅ' => 'う',
        'ぇ' => 'え',
        'ぉ' => 'お',
        'っ' => 'つ',
        'ゃ' => 'や',
        'ゅ' => 'ゆ',
        'ょ' => 'よ',
        'ゎ' => 'わ',
        'ゕ' | 'ヵ' => 'か',
        'ゖ' | 'ヶ' => 'け',
        _ => c,
    }
}

/// Extract the authoritative reading from a display form.
///
/// `"学校(がっこう)"` → `"がっこう"`; with several groups the last one wins;
/// without any parenthetical the input is returned unchanged.
pub fn clean_reading(text: &str) -> &str {
    let mut last = None;
    let mut open = None;
    for (i, c) in text.char_indices() {
        match c {
            '(' => open = Some(i + c.len_utf8()),
            ')' => {
                if let Some(start) = open.take()
                    && start < i
                {
                    last = Some(&text[start..i]);
                }
            }
            _ => {}
        }
    }
    last.unwrap_or(text)
}

/// Remove every parenthetical annotation, keeping the base word.
/// `"学校(がっこう)"` → `"学校"`. Used for duplicate detection.
pub fn strip_annotation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Normalized comparable form of a Japanese reading: annotation resolved,
/// katakana folded to hiragana, surrounding whitespace dropped.
pub fn comparable_reading(text: &str) -> String {
    to_hiragana(clean_reading(text).trim())
}

/// Effective final sound of a Japanese reading. A trailing long-vowel mark
/// is resolved by the character in front of it, not the mark itself.
pub fn final_sound(reading: &str) -> Option<char> {
    let normalized = comparable_reading(reading);
    let chars: Vec<char> = normalized.chars().collect();
    let mut i = chars.len().checked_sub(1)?;
    while chars[i] == 'ー' {
        if i == 0 {
            return Some('ー');
        }
        i -= 1;
    }
    Some(fold_small_kana(chars[i]))
}

/// Effective first sound of a Japanese reading.
pub fn first_sound(reading: &str) -> Option<char> {
    comparable_reading(reading).chars().next().map(fold_small_kana)
}

/// Does a Japanese reading end in the moraic nasal (ん/ン)?
/// Such a word is an instant loss for the submitter.
pub fn ends_in_moraic_nasal(reading: &str) -> bool {
    matches!(comparable_reading(reading).chars().last(), Some('ん' | 'ン'))
}

const SYLLABLE_BASE: u32 = 0xAC00;
const VOWEL_COUNT: u32 = 21;
const FINAL_COUNT: u32 = 28;

const INITIAL_NIEUN: u32 = 2; // ㄴ
const INITIAL_RIEUL: u32 = 5; // ㄹ
const INITIAL_IEUNG: u32 = 11; // ㅇ (silent)

// Vowel indices in the precomposed-syllable layout.
const Y_VOWELS: [u32; 6] = [2, 6, 7, 12, 17, 20]; // ㅑ ㅕ ㅖ ㅛ ㅠ ㅣ
const PLAIN_VOWELS: [u32; 6] = [0, 1, 8, 11, 13, 18]; // ㅏ ㅐ ㅗ ㅚ ㅜ ㅡ

/// Expand a Hangul syllable into the set of initial sounds the chain rule
/// accepts, applying dueum (initial-sound) alternation:
///
/// - ㄴ before a y-vowel drops to silent ㅇ (녀 → 여)
/// - ㄹ before a y-vowel drops to silent ㅇ (리 → 이)
/// - ㄹ before a plain vowel shifts to ㄴ (라 → 나)
///
/// The original character is always the first member of the result.
pub fn expand_initial_variants(c: char) -> Vec<char> {
    let code = c as u32;
    if !(SYLLABLE_BASE..=0xD7A3).contains(&code) {
        return vec![c];
    }
    let syllable = code - SYLLABLE_BASE;
    let initial = syllable / (VOWEL_COUNT * FINAL_COUNT);
    let vowel = (syllable % (VOWEL_COUNT * FINAL_COUNT)) / FINAL_COUNT;
    let final_jamo = syllable % FINAL_COUNT;

    let with_initial = |new_initial: u32| {
        char::from_u32(SYLLABLE_BASE + (new_initial * VOWEL_COUNT + vowel) * FINAL_COUNT + final_jamo)
            .unwrap_or(c)
    };

    let variant = match initial {
        INITIAL_NIEUN if Y_VOWELS.contains(&vowel) => Some(with_initial(INITIAL_IEUNG)),
        INITIAL_RIEUL if Y_VOWELS.contains(&vowel) => Some(with_initial(INITIAL_IEUNG)),
        INITIAL_RIEUL if PLAIN_VOWELS.contains(&vowel) => Some(with_initial(INITIAL_NIEUN)),
        _ => None,
    };

    match variant {
        Some(v) => vec![c, v],
        None => vec![c],
    }
}
