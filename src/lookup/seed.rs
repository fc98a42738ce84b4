//! Fixed bilingual starting words. Every pair is a common noun whose
//! Japanese form does not end in the moraic nasal, so the seeded word can
//! never be an instant-loss position.

use rand::Rng;

use super::SeedSource;
use crate::game::session::WordPair;

const START_WORDS: &[(&str, &str)] = &[
    ("사과", "りんご"),
    ("바다", "うみ"),
    ("하늘", "そら"),
    ("노래", "うた"),
    ("나무", "き"),
    ("별", "ほし"),
    ("산", "やま"),
    ("꽃", "はな"),
];

pub struct BuiltinSeeds;

impl SeedSource for BuiltinSeeds {
    fn pick(&self) -> WordPair {
        let mut rng = rand::rng();
        let (korean, japanese) = START_WORDS[rng.random_range(0..START_WORDS.len())];
        WordPair {
            korean: korean.to_string(),
            japanese: japanese.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::phonetics::ends_in_moraic_nasal;

    #[test]
    fn picks_come_from_the_fixed_list() {
        for _ in 0..50 {
            let pair = BuiltinSeeds.pick();
            assert!(
                START_WORDS
                    .iter()
                    .any(|(ko, ja)| *ko == pair.korean && *ja == pair.japanese)
            );
        }
    }

    #[test]
    fn no_seed_ends_in_the_moraic_nasal() {
        for (_, japanese) in START_WORDS {
            assert!(!ends_in_moraic_nasal(japanese), "{japanese}");
        }
    }
}
