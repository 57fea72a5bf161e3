#![forbid(unsafe_code)]

//! Diacritic folding table.
//!
//! Every entry maps an ASCII base letter to the characters that should be
//! treated as that letter when searching. The table drives two things:
//!
//! - [`fold`]: replaces each variant with its base letter and lowercases
//!   the rest, producing a string with exactly as many `char`s as the input.
//! - [`class_for`]: the bracket expression a tokenizer substitutes for a
//!   bare base letter so that `a` also matches `á`, `à`, `ä`, ...
//!
//! # Invariants
//!
//! 1. `fold(s).chars().count() == s.chars().count()` for every `s`.
//! 2. `fold(fold(s)) == fold(s)`.
//! 3. Combining marks never appear in the table; they pass through `fold`
//!    unchanged.
//! 4. Case never matters: every `char` folds like its one-`char` lowercase
//!    and uppercase forms, including `Σ`/`σ`/`ς` and `İ`/`I`/`ı`/`i`.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Base letter → variants treated as that letter.
const DIACRITICS: &[(char, &str)] = &[
    ('a', "aḀḁĂăÂâǍǎȺⱥȦȧẠạÄäÀàÁáĀāÃãÅåąĄ"),
    ('b', "b␢βΒB฿𐌁ᛒ"),
    ('c', "cĆćĈĉČčĊċÇçḈḉȻȼƇƈɕᴄＣｃ"),
    ('d', "dĎďḊḋḐḑḌḍḒḓḎḏĐđƉɖƊɗƋƌᵭᶁᶑȡᴅＤｄð"),
    (
        'e',
        "eÉéÈèÊêḘḙĚěĔĕẼẽḚḛẺẻĖėËëĒēȨȩĘęᶒɆɇȄȅẾếỀềỄễỂểḜḝḖḗḔḕȆȇẸẹỆệⱸᴇＥｅɘǝƏƐε",
    ),
    ('f', "fƑƒḞḟ"),
    ('g', "gɢ₲ǤǥĜĝĞğĢģƓɠĠġ"),
    ('h', "hĤĥĦħḨḩẖḤḥḢḣɦʰǶƕ"),
    ('i', "iÍíÌìĬĭÎîǏǐÏïḮḯĨĩĮįĪīỈỉȈȉȊȋỊịḬḭƗɨᵻᶖİIıɪＩｉ"),
    ('j', "jȷĴĵɈɉʝɟʲ"),
    ('k', "kƘƙꝀꝁḰḱǨǩḲḳḴḵκϰ₭"),
    ('l', "lŁłĽľĻļĹĺḶḷḸḹḼḽḺḻĿŀȽƚⱠⱡⱢɫɬᶅɭȴʟＬｌ"),
    ('n', "nŃńǸǹŇňÑñṄṅŅņṆṇṊṋṈṉƝɲȠƞᵰᶇɳȵɴＮｎŊŋ"),
    ('o', "oØøÖöÓóÒòÔôǑǒŐőŎŏȮȯỌọƟɵƠơỎỏŌōÕõǪǫȌȍՕօ"),
    ('p', "pṔṕṖṗⱣᵽƤƥᵱ"),
    ('q', "qꝖꝗʠɊɋꝘꝙ"),
    ('r', "rŔŕɌɍŘřŖŗṘṙȐȑȒȓṚṛⱤɽ"),
    ('s', "sŚśṠṡṢṣꞨꞩŜŝŠšŞşȘș"),
    ('t', "tŤťṪṫŢţṬṭƮʈȚțṰṱṮṯƬƭ"),
    ('u', "uŬŭɄʉỤụÜüÚúÙùÛûǓǔŰűƯưỦủŪūŨũŲųȔȕ∪"),
    ('v', "vṼṽṾṿƲʋꝞꝟⱱ"),
    ('w', "wẂẃẀẁŴŵẄẅẆẇẈẉ"),
    ('x', "xẌẍẊẋχ"),
    ('y', "yÝýỲỳŶŷŸÿỸỹẎẏỴỵɎɏƳƴ"),
    ('z', "zŹźẐẑŽžŻżẒẓẔẕƵƶ"),
];

const SIGMA: char = 'σ';
const FINAL_SIGMA: char = 'ς';

struct Tables {
    /// variant → base letter
    lookup: HashMap<char, char>,
    /// base letter → `[...]` bracket expression
    classes: HashMap<char, String>,
}

fn is_combining(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F)
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut lookup = HashMap::new();
        let mut classes = HashMap::with_capacity(DIACRITICS.len());
        for &(base, variants) in DIACRITICS {
            let mut class = String::with_capacity(variants.len() + 2);
            class.push('[');
            for variant in variants.chars().filter(|c| !is_combining(*c)) {
                // Later letters win on overlap, matching table order.
                lookup.insert(variant, base);
                class.push_str(&regex::escape(variant.encode_utf8(&mut [0; 4])));
            }
            class.push(']');
            classes.insert(base, class);
        }
        Tables { lookup, classes }
    })
}

/// Fold a single character.
///
/// Table variants map to their base letter. Anything else is lowercased
/// and, when the lowercase form spans several `char`s (`İ` becomes `i`
/// plus a combining dot), only its first `char` is kept. Final sigma `ς`
/// folds to `σ`, so the result never depends on the position in a word.
#[must_use]
pub fn fold_char(c: char) -> char {
    if let Some(&base) = tables().lookup.get(&c) {
        return base;
    }
    let lower = c.to_lowercase().next().unwrap_or(c);
    if lower == FINAL_SIGMA {
        return SIGMA;
    }
    tables().lookup.get(&lower).copied().unwrap_or(lower)
}

/// Fold `text` for diacritic- and case-insensitive comparison.
///
/// The result has the same number of `char`s as the input, so character
/// offsets computed against the folded text are valid in the original.
///
/// ```
/// use combo_text::fold;
///
/// assert_eq!(fold("Café Crème"), "cafe creme");
/// assert_eq!(fold("ŁÓDŹ"), "lodz");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Bracket expression matching `base` and all of its variants.
///
/// Returns `None` for characters that are not base letters in the table.
#[must_use]
pub fn class_for(base: char) -> Option<&'static str> {
    tables().classes.get(&base).map(String::as_str)
}

/// All base letters known to the table, in table order.
pub fn base_letters() -> impl Iterator<Item = char> {
    DIACRITICS.iter().map(|&(base, _)| base)
}
