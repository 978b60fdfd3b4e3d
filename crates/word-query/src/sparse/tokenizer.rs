//! Rule-based Korean morpheme splitter backed by a noun lexicon.
//!
//! Korean attaches particles (조사) and endings (어미) directly to stems, so
//! whitespace tokens such as `금리가` or `의미합니다` never match the bare
//! terms in the corpus. The analyzer splits on script boundaries, strips
//! those suffixes from Hangul runs and drops function morphemes.
//!
//! Suffix stripping alone cannot tell `물가` (a noun) from `물` + `가`, so
//! runs are first matched against a lexicon: a built-in list of common
//! nouns plus the corpus titles. A run that is a known noun followed by
//! particles splits exactly there. Unknown runs fall back to the suffix
//! rules; when the stripped syllable could also end a noun, both readings
//! are indexed.

use std::collections::HashSet;
use std::sync::OnceLock;

use word_core::{Corpus, Tokenizer};

/// Suffixes removed from the end of a Hangul run, longest first.
const SUFFIXES: &[&str] = &[
    // copula and verbal endings
    "이었습니다", "하였습니다", "되었습니다", "했습니다", "합니다", "됩니다", "입니다",
    "이라는", "이라고", "이란", "이며", "이고", "이다", "이야", "인가요", "인가", "인지",
    "한다", "하는", "하고", "하며", "하여", "해서", "했다", "하다", "할", "한",
    "된다", "되는", "되어", "되고", "됐다", "되다", "될", "된",
    "에요", "예요", "이에요", "나요", "까요", "라는", "라고",
    // particles
    "으로서", "으로써", "에서는", "에게서", "으로는", "에서", "에게", "한테", "으로",
    "까지", "부터", "보다", "처럼", "마다", "이나", "에는", "와는", "과는", "만큼",
    "이", "가", "은", "는", "을", "를", "의", "에", "로", "와", "과", "도", "만", "란",
    "야", "요",
];

/// Particles that attach to one-syllable nouns (돈을, 값은) and never end one.
const CASE_PARTICLES: &[&str] = &["은", "는", "을", "를", "에"];

/// Particles that are also a common last syllable of nouns:
/// 물가, 주의, 제도, 효과, 경로, 수요, 차이.
const NOUN_FINAL_PARTICLES: &[&str] = &["이", "가", "의", "도", "과", "로", "요"];

/// Nouns recognized without any corpus: single-syllable nouns and frequent
/// economic terms whose last syllable looks like a particle.
const BUILTIN_NOUNS: &[&str] = &[
    "빚", "돈", "값", "금", "땅", "집", "세", "몫",
    "금리", "기준금리", "물가", "소비자물가", "환율", "이자", "가격", "국가", "주가",
    "원가", "대가", "지가", "수요", "총수요", "공급", "총공급", "소비", "소비자", "소득",
    "세금", "부채", "예금", "대출", "주식", "채권", "제도", "한도", "효과", "결과",
    "경제", "시장", "비용", "차이", "경로", "통화",
];

/// Morphemes that carry no lexical meaning for retrieval.
const STOP_MORPHEMES: &[&str] = &[
    "뭐", "뭐야", "뭔가", "뭔지", "무엇", "무슨", "어떤", "어떻게", "왜", "것", "수", "등",
    "및", "또는", "그", "이", "저", "좀", "더", "알려줘", "알려", "설명해줘", "설명해",
    "주세요", "대해", "대한",
];

fn stop_morphemes() -> &'static HashSet<&'static str> {
    static STOP: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP.get_or_init(|| STOP_MORPHEMES.iter().copied().collect())
}

fn builtin_nouns() -> &'static HashSet<&'static str> {
    static NOUNS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    NOUNS.get_or_init(|| BUILTIN_NOUNS.iter().copied().collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Hangul,
    Latin,
    Digit,
    Other,
}

fn script(c: char) -> Script {
    match c {
        '\u{AC00}'..='\u{D7A3}' => Script::Hangul,
        c if c.is_ascii_digit() => Script::Digit,
        c if c.is_alphabetic() => Script::Latin,
        _ => Script::Other,
    }
}

fn is_suffix(s: &str) -> bool {
    SUFFIXES.iter().any(|suffix| *suffix == s)
}

/// Empty, one suffix, or two stacked suffixes (`에서는`, `으로는`).
fn is_particle_chain(rest: &str) -> bool {
    rest.is_empty()
        || is_suffix(rest)
        || SUFFIXES
            .iter()
            .any(|suffix| rest.strip_suffix(suffix).is_some_and(is_suffix))
}

/// Korean-aware analyzer for the sparse retriever.
#[derive(Debug, Clone)]
pub struct KoreanTokenizer {
    compound_bigrams: bool,
    /// Nouns added on top of the built-in list.
    nouns: HashSet<String>,
}

impl KoreanTokenizer {
    /// Create an analyzer that also indexes syllable bigrams of long stems.
    pub fn new() -> Self {
        Self {
            compound_bigrams: true,
            nouns: HashSet::new(),
        }
    }

    /// Analyzer whose lexicon also holds every corpus title.
    pub fn for_corpus(corpus: &Corpus) -> Self {
        Self::new().with_nouns(corpus.iter().map(|doc| doc.title.as_str()))
    }

    /// Enable or disable compound sub-terms.
    pub fn with_compound_bigrams(mut self, enabled: bool) -> Self {
        self.compound_bigrams = enabled;
        self
    }

    /// Add nouns to the lexicon. Only the Hangul runs of each entry are kept,
    /// so `국내총생산(GDP)` adds `국내총생산`.
    pub fn with_nouns<I, S>(mut self, nouns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for noun in nouns {
            for run in noun.as_ref().split(|c: char| script(c) != Script::Hangul) {
                if !run.is_empty() && !is_suffix(run) && !stop_morphemes().contains(run) {
                    self.nouns.insert(run.to_string());
                }
            }
        }
        self
    }

    fn is_noun(&self, s: &str) -> bool {
        builtin_nouns().contains(s) || self.nouns.contains(s)
    }

    /// Longest known noun at the start of `run` that is followed only by
    /// particles or endings.
    fn lexicon_stem<'a>(&self, run: &'a str) -> Option<&'a str> {
        let mut ends: Vec<usize> = run.char_indices().skip(1).map(|(i, _)| i).collect();
        ends.push(run.len());

        ends.into_iter().rev().find_map(|end| {
            let (noun, rest) = run.split_at(end);
            (self.is_noun(noun) && is_particle_chain(rest)).then_some(noun)
        })
    }

    fn push_hangul(&self, run: &str, out: &mut Vec<String>) {
        // a bare particle, e.g. the "는" of "GDP는"
        if is_suffix(run) {
            return;
        }
        let (stem, unstripped) = match self.lexicon_stem(run) {
            Some(noun) => (noun, None),
            None => strip_endings(run),
        };
        if stem.is_empty() || stop_morphemes().contains(stem) {
            return;
        }

        let mut terms = vec![stem.to_string()];
        terms.extend(unstripped.map(str::to_string));

        if self.compound_bigrams {
            let syllables: Vec<char> = unstripped.unwrap_or(stem).chars().collect();
            if syllables.len() >= 3 {
                for bigram in syllables.windows(2).map(|w| w.iter().collect::<String>()) {
                    if !terms.contains(&bigram) {
                        terms.push(bigram);
                    }
                }
            }
        }
        out.extend(terms);
    }
}

impl Default for KoreanTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip up to two layers of endings (`금리란`, `기준금리에서는`).
///
/// When the last syllable removed could also end a noun, stripping stops
/// there and the form before the strip is returned alongside the stem.
fn strip_endings(run: &str) -> (&str, Option<&str>) {
    let mut stem = run;
    for _ in 0..2 {
        match strip_suffix(stem) {
            Some((shorter, true)) => return (shorter, Some(stem)),
            Some((shorter, false)) => stem = shorter,
            None => break,
        }
    }
    (stem, None)
}

/// Remove the first matching suffix. The flag marks a noun-final particle.
fn strip_suffix(run: &str) -> Option<(&str, bool)> {
    let syllables = run.chars().count();
    SUFFIXES.iter().find_map(|suffix| {
        let stem = run.strip_suffix(suffix)?;
        let stem_len = syllables - suffix.chars().count();
        let ambiguous = NOUN_FINAL_PARTICLES.iter().any(|p| p == suffix);
        let min_stem = if suffix.chars().count() > 1 || CASE_PARTICLES.iter().any(|p| p == suffix)
        {
            1
        } else {
            2
        };
        (stem_len >= min_stem).then_some((stem, ambiguous))
    })
}

impl Tokenizer for KoreanTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut start = 0;
        let mut current = Script::Other;

        let flush = |run: &str, kind: Script, tokens: &mut Vec<String>| match kind {
            Script::Hangul => self.push_hangul(run, tokens),
            Script::Latin | Script::Digit => tokens.push(run.to_string()),
            Script::Other => {}
        };

        for (i, c) in lowered.char_indices() {
            let kind = script(c);
            if kind != current {
                flush(&lowered[start..i], current, &mut tokens);
                start = i;
                current = kind;
            }
        }
        flush(&lowered[start..], current, &mut tokens);

        tokens
    }
}
