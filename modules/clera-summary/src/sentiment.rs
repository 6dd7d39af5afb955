// Lexicon sentiment for headlines and snippets.
//
// Each matched word carries a polarity in -3..=3; a negator in the two
// preceding tokens flips it. The score is the mean polarity scaled to
// [-1.0, 1.0], and 0.0 when nothing matched.

const MAX_POLARITY: f64 = 3.0;
const NEGATION_WINDOW: usize = 2;

const NEGATORS: &[&str] = &[
    "not", "no", "never", "without", "isn't", "wasn't", "aren't", "don't", "doesn't", "didn't",
    "won't", "can't", "cannot", "hardly",
];

const LEXICON: &[(&str, i8)] = &[
    // positive
    ("beat", 2),
    ("beats", 2),
    ("boom", 2),
    ("boost", 2),
    ("boosts", 2),
    ("bullish", 3),
    ("climb", 1),
    ("climbs", 1),
    ("confidence", 2),
    ("gain", 2),
    ("gains", 2),
    ("good", 2),
    ("growth", 2),
    ("high", 1),
    ("improve", 2),
    ("improves", 2),
    ("jump", 2),
    ("jumps", 2),
    ("optimism", 2),
    ("optimistic", 2),
    ("outperform", 2),
    ("positive", 2),
    ("profit", 2),
    ("profits", 2),
    ("rally", 2),
    ("rallies", 2),
    ("rebound", 2),
    ("record", 1),
    ("recover", 1),
    ("recovery", 2),
    ("rise", 1),
    ("rises", 1),
    ("soar", 3),
    ("soars", 3),
    ("strong", 2),
    ("surge", 3),
    ("surges", 3),
    ("upgrade", 2),
    ("win", 2),
    // negative
    ("bankruptcy", -3),
    ("bearish", -3),
    ("concern", -1),
    ("concerns", -1),
    ("crash", -3),
    ("crisis", -3),
    ("cut", -1),
    ("cuts", -1),
    ("decline", -2),
    ("declines", -2),
    ("default", -2),
    ("downgrade", -2),
    ("drop", -2),
    ("drops", -2),
    ("fall", -2),
    ("falls", -2),
    ("fear", -2),
    ("fears", -2),
    ("fraud", -3),
    ("inflation", -1),
    ("layoffs", -2),
    ("loss", -2),
    ("losses", -2),
    ("miss", -2),
    ("misses", -2),
    ("negative", -2),
    ("plunge", -3),
    ("plunges", -3),
    ("recession", -3),
    ("risk", -1),
    ("selloff", -2),
    ("slump", -2),
    ("slumps", -2),
    ("tumble", -2),
    ("tumbles", -2),
    ("uncertainty", -2),
    ("weak", -2),
    ("worst", -3),
];

fn polarity(word: &str) -> Option<i8> {
    LEXICON
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, p)| *p)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_lowercase())
        .collect()
}

/// Sentiment of `text` in [-1.0, 1.0].
pub fn score(text: &str) -> f64 {
    let tokens = tokens(text);
    let mut total = 0i32;
    let mut matched = 0u32;

    for (i, token) in tokens.iter().enumerate() {
        let Some(p) = polarity(token) else {
            continue;
        };
        let negated = tokens[i.saturating_sub(NEGATION_WINDOW)..i]
            .iter()
            .any(|t| NEGATORS.contains(&t.as_str()));
        total += if negated { -i32::from(p) } else { i32::from(p) };
        matched += 1;
    }

    if matched == 0 {
        return 0.0;
    }
    let mean = f64::from(total) / f64::from(matched);
    (mean / MAX_POLARITY).clamp(-1.0, 1.0)
}
