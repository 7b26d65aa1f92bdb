// ============================================================
// Label Dictionary
// ============================================================
// Maps label symbols (phonemes or characters) to the integer
// indices used by the model, and back again for display.
//
// The CTC blank is not a symbol in the dictionary: it is the
// extra class appended AFTER the last real label, so
// blank == dictionary size and num_classes == size + 1.
//
// Phoneme labels come from the standard TIMIT fold file
// `phones.60-48-39.map`: three whitespace-separated columns
// (61-set, 48-set, 39-set). Training targets use the 39-symbol
// evaluation set, i.e. the unique entries of the last column.
// Symbols whose line has no third column (glottal stop `q`)
// are folded away entirely.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Which label granularity a run trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// Folded 39-phoneme set
    Phn,
    /// Character transcriptions
    Char,
}

impl FromStr for LabelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "phn" => Ok(LabelKind::Phn),
            "char" => Ok(LabelKind::Char),
            other => bail!("unknown label type '{other}' (expected 'phn' or 'char')"),
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKind::Phn => write!(f, "phn"),
            LabelKind::Char => write!(f, "char"),
        }
    }
}

// ─── LabelMap ─────────────────────────────────────────────────────────────────
/// Symbol <-> index dictionary for one label granularity.
#[derive(Debug, Clone)]
pub struct LabelMap {
    kind: LabelKind,
    symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelMap {
    fn from_symbols(kind: LabelKind, symbols: Vec<String>) -> Self {
        let index = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self { kind, symbols, index }
    }

    /// Build the phoneme dictionary from a TIMIT `phones.60-48-39.map` file.
    pub fn from_phn_map_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read phoneme map '{}'", path.display()))?;
        let symbols = parse_phn_map(&text);
        if symbols.is_empty() {
            bail!("phoneme map '{}' contains no foldable entries", path.display());
        }
        Ok(Self::from_symbols(LabelKind::Phn, symbols))
    }

    /// Build the character dictionary: `a`-`z`, space, apostrophe.
    pub fn char_map() -> Self {
        let mut symbols: Vec<String> = ('a'..='z').map(|c| c.to_string()).collect();
        symbols.push(" ".to_string());
        symbols.push("'".to_string());
        Self::from_symbols(LabelKind::Char, symbols)
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    /// Number of real label symbols (blank excluded).
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Index reserved for the CTC blank (one past the last symbol).
    pub fn blank(&self) -> usize {
        self.symbols.len()
    }

    /// Model output dimension: every symbol plus the blank.
    pub fn num_classes(&self) -> usize {
        self.symbols.len() + 1
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    /// The symbol for `idx`; the blank renders as `<b>`.
    pub fn symbol(&self, idx: usize) -> &str {
        if idx == self.blank() {
            "<b>"
        } else {
            &self.symbols[idx]
        }
    }

    /// Render a label sequence for humans: phonemes are space-joined,
    /// characters are concatenated.
    pub fn display(&self, labels: &[usize]) -> String {
        let parts: Vec<&str> = labels.iter().map(|&i| self.symbol(i)).collect();
        match self.kind {
            LabelKind::Phn => parts.join(" "),
            LabelKind::Char => parts.concat(),
        }
    }
}

/// Parse the fold file into the sorted, de-duplicated 39-symbol set.
fn parse_phn_map(text: &str) -> Vec<String> {
    let mut folded: Vec<String> = text
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let _phn61 = cols.next()?;
            let _phn48 = cols.next()?;
            // Lines without a third column are folded away (e.g. `q`)
            cols.next().map(|s| s.to_string())
        })
        .collect();
    folded.sort();
    folded.dedup();
    folded
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const MAP_SNIPPET: &str = "\
aa\taa\taa
ao\tao\taa
ax\tax\tah
ah\tah\tah
q
sil\tsil\tsil
";

    #[test]
    fn phn_map_folds_and_dedups() {
        let symbols = parse_phn_map(MAP_SNIPPET);
        // aa+ao fold to aa, ax+ah fold to ah, q disappears
        assert_eq!(symbols, vec!["aa", "ah", "sil"]);
    }

    #[test]
    fn phn_map_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phones.60-48-39.map");
        std::fs::write(&path, MAP_SNIPPET).unwrap();

        let map = LabelMap::from_phn_map_file(&path).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.blank(), 3);
        assert_eq!(map.num_classes(), 4);
        assert_eq!(map.index_of("ah"), Some(1));
        assert_eq!(map.symbol(map.blank()), "<b>");
        assert_eq!(map.display(&[0, 2]), "aa sil");
    }

    #[test]
    fn char_map_layout() {
        let map = LabelMap::char_map();
        assert_eq!(map.len(), 28);
        assert_eq!(map.index_of("a"), Some(0));
        assert_eq!(map.index_of("z"), Some(25));
        assert_eq!(map.index_of(" "), Some(26));
        assert_eq!(map.index_of("'"), Some(27));
        // blank is last
        assert_eq!(map.blank(), 28);
        assert_eq!(map.display(&[7, 4, 11, 11, 14]), "hello");
    }

    #[test]
    fn label_kind_parsing() {
        assert_eq!("phn".parse::<LabelKind>().unwrap(), LabelKind::Phn);
        assert_eq!("char".parse::<LabelKind>().unwrap(), LabelKind::Char);
        assert!("word".parse::<LabelKind>().is_err());
    }
}
