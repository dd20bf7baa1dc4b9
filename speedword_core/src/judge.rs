use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::DictionaryError;

/// The dictionary every board is checked against. Built once at startup and
/// shared read-only between all sessions.
#[derive(Debug, Clone, Default)]
pub struct Judge {
    dictionary: HashSet<String>,
}

impl Judge {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dictionary = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_uppercase())
            .filter(|word| !word.is_empty())
            .collect();
        Self { dictionary }
    }

    /// Reads a newline delimited word list
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DictionaryError> {
        let words = reader.lines().collect::<Result<Vec<_>, _>>()?;
        let judge = Self::new(words);
        if judge.is_empty() {
            return Err(DictionaryError::Empty);
        }
        Ok(judge)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DictionaryError> {
        let file = File::open(path.as_ref()).map_err(|source| DictionaryError::Open {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let judge = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            "Loaded {} words from {}",
            judge.len(),
            path.as_ref().display()
        );
        Ok(judge)
    }

    /// Words are matched case-insensitively
    pub fn contains(&self, word: &str) -> bool {
        if word.bytes().all(|b| !b.is_ascii_lowercase()) {
            self.dictionary.contains(word)
        } else {
            self.dictionary.contains(&word.to_uppercase())
        }
    }

    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }
}
