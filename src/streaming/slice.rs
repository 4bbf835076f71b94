//! Named offset/length ranges over a point stream
//!
//! Slices come from a tab-separated slice list written by the import
//! tooling. The first line names the source bin and is skipped; every other
//! line is `<path-with-id>\t<offset>\t<length>`, where the id is embedded in
//! the path as `..._<digits>[-\w ]*<extension>`.

use std::path::Path;

use rand::Rng;

use crate::core::error::{Error, Result};

/// Contiguous sub-range of the point stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slice {
    pub name: String,
    pub offset: u64,
    pub length: u64,
    /// Marked by external tooling, the only field mutable at runtime
    pub selected: bool,
}

impl Slice {
    pub fn new(name: impl Into<String>, offset: u64, length: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            selected: false,
        }
    }

    /// One past the last point of the slice, saturating at `u64::MAX`
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Points left in the slice when the cursor is at `cursor`
    pub fn remaining(&self, cursor: u64) -> u64 {
        self.end().saturating_sub(cursor)
    }

    pub fn contains(&self, cursor: u64) -> bool {
        cursor >= self.offset && cursor < self.end()
    }
}

/// Cap a read request so it never crosses the end of `slice`
pub fn bounded_request(requested: usize, slice: &Slice, cursor: u64) -> usize {
    (requested as u64).min(slice.remaining(cursor)) as usize
}

/// Number of chunks needed to play a slice of `length` points
pub fn chunks_in_slice(length: u64, points_per_mesh: usize) -> u64 {
    length.div_ceil(points_per_mesh as u64)
}

/// Extracts slice ids from slice source paths
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceIdPattern {
    /// Required path suffix, e.g. `.ply`
    pub extension: String,
}

impl Default for SliceIdPattern {
    fn default() -> Self {
        Self {
            extension: ".ply".to_string(),
        }
    }
}

impl SliceIdPattern {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Id embedded in `path`: the last `_<digits>` group that is followed only
    /// by `[-A-Za-z0-9_ ]` up to the extension
    pub fn extract<'a>(&self, path: &'a str) -> Option<&'a str> {
        let stem = path.strip_suffix(self.extension.as_str())?;
        let is_tail = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ';

        for (underscore, _) in stem.rmatch_indices('_') {
            let rest = &stem[underscore + 1..];
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                continue;
            }
            if rest[digits..].chars().all(is_tail) {
                return Some(&rest[..digits]);
            }
            // Anything further left would have to span the same bad tail.
            return None;
        }
        None
    }
}

/// Slices of one dataset, looked up by name
#[derive(Clone, Debug, Default)]
pub struct SliceIndex {
    slices: Vec<Slice>,
}

impl SliceIndex {
    pub fn new(slices: Vec<Slice>) -> Self {
        Self { slices }
    }

    /// Parse slice list text, skipping malformed lines with a warning
    pub fn parse(text: &str, pattern: &SliceIdPattern) -> Self {
        let mut slices = Vec::new();

        for (line_no, line) in text.lines().enumerate().skip(1) {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() < 3 {
                log::warn!("Slice list line {}: expected 3 tab-separated fields: {:?}", line_no + 1, line);
                continue;
            }
            let Some(id) = pattern.extract(tokens[0]) else {
                log::warn!("Slice list line {}: can't parse slice id from path: {}", line_no + 1, tokens[0]);
                continue;
            };
            let (Ok(offset), Ok(length)) = (tokens[1].trim().parse::<u64>(), tokens[2].trim().parse::<u64>()) else {
                log::warn!("Slice list line {}: bad offset/length: {:?}", line_no + 1, line);
                continue;
            };
            if offset.checked_add(length).is_none() {
                log::warn!("Slice list line {}: {}+{} overflows the point range", line_no + 1, offset, length);
                continue;
            }
            slices.push(Slice::new(id, offset, length));
        }

        log::debug!("Parsed {} slices", slices.len());
        Self { slices }
    }

    /// Read and parse a slice list file
    pub fn load(path: &Path, pattern: &SliceIdPattern) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let index = Self::parse(&text, pattern);
        log::info!("Loaded {} slices from {}", index.len(), path.display());
        Ok(index)
    }

    fn matching(&self, pred: impl Fn(&Slice) -> bool) -> Vec<usize> {
        self.slices
            .iter()
            .enumerate()
            .filter(|(_, s)| pred(s))
            .map(|(i, _)| i)
            .collect()
    }

    fn position(&self, query: &str) -> Result<usize> {
        let mut matches = self.matching(|s| s.name == query);
        if matches.is_empty() {
            matches = self.matching(|s| s.name.contains(query));
        }

        match matches.as_slice() {
            [] => Err(Error::SliceNotFound(query.to_string())),
            [i] => Ok(*i),
            _ => Err(Error::AmbiguousSlice {
                query: query.to_string(),
                matches: matches.iter().map(|&i| self.slices[i].name.clone()).collect(),
            }),
        }
    }

    /// Look a slice up by name
    ///
    /// A unique exact name wins. Otherwise the query must be a substring of
    /// exactly one slice name. Several candidates at either stage, including
    /// duplicate names, are a configuration error.
    pub fn find(&self, query: &str) -> Result<&Slice> {
        self.position(query).map(|i| &self.slices[i])
    }

    /// Check every slice lies inside a stream of `point_count` points
    pub fn validate(&self, point_count: u64) -> Result<()> {
        match self.slices.iter().find(|s| s.end() > point_count) {
            Some(s) => Err(Error::SliceOutOfBounds {
                name: s.name.clone(),
                offset: s.offset,
                length: s.length,
                point_count,
            }),
            None => Ok(()),
        }
    }

    pub fn set_selected(&mut self, query: &str, selected: bool) -> Result<()> {
        let i = self.position(query)?;
        self.slices[i].selected = selected;
        Ok(())
    }

    pub fn selected(&self) -> impl Iterator<Item = &Slice> {
        self.slices.iter().filter(|s| s.selected)
    }

    /// Uniformly chosen slice, `None` if there are none
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Slice> {
        self.random_index(rng).map(|i| &self.slices[i])
    }

    /// Position of a uniformly chosen slice
    pub fn random_index<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if self.slices.is_empty() {
            return None;
        }
        Some(rng.random_range(0..self.slices.len()))
    }

    /// Slice at position `index` in list order
    pub fn get(&self, index: usize) -> Option<&Slice> {
        self.slices.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slice> {
        self.slices.iter()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}
