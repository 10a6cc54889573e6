use crate::error::SetupError;
use regex::Regex;
use std::io::BufRead;

lazy_static::lazy_static! {
    static ref INSERT_REGEX: Regex = Regex::new(
        r"(?i)INSERT\s+INTO\s+`?(\w+)`?\s+VALUES"
    ).unwrap();
}

/// Image extensions recognized when none are configured
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "png", "gif"];

/// An image URL found in an insert statement, tagged with the table it was inserted into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub source_table: String,
    pub url: String,
}

/// Pulls image URLs out of insert statements in a SQL dump
#[derive(Debug, Clone)]
pub struct Extractor {
    url_regex: Regex,
}

impl Extractor {
    /// Build an extractor matching URLs that end in one of `extensions`.
    /// Extensions are matched case-sensitively.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Result<Self, SetupError> {
        let mut exts: Vec<&str> = extensions
            .iter()
            .map(|e| e.as_ref())
            .filter(|e| !e.is_empty())
            .collect();
        if exts.is_empty() {
            return Err(SetupError::InvalidConfig(
                "at least one image extension is required".to_string(),
            ));
        }

        // Longest first, so `tiff` wins over `tif` at the same position
        exts.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = exts
            .iter()
            .map(|e| regex::escape(e))
            .collect::<Vec<_>>()
            .join("|");

        let url_regex = Regex::new(&format!(r"https?://[A-Za-z0-9_./-]+\.(?:{})", alternation))?;
        Ok(Extractor { url_regex })
    }

    /// Extract records from a single line. Lines that are not insert statements yield nothing.
    pub fn extract_line(&self, line: &str) -> Vec<ExtractionRecord> {
        let table = match INSERT_REGEX.captures(line).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return Vec::new(),
        };

        self.url_regex
            .find_iter(line)
            .map(|m| ExtractionRecord {
                source_table: table.to_string(),
                url: m.as_str().to_string(),
            })
            .collect()
    }

    /// Extract records from in-memory text
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn extract(&self, text: &str) -> Vec<ExtractionRecord> {
        text.lines().flat_map(|line| self.extract_line(line)).collect()
    }

    /// Extract records from a reader one line at a time, so large dumps are never held in memory whole.
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    pub fn extract_reader<R: BufRead>(&self, mut reader: R) -> std::io::Result<Vec<ExtractionRecord>> {
        let mut records = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            records.extend(self.extract_line(line.trim_end_matches(['\r', '\n'])));
        }
        Ok(records)
    }
}

#[cfg_attr(not(test), allow(dead_code))]
impl Default for Extractor {
    fn default() -> Self {
        Self::new(&DEFAULT_EXTENSIONS).unwrap()
    }
}
