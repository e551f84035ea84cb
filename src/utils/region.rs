use crate::utils::Result;

/// A reference interval, 0-based half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenomicRange {
    pub start: usize,
    pub end: usize,
}

impl GenomicRange {
    /// Parses a 1-based inclusive "START-END" region string.
    pub fn from_1based_str(region: &str) -> Result<GenomicRange> {
        let (start, end) = region
            .split_once('-')
            .ok_or_else(|| format!("Invalid region format: {}, expected START-END", region))?;
        let start: usize = start
            .trim()
            .parse()
            .map_err(|_| format!("Invalid region start: {}", start))?;
        let end: usize = end
            .trim()
            .parse()
            .map_err(|_| format!("Invalid region end: {}", end))?;
        if start == 0 || end == 0 {
            return Err("Region indexing is 1-based".to_string());
        }
        if end < start {
            return Err(format!("Region end must not precede start: {}", region));
        }
        Ok(GenomicRange {
            start: start - 1,
            end,
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
