//! Maximum-timestamp tracking across a run.

/// Highest record timestamp observed, seeded from the stored watermark.
///
/// A record only moves the mark when it is strictly newer than everything
/// seen so far, so out-of-order records never pull it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighWaterMark {
    current: Option<i64>,
    advanced: bool,
}

impl HighWaterMark {
    #[must_use]
    pub fn new(stored: Option<i64>) -> Self {
        Self {
            current: stored,
            advanced: false,
        }
    }

    pub fn observe(&mut self, timestamp: i64) {
        match self.current {
            Some(current) if timestamp <= current => {}
            _ => {
                self.current = Some(timestamp);
                self.advanced = true;
            }
        }
    }

    /// Highest timestamp known, stored or observed.
    #[must_use]
    pub fn current(&self) -> Option<i64> {
        self.current
    }

    /// New watermark to persist, if any record moved the mark.
    #[must_use]
    pub fn advanced(&self) -> Option<i64> {
        if self.advanced {
            self.current
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_record_seeds_empty_mark() {
        let mut mark = HighWaterMark::new(None);
        mark.observe(50);
        assert_eq!(mark.advanced(), Some(50));
    }

    #[test]
    fn test_never_decreases() {
        let mut mark = HighWaterMark::new(None);
        let mut seen = Vec::new();
        for ts in [30, 10, 40, 20, 40, 5] {
            mark.observe(ts);
            seen.push(mark.current().unwrap());
        }
        assert_eq!(seen, vec![30, 30, 40, 40, 40, 40]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_older_records_do_not_advance_stored_mark() {
        let mut mark = HighWaterMark::new(Some(100));
        mark.observe(90);
        mark.observe(100);
        assert_eq!(mark.current(), Some(100));
        assert_eq!(mark.advanced(), None);
    }

    #[test]
    fn test_newer_record_advances_stored_mark() {
        let mut mark = HighWaterMark::new(Some(100));
        mark.observe(101);
        assert_eq!(mark.advanced(), Some(101));
    }

    #[test]
    fn test_untouched_mark() {
        assert_eq!(HighWaterMark::new(Some(7)).advanced(), None);
        assert_eq!(HighWaterMark::new(None).current(), None);
    }
}
