//! Splits an object into contiguous part ranges for parallel transfer.

use crate::error::{Result, TosError};

/// Default part size used when a caller does not specify one (20 MiB).
pub const DEFAULT_PART_SIZE: u64 = 20 * 1024 * 1024;

/// Maximum number of parts a single upload may be split into.
///
/// Mirrors the TOS service-side limit on multipart uploads.
pub const MAX_PART_COUNT: usize = 10_000;

/// A single contiguous byte range of an object to transfer as one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartTask {
    /// 1-indexed part number.
    pub part_number: u32,
    /// Byte offset of this part within the object.
    pub offset: u64,
    /// Length of this part in bytes.
    pub length: u64,
}

impl PartTask {
    /// Inclusive end offset of this part, suitable for an HTTP `Range` header.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.length.saturating_sub(1)
    }

    /// The `bytes=start-end` range header value for this part.
    ///
    /// A zero-length part (the sole task for an empty object) has no valid
    /// byte range and returns `None`; callers should issue an unranged GET.
    pub fn range_header(&self) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        Some(format!("bytes={}-{}", self.offset, self.end_offset()))
    }
}

/// Divides an object into a sequence of [`PartTask`]s.
#[derive(Debug, Clone, Copy)]
pub struct PartPlanner;

impl PartPlanner {
    /// Plan parts for an object of `object_size` bytes using `part_size`-byte parts.
    ///
    /// A zero-size object always plans to exactly one zero-length part.
    /// Otherwise parts are contiguous, `part_size`-byte ranges with the
    /// final part truncated to whatever remains.
    pub fn plan(object_size: u64, part_size: u64) -> Result<Vec<PartTask>> {
        if part_size == 0 {
            return Err(TosError::InvalidParameter {
                field: "part_size".into(),
                reason: "must be at least 1 byte".into(),
            });
        }

        if object_size == 0 {
            return Ok(vec![PartTask {
                part_number: 1,
                offset: 0,
                length: 0,
            }]);
        }

        let part_count = object_size.div_ceil(part_size);
        let parts = (0..part_count)
            .map(|i| {
                let offset = i * part_size;
                let length = part_size.min(object_size - offset);
                PartTask {
                    part_number: (i + 1) as u32,
                    offset,
                    length,
                }
            })
            .collect::<Vec<_>>();

        if parts.len() > MAX_PART_COUNT {
            return Err(TosError::InvalidParameter {
                field: "part_size".into(),
                reason: format!(
                    "object of {object_size} bytes split at {part_size} bytes yields {} parts, exceeding the {MAX_PART_COUNT} part limit",
                    parts.len()
                ),
            });
        }

        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_single_zero_length_part() {
        let parts = PartPlanner::plan(0, DEFAULT_PART_SIZE).unwrap();
        assert_eq!(
            parts,
            vec![PartTask {
                part_number: 1,
                offset: 0,
                length: 0,
            }]
        );
        assert_eq!(parts[0].range_header(), None);
    }

    #[test]
    fn exact_multiple_splits_evenly() {
        let parts = PartPlanner::plan(30, 10).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], PartTask { part_number: 1, offset: 0, length: 10 });
        assert_eq!(parts[1], PartTask { part_number: 2, offset: 10, length: 10 });
        assert_eq!(parts[2], PartTask { part_number: 3, offset: 20, length: 10 });
    }

    #[test]
    fn odd_remainder_shrinks_final_part() {
        let parts = PartPlanner::plan(10 * 1024 * 1024, 7177).unwrap();
        let total: u64 = parts.iter().map(|p| p.length).sum();
        assert_eq!(total, 10 * 1024 * 1024);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.part_number as usize, i + 1);
        }
        let last = parts.last().unwrap();
        assert!(last.length <= 7177);
        assert_eq!(last.end_offset(), 10 * 1024 * 1024 - 1);
    }

    #[test]
    fn single_part_when_smaller_than_part_size() {
        let parts = PartPlanner::plan(1024, DEFAULT_PART_SIZE).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].length, 1024);
        assert_eq!(parts[0].range_header(), Some("bytes=0-1023".to_string()));
    }

    #[test]
    fn rejects_zero_part_size() {
        assert!(PartPlanner::plan(100, 0).is_err());
    }

    #[test]
    fn rejects_plans_exceeding_max_part_count() {
        let err = PartPlanner::plan(MAX_PART_COUNT as u64 + 1, 1).unwrap_err();
        assert!(matches!(err, TosError::InvalidParameter { .. }));
    }

    #[test]
    fn allows_plans_at_exactly_max_part_count() {
        let parts = PartPlanner::plan(MAX_PART_COUNT as u64, 1).unwrap();
        assert_eq!(parts.len(), MAX_PART_COUNT);
    }

    #[test]
    fn range_header_format() {
        let task = PartTask { part_number: 2, offset: 1000, length: 500 };
        assert_eq!(task.range_header(), Some("bytes=1000-1499".to_string()));
    }
}
