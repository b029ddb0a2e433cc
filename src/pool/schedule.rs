//! Capacity schedule and the halving algorithm that derives one (component
//! E). Pairs are stored and compared as `(threshold, cap)`, threshold first
//! ascending — the newer of two divergent conventions in the source, adopted
//! here per the design notes.

/// An ordered `(open_count_threshold, max_clients_per_connection)` table.
/// For a given open count `n`, the cap is the `max_clients` of the first
/// entry whose threshold is `>= n`; if `n` exceeds every threshold, the last
/// entry's cap applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacitySchedule {
    entries: Vec<(usize, usize)>,
}

impl CapacitySchedule {
    /// Builds a schedule from explicit `(threshold, cap)` pairs, sorting by
    /// threshold ascending.
    pub fn new(mut entries: Vec<(usize, usize)>) -> Self {
        entries.sort_by_key(|&(threshold, _)| threshold);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    /// The client cap to apply when the pool currently has `open_count` live
    /// connections.
    pub fn cap_for(&self, open_count: usize) -> usize {
        for &(threshold, cap) in &self.entries {
            if threshold >= open_count {
                return cap;
            }
        }
        self.entries
            .last()
            .map(|&(_, cap)| cap)
            .unwrap_or(1)
    }

    /// Derives a schedule by halving the remaining space between the current
    /// start and `max_connections`, starting at `cap = 1`:
    ///
    /// while `cap < hard_cap`: `len = (max_connections - start) / 2`; stop
    /// if `len == 0`; append `(start + len, cap)`; `start += len; cap += 1`.
    /// Finally append `(max_connections, hard_cap)`.
    pub fn from_halving(max_connections: usize, hard_cap: usize) -> Self {
        let mut entries = Vec::new();
        let mut cap = 1usize;
        let mut start = 0usize;
        while cap < hard_cap {
            let remaining = max_connections.saturating_sub(start);
            let len = remaining / 2;
            if len == 0 {
                break;
            }
            entries.push((start + len, cap));
            start += len;
            cap += 1;
        }
        entries.push((max_connections, hard_cap));
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_for_picks_first_threshold_at_or_above_open_count() {
        let schedule = CapacitySchedule::new(vec![(1, 1), (3, 2), (10, 5)]);
        let expected = [(0, 1), (1, 1), (2, 2), (3, 2), (4, 5), (10, 5), (11, 5)];
        for (open_count, cap) in expected {
            assert_eq!(schedule.cap_for(open_count), cap, "open_count={}", open_count);
        }
    }

    #[test]
    fn test_from_halving_worked_example() {
        let schedule = CapacitySchedule::from_halving(100, 7);
        assert_eq!(
            schedule.entries(),
            &[(50, 1), (75, 2), (87, 3), (93, 4), (96, 5), (98, 6), (100, 7)]
        );
    }

    #[test]
    fn test_from_halving_small_hard_cap() {
        let schedule = CapacitySchedule::from_halving(4, 3);
        // cap=1: len=(4-0)/2=2 -> (2,1); start=2,cap=2
        // cap=2: len=(4-2)/2=1 -> (3,2); start=3,cap=3
        // cap=3 < hard_cap=3? no, loop stops. Final entry (4,3).
        assert_eq!(schedule.entries(), &[(2, 1), (3, 2), (4, 3)]);
    }

    #[test]
    fn test_from_halving_hard_cap_one_is_immediately_final() {
        let schedule = CapacitySchedule::from_halving(10, 1);
        assert_eq!(schedule.entries(), &[(10, 1)]);
    }
}
