/// Default floor for the total slot count of a portfolio.
pub const MIN_TOTAL_SLOTS: u32 = 2;

/// Default ceiling for candidate totals. A full stack takes one simulated
/// month per slot, so larger stacks make the game drag.
pub const MAX_TOTAL_SLOTS: u32 = 24;

const SCORE_EPSILON: f64 = 1e-9;

/// Result of apportioning target percentages into integer slot counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPlan {
    /// Chosen total, `sum(slots)` exactly
    pub total_slots: u32,

    /// One slot count per input weight, each ≥ 1
    pub slots: Vec<u32>,
}

/// Policy seam for converting target percentages into per-crate slot
/// capacities. The caller picks the policy; the rest of the system only
/// sees the resulting `SlotPlan`.
pub trait SlotApportionment {
    /// Total over any weight vector whose entries are percentages summing
    /// to ~100. Callers pre-validate the sum and the count bounds.
    fn compute_slot_targets(&self, weights: &[f64]) -> SlotPlan;
}

/// The default policy: tries every candidate total, rounds fractional
/// allocations with a floor of one slot each, repairs the rounded vector
/// to the exact total, and keeps the candidate with the smallest summed
/// representation error.
#[derive(Debug, Clone)]
pub struct MinErrorApportionment {
    /// Winning totals below this floor are scaled up by the smallest
    /// integer multiplier that clears it, preserving exact proportions.
    pub min_total: u32,
    pub max_total: u32,
}

impl Default for MinErrorApportionment {
    fn default() -> Self {
        Self {
            min_total: MIN_TOTAL_SLOTS,
            max_total: MAX_TOTAL_SLOTS,
        }
    }
}

struct Candidate {
    total: u32,
    slots: Vec<u32>,
    error: f64,
    adjustment_ops: u32,
}

impl SlotApportionment for MinErrorApportionment {
    fn compute_slot_targets(&self, weights: &[f64]) -> SlotPlan {
        if weights.is_empty() {
            return SlotPlan {
                total_slots: 0,
                slots: Vec::new(),
            };
        }

        let fractions: Vec<f64> = weights.iter().map(|w| w / 100.0).collect();
        let start = weights.len() as u32;
        let mut best = apportion_for_total(&fractions, start);

        for total in (start + 1)..=self.max_total.max(start) {
            let candidate = apportion_for_total(&fractions, total);
            let replace = candidate.error < best.error - SCORE_EPSILON
                || ((candidate.error - best.error).abs() <= SCORE_EPSILON
                    && (candidate.total < best.total
                        || (candidate.total == best.total
                            && candidate.adjustment_ops < best.adjustment_ops)));
            if replace {
                best = candidate;
            }
        }

        let mut total_slots = best.total;
        let mut slots = best.slots;

        if total_slots < self.min_total {
            let multiplier = self.min_total.div_ceil(total_slots);
            for slot in &mut slots {
                *slot *= multiplier;
            }
            total_slots *= multiplier;
        }

        SlotPlan { total_slots, slots }
    }
}

/// Round `fraction × total` per weight with a floor of one slot, then
/// repair the vector until it sums to exactly `total`: decrement the
/// largest overshoot (never below 1) or increment the largest deficit,
/// ties going to the lowest index.
fn apportion_for_total(fractions: &[f64], total: u32) -> Candidate {
    let raw: Vec<f64> = fractions.iter().map(|f| f * f64::from(total)).collect();
    let mut slots: Vec<u32> = raw
        .iter()
        .map(|r| (r.round() as i64).max(1) as u32)
        .collect();

    let mut sum: i64 = slots.iter().map(|&s| i64::from(s)).sum();
    let mut adjustment_ops = 0u32;

    while sum > i64::from(total) {
        let mut pick: Option<usize> = None;
        let mut best_overshoot = f64::NEG_INFINITY;
        for (idx, &slot) in slots.iter().enumerate() {
            if slot <= 1 {
                continue;
            }
            let overshoot = f64::from(slot) - raw[idx];
            if overshoot > best_overshoot + SCORE_EPSILON {
                best_overshoot = overshoot;
                pick = Some(idx);
            }
        }
        match pick {
            Some(idx) => {
                slots[idx] -= 1;
                sum -= 1;
                adjustment_ops += 1;
            }
            // All slots at the floor; can only happen when total ≤ count.
            None => break,
        }
    }

    while sum < i64::from(total) {
        let mut pick = 0;
        let mut best_deficit = f64::NEG_INFINITY;
        for (idx, &slot) in slots.iter().enumerate() {
            let deficit = raw[idx] - f64::from(slot);
            if deficit > best_deficit + SCORE_EPSILON {
                best_deficit = deficit;
                pick = idx;
            }
        }
        slots[pick] += 1;
        sum += 1;
        adjustment_ops += 1;
    }

    let error = slots
        .iter()
        .zip(fractions)
        .map(|(&slot, fraction)| (f64::from(slot) / f64::from(total) - fraction).abs())
        .sum();

    Candidate {
        total,
        slots,
        error,
        adjustment_ops,
    }
}
