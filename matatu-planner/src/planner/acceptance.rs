//! Soft-window acceptance of complete search paths.
//!
//! The accumulator keeps every complete path whose cost is within an
//! adaptive window of the best cost seen so far, at most `bucket_cap` per
//! transfer count and `max_solutions` overall. When a bucket or the whole
//! set is full, a cheaper candidate evicts the most expensive member.

use crate::domain::StopId;

use super::config::PlannerConfig;
use super::search::Step;

/// A complete path from an origin stop to a destination stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub steps: Vec<Step>,
    /// Search cost, including the weighted egress walk.
    pub cost: f64,
    pub transfers: usize,
    pub destination: StopId,
}

impl Solution {
    /// Returns true if both solutions take the same hops.
    pub fn same_path(&self, other: &Solution) -> bool {
        self.steps.len() == other.steps.len()
            && self
                .steps
                .iter()
                .zip(&other.steps)
                .all(|(a, b)| a.same_hop(b))
    }
}

/// Accumulates solutions across search rounds.
#[derive(Debug, Clone)]
pub struct SolutionAccumulator {
    solutions: Vec<Solution>,
    best: f64,
    window_ratio: f64,
    window_min: f64,
    bucket_cap: usize,
    max_solutions: usize,
}

impl SolutionAccumulator {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            solutions: Vec::new(),
            best: f64::INFINITY,
            window_ratio: config.soft_window_ratio,
            window_min: config.soft_window_min_mins,
            bucket_cap: config.bucket_cap.max(1),
            max_solutions: config.max_solutions.max(1),
        }
    }

    fn window(&self, best: f64) -> f64 {
        (best * self.window_ratio).max(self.window_min)
    }

    /// Best cost accepted so far.
    pub fn best_cost(&self) -> Option<f64> {
        self.best.is_finite().then_some(self.best)
    }

    /// Offer a candidate. Returns true if it was kept.
    pub fn offer(&mut self, candidate: Solution) -> bool {
        if !candidate.cost.is_finite() {
            return false;
        }

        if let Some(i) = self.solutions.iter().position(|s| s.same_path(&candidate)) {
            if candidate.cost >= self.solutions[i].cost {
                return false;
            }
            let previous = self.solutions.swap_remove(i);
            if self.admit(candidate) {
                return true;
            }
            self.solutions.push(previous);
            self.refresh();
            return false;
        }

        self.admit(candidate)
    }

    fn admit(&mut self, candidate: Solution) -> bool {
        if self.best.is_finite() && candidate.cost > self.best + self.window(self.best) {
            return false;
        }

        let bucket_worst = worst(
            self.solutions
                .iter()
                .enumerate()
                .filter(|(_, s)| s.transfers == candidate.transfers),
        );
        let bucket_size = self
            .solutions
            .iter()
            .filter(|s| s.transfers == candidate.transfers)
            .count();

        if bucket_size >= self.bucket_cap {
            match bucket_worst {
                Some((i, cost)) if candidate.cost < cost => {
                    self.solutions.swap_remove(i);
                }
                _ => return false,
            }
        } else if self.solutions.len() >= self.max_solutions {
            match worst(self.solutions.iter().enumerate()) {
                Some((i, cost)) if candidate.cost < cost => {
                    self.solutions.swap_remove(i);
                }
                _ => return false,
            }
        }

        self.solutions.push(candidate);
        self.refresh();
        true
    }

    /// Recompute the best cost and drop members that fell out of the window.
    fn refresh(&mut self) {
        self.best = self
            .solutions
            .iter()
            .map(|s| s.cost)
            .fold(f64::INFINITY, f64::min);
        if self.best.is_finite() {
            let limit = self.best + self.window(self.best);
            self.solutions.retain(|s| s.cost <= limit);
        }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Accepted solutions, cheapest first.
    pub fn into_solutions(mut self) -> Vec<Solution> {
        self.solutions.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        self.solutions
    }
}

fn worst<'a>(solutions: impl Iterator<Item = (usize, &'a Solution)>) -> Option<(usize, f64)> {
    solutions
        .map(|(i, s)| (i, s.cost))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn offers() -> impl Strategy<Value = Vec<(u8, f64, usize)>> {
        prop::collection::vec((0u8..30, 5.0f64..120.0, 0usize..4), 0..60)
    }

    proptest! {
        #[test]
        fn caps_and_window_hold(offers in offers(), bucket_cap in 1usize..4, max in 1usize..10) {
            let config = PlannerConfig {
                bucket_cap,
                max_solutions: max,
                ..PlannerConfig::default()
            };
            let mut acc = SolutionAccumulator::new(&config);
            for (tag, cost, transfers) in offers {
                acc.offer(Solution {
                    steps: vec![Step::Walk {
                        from: StopId::parse("O").unwrap(),
                        to: StopId::parse(&format!("S{tag}")).unwrap(),
                        minutes: 1.0,
                        distance_m: 1.0,
                    }],
                    cost,
                    transfers,
                    destination: StopId::parse("D").unwrap(),
                });
            }

            let best = acc.best_cost();
            let solutions = acc.into_solutions();
            prop_assert!(solutions.len() <= max);
            for t in 0..4 {
                prop_assert!(solutions.iter().filter(|s| s.transfers == t).count() <= bucket_cap);
            }
            if let Some(best) = best {
                let limit = best + config.soft_window(best);
                prop_assert!(solutions.iter().all(|s| s.cost <= limit));
                prop_assert_eq!(solutions[0].cost, best);
            }
            for (i, a) in solutions.iter().enumerate() {
                for b in &solutions[i + 1..] {
                    prop_assert!(!a.same_path(b));
                }
            }
        }
    }
}
