//! Budgeted latency quantization.
//!
//! Each representative port contributes a [`LatencyLadder`]: its distinct
//! latencies in ascending order, each with an aggregate weight. Quantizing a
//! ladder means cutting it into contiguous runs and replacing every latency in
//! a run by the run's weighted average. A run costs the weighted absolute
//! deviation it introduces.
//!
//! The budget is shared by every ladder of a family: the solver picks, over
//! all ladders together, exactly `K` runs minimizing the total cost. The
//! ladders are laid end to end and walked by a DP over
//! `(ladder, position, runs left)`; a run never spans two ladders.

/// One distinct latency and its aggregate weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderPoint {
    pub latency: u32,
    /// Always at least 1.
    pub weight: u64,
}

/// Distinct latencies observed on one representative port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencyLadder {
    pub port: String,
    points: Vec<LadderPoint>,
}

impl LatencyLadder {
    /// Build a ladder from `(latency, weight)` pairs.
    ///
    /// Equal latencies are merged, points are sorted ascending and weights
    /// are floored to 1.
    pub fn new(port: impl Into<String>, samples: impl IntoIterator<Item = (u32, u64)>) -> Self {
        let mut points: Vec<LadderPoint> = Vec::new();
        let mut samples: Vec<(u32, u64)> = samples.into_iter().collect();
        samples.sort_by_key(|&(latency, _)| latency);
        for (latency, weight) in samples {
            match points.last_mut() {
                Some(last) if last.latency == latency => {
                    last.weight = last.weight.saturating_add(weight);
                }
                _ => points.push(LadderPoint { latency, weight }),
            }
        }
        for point in &mut points {
            point.weight = point.weight.max(1);
        }
        Self {
            port: port.into(),
            points,
        }
    }

    pub fn points(&self) -> &[LadderPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A contiguous run `[start, end)` of ladder points sharing one latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
    /// Rounded weighted average of the run.
    pub latency: u32,
    pub cost: u128,
}

/// Optimal partition of every ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantization {
    /// Runs per ladder, in ladder order.
    pub runs: Vec<Vec<Run>>,
    pub cost: u128,
}

impl Quantization {
    /// The quantized latency of every point of ladder `ladder`.
    pub fn quantized(&self, ladder: usize) -> Vec<u32> {
        self.runs[ladder]
            .iter()
            .flat_map(|run| std::iter::repeat(run.latency).take(run.end - run.start))
            .collect()
    }

    pub fn run_count(&self) -> usize {
        self.runs.iter().map(Vec::len).sum()
    }
}

/// Prefix sums of weight and weight * latency for one ladder.
#[derive(Debug, Clone)]
struct Prefix {
    weight: Vec<u128>,
    moment: Vec<u128>,
}

impl Prefix {
    fn new(ladder: &LatencyLadder) -> Self {
        let mut weight = Vec::with_capacity(ladder.len() + 1);
        let mut moment = Vec::with_capacity(ladder.len() + 1);
        weight.push(0);
        moment.push(0);
        for p in ladder.points() {
            let w = p.weight as u128;
            weight.push(weight[weight.len() - 1] + w);
            moment.push(moment[moment.len() - 1] + w * p.latency as u128);
        }
        Self { weight, moment }
    }

    fn weight(&self, start: usize, end: usize) -> u128 {
        self.weight[end] - self.weight[start]
    }

    fn moment(&self, start: usize, end: usize) -> u128 {
        self.moment[end] - self.moment[start]
    }
}

/// DP solver over a family's ladders.
#[derive(Debug)]
pub struct Solver<'a> {
    ladders: &'a [LatencyLadder],
    prefix: Vec<Prefix>,
}

impl<'a> Solver<'a> {
    pub fn new(ladders: &'a [LatencyLadder]) -> Self {
        let prefix = ladders.iter().map(Prefix::new).collect();
        Self { ladders, prefix }
    }

    /// Largest admissible budget: every point in its own run.
    pub fn max_runs(&self) -> usize {
        self.ladders.iter().map(LatencyLadder::len).sum()
    }

    /// Smallest admissible budget: one run per non-empty ladder.
    pub fn min_runs(&self) -> usize {
        self.ladders.iter().filter(|l| !l.is_empty()).count()
    }

    /// Weighted average of `[start, end)` rounded half up.
    pub fn run_latency(&self, ladder: usize, start: usize, end: usize) -> u32 {
        let p = &self.prefix[ladder];
        let w = p.weight(start, end);
        let m = p.moment(start, end);
        ((2 * m + w) / (2 * w)) as u32
    }

    /// Weighted absolute deviation of `[start, end)` from its latency.
    pub fn run_cost(&self, ladder: usize, start: usize, end: usize) -> u128 {
        let latency = self.run_latency(ladder, start, end);
        let p = &self.prefix[ladder];
        let points = &self.ladders[ladder].points()[start..end];
        let split = start + points.partition_point(|pt| pt.latency <= latency);
        let x = latency as u128;

        let below = x * p.weight(start, split) - p.moment(start, split);
        let above = p.moment(split, end) - x * p.weight(split, end);
        below + above
    }

    /// Partition every ladder using exactly `budget` runs in total.
    ///
    /// Returns `None` when the budget is outside `[min_runs, max_runs]`.
    pub fn solve(&self, budget: usize) -> Option<Quantization> {
        if budget < self.min_runs() || budget > self.max_runs() {
            return None;
        }
        let ladders: Vec<usize> = (0..self.ladders.len())
            .filter(|&i| !self.ladders[i].is_empty())
            .collect();
        let n = ladders.len();
        let stride = budget + 1;

        // best[l][i * stride + k]: min cost covering ladder l from point i
        // onwards plus every later ladder, using exactly k runs.
        let mut best: Vec<Vec<Option<u128>>> = ladders
            .iter()
            .map(|&l| vec![None; self.ladders[l].len() * stride])
            .collect();
        let mut choice: Vec<Vec<usize>> = ladders
            .iter()
            .map(|&l| vec![0; self.ladders[l].len() * stride])
            .collect();

        for li in (0..n).rev() {
            let ladder = ladders[li];
            let m = self.ladders[ladder].len();
            for i in (0..m).rev() {
                for k in 1..=budget {
                    let mut cell: Option<(u128, usize)> = None;
                    for j in i..m {
                        let rest = if j + 1 < m {
                            best[li][(j + 1) * stride + k - 1]
                        } else if li + 1 < n {
                            best[li + 1][k - 1]
                        } else if k == 1 {
                            Some(0)
                        } else {
                            None
                        };
                        let Some(rest) = rest else {
                            continue;
                        };
                        let total = rest + self.run_cost(ladder, i, j + 1);
                        if cell.map_or(true, |(c, _)| total < c) {
                            cell = Some((total, j));
                        }
                    }
                    if let Some((cost, j)) = cell {
                        best[li][i * stride + k] = Some(cost);
                        choice[li][i * stride + k] = j;
                    }
                }
            }
        }

        let mut runs: Vec<Vec<Run>> = vec![Vec::new(); self.ladders.len()];
        if n == 0 {
            return Some(Quantization { runs, cost: 0 });
        }
        let cost = best[0][budget]?;

        let (mut li, mut i, mut k) = (0, 0, budget);
        while li < n {
            let ladder = ladders[li];
            let j = choice[li][i * stride + k];
            runs[ladder].push(Run {
                start: i,
                end: j + 1,
                latency: self.run_latency(ladder, i, j + 1),
                cost: self.run_cost(ladder, i, j + 1),
            });
            k -= 1;
            if j + 1 < self.ladders[ladder].len() {
                i = j + 1;
            } else {
                li += 1;
                i = 0;
            }
        }

        Some(Quantization { runs, cost })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder(port: &str, points: &[(u32, u64)]) -> LatencyLadder {
        LatencyLadder::new(port, points.iter().copied())
    }

    fn assert_tiles(q: &Quantization, ladders: &[LatencyLadder]) {
        for (runs, l) in q.runs.iter().zip(ladders) {
            if l.is_empty() {
                assert!(runs.is_empty());
                continue;
            }
            assert!(!runs.is_empty() && runs.len() <= l.len());
            assert_eq!(runs[0].start, 0);
            assert_eq!(runs[runs.len() - 1].end, l.len());
            for pair in runs.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn ladder_merges_sorts_and_floors() {
        let l = ladder("p0", &[(8, 2), (5, 1), (3, 0), (5, 1)]);
        let lat: Vec<_> = l.points().iter().map(|p| p.latency).collect();
        let w: Vec<_> = l.points().iter().map(|p| p.weight).collect();
        assert_eq!(lat, vec![3, 5, 8]);
        assert_eq!(w, vec![1, 2, 2]);
    }

    #[test]
    fn run_latency_rounds_half_up() {
        let ladders = [ladder("p0", &[(1, 1), (2, 1)])];
        let s = Solver::new(&ladders);
        assert_eq!(s.run_latency(0, 0, 2), 2);
    }

    #[test]
    fn run_cost_is_weighted_absolute_deviation() {
        // {5, 5, 8} with weights {1, 1, 2}: average 6.5, cost 6 either way.
        let ladders = [ladder("p1", &[(3, 10), (5, 1), (5, 1), (8, 2)])];
        let s = Solver::new(&ladders);
        assert_eq!(s.run_latency(0, 1, 3), 7);
        assert_eq!(s.run_cost(0, 1, 3), 6);
        assert_eq!(s.run_cost(0, 0, 1), 0);
    }

    #[test]
    fn heavy_point_pulls_its_neighbour() {
        let ladders = [ladder("p1", &[(3, 10), (5, 1), (5, 1), (8, 2)])];
        let s = Solver::new(&ladders);
        let q = s.solve(2).unwrap();
        assert_eq!(q.cost, 4);
        assert_eq!(q.runs[0].len(), 2);
        assert_eq!((q.runs[0][0].start, q.runs[0][0].end), (0, 2));
        assert_eq!(q.runs[0][0].latency, 3);
        assert_eq!((q.runs[0][1].start, q.runs[0][1].end), (2, 3));
        assert_eq!(q.quantized(0), vec![3, 3, 8]);
        assert_tiles(&q, &ladders);
    }

    #[test]
    fn full_budget_has_zero_error() {
        let ladders = [
            ladder("p0", &[(1, 4), (3, 1), (9, 7)]),
            ladder("p5", &[(2, 1), (6, 1)]),
        ];
        let s = Solver::new(&ladders);
        let q = s.solve(s.max_runs()).unwrap();
        assert_eq!(q.cost, 0);
        assert!(q.runs.iter().flatten().all(|r| r.end - r.start == 1));
        assert_eq!(q.quantized(0), vec![1, 3, 9]);
    }

    #[test]
    fn single_run_per_ladder() {
        let ladders = [ladder("p0", &[(2, 1), (4, 1), (6, 2)])];
        let s = Solver::new(&ladders);
        let q = s.solve(1).unwrap();
        assert_eq!(q.runs[0].len(), 1);
        // (2 + 4 + 12) / 4 = 4.5 -> 5
        assert_eq!(q.runs[0][0].latency, 5);
        assert_eq!(q.cost, 3 + 1 + 2);
    }

    #[test]
    fn budget_is_shared_across_ladders() {
        let ladders = [
            ladder("p0", &[(1, 1), (2, 1), (3, 1)]),
            ladder("p5", &[(10, 1), (20, 1)]),
        ];
        let s = Solver::new(&ladders);
        let q = s.solve(3).unwrap();
        assert_eq!(q.run_count(), 3);
        assert_eq!(q.runs[0].len(), 1);
        assert_eq!(q.runs[1].len(), 2);
        assert_eq!(q.cost, 2);
        assert_tiles(&q, &ladders);
    }

    #[test]
    fn run_counts_sum_to_budget() {
        let ladders = [
            ladder("p0", &[(1, 5), (2, 1), (4, 1), (7, 3), (11, 1)]),
            ladder("p1", &[(3, 1), (5, 9)]),
            ladder("p5", &[(1, 1), (2, 1), (3, 1), (4, 1)]),
        ];
        let s = Solver::new(&ladders);
        for budget in s.min_runs()..=s.max_runs() {
            let q = s.solve(budget).unwrap();
            assert_eq!(q.run_count(), budget);
            assert_tiles(&q, &ladders);
            let total: u128 = q.runs.iter().flatten().map(|r| r.cost).sum();
            assert_eq!(total, q.cost);
        }
    }

    #[test]
    fn out_of_range_budget_is_rejected() {
        let ladders = [ladder("p0", &[(1, 1), (2, 1)]), ladder("p5", &[(4, 1)])];
        let s = Solver::new(&ladders);
        assert!(s.solve(1).is_none());
        assert!(s.solve(4).is_none());
        assert!(s.solve(2).is_some());
    }

    #[test]
    fn empty_family_needs_no_runs() {
        let s = Solver::new(&[]);
        let q = s.solve(0).unwrap();
        assert_eq!(q.cost, 0);
        assert!(q.runs.is_empty());
    }

    #[test]
    fn solver_is_deterministic() {
        let ladders = [
            ladder("p0", &[(1, 2), (2, 2), (3, 2), (4, 2)]),
            ladder("p1", &[(5, 1), (6, 1)]),
        ];
        let s = Solver::new(&ladders);
        assert_eq!(s.solve(3), s.solve(3));
    }
}
