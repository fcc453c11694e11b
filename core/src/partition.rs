//! Weight-balanced task partitioning.
//!
//! Splits an ordered list of tasks into one contiguous bucket per worker so that every
//! worker carries roughly the same total weight.
//!
//! # How it works
//!
//! Workers are served in rank order with a single greedy pass. For worker `w` of `W`:
//!
//! 1. The fair share is the weight still unassigned divided by the `W - w` workers left.
//! 2. Walk the cumulative weight of the unassigned suffix and stop at the prefix whose
//!    cumulative weight is closest to that share (the first such prefix on ties).
//! 3. That prefix becomes worker `w`'s bucket; the next worker starts right after it.
//!
//! The last worker takes whatever is left, and workers that find nothing left get an
//! empty bucket.
//!
//! ```rust
//! use procgroup::partition;
//!
//! let tasks = ["t0", "t1", "t2"];
//! let assignment = partition(&tasks, Some(&[10.0, 1.0, 1.0]), 2).unwrap();
//!
//! assert_eq!(assignment.bucket(0), &["t0"]);
//! assert_eq!(assignment.bucket(1), &["t1", "t2"]);
//! ```
//!
//! > [!NOTE]
//! > The split is greedy, not globally optimal, and costs `O(N * W)` in the worst case.
//! > In exchange tasks never move once assigned and keep their order, so each worker sees
//! > a contiguous run of the input. Callers rely on the exact split points, including the
//! > first-minimum tie-break.

use crate::{ParallelError, Result};
use std::borrow::Cow;
use std::ops::Range;

/// The result of partitioning: one contiguous bucket of tasks per worker, in rank order.
///
/// Buckets borrow from the task slice handed to [`partition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<'a, T> {
    tasks: &'a [T],
    ranges: Vec<Range<usize>>,
}

impl<'a, T> Assignment<'a, T> {
    /// Number of workers (buckets), including workers with nothing to do.
    pub fn num_workers(&self) -> usize {
        self.ranges.len()
    }

    /// Returns the tasks assigned to `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank >= self.num_workers()`.
    pub fn bucket(&self, rank: usize) -> &'a [T] {
        &self.tasks[self.ranges[rank].clone()]
    }

    /// Returns the tasks assigned to `rank`, or `None` if there is no such worker.
    pub fn get(&self, rank: usize) -> Option<&'a [T]> {
        self.ranges.get(rank).map(|range| &self.tasks[range.clone()])
    }

    /// Iterates over all buckets in rank order.
    pub fn buckets(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        self.ranges.iter().map(|range| &self.tasks[range.clone()])
    }

    /// Index ranges into the original task slice, one per worker.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Returns `true` if any worker received no tasks.
    pub fn has_empty_bucket(&self) -> bool {
        self.ranges.iter().any(|range| range.is_empty())
    }

    /// Number of workers that received no tasks.
    pub fn empty_bucket_count(&self) -> usize {
        self.ranges.iter().filter(|range| range.is_empty()).count()
    }

    /// Copies the buckets out into owned vectors.
    pub fn to_vecs(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.buckets().map(<[T]>::to_vec).collect()
    }
}

/// Returns `true` if any worker in `assignment` received no tasks.
///
/// An empty bucket usually means there are more workers than tasks.
pub fn has_empty_bucket<T>(assignment: &Assignment<'_, T>) -> bool {
    assignment.has_empty_bucket()
}

/// Splits `tasks` into `workers` contiguous buckets of near-equal total weight.
///
/// # Arguments
///
/// * `tasks` - The ordered tasks. Their contents are never inspected.
/// * `weights` - Per-task weights, parallel to `tasks`. `None` gives every task weight 1.
///   Zero weights are allowed.
/// * `workers` - Number of buckets to produce.
///
/// # Errors
///
/// Returns `ParallelError::InvalidArgument` if `workers` is zero, if `weights` and `tasks`
/// differ in length, or if any weight is negative or not finite. No partial assignment is
/// produced.
pub fn partition<'a, T>(
    tasks: &'a [T],
    weights: Option<&[f64]>,
    workers: usize,
) -> Result<Assignment<'a, T>> {
    if workers == 0 {
        return Err(ParallelError::InvalidArgument(
            "cannot partition tasks across zero workers".to_string(),
        ));
    }

    let weights: Cow<'_, [f64]> = match weights {
        Some(weights) => {
            validate_weights(weights, tasks.len())?;
            Cow::Borrowed(weights)
        }
        None => Cow::Owned(vec![1.0; tasks.len()]),
    };

    Ok(Assignment {
        tasks,
        ranges: split_ranges(&weights, workers),
    })
}

fn validate_weights(weights: &[f64], num_tasks: usize) -> Result<()> {
    if weights.len() != num_tasks {
        return Err(ParallelError::InvalidArgument(format!(
            "got {} weights for {} tasks",
            weights.len(),
            num_tasks
        )));
    }
    if let Some((index, weight)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(ParallelError::InvalidArgument(format!(
            "weight {weight} of task {index} is not a non-negative number"
        )));
    }
    Ok(())
}

fn split_ranges(weights: &[f64], workers: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(workers);
    let mut first_unassigned = 0;

    for worker in 0..workers {
        let remaining = &weights[first_unassigned..];
        let workers_remaining = workers - worker;

        let prefix_len = if remaining.is_empty() {
            0
        } else if workers_remaining == 1 {
            // Trailing zero-weight tasks would otherwise tie with the full suffix.
            remaining.len()
        } else {
            let work_remaining: f64 = remaining.iter().sum();
            let work_per_worker = work_remaining / workers_remaining as f64;
            closest_prefix_len(remaining, work_per_worker)
        };

        let end = first_unassigned + prefix_len;
        ranges.push(first_unassigned..end);
        first_unassigned = end;
    }

    ranges
}

/// Length of the first prefix of `weights` whose cumulative sum is closest to `target`.
///
/// `weights` must be non-empty; the result is at least 1.
fn closest_prefix_len(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    let mut best_len = 1;
    let mut best_distance = f64::INFINITY;

    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        let distance = (cumulative - target).abs();
        if distance < best_distance {
            best_distance = distance;
            best_len = i + 1;
        }
    }

    best_len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes<T>(assignment: &Assignment<'_, T>) -> Vec<usize> {
        assignment.buckets().map(<[T]>::len).collect()
    }

    #[test]
    fn test_uniform_ten_tasks_three_workers() {
        let tasks: Vec<usize> = (0..10).collect();
        let assignment = partition(&tasks, None, 3).unwrap();

        // Shares are 10/3 then 7/2 then 4: 3 beats 4 first, 3 ties 4 and the
        // shorter prefix wins, the last worker takes the rest.
        assert_eq!(sizes(&assignment), vec![3, 3, 4]);
        assert_eq!(assignment.bucket(0), &[0, 1, 2]);
        assert_eq!(assignment.bucket(1), &[3, 4, 5]);
        assert_eq!(assignment.bucket(2), &[6, 7, 8, 9]);
        assert_eq!(assignment.buckets().map(<[usize]>::len).sum::<usize>(), 10);
    }

    #[test]
    fn test_heavy_first_task() {
        let tasks = ["t0", "t1", "t2"];
        let assignment = partition(&tasks, Some(&[10.0, 1.0, 1.0]), 2).unwrap();

        // Share is 6: |10 - 6| = 4 beats |11 - 6| = 5
        assert_eq!(assignment.bucket(0), &["t0"]);
        assert_eq!(assignment.bucket(1), &["t1", "t2"]);
        assert!(!assignment.has_empty_bucket());
    }

    #[test]
    fn test_no_tasks_gives_empty_buckets() {
        let tasks: Vec<u32> = Vec::new();
        let assignment = partition(&tasks, None, 4).unwrap();

        assert_eq!(assignment.num_workers(), 4);
        assert!(assignment.buckets().all(<[u32]>::is_empty));
        assert!(has_empty_bucket(&assignment));
        assert_eq!(assignment.empty_bucket_count(), 4);
    }

    #[test]
    fn test_more_workers_than_tasks() {
        let tasks = ['a', 'b'];
        let assignment = partition(&tasks, None, 4).unwrap();

        assert_eq!(sizes(&assignment), vec![1, 1, 0, 0]);
        assert_eq!(assignment.ranges(), &[0..1, 1..2, 2..2, 2..2]);
        assert_eq!(assignment.empty_bucket_count(), 2);
    }

    #[test]
    fn test_single_worker_takes_everything() {
        let tasks = [1, 2, 3, 4, 5];
        let assignment = partition(&tasks, Some(&[0.0, 3.0, 0.5, 2.0, 0.0]), 1).unwrap();
        assert_eq!(assignment.to_vecs(), vec![vec![1, 2, 3, 4, 5]]);
    }

    #[test]
    fn test_uniform_divisible_split_is_even() {
        let tasks: Vec<usize> = (0..12).collect();
        let assignment = partition(&tasks, None, 4).unwrap();
        assert_eq!(sizes(&assignment), vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_zero_weight_tasks() {
        let tasks = ["a", "b", "c", "d"];

        // All zeros: every prefix is at distance 0, so each worker takes one task
        // and the last one absorbs the rest.
        let assignment = partition(&tasks, Some(&[0.0; 4]), 2).unwrap();
        assert_eq!(assignment.bucket(0), &["a"]);
        assert_eq!(assignment.bucket(1), &["b", "c", "d"]);

        // Trailing zeros stay with the last worker.
        let assignment = partition(&tasks, Some(&[2.0, 2.0, 0.0, 0.0]), 2).unwrap();
        assert_eq!(assignment.bucket(0), &["a"]);
        assert_eq!(assignment.bucket(1), &["b", "c", "d"]);
    }

    #[test]
    fn test_tie_prefers_shorter_prefix() {
        // Share 2: cumulative 1 and 3 are both at distance 1
        assert_eq!(closest_prefix_len(&[1.0, 2.0, 1.0], 2.0), 1);
        assert_eq!(closest_prefix_len(&[5.0], 0.0), 1);
        assert_eq!(closest_prefix_len(&[1.0, 1.0, 1.0, 1.0], 2.0), 2);
    }

    #[test]
    fn test_invalid_arguments() {
        let tasks = [1, 2, 3];

        let err = partition(&tasks, Some(&[1.0, 1.0]), 2);
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));

        let err = partition(&tasks, Some(&[1.0, -1.0, 1.0]), 2);
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));

        let err = partition(&tasks, Some(&[1.0, f64::NAN, 1.0]), 2);
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));

        let err = partition(&tasks, Some(&[1.0, f64::INFINITY, 1.0]), 2);
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));

        let err = partition(&tasks, None, 0);
        assert!(matches!(err, Err(ParallelError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = partition(&[1, 2, 3], Some(&[1.0]), 2).unwrap_err();
        assert_eq!(format!("{}", err), "Invalid argument: got 1 weights for 3 tasks");
    }

    #[test]
    fn test_get_out_of_range() {
        let tasks = [1, 2];
        let assignment = partition(&tasks, None, 2).unwrap();
        assert_eq!(assignment.get(1), Some(&[2][..]));
        assert_eq!(assignment.get(2), None);
    }
}
