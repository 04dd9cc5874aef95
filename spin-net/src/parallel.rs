use rayon::prelude::*;

/// Map `body` over `(index, item)` pairs, optionally in parallel, keeping the
/// input order in the output.
///
/// When `sequential` is true, items are processed on the current thread (no
/// rayon overhead, best when an outer level of parallelism already saturates
/// all cores).
pub fn par_over_runs<T, R>(
    items: &[T],
    sequential: bool,
    body: impl Fn(usize, &T) -> R + Send + Sync,
) -> Vec<R>
where
    T: Sync,
    R: Send,
{
    if sequential {
        items.iter().enumerate().map(|(i, t)| body(i, t)).collect()
    } else {
        items.par_iter().enumerate().map(|(i, t)| body(i, t)).collect()
    }
}
