use crate::error::{ArchiveError, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Apply `f` to every item, stopping at the first failure.
///
/// `jobs == 1` is a plain sequential loop. Otherwise the work runs on a rayon
/// pool of `jobs` threads (`0` = rayon's default); a shared abort flag is
/// raised by the first failing item, later items are skipped, and the first
/// error recorded is the one returned. Output order matches input order.
pub(crate) fn map_abortable<T, R, F>(jobs: usize, items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    if jobs == 1 {
        return items.iter().map(&f).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let abort = AtomicBool::new(false);
    let first_err: Mutex<Option<ArchiveError>> = Mutex::new(None);

    let out: Vec<Option<R>> = pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                if abort.load(Ordering::Acquire) {
                    return None;
                }
                match f(item) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        abort.store(true, Ordering::Release);
                        let mut slot = first_err.lock().unwrap_or_else(|p| p.into_inner());
                        if slot.is_none() {
                            *slot = Some(e);
                        }
                        None
                    }
                }
            })
            .collect()
    });

    if let Some(e) = first_err.into_inner().unwrap_or_else(|p| p.into_inner()) {
        return Err(e);
    }
    Ok(out.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn preserves_order_in_parallel() {
        let items: Vec<u32> = (0..500).collect();
        let out = map_abortable(4, &items, |x| Ok(x * 2)).unwrap();
        assert_eq!(out, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn sequential_stops_at_first_failure() {
        let calls = AtomicUsize::new(0);
        let items: Vec<u32> = (0..10).collect();
        let err = map_abortable(1, &items, |x| {
            calls.fetch_add(1, Ordering::SeqCst);
            if *x == 3 {
                Err(ArchiveError::Validation(PathBuf::from(format!("f{x}"))))
            } else {
                Ok(*x)
            }
        })
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Validation(p) if p == PathBuf::from("f3")));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn parallel_failure_aborts_whole_map() {
        let items: Vec<u32> = (0..1000).collect();
        let err = map_abortable(4, &items, |x| {
            if *x % 97 == 5 {
                Err(ArchiveError::MissingFile(x.to_string()))
            } else {
                Ok(*x)
            }
        })
        .unwrap_err();
        assert!(matches!(err, ArchiveError::MissingFile(_)));
    }
}
