use crossbeam_channel::{bounded, unbounded, Sender};
use std::thread;

/// Thread-safe handle through which a mapper invocation publishes results.
/// Each task may emit zero or more results; sends never block the mapper.
pub struct Emit<'a, O> {
    tx: &'a Sender<O>,
}

impl<'a, O> Emit<'a, O> {
    pub fn emit(&self, item: O) {
        // a consumer that has stopped draining just discards the result
        let _ = self.tx.send(item);
    }
}

/// Run `mapper` over every item of `source` on a pool of `workers` threads,
/// draining results into `consume` on the calling thread.
///
/// The source is anything iterable whose items can cross threads: a keyed
/// map, an indexed sequence, or a channel receiver. Tasks are pulled from a
/// shared bounded queue, so a slow source and fast workers (or the reverse)
/// degrade gracefully. Results arrive in completion order, not source
/// order. The drain ends when the source is exhausted and all workers are
/// idle.
///
/// The first error returned by `consume` stops consumption; remaining
/// results are drained and discarded so the workers can wind down, and the
/// error is returned.
pub fn map_n<S, I, O, E, M, C>(source: S, workers: usize, mapper: M, mut consume: C) -> Result<(), E>
where
    S: IntoIterator<Item = I> + Send,
    I: Send,
    O: Send,
    M: Fn(I, &Emit<'_, O>) + Sync,
    C: FnMut(O) -> Result<(), E>,
{
    let workers = workers.max(1);
    let (task_tx, task_rx) = bounded::<I>(workers * 2);
    let (result_tx, result_rx) = unbounded::<O>();
    let mut first_err = None;
    thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            let mapper = &mapper;
            scope.spawn(move || {
                for task in task_rx {
                    mapper(task, &Emit { tx: &result_tx });
                }
            });
        }
        // the pool keeps clones; results end when the last worker exits
        drop(task_rx);
        drop(result_tx);
        scope.spawn(move || {
            for item in source {
                if task_tx.send(item).is_err() {
                    break;
                }
            }
        });
        for item in result_rx {
            if first_err.is_none() {
                if let Err(err) = consume(item) {
                    first_err = Some(err);
                }
            }
        }
    });
    match first_err {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_map_source() {
        let mut source = HashMap::new();
        for i in 0..100i64 {
            source.insert(i, i * 10);
        }
        let mut results = Vec::new();
        map_n(
            source,
            8,
            |(k, v): (i64, i64), emit| emit.emit(k + v),
            |x| {
                results.push(x);
                Ok::<(), ()>(())
            },
        )
        .unwrap();
        results.sort();
        let expected: Vec<i64> = (0..100).map(|i| i * 11).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn test_sequence_source_with_variable_emit() {
        let source: Vec<usize> = (0..10).collect();
        let mut results = Vec::new();
        map_n(
            source,
            4,
            |n, emit| {
                // n results per task, including none for 0
                for _ in 0..n {
                    emit.emit(n);
                }
            },
            |x| {
                results.push(x);
                Ok::<(), ()>(())
            },
        )
        .unwrap();
        assert_eq!(results.len(), (0..10).sum::<usize>());
        results.sort();
        assert_eq!(results[0], 1);
        assert_eq!(*results.last().unwrap(), 9);
    }

    #[test]
    fn test_channel_source() {
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..50i64 {
            tx.send(i).unwrap();
        }
        drop(tx);
        let mut total = 0;
        map_n(
            rx,
            3,
            |n, emit| emit.emit(n * 2),
            |x: i64| {
                total += x;
                Ok::<(), ()>(())
            },
        )
        .unwrap();
        assert_eq!(total, (0..50).map(|i| i * 2).sum::<i64>());
    }

    #[test]
    fn test_single_worker() {
        let source = vec![1, 2, 3];
        let mut results = Vec::new();
        map_n(
            source,
            1,
            |n: i32, emit| emit.emit(n),
            |x| {
                results.push(x);
                Ok::<(), ()>(())
            },
        )
        .unwrap();
        results.sort();
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[test]
    fn test_consume_error_stops_and_propagates() {
        let source: Vec<i32> = (0..1000).collect();
        let mut consumed = 0;
        let result = map_n(
            source,
            4,
            |n, emit| emit.emit(n),
            |_| {
                consumed += 1;
                if consumed == 5 {
                    Err("boom")
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(result, Err("boom"));
    }
}
