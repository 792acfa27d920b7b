//! Observer pairs: the `(src, dst)` routes whose end-to-end latency and
//! reachability the run aggregates.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::{Result, SimError};

/// One configured latency probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
    pub src: usize,
    pub dst: usize,
}

/// Load the observer list: a leading count followed by `src dst` pairs.
/// Pairs arrive unordered and are normalized so `src <= dst`. A missing
/// file is fatal at startup.
pub fn load_observers(path: &Path, node_count: usize) -> Result<Vec<Observer>> {
    let text = fs::read_to_string(path).map_err(|source| SimError::ObserverFile {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |detail: String| SimError::MalformedRecord {
        path: path.to_path_buf(),
        detail,
    };

    let mut tokens = text.split_whitespace();
    let declared: usize = tokens
        .next()
        .ok_or_else(|| malformed("missing observer count".into()))?
        .parse()
        .map_err(|_| malformed("invalid observer count".into()))?;

    let mut observers = Vec::with_capacity(declared);
    for index in 0..declared {
        let read_id = |tokens: &mut std::str::SplitWhitespace<'_>| -> Result<usize> {
            tokens
                .next()
                .ok_or_else(|| malformed(format!("expected {declared} pairs, ran out at {index}")))?
                .parse()
                .map_err(|_| malformed(format!("invalid node id in pair {index}")))
        };
        let src = read_id(&mut tokens)?;
        let dst = read_id(&mut tokens)?;
        if src >= node_count || dst >= node_count {
            return Err(SimError::ObserverOutOfRange {
                src,
                dst,
                node_count,
            });
        }
        let (src, dst) = if src > dst { (dst, src) } else { (src, dst) };
        observers.push(Observer { src, dst });
    }

    info!(count = observers.len(), path = %path.display(), "loaded observers");
    Ok(observers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_observers(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_count_and_pairs() {
        let file = write_observers("2\n0 5\n3 9\n");
        let observers = load_observers(file.path(), 16).unwrap();
        assert_eq!(
            observers,
            vec![Observer { src: 0, dst: 5 }, Observer { src: 3, dst: 9 }]
        );
    }

    #[test]
    fn swaps_reversed_pairs() {
        let file = write_observers("1\n9 3\n");
        let observers = load_observers(file.path(), 16).unwrap();
        assert_eq!(observers, vec![Observer { src: 3, dst: 9 }]);
    }

    #[test]
    fn rejects_out_of_range_ids() {
        let file = write_observers("1\n0 16\n");
        assert!(matches!(
            load_observers(file.path(), 16),
            Err(SimError::ObserverOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_truncated_list() {
        let file = write_observers("2\n0 5\n");
        assert!(load_observers(file.path(), 16).is_err());
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(matches!(
            load_observers(Path::new("/nonexistent/observers.txt"), 16),
            Err(SimError::ObserverFile { .. })
        ));
    }
}
