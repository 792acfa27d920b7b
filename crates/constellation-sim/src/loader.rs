//! Per-epoch input files.
//!
//! Each epoch `t` is described by `{isl_state_dir}/{t}.txt` (failed ISL
//! endpoint pairs) and `{dir}/{t}.csv` tables for positions, geodetic
//! coordinates, and velocity signs.

use std::fs;
use std::path::{Path, PathBuf};

use grid_routing::{GridConfig, LinkBans};
use tracing::debug;

use crate::{Result, SimError};

pub fn isl_state_path(dir: &Path, epoch: u64) -> PathBuf {
    dir.join(format!("{epoch}.txt"))
}

pub fn epoch_csv_path(dir: &Path, epoch: u64) -> PathBuf {
    dir.join(format!("{epoch}.csv"))
}

fn malformed(path: &Path, detail: impl Into<String>) -> SimError {
    SimError::MalformedRecord {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

/// Apply one ISL-state file on top of `bans`.
///
/// The file holds whitespace-separated undirected endpoint pairs, one
/// failed link each. Every pair must resolve to a grid-adjacent port
/// pair; a mismatch means the scenario files disagree with the
/// configured topology and aborts the run.
pub fn apply_isl_state(path: &Path, grid: &GridConfig, bans: &mut LinkBans) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let mut tokens = text.split_whitespace();
    let mut failed_links = 0usize;

    while let Some(first) = tokens.next() {
        let second = tokens
            .next()
            .ok_or_else(|| malformed(path, "odd number of endpoint tokens"))?;
        let u: usize = first
            .parse()
            .map_err(|_| malformed(path, format!("invalid node id {first:?}")))?;
        let v: usize = second
            .parse()
            .map_err(|_| malformed(path, format!("invalid node id {second:?}")))?;
        if u >= grid.node_count() || v >= grid.node_count() {
            return Err(malformed(path, format!("node pair ({u}, {v}) out of range")));
        }
        bans.ban_link(grid, u, v)?;
        failed_links += 1;
    }

    debug!(path = %path.display(), failed_links, "applied ISL state");
    Ok(())
}

/// Load the failures of the epoch under evaluation.
pub fn load_current_bans(
    dir: &Path,
    epoch: u64,
    grid: &GridConfig,
    bans: &mut LinkBans,
) -> Result<()> {
    bans.clear();
    apply_isl_state(&isl_state_path(dir, epoch), grid, bans)
}

/// Union of the failures over the upcoming update window, feeding the
/// predictive planners.
pub fn load_predicted_bans(
    dir: &Path,
    epoch: u64,
    step: u64,
    update_period: u64,
    end_of_run: u64,
    grid: &GridConfig,
    bans: &mut LinkBans,
) -> Result<()> {
    bans.clear();
    let horizon = (epoch + update_period).min(end_of_run);
    let mut t = epoch;
    while t < horizon {
        apply_isl_state(&isl_state_path(dir, t), grid, bans)?;
        t += step;
    }
    Ok(())
}

/// Load `out.len()` rows of three whitespace-separated values.
pub fn load_vec3_table(path: &Path, out: &mut [[f64; 3]]) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let mut values = text.split_whitespace();
    let row_count = out.len();
    for (row_index, row) in out.iter_mut().enumerate() {
        for slot in row.iter_mut() {
            let token = values.next().ok_or_else(|| {
                malformed(
                    path,
                    format!("expected {row_count} rows of 3 values, ran out at row {row_index}"),
                )
            })?;
            *slot = token
                .parse()
                .map_err(|_| malformed(path, format!("invalid value {token:?}")))?;
        }
    }
    Ok(())
}

/// Load `out.len()` scalar values.
pub fn load_scalar_table(path: &Path, out: &mut [f64]) -> Result<()> {
    let text = fs::read_to_string(path)?;
    let mut values = text.split_whitespace();
    let row_count = out.len();
    for (row_index, slot) in out.iter_mut().enumerate() {
        let token = values.next().ok_or_else(|| {
            malformed(
                path,
                format!("expected {row_count} values, ran out at row {row_index}"),
            )
        })?;
        *slot = token
            .parse()
            .map_err(|_| malformed(path, format!("invalid value {token:?}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_routing::Direction;
    use std::io::Write;
    use tempfile::tempdir;

    fn grid_4x4() -> GridConfig {
        GridConfig::new(4, 4, 0).unwrap()
    }

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn isl_state_bans_both_endpoints() {
        let grid = grid_4x4();
        let dir = tempdir().unwrap();
        write_file(dir.path(), "0.txt", "0 1\n5 9\n");

        let mut bans = LinkBans::new(grid.node_count());
        load_current_bans(dir.path(), 0, &grid, &mut bans).unwrap();

        assert!(bans.is_banned(0, Direction::Down));
        assert!(bans.is_banned(1, Direction::Up));
        assert!(bans.is_banned(5, Direction::Right));
        assert!(bans.is_banned(9, Direction::Left));
        assert!(!bans.is_banned(2, Direction::Up));
    }

    #[test]
    fn non_adjacent_pair_is_fatal() {
        let grid = grid_4x4();
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "0.txt", "0 10\n");

        let mut bans = LinkBans::new(grid.node_count());
        assert!(apply_isl_state(&path, &grid, &mut bans).is_err());
    }

    #[test]
    fn odd_token_count_is_fatal() {
        let grid = grid_4x4();
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "0.txt", "0 1 5\n");

        let mut bans = LinkBans::new(grid.node_count());
        assert!(matches!(
            apply_isl_state(&path, &grid, &mut bans),
            Err(SimError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn predicted_bans_union_the_update_window() {
        let grid = grid_4x4();
        let dir = tempdir().unwrap();
        write_file(dir.path(), "0.txt", "0 1\n");
        write_file(dir.path(), "1.txt", "5 9\n");
        write_file(dir.path(), "2.txt", "2 3\n");

        let mut bans = LinkBans::new(grid.node_count());
        // Window covers epochs 0 and 1; epoch 2 is past the horizon.
        load_predicted_bans(dir.path(), 0, 1, 2, 10, &grid, &mut bans).unwrap();

        assert!(bans.is_banned(0, Direction::Down));
        assert!(bans.is_banned(5, Direction::Right));
        assert!(!bans.is_banned(2, Direction::Down));
    }

    #[test]
    fn predicted_window_clips_at_end_of_run() {
        let grid = grid_4x4();
        let dir = tempdir().unwrap();
        write_file(dir.path(), "9.txt", "0 1\n");

        let mut bans = LinkBans::new(grid.node_count());
        // End of run at epoch 10; the window must not reach for 10.txt.
        load_predicted_bans(dir.path(), 9, 1, 5, 10, &grid, &mut bans).unwrap();
        assert!(bans.is_banned(0, Direction::Down));
    }

    #[test]
    fn vec3_table_loads_row_major() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "0.csv", "1 2 3\n4 5 6\n");

        let mut out = [[0.0; 3]; 2];
        load_vec3_table(&path, &mut out).unwrap();
        assert_eq!(out, [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn short_table_is_fatal() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "0.csv", "1 2 3\n");

        let mut out = [[0.0; 3]; 2];
        assert!(load_vec3_table(&path, &mut out).is_err());
    }

    #[test]
    fn scalar_table_loads_in_order() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "0.csv", "-1.5\n2.5\n");

        let mut out = [0.0; 2];
        load_scalar_table(&path, &mut out).unwrap();
        assert_eq!(out, [-1.5, 2.5]);
    }
}
