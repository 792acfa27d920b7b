//! The epoch loop.

use std::time::Instant;

use grid_routing::{
    follow_route_tables, BorderIndex, ComputeScratch, DelayModel, EpochState, GridConfig,
    PathEvaluator, RoutePlanner,
};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::loader;
use crate::metrics::{Average, ObserverStats};
use crate::observers::{self, Observer};
use crate::report::{self, ReportSnapshot};
use crate::{Result, SimError};

/// Owns the run state and drives the epoch loop: load inputs, recompute
/// route tables on update boundaries, evaluate observers, report.
pub struct Simulation {
    config: SimConfig,
    grid: GridConfig,
    delay: DelayModel,
    planner: RoutePlanner,
    algorithm: String,
    border: Option<BorderIndex>,
    state: EpochState,
    tables: Vec<Vec<u8>>,
    observers: Vec<Observer>,
    observer_stats: Vec<ObserverStats>,
    compute_time_ms: Average,
    updated_entries: Average,
}

impl Simulation {
    pub fn new(config: SimConfig, planner: RoutePlanner) -> Result<Self> {
        let grid = config.grid()?;
        let node_count = grid.node_count();

        let observers = observers::load_observers(&config.observer_config_path, node_count)?;
        for &node in &config.dump_rib_nodes {
            if node >= node_count {
                return Err(SimError::Config(format!(
                    "dump_rib node {node} out of range for {node_count} nodes"
                )));
            }
        }

        // The border index depends only on the decomposition; build it
        // once and share it across all epochs.
        let border = planner
            .domain_grid()
            .map(|domains| BorderIndex::build(&grid, domains));

        let algorithm = planner.name();
        let delay = config.delay_model();
        info!(
            nodes = node_count,
            observers = observers.len(),
            algorithm = %algorithm,
            "simulation initialized"
        );

        Ok(Self {
            observer_stats: vec![ObserverStats::default(); observers.len()],
            observers,
            state: EpochState::new(node_count),
            tables: vec![vec![0u8; node_count]; node_count],
            compute_time_ms: Average::default(),
            updated_entries: Average::default(),
            config,
            grid,
            delay,
            planner,
            algorithm,
            border,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let started = Instant::now();
        let start = self.config.start_time;
        let end = self.config.end_time();
        let step = self.config.step_length;
        let update_period = self.config.update_period();
        let refresh_period = self.config.refresh_period();

        let mut epoch = start;
        while epoch < end {
            self.load_epoch(epoch)?;

            if epoch % update_period == 0 {
                self.recompute_tables(epoch)?;
            }
            if epoch % refresh_period == 0 {
                self.write_report(epoch, &started)?;
            }
            self.evaluate_observers();

            epoch += step;
        }

        self.write_report(end, &started)?;
        info!(
            wall_clock_s = started.elapsed().as_secs_f64(),
            "simulation finished"
        );
        Ok(())
    }

    fn load_epoch(&mut self, epoch: u64) -> Result<()> {
        loader::load_current_bans(
            &self.config.isl_state_dir,
            epoch,
            &self.grid,
            &mut self.state.current_bans,
        )?;
        loader::load_vec3_table(
            &loader::epoch_csv_path(&self.config.sat_position_dir, epoch),
            &mut self.state.positions,
        )?;
        if let Some(dir) = &self.config.sat_lla_dir {
            loader::load_vec3_table(
                &loader::epoch_csv_path(dir, epoch),
                &mut self.state.geodetic,
            )?;
        }
        if let Some(dir) = &self.config.sat_velocity_dir {
            loader::load_scalar_table(
                &loader::epoch_csv_path(dir, epoch),
                &mut self.state.velocity,
            )?;
        }
        Ok(())
    }

    fn recompute_tables(&mut self, epoch: u64) -> Result<()> {
        loader::load_predicted_bans(
            &self.config.isl_state_dir,
            epoch,
            self.config.step_length,
            self.config.update_period(),
            self.config.end_time(),
            &self.grid,
            &mut self.state.predicted_bans,
        )?;

        let grid = &self.grid;
        let delay = &self.delay;
        let state = &self.state;
        let planner = &self.planner;

        let pass_started = Instant::now();
        let fresh: Vec<Vec<u8>> = (0..grid.node_count())
            .into_par_iter()
            .map_init(ComputeScratch::new, |scratch, id| {
                planner.compute_row(grid, delay, state, id, scratch)
            })
            .collect();
        let elapsed_ms = pass_started.elapsed().as_secs_f64() * 1e3;
        self.compute_time_ms
            .add(elapsed_ms / grid.node_count() as f64);

        let count_churn = epoch != self.config.start_time;
        for (current, next) in self.tables.iter_mut().zip(fresh) {
            if count_churn {
                let changed = current.iter().zip(&next).filter(|(a, b)| a != b).count();
                self.updated_entries.add(changed as f64);
            }
            *current = next;
        }

        for &node in &self.config.dump_rib_nodes {
            report::write_rib_row(
                &self.config.report_dir,
                &self.algorithm,
                node,
                epoch,
                &self.tables[node],
            )?;
        }

        debug!(epoch, elapsed_ms, "route tables recomputed");
        Ok(())
    }

    fn evaluate_observers(&mut self) {
        if let (Some(domains), Some(border)) = (self.planner.domain_grid(), self.border.as_ref()) {
            let evaluator = PathEvaluator::new(
                domains,
                &self.delay,
                &self.state.positions,
                &self.state.current_bans,
                &self.tables,
                border,
            );
            for (observer, stats) in self.observers.iter().zip(&mut self.observer_stats) {
                stats.record(evaluator.evaluate(observer.src, observer.dst));
            }
        } else {
            for (observer, stats) in self.observers.iter().zip(&mut self.observer_stats) {
                stats.record(follow_route_tables(
                    &self.grid,
                    &self.delay,
                    &self.state.positions,
                    &self.state.current_bans,
                    &self.tables,
                    observer.src,
                    observer.dst,
                ));
            }
        }
    }

    fn write_report(&self, epoch: u64, started: &Instant) -> Result<()> {
        let wall_clock_s = started.elapsed().as_secs_f64();
        let past = (epoch - self.config.start_time + 1) as f64;
        let eta_s = wall_clock_s / past * (self.config.duration as f64 - past).max(0.0);

        let snapshot = ReportSnapshot {
            name: &self.config.name,
            algorithm: &self.algorithm,
            simulation_time: epoch,
            wall_clock_s,
            eta_s,
            compute_time_ms: self.compute_time_ms,
            updated_entries: self.updated_entries,
            observers: &self.observers,
            stats: &self.observer_stats,
        };
        report::write_report(&self.config.report_dir, &snapshot)?;
        debug!(epoch, wall_clock_s, "report written");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn observer_stats(&self) -> &[ObserverStats] {
        &self.observer_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_routing::DomainGrid;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const EPOCHS: u64 = 3;

    fn write_scenario(root: &Path) -> SimConfig {
        let isl_dir = root.join("isl");
        let pos_dir = root.join("pos");
        fs::create_dir_all(&isl_dir).unwrap();
        fs::create_dir_all(&pos_dir).unwrap();

        for epoch in 0..EPOCHS {
            // One failed link in the middle epoch, none otherwise.
            let state = if epoch == 1 { "5 9\n" } else { "" };
            fs::write(isl_dir.join(format!("{epoch}.txt")), state).unwrap();

            let mut positions = String::new();
            for node in 0..16 {
                positions.push_str(&format!("{} 0 0\n", node));
            }
            fs::write(pos_dir.join(format!("{epoch}.csv")), positions).unwrap();
        }

        fs::write(root.join("observers.txt"), "2\n0 5\n15 3\n").unwrap();

        SimConfig {
            name: "unit".to_string(),
            constellation: crate::config::ConstellationSection {
                num_of_orbit_planes: 4,
                num_of_satellites_per_plane: 4,
                relative_spacing: 0,
            },
            isl_latency: crate::config::LatencySection {
                processing_delay: 1.0,
                propagation_delay_coef: 1.0,
                propagation_speed: 299_792.458,
            },
            step_length: 1,
            duration: EPOCHS,
            start_time: 0,
            update_period: Some(1),
            refresh_period: Some(1),
            isl_state_dir: isl_dir,
            sat_position_dir: pos_dir,
            sat_lla_dir: None,
            sat_velocity_dir: None,
            report_dir: root.join("reports"),
            observer_config_path: root.join("observers.txt"),
            dump_rib_nodes: vec![0],
        }
    }

    #[test]
    fn min_hop_run_reports_every_observer_reachable() {
        let root = tempdir().unwrap();
        let config = write_scenario(root.path());
        let report_dir = config.report_dir.clone();

        let mut simulation = Simulation::new(config, RoutePlanner::MinHop).unwrap();
        simulation.run().unwrap();

        for stats in simulation.observer_stats() {
            assert_eq!(stats.failure_rate.mean(), 0.0);
            assert_eq!(stats.latency.count(), EPOCHS);
            assert!(stats.latency.mean() > 0.0);
        }

        let text =
            fs::read_to_string(report_dir.join("report [unit] MinHop.txt")).unwrap();
        assert!(text.contains("number of observers: 2"));
        assert!(text.contains("route path [0, 5]"));
        assert!(text.contains("route path [3, 15]"));

        // One rib dump per recompute for the configured node.
        for epoch in 0..EPOCHS {
            assert!(report_dir
                .join(format!("rib/MinHop/0/{epoch}.txt"))
                .exists());
        }
    }

    #[test]
    fn domain_heuristic_run_evaluates_cross_cell_observers() {
        let root = tempdir().unwrap();
        let mut config = write_scenario(root.path());
        config.dump_rib_nodes.clear();
        let report_dir = config.report_dir.clone();

        let grid = config.grid().unwrap();
        let planner = RoutePlanner::DomainRestricted(DomainGrid::new(grid, 2, 2).unwrap());
        let mut simulation = Simulation::new(config, planner).unwrap();
        simulation.run().unwrap();

        for stats in simulation.observer_stats() {
            assert_eq!(stats.failure_rate.mean(), 0.0);
            assert!(stats.latency.mean() > 0.0);
        }

        assert!(report_dir
            .join("report [unit] DomainHeuristic_2_2.csv")
            .exists());
    }

    #[test]
    fn rejects_out_of_range_rib_dump_node() {
        let root = tempdir().unwrap();
        let mut config = write_scenario(root.path());
        config.dump_rib_nodes = vec![16];

        assert!(matches!(
            Simulation::new(config, RoutePlanner::MinHop),
            Err(SimError::Config(_))
        ));
    }
}
