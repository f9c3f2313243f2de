mod board;

use board::{Board, QueensManager};

use agal::control::{EvolutionController, FitnessThresholdStop, StopCondition, TimedStop};
use agal::evolution::{
    BestResult, EugenicAlgorithm, EvolutionAlgorithm, RateMutator, StateManager,
    TournamentSelector,
};
use agal::populations::{Population, PopulationConfig, SharedPopulation};

use serde::{Deserialize, Serialize};

use std::env;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Settings for a single n-queens search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct NQueensConfig {
    board_size: usize,
    population: PopulationConfig,
    workers: usize,
    time_limit_ms: u64,
    mutation_rate: f64,
    /// The search stops early once a board with
    /// this many conflicts or fewer is bred.
    goal_conflicts: i64,
}

impl Default for NQueensConfig {
    fn default() -> NQueensConfig {
        NQueensConfig {
            board_size: 50,
            population: PopulationConfig::default(),
            workers: 5,
            time_limit_ms: 500,
            mutation_rate: 0.115,
            goal_conflicts: 0,
        }
    }
}

impl NQueensConfig {
    /// Reads a configuration from the RON file at `path`,
    /// or returns the defaults if there is no path.
    fn load(path: Option<String>) -> Result<NQueensConfig, Box<dyn Error>> {
        match path {
            Some(path) => Ok(ron::from_str(&fs::read_to_string(path)?)?),
            None => Ok(NQueensConfig::default()),
        }
    }
}

/// The result of a search.
struct Outcome {
    best: Arc<Board>,
    generations: usize,
    elapsed: Duration,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

fn solve(config: &NQueensConfig) -> Result<Outcome, Box<dyn Error>> {
    if config.board_size == 0 {
        return Err("board size must be greater than zero".into());
    }
    let manager = QueensManager::new(config.board_size);

    let population = Arc::new(SharedPopulation::new(&config.population, manager, || {
        manager.randomize()
    })?);
    let engine = Arc::new(EugenicAlgorithm::new(
        population.clone(),
        manager,
        TournamentSelector::new(manager),
        RateMutator::new(config.mutation_rate, move |board: &mut Board| {
            manager.mutate(board)
        })?,
    ));

    let best = Arc::new(BestResult::new(manager));
    engine.register_listener(best.clone());

    let solved: Arc<dyn StopCondition<Board>> =
        Arc::new(FitnessThresholdStop::new(manager, config.goal_conflicts));
    let timeout: Arc<dyn StopCondition<Board>> =
        Arc::new(TimedStop::new(Duration::from_millis(config.time_limit_ms)));
    let controller = EvolutionController::new(engine, config.workers, vec![solved, timeout]);

    let started = Instant::now();
    controller.start()?;
    controller.await_termination()?;
    let elapsed = started.elapsed();

    Ok(Outcome {
        best: best.best().ok_or("no boards were bred")?,
        generations: population.generation_count(),
        elapsed,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = NQueensConfig::load(env::args().nth(1))?;
    tracing::info!(?config, "searching for a solution");

    let outcome = solve(&config)?;
    let max_conflicts = QueensManager::new(config.board_size).max_conflicts().max(1);
    let conflicts = outcome.best.conflicts();
    let elapsed_ms = outcome.elapsed.as_millis() as u64;

    tracing::info!(
        conflicts,
        fitness = 1.0 - conflicts as f64 / max_conflicts as f64,
        elapsed_ms,
        generations = outcome.generations,
        "{}",
        if conflicts == 0 {
            "solved"
        } else {
            "best board found"
        }
    );
    let board = ron::to_string(&*outcome.best)?;
    tracing::info!(%board, "best board");

    let generations_per_ms = outcome.generations as f64 / elapsed_ms.max(1) as f64;
    tracing::info!(
        generations_per_ms,
        boards_per_ms = generations_per_ms * config.population.size as f64,
        "performance"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: NQueensConfig =
            ron::from_str("(board_size: 8, population: (size: 20))").unwrap();

        assert_eq!(config.board_size, 8);
        assert_eq!(config.population.size, 20);
        assert_eq!(
            config.population.retry_limit,
            PopulationConfig::default().retry_limit
        );
        assert_eq!(config.workers, NQueensConfig::default().workers);
    }

    #[test]
    fn missing_path_gives_defaults() {
        let config = NQueensConfig::load(None).unwrap();
        assert_eq!(config.board_size, 50);
    }

    #[test]
    fn reachable_goal_stops_early() {
        let config = NQueensConfig {
            board_size: 8,
            workers: 2,
            time_limit_ms: 60_000,
            goal_conflicts: i64::MAX,
            ..NQueensConfig::default()
        };

        let outcome = solve(&config).unwrap();

        assert_eq!(outcome.best.size(), 8);
        assert!(outcome.elapsed < Duration::from_secs(60));
    }

    #[test]
    fn time_limit_stops_search() {
        let config = NQueensConfig {
            board_size: 200,
            workers: 2,
            time_limit_ms: 50,
            goal_conflicts: -1,
            ..NQueensConfig::default()
        };

        let outcome = solve(&config).unwrap();

        assert!(outcome.best.conflicts() >= 0);
        assert!(outcome.elapsed >= Duration::from_millis(50));
    }

    #[test]
    fn empty_board_is_rejected() {
        let config = NQueensConfig {
            board_size: 0,
            ..NQueensConfig::default()
        };
        assert!(solve(&config).is_err());
    }
}
