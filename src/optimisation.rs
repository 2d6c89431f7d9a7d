//! Solve orchestration: single-objective runs and epsilon-constraint Pareto
//! tracing.
//!
//! Each solve builds a fresh problem from the hub model, so no solver state
//! is shared between the points of a sweep. A point that fails to solve is
//! reported through its status and the sweep continues.
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::model::variables::{VariableKey, VariableMap};
use crate::model::{HubModel, Objective};
use highs::{HighsModelStatus, Sense};
use log::{info, warn};
use std::env;
use std::fmt;

/// How the cost and carbon objectives are combined over a run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptimisationMode {
    /// One cost-minimal solve
    CostOnly,
    /// Carbon-minimal solve, then least cost under a near-minimal carbon cap
    CarbonOnly,
    /// Both extremes plus `pareto_points` epsilon-stepped intermediate solves
    MultiObjective { pareto_points: u32 },
}

/// Stopping criteria passed to the HiGHS solver
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Relative MIP gap at which a solution counts as optimal
    pub mip_gap: f64,
    /// Wall-clock limit per solve in seconds
    pub time_limit: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mip_gap: 0.001,
            time_limit: 1e8,
        }
    }
}

/// Outcome of one solver invocation
#[derive(Clone, Debug, PartialEq)]
pub enum SolveStatus {
    /// Solved to within the configured MIP gap
    Optimal,
    /// No feasible solution exists for the built constraint system
    Infeasible,
    /// The wall-clock limit was reached before the gap was met
    TimeLimit,
    /// Any other solver outcome
    Other(String),
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::TimeLimit => write!(f, "time limit reached"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

/// Variable values of one solved point, keyed in column order
pub struct Solution {
    variables: VariableMap,
    values: Vec<f64>,
    total_cost: f64,
    total_carbon: f64,
}

impl Solution {
    fn new(variables: VariableMap, values: Vec<f64>) -> Self {
        let read = |key| {
            variables
                .index_of(key)
                .map(|i| values[i])
                .expect("Objective variable missing from the problem")
        };
        let total_cost = read(&VariableKey::TotalCost);
        let total_carbon = read(&VariableKey::TotalCarbon);

        Self {
            variables,
            values,
            total_cost,
            total_carbon,
        }
    }

    /// Iterate over every variable with its solved value
    pub fn iter(&self) -> impl Iterator<Item = (&VariableKey, f64)> {
        self.variables.keys().zip(self.values.iter().copied())
    }

    /// The solved value of one variable, if it exists in this problem
    pub fn value_of(&self, key: &VariableKey) -> Option<f64> {
        self.variables.index_of(key).map(|i| self.values[i])
    }

    /// Total discounted system cost at this point
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Total carbon emissions at this point
    pub fn total_carbon(&self) -> f64 {
        self.total_carbon
    }
}

/// One solved (or failed) point of a run
pub struct SolvePoint {
    /// Short name identifying the point within the run
    pub label: String,
    /// The objective this point minimised
    pub objective: Objective,
    /// The carbon cap applied, if any
    pub carbon_cap: Option<f64>,
    /// Solver outcome
    pub status: SolveStatus,
    /// Variable values, present only for optimal outcomes
    pub solution: Option<Solution>,
}

/// Drives the solver over one hub model according to the optimisation mode
pub struct Orchestrator<'a> {
    model: &'a HubModel<'a>,
    mode: OptimisationMode,
    config: SolverConfig,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator; the mode is fixed for the orchestrator's lifetime
    pub fn new(model: &'a HubModel<'a>, mode: OptimisationMode, config: SolverConfig) -> Self {
        Self {
            model,
            mode,
            config,
        }
    }

    /// Run every solve of the configured mode, in order.
    ///
    /// Failed points are reported through their status; the run continues
    /// past them wherever later points do not depend on their values.
    pub fn run(&self) -> Vec<SolvePoint> {
        match self.mode {
            OptimisationMode::CostOnly => {
                info!("Single objective run: cost minimisation");
                vec![self.solve_point("cost_min", Objective::Cost, None)]
            }
            OptimisationMode::CarbonOnly => self.run_carbon_only(),
            OptimisationMode::MultiObjective { pareto_points } => {
                self.run_multi_objective(pareto_points)
            }
        }
    }

    fn run_carbon_only(&self) -> Vec<SolvePoint> {
        info!("Single objective run: carbon minimisation");
        let first = self.solve_point("carbon_min", Objective::Carbon, None);
        let Some(solution) = &first.solution else {
            warn!("Carbon minimisation failed ({}); skipping cost solve", first.status);
            return vec![first];
        };

        // Least-cost operation within 1% of the carbon optimum
        let cap = solution.total_carbon() * 1.01;
        let second = self.solve_point("cost_under_cap", Objective::Cost, Some(cap));
        vec![first, second]
    }

    fn run_multi_objective(&self, pareto_points: u32) -> Vec<SolvePoint> {
        info!(
            "Multi-objective run: tracing {} Pareto point(s) between the extremes",
            pareto_points
        );
        let mut points = Vec::with_capacity(pareto_points as usize + 2);
        points.push(self.solve_point("cost_min", Objective::Cost, None));
        points.push(self.solve_point("carbon_min", Objective::Carbon, None));

        if pareto_points == 0 {
            points.push(self.solve_point("cost_uncapped", Objective::Cost, None));
            return points;
        }

        let carbon_range = match (&points[0].solution, &points[1].solution) {
            (Some(cost_point), Some(carbon_point)) => {
                Some((carbon_point.total_carbon(), cost_point.total_carbon()))
            }
            _ => None,
        };
        let Some((carbon_min, carbon_max)) = carbon_range else {
            warn!("One of the extreme points failed; skipping intermediate points");
            return points;
        };

        let interval = (carbon_max - carbon_min) / (pareto_points as f64 + 1.0);
        for i in 1..=pareto_points {
            let cap = carbon_max - interval * i as f64;
            points.push(self.solve_point(&format!("pareto_{i}"), Objective::Cost, Some(cap)));
        }

        points
    }

    /// Build and solve one point
    pub fn solve_point(
        &self,
        label: &str,
        objective: Objective,
        carbon_cap: Option<f64>,
    ) -> SolvePoint {
        let (problem, variables) = self.model.build(objective, carbon_cap);
        info!(
            "Solving point {label}: {} columns, carbon cap {carbon_cap:?}",
            variables.len()
        );

        let mut highs_model = problem.optimise(Sense::Minimise);
        highs_model.set_option("mip_rel_gap", self.config.mip_gap);
        highs_model.set_option("time_limit", self.config.time_limit);
        configure_highs_logging(&mut highs_model);

        let solved = highs_model.solve();
        let (status, solution) = match solved.status() {
            HighsModelStatus::Optimal => {
                let values = solved.get_solution().columns().to_vec();
                (SolveStatus::Optimal, Some(Solution::new(variables, values)))
            }
            HighsModelStatus::Infeasible => (SolveStatus::Infeasible, None),
            HighsModelStatus::ReachedTimeLimit => (SolveStatus::TimeLimit, None),
            other => (SolveStatus::Other(format!("{other:?}")), None),
        };
        match &status {
            SolveStatus::Optimal => info!("Point {label} solved"),
            status => warn!("Point {label} not solved: {status}"),
        }

        SolvePoint {
            label: label.to_string(),
            objective,
            carbon_cap,
            status,
            solution,
        }
    }
}

/// Route HiGHS output to the console unless logging is switched off
fn configure_highs_logging(model: &mut highs::Model) {
    if let Ok(log_level) = env::var(LOG_LEVEL_ENV_VAR) {
        if log_level.eq_ignore_ascii_case("off") {
            return;
        }
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}
