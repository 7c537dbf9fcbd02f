use std::fmt;

/// Where a scrape session stands in the select/refresh/paginate/persist chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Bootstrapped,
    YAxisSelected,
    XAxisSelected,
    YearSelected,
    Refreshed,
    Paginated,
    Persisted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Bootstrapped => "bootstrapped",
            Stage::YAxisSelected => "y-axis selected",
            Stage::XAxisSelected => "x-axis selected",
            Stage::YearSelected => "year selected",
            Stage::Refreshed => "refreshed",
            Stage::Paginated => "paginated",
            Stage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// An action the orchestrator wants to take next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    SelectY,
    SelectX,
    SelectYear,
    Refresh,
    Paginate,
    Persist,
}

impl Step {
    /// Stage reached once the step succeeds.
    pub fn target(self) -> Stage {
        match self {
            Step::SelectY => Stage::YAxisSelected,
            Step::SelectX => Stage::XAxisSelected,
            Step::SelectYear => Stage::YearSelected,
            Step::Refresh => Stage::Refreshed,
            Step::Paginate => Stage::Paginated,
            Step::Persist => Stage::Persisted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {step:?} while {stage}")]
pub struct FlowError {
    pub stage: Stage,
    pub step: Step,
}

/// Pure state machine guarding the order of scrape steps.
///
/// Selections may be redone while nothing has been fetched yet; redoing an
/// upstream selection moves the flow back to that stage. Refresh, paginate
/// and persist each require exactly the preceding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeFlow {
    stage: Stage,
}

impl Default for ScrapeFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrapeFlow {
    pub fn new() -> Self {
        Self {
            stage: Stage::Bootstrapped,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Check a step without applying it.
    pub fn check(&self, step: Step) -> Result<(), FlowError> {
        let allowed = match step {
            Step::SelectY => self.stage <= Stage::YearSelected,
            Step::SelectX => {
                self.stage >= Stage::YAxisSelected && self.stage <= Stage::YearSelected
            }
            Step::SelectYear => {
                self.stage >= Stage::XAxisSelected && self.stage <= Stage::YearSelected
            }
            Step::Refresh => self.stage == Stage::YearSelected,
            Step::Paginate => self.stage == Stage::Refreshed,
            Step::Persist => self.stage == Stage::Paginated,
        };
        if allowed {
            Ok(())
        } else {
            Err(FlowError {
                stage: self.stage,
                step,
            })
        }
    }

    /// Apply a step that has completed successfully.
    pub fn apply(&mut self, step: Step) -> Result<Stage, FlowError> {
        self.check(step)?;
        self.stage = step.target();
        Ok(self.stage)
    }
}
