//! The five fixed stages of the analysis pipeline

use serde::Serialize;

pub const MIN_STEP: u8 = 1;
pub const MAX_STEP: u8 = 5;

/// Display text for one pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub step: u8,
    pub title: &'static str,
    pub description: &'static str,
}

pub const STEPS: [StepDescriptor; 5] = [
    StepDescriptor {
        step: 1,
        title: "Define Objective",
        description: "Review the request and agree on a specific, answerable objective",
    },
    StepDescriptor {
        step: 2,
        title: "Data Cleaning",
        description: "Check the dataset for missing values, duplicates and outliers and fix them",
    },
    StepDescriptor {
        step: 3,
        title: "Data Exploration",
        description: "Summarize distributions and relationships relevant to the objective",
    },
    StepDescriptor {
        step: 4,
        title: "Data Analysis",
        description: "Run the analysis that answers the objective",
    },
    StepDescriptor {
        step: 5,
        title: "Write Report",
        description: "Compile the findings into the final report",
    },
];

/// Look up the descriptor for `step`
pub fn step_descriptor(step: u8) -> Option<&'static StepDescriptor> {
    STEPS.iter().find(|descriptor| descriptor.step == step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_step_has_a_descriptor() {
        for step in MIN_STEP..=MAX_STEP {
            assert_eq!(step_descriptor(step).map(|d| d.step), Some(step));
        }
        assert!(step_descriptor(0).is_none());
        assert!(step_descriptor(6).is_none());
        assert_eq!(step_descriptor(5).unwrap().title, "Write Report");
    }
}
