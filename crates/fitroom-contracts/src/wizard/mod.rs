mod pool;
mod stage;
mod state;

pub use pool::GarmentPool;
pub use stage::WizardStage;
pub use state::{
    SelectionSet, Transition, TransitionError, WizardAction, WizardEffect, WizardState,
};
