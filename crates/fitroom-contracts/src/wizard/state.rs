use super::pool::GarmentPool;
use super::stage::WizardStage;
use crate::image::EncodedImage;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    pub person: Option<EncodedImage>,
    pub garment: Option<EncodedImage>,
    pub result: Option<EncodedImage>,
}

/// Every way the wizard state can change.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    Navigate(WizardStage),
    SelectPerson(EncodedImage),
    UploadGarment(EncodedImage),
    /// Index into the generated pool, 0 = most recent.
    PickGarment(usize),
    ConfirmGarment,
    RetryGarment,
    Reset,
    GarmentsGenerated(Vec<EncodedImage>),
    TryOnCompleted(EncodedImage),
    RestoreResult(EncodedImage),
}

impl WizardAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "navigate",
            Self::SelectPerson(_) => "select_person",
            Self::UploadGarment(_) => "upload_garment",
            Self::PickGarment(_) => "pick_garment",
            Self::ConfirmGarment => "confirm_garment",
            Self::RetryGarment => "retry_garment",
            Self::Reset => "reset",
            Self::GarmentsGenerated(_) => "garments_generated",
            Self::TryOnCompleted(_) => "try_on_completed",
            Self::RestoreResult(_) => "restore_result",
        }
    }
}

/// Work a transition asks the caller to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEffect {
    TryOnRequested {
        person: EncodedImage,
        garment: EncodedImage,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: WizardStage,
    pub to: WizardStage,
    pub effect: Option<WizardEffect>,
}

impl Transition {
    pub fn stage_changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{action} is not available in the {stage} stage")]
    WrongStage {
        action: &'static str,
        stage: WizardStage,
    },

    #[error("upload a person image first")]
    PersonMissing,

    #[error("select or generate a garment first")]
    GarmentMissing,

    #[error("no garment candidate #{index} (pool has {len})")]
    UnknownCandidate { index: usize, len: usize },

    #[error("the result stage is reached by confirming a garment")]
    ResultNotNavigable,
}

/// Stage, selections and garment candidates of one wizard session.
///
/// State only changes through [`WizardState::apply`]. A rejected action
/// leaves every field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    stage: WizardStage,
    selection: SelectionSet,
    pool: GarmentPool,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn pool(&self) -> &GarmentPool {
        &self.pool
    }

    pub fn apply(&mut self, action: WizardAction) -> Result<Transition, TransitionError> {
        let from = self.stage;
        let name = action.name();
        let mut effect = None;

        match action {
            WizardAction::Navigate(WizardStage::Person) => {
                self.stage = WizardStage::Person;
            }
            WizardAction::Navigate(WizardStage::Garment) => {
                if self.selection.person.is_none() {
                    return Err(TransitionError::PersonMissing);
                }
                self.stage = WizardStage::Garment;
            }
            WizardAction::Navigate(WizardStage::Result) => {
                return Err(TransitionError::ResultNotNavigable);
            }
            WizardAction::SelectPerson(image) => {
                self.require_stage(name, WizardStage::Person)?;
                self.selection.person = Some(image);
                // A new person invalidates the previous composite.
                self.selection.result = None;
                self.stage = WizardStage::Garment;
            }
            WizardAction::UploadGarment(image) => {
                self.require_stage(name, WizardStage::Garment)?;
                self.pool.set_uploaded(image.clone());
                self.selection.garment = Some(image);
            }
            WizardAction::PickGarment(index) => {
                self.require_stage(name, WizardStage::Garment)?;
                let image = self
                    .pool
                    .get(index)
                    .cloned()
                    .ok_or(TransitionError::UnknownCandidate {
                        index,
                        len: self.pool.len(),
                    })?;
                self.selection.garment = Some(image);
            }
            WizardAction::ConfirmGarment => {
                self.require_stage(name, WizardStage::Garment)?;
                let person = self
                    .selection
                    .person
                    .clone()
                    .ok_or(TransitionError::PersonMissing)?;
                let garment = self
                    .selection
                    .garment
                    .clone()
                    .ok_or(TransitionError::GarmentMissing)?;
                self.stage = WizardStage::Result;
                effect = Some(WizardEffect::TryOnRequested { person, garment });
            }
            WizardAction::RetryGarment => {
                self.require_stage(name, WizardStage::Result)?;
                self.stage = WizardStage::Garment;
            }
            WizardAction::Reset => {
                self.require_stage(name, WizardStage::Result)?;
                self.selection = SelectionSet::default();
                self.pool.clear_uploaded();
                self.stage = WizardStage::Person;
            }
            WizardAction::GarmentsGenerated(images) => {
                for image in images {
                    self.pool.push_generated(image.clone());
                    self.selection.garment = Some(image);
                }
            }
            WizardAction::TryOnCompleted(image) | WizardAction::RestoreResult(image) => {
                self.selection.result = Some(image);
            }
        }

        Ok(Transition {
            from,
            to: self.stage,
            effect,
        })
    }

    fn require_stage(&self, action: &'static str, stage: WizardStage) -> Result<(), TransitionError> {
        if self.stage != stage {
            return Err(TransitionError::WrongStage {
                action,
                stage: self.stage,
            });
        }
        Ok(())
    }
}
