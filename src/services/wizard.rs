//! Worry wizard state machine
//!
//! The guided decision flow that processes one worry at a time:
//! capture the worry, optionally restructure it (evidence + reframe),
//! decide whether it is actionable, then either act now, schedule the
//! action, or release the worry. Terminal steps produce a [`WorryDraft`]
//! for the engine to persist; the session itself never talks to storage.
//!
//! Each step variant carries exactly the data confirmed so far, so a
//! step/field combination that the flow cannot reach cannot be
//! represented. Branch-specific inputs (action text, schedule date) are
//! parameters of the terminal confirmation rather than session state,
//! which is what makes switching branches drop them.

use crate::config::{
    ACTION_HOW_IMMEDIATE, DEFAULT_EFFECTIVENESS_RATING, MAX_EFFECTIVENESS_RATING,
    MAX_WORRY_TEXT_LENGTH, MIN_EFFECTIVENESS_RATING,
};
use crate::database::{ActionPlan, ReviewOutcome, WorryCategory, WorryDraft};
use crate::error::{AppError, Result};
use chrono::NaiveDate;

/// Flow configuration, loaded from settings at session start
#[derive(Debug, Clone, Copy)]
pub struct FlowOptions {
    /// Run the cognitive-restructuring stage between capture and
    /// categorization
    pub restructure: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self { restructure: true }
    }
}

/// The worry statement plus any restructuring notes confirmed so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedWorry {
    pub text: String,
    pub evidence: Option<String>,
    pub reframe: Option<String>,
}

/// Current wizard step. Variants carry the data confirmed in earlier
/// steps so that back-navigation can restore it for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStep {
    /// Entering the worry statement. Holds the draft text so returning
    /// here does not lose what was typed.
    Capture { text: String },
    /// Writing evidence and a reframe for the captured worry
    Restructure {
        text: String,
        evidence: Option<String>,
        reframe: Option<String>,
    },
    /// Deciding whether the worry is actionable
    Categorize { worry: CapturedWorry },
    /// Actionable: deciding between acting now and scheduling
    TimingCheck { worry: CapturedWorry },
    /// Not actionable: confirming the release
    Release { worry: CapturedWorry },
    /// Entering the immediate action
    ActNow { worry: CapturedWorry },
    /// Entering the planned action and its date
    ScheduleLater { worry: CapturedWorry },
}

/// One in-progress pass through the worry flow.
///
/// Ephemeral: reset on commit or cancel, discarded on teardown.
#[derive(Debug, Clone)]
pub struct WizardSession {
    step: WizardStep,
    options: FlowOptions,
}

impl WizardSession {
    pub fn new(options: FlowOptions) -> Self {
        Self {
            step: WizardStep::Capture {
                text: String::new(),
            },
            options,
        }
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn options(&self) -> FlowOptions {
        self.options
    }

    /// Confirm the worry statement and advance to restructuring, or
    /// straight to categorization when that stage is disabled.
    pub fn submit_worry(&mut self, text: &str) -> Result<()> {
        let WizardStep::Capture { .. } = self.step else {
            return Err(unexpected_step("a worry is already being processed"));
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("worry text must not be empty".into()));
        }
        if text.len() > MAX_WORRY_TEXT_LENGTH {
            return Err(AppError::Validation(format!(
                "worry text exceeds {MAX_WORRY_TEXT_LENGTH} characters"
            )));
        }

        self.step = if self.options.restructure {
            WizardStep::Restructure {
                text: text.to_string(),
                evidence: None,
                reframe: None,
            }
        } else {
            WizardStep::Categorize {
                worry: CapturedWorry {
                    text: text.to_string(),
                    evidence: None,
                    reframe: None,
                },
            }
        };

        Ok(())
    }

    /// Confirm the restructuring notes and advance to categorization
    pub fn submit_restructure(&mut self, evidence: &str, reframe: &str) -> Result<()> {
        let WizardStep::Restructure { text, .. } = &self.step else {
            return Err(unexpected_step("not at the restructuring stage"));
        };

        let evidence = evidence.trim();
        let reframe = reframe.trim();
        if evidence.is_empty() {
            return Err(AppError::Validation("evidence must not be empty".into()));
        }
        if reframe.is_empty() {
            return Err(AppError::Validation("reframe must not be empty".into()));
        }

        self.step = WizardStep::Categorize {
            worry: CapturedWorry {
                text: text.clone(),
                evidence: Some(evidence.to_string()),
                reframe: Some(reframe.to_string()),
            },
        };

        Ok(())
    }

    /// The worry can be acted on; move to the timing decision
    pub fn choose_actionable(&mut self) -> Result<()> {
        let WizardStep::Categorize { worry } = &self.step else {
            return Err(unexpected_step("not at the categorization stage"));
        };

        self.step = WizardStep::TimingCheck {
            worry: worry.clone(),
        };
        Ok(())
    }

    /// The worry cannot be acted on; move to the release confirmation
    pub fn choose_not_actionable(&mut self) -> Result<()> {
        let WizardStep::Categorize { worry } = &self.step else {
            return Err(unexpected_step("not at the categorization stage"));
        };

        self.step = WizardStep::Release {
            worry: worry.clone(),
        };
        Ok(())
    }

    /// Act on the worry right away
    pub fn choose_act_now(&mut self) -> Result<()> {
        let WizardStep::TimingCheck { worry } = &self.step else {
            return Err(unexpected_step("not at the timing decision"));
        };

        self.step = WizardStep::ActNow {
            worry: worry.clone(),
        };
        Ok(())
    }

    /// Plan the action for a later date
    pub fn choose_schedule_later(&mut self) -> Result<()> {
        let WizardStep::TimingCheck { worry } = &self.step else {
            return Err(unexpected_step("not at the timing decision"));
        };

        self.step = WizardStep::ScheduleLater {
            worry: worry.clone(),
        };
        Ok(())
    }

    /// Confirm letting the worry go. Leaves the session unchanged so a
    /// failed store call can be retried.
    pub fn confirm_release(&self) -> Result<WorryDraft> {
        let WizardStep::Release { worry } = &self.step else {
            return Err(unexpected_step("not at the release confirmation"));
        };

        Ok(draft_from(worry, WorryCategory::LetItGo, None, None))
    }

    /// Confirm an immediate action. Leaves the session unchanged so a
    /// failed store call can be retried.
    pub fn confirm_action(&self, what: &str) -> Result<WorryDraft> {
        let WizardStep::ActNow { worry } = &self.step else {
            return Err(unexpected_step("not at the act-now stage"));
        };

        let what = what.trim();
        if what.is_empty() {
            return Err(AppError::Validation("action must not be empty".into()));
        }

        let plan = ActionPlan {
            what: what.to_string(),
            how: ACTION_HOW_IMMEDIATE.to_string(),
        };
        Ok(draft_from(worry, WorryCategory::Actionable, Some(plan), None))
    }

    /// Confirm a scheduled action. Leaves the session unchanged so a
    /// failed store call can be retried.
    pub fn confirm_schedule(&self, what: &str, how: &str, date: NaiveDate) -> Result<WorryDraft> {
        let WizardStep::ScheduleLater { worry } = &self.step else {
            return Err(unexpected_step("not at the scheduling stage"));
        };

        let what = what.trim();
        if what.is_empty() {
            return Err(AppError::Validation("action must not be empty".into()));
        }

        let plan = ActionPlan {
            what: what.to_string(),
            how: how.trim().to_string(),
        };
        Ok(draft_from(
            worry,
            WorryCategory::Scheduled,
            Some(plan),
            Some(date),
        ))
    }

    /// Move to the previous step. Data confirmed in earlier steps is
    /// restored for editing; decisions belonging to the abandoned step
    /// are dropped. At the capture step this is a no-op.
    pub fn back(&mut self) {
        self.step = match std::mem::replace(
            &mut self.step,
            WizardStep::Capture {
                text: String::new(),
            },
        ) {
            WizardStep::Capture { text } => WizardStep::Capture { text },
            WizardStep::Restructure { text, .. } => WizardStep::Capture { text },
            WizardStep::Categorize { worry } => {
                if self.options.restructure {
                    WizardStep::Restructure {
                        text: worry.text,
                        evidence: worry.evidence,
                        reframe: worry.reframe,
                    }
                } else {
                    WizardStep::Capture { text: worry.text }
                }
            }
            WizardStep::TimingCheck { worry } | WizardStep::Release { worry } => {
                WizardStep::Categorize { worry }
            }
            WizardStep::ActNow { worry } | WizardStep::ScheduleLater { worry } => {
                WizardStep::TimingCheck { worry }
            }
        };
    }

    /// Discard the session and return to an empty capture step
    pub fn reset(&mut self) {
        self.step = WizardStep::Capture {
            text: String::new(),
        };
    }
}

fn draft_from(
    worry: &CapturedWorry,
    category: WorryCategory,
    action_plan: Option<ActionPlan>,
    scheduled_for: Option<NaiveDate>,
) -> WorryDraft {
    WorryDraft {
        text: worry.text.clone(),
        category,
        evidence: worry.evidence.clone(),
        reframe: worry.reframe.clone(),
        action_plan,
        scheduled_for,
    }
}

fn unexpected_step(msg: &str) -> AppError {
    AppError::Validation(msg.to_string())
}

/// Effectiveness review form shown before a reviewed completion.
///
/// The rating starts at the mid-scale default but must be explicitly
/// acknowledged, and the lesson text is required.
#[derive(Debug, Clone)]
pub struct ReviewForm {
    rating: u8,
    rating_acknowledged: bool,
    lesson: String,
}

impl ReviewForm {
    pub fn new() -> Self {
        Self {
            rating: DEFAULT_EFFECTIVENESS_RATING,
            rating_acknowledged: false,
            lesson: String::new(),
        }
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Pick a rating, acknowledging it
    pub fn set_rating(&mut self, rating: u8) -> Result<()> {
        if !(MIN_EFFECTIVENESS_RATING..=MAX_EFFECTIVENESS_RATING).contains(&rating) {
            return Err(AppError::Validation(format!(
                "rating must be between {MIN_EFFECTIVENESS_RATING} and {MAX_EFFECTIVENESS_RATING}"
            )));
        }
        self.rating = rating;
        self.rating_acknowledged = true;
        Ok(())
    }

    /// Keep the current rating, acknowledging it
    pub fn acknowledge_rating(&mut self) {
        self.rating_acknowledged = true;
    }

    pub fn set_lesson(&mut self, lesson: &str) {
        self.lesson = lesson.trim().to_string();
    }

    /// Finish the review, yielding the outcome to persist
    pub fn finish(&self) -> Result<ReviewOutcome> {
        if !self.rating_acknowledged {
            return Err(AppError::Validation(
                "the effectiveness rating must be acknowledged".into(),
            ));
        }
        if self.lesson.is_empty() {
            return Err(AppError::Validation("lesson must not be empty".into()));
        }

        Ok(ReviewOutcome {
            effectiveness_rating: self.rating,
            lesson_learned: self.lesson.clone(),
        })
    }
}

impl Default for ReviewForm {
    fn default() -> Self {
        Self::new()
    }
}
