//! Services module
//!
//! Business logic: the wizard state machine, the worry engine that
//! coordinates it with the record store, identity gating, and settings
//! persistence.

pub mod identity;
pub mod settings;
pub mod wizard;
pub mod worries;

pub use identity::{CurrentUser, IdentityService};
pub use settings::{AppSettings, FlowSettings, SettingsService};
pub use wizard::{FlowOptions, ReviewForm, WizardSession, WizardStep};
pub use worries::WorryService;
