//! Formwizard - multi-step form wizards with resumable, cached progress.
//!
//! A wizard is an ordered sequence of steps. Partially entered data and the
//! caller's position are kept in a session or database store between
//! requests, and the wizard answers the navigation questions a web
//! controller asks.

pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod naming;
pub mod rest;
pub mod steps;
pub mod wizard;

pub use error::{Result, WizardError};
pub use wizard::{Wizard, WizardDefinition};
