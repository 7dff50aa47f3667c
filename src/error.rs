//! Crate-level error aggregating every layer's error type.

use crate::buffer::TriggerError;
use crate::dsl::DslError;
use crate::graph::GraphError;
use crate::plan::PlanError;
use crate::registry::RegistryError;
use crate::render::RenderError;
use crate::rt::RuntimeError;
use crate::settings::SettingsError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Trigger(#[from] TriggerError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Dsl(#[from] DslError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
