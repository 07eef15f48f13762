//! Relay core: pure protocol vocabulary and the delivery state machine.
mod action;
mod contract;
mod delivery;
mod notification;
mod policy;
mod settings;
mod surface;

pub use action::Action;
pub use contract::{
    ContractViolation, FailureKind, Request, Response, NOT_READY_ERROR, RESTRICTED_SURFACE_ERROR,
    TARGET_NOT_FOUND_ERROR, UNKNOWN_ERROR, UNREACHABLE_ERROR,
};
pub use delivery::{DeliveryEffect, DeliveryEvent, DeliveryMachine, DeliveryState};
pub use notification::{Notification, ERROR_TITLE};
pub use policy::{Backoff, PolicyOverrides, RetryPolicy, MAX_BACKOFF};
pub use settings::{AiProvider, Settings, SettingsPatch, SummaryLength};
pub use surface::{is_restricted_surface, TabId, Target};
