//! Fulfillment stages and the status overlay layered on them.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, StageId};

/// Ordered fulfillment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    New,
    Confirmed,
    Processing,
    Shipped,
    Success,
}

impl Stage {
    /// The following stage; `Success` is terminal and maps to itself.
    pub fn next(self) -> Self {
        match self {
            Stage::New => Stage::Confirmed,
            Stage::Confirmed => Stage::Processing,
            Stage::Processing => Stage::Shipped,
            Stage::Shipped => Stage::Success,
            Stage::Success => Stage::Success,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Confirmed => "confirmed",
            Stage::Processing => "processing",
            Stage::Shipped => "shipped",
            Stage::Success => "success",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Stage::New),
            "confirmed" => Ok(Stage::Confirmed),
            "processing" => Ok(Stage::Processing),
            "shipped" => Ok(Stage::Shipped),
            "success" => Ok(Stage::Success),
            other => Err(DomainError::validation(format!("unknown stage: {other}"))),
        }
    }
}

/// Status overlay on a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Warning,
    Error,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::Warning => "warning",
            StageStatus::Error => "error",
        }
    }
}

impl core::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(StageStatus::Success),
            "warning" => Ok(StageStatus::Warning),
            "error" => Ok(StageStatus::Error),
            other => Err(DomainError::validation(format!(
                "unknown stage status: {other} (expected success, warning or error)"
            ))),
        }
    }
}

/// Order-level status. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Closed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Active => "active",
            OrderStatus::Closed => "closed",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OrderStatus::Active),
            "closed" => Ok(OrderStatus::Closed),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

/// A stage together with its status overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageState {
    pub stage: Stage,
    pub status: StageStatus,
}

impl StageState {
    pub const fn new(stage: Stage, status: StageStatus) -> Self {
        Self { stage, status }
    }

    /// State every order starts in.
    pub const fn initial() -> Self {
        Self::new(Stage::New, StageStatus::Success)
    }

    /// Fulfilled: final stage reached without a problem overlay.
    pub fn is_fulfilled(&self) -> bool {
        self.stage == Stage::Success && self.status == StageStatus::Success
    }
}

/// Persisted stage row. Owned 1:1 by an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: StageId,
    #[serde(flatten)]
    pub state: StageState,
}

impl StageRecord {
    pub fn new(id: StageId, state: StageState) -> Self {
        Self { id, state }
    }
}
