// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Client side of the task API: an HTTP client for the remote task collection
//! and [`TaskBoard`], the view state that stays in step with it.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod requests;

pub use api::{HttpTaskApi, TaskApi};
pub use board::{EditSession, Operation, Outcome, TaskBoard, ViewError, ViewState};
pub use config::ApiConfig;
pub use error::{ClientError, ErrorKind, Result};

pub use common::{Priority, Status, StatusFilter, Task, TaskDraft};
