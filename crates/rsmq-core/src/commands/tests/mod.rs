use super::*;
use crate::error::ValidationError;
use crate::queue::{MaxSize, QueueAttributes};
use crate::storage::{ManualClock, MemoryStore};
use std::time::Duration;

mod common;
use common::*;

mod delete;
mod queue;
