// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! linkflow-callback: the Callback Notifier (§4.H). Signs lifecycle
//! notifications with HMAC-SHA256 and delivers them to the control plane
//! either synchronously or through a bounded, retrying async queue.

mod error;
mod notifier;
mod payload;
mod transport;

pub use error::CallbackError;
pub use notifier::{CallbackConfig, CallbackNotifier};
pub use payload::{event_name, sign, CallbackPayload};
pub use transport::{CallbackTransport, HttpCallbackTransport};

#[cfg(any(test, feature = "test-support"))]
pub use transport::FakeCallbackTransport;
