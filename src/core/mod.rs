// src/core/mod.rs

pub mod html;
pub mod net;
pub mod retry;
pub mod sanitize;
pub mod time;

pub use net::{HttpResponse, ReqwestTransport, Transport};
pub use retry::Executor;
