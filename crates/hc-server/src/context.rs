//! Application context shared across route handlers via Axum state.

use std::sync::Arc;

use crate::muxer::Muxer;

#[derive(Clone)]
pub struct AppContext {
    pub muxer: Arc<Muxer>,
}

impl AppContext {
    pub fn new(muxer: Arc<Muxer>) -> Self {
        Self { muxer }
    }
}
