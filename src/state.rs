// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::handshake::Handshake;

#[derive(Clone)]
pub struct AppState {
    pub handshake: Arc<Handshake>,
}

impl AppState {
    pub fn new(handshake: Handshake) -> Self {
        Self {
            handshake: Arc::new(handshake),
        }
    }
}
