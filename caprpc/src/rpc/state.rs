//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::fmt;

/// Lifecycle of a [`Connection`](crate::rpc::Connection).
///
/// Transitions only move forward:
///
/// ```text
/// Connecting ──► Active ──► Closing ──► Closed
///      └──────────────────────┘
/// ```
///
/// A connection goes `Active` on its first completed bootstrap exchange (in
/// either direction) or its first inbound call, and starts `Closing` on an
/// explicit close, a peer abort, end of stream, or a fatal error. It is
/// `Closed` once the transport is shut down, every outstanding question has
/// resolved, and every export has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Transport established, no exchange completed yet.
    Connecting,
    /// Calls are flowing.
    Active,
    /// Shutdown has started; new calls fail immediately.
    Closing,
    /// Everything has been torn down.
    Closed,
}

impl ConnectionState {
    /// Returns `true` while new calls can be issued.
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Active)
    }

    /// Returns `true` once shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        !self.is_open()
    }

    /// Returns `true` if moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Active) | (Connecting, Closing) | (Active, Closing) | (Closing, Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;

    #[test]
    fn test_transitions_only_move_forward() {
        assert!(Connecting.can_transition_to(Active));
        assert!(Connecting.can_transition_to(Closing));
        assert!(Active.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));

        assert!(!Active.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Connecting.can_transition_to(Closed));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_open_states() {
        assert!(Connecting.is_open());
        assert!(Active.is_open());
        assert!(Closing.is_shutting_down());
        assert!(Closed.is_shutting_down());
        assert_eq!(Closing.to_string(), "closing");
    }
}
