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

//! Outstanding questions awaiting a `Return`.

use crate::RpcError;
use crate::capability::{Promise, Resolver};
use crate::rpc::{IdGenerator, QuestionId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A question that has been sent but not answered.
pub(crate) struct Question {
    pub(crate) resolver: Resolver,
    pub(crate) is_bootstrap: bool,
}

#[derive(Default)]
struct Questions {
    pending: HashMap<QuestionId, Question>,
    closed: bool,
}

/// Question table for one connection.
///
/// Once [`drain`](Self::drain) has run no further questions are accepted, so
/// a call racing with shutdown either lands in the drained set or fails
/// immediately.
#[derive(Default)]
pub(crate) struct QuestionTable {
    questions: Mutex<Questions>,
    ids: IdGenerator,
}

impl QuestionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates a question id and the promise its `Return` will resolve.
    pub(crate) fn register(&self, is_bootstrap: bool) -> Result<(QuestionId, Promise), RpcError> {
        let mut questions = self.questions.lock();
        if questions.closed {
            return Err(RpcError::disconnected("connection is closed"));
        }

        let id = QuestionId::new(self.ids.next());
        let (resolver, promise) = Promise::channel();
        questions.pending.insert(
            id,
            Question {
                resolver,
                is_bootstrap,
            },
        );
        Ok((id, promise))
    }

    /// Removes an answered question.
    pub(crate) fn complete(&self, id: QuestionId) -> Option<Question> {
        self.questions.lock().pending.remove(&id)
    }

    /// Closes the table and returns every unanswered question.
    pub(crate) fn drain(&self) -> Vec<Question> {
        let mut questions = self.questions.lock();
        questions.closed = true;
        questions.pending.drain().map(|(_, question)| question).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.questions.lock().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Payload, Results};

    #[tokio::test]
    async fn test_register_and_complete() {
        let table = QuestionTable::new();
        let (id, promise) = table.register(false).unwrap();
        assert_eq!(id, QuestionId::new(1));
        assert_eq!(table.len(), 1);

        let question = table.complete(id).unwrap();
        assert!(!question.is_bootstrap);
        question
            .resolver
            .resolve(Ok(Results::new(Payload::encode(&"done").unwrap())));
        assert_eq!(promise.wait().await.unwrap().get::<String>().unwrap(), "done");
        assert!(table.complete(id).is_none());
    }

    #[tokio::test]
    async fn test_question_ids_increase() {
        let table = QuestionTable::new();
        let (first, _a) = table.register(true).unwrap();
        let (second, _b) = table.register(false).unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_drain_closes_table() {
        let table = QuestionTable::new();
        let (_, first) = table.register(false).unwrap();
        let (_, second) = table.register(false).unwrap();

        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        for question in drained {
            question
                .resolver
                .resolve(Err(RpcError::disconnected("closed")));
        }
        assert!(first.wait().await.unwrap_err().is_disconnected());
        assert!(second.wait().await.unwrap_err().is_disconnected());

        assert!(table.register(false).unwrap_err().is_disconnected());
        assert_eq!(table.len(), 0);
    }
}
