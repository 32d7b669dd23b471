use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{ConversationSummary, Message};

/// Order-independent identity of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    pub low: Uuid,
    pub high: Uuid,
}

impl ConversationKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn of(message: &Message) -> Self {
        Self::new(message.sender_id, message.receiver_id)
    }

    pub fn contains(&self, user_id: Uuid) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other(&self, user_id: Uuid) -> Uuid {
        if self.low == user_id {
            self.high
        } else {
            self.low
        }
    }
}

/// Orders messages the way every conversation read returns them.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// Most recent activity first, ties broken by the pair so output is stable.
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then(a.participant_a.cmp(&b.participant_a))
            .then(a.participant_b.cmp(&b.participant_b))
    });
}

/// Full-scan grouping of a message log into one summary per pair.
pub fn group_conversations(messages: &[Message]) -> Vec<ConversationSummary> {
    let mut grouped: HashMap<ConversationKey, ConversationSummary> = HashMap::new();

    for message in messages {
        let key = ConversationKey::of(message);
        grouped
            .entry(key)
            .and_modify(|summary| {
                summary.message_count += 1;
                if message.created_at > summary.last_message_at {
                    summary.last_message_at = message.created_at;
                }
            })
            .or_insert_with(|| ConversationSummary {
                participant_a: key.low,
                participant_b: key.high,
                last_message_at: message.created_at,
                message_count: 1,
            });
    }

    let mut summaries: Vec<ConversationSummary> = grouped.into_values().collect();
    sort_summaries(&mut summaries);
    summaries
}

/// Client-side view of one conversation. Inserting a message id that is
/// already present is a no-op, so at-least-once delivery never shows a
/// message twice.
#[derive(Debug, Clone)]
pub struct ConversationView {
    key: ConversationKey,
    seen: HashSet<Uuid>,
    messages: Vec<Message>,
}

impl ConversationView {
    pub fn new(user_id: Uuid, other_user_id: Uuid) -> Self {
        Self {
            key: ConversationKey::new(user_id, other_user_id),
            seen: HashSet::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_history(user_id: Uuid, other_user_id: Uuid, history: Vec<Message>) -> Self {
        let mut view = Self::new(user_id, other_user_id);
        for message in history {
            view.insert(message);
        }
        view
    }

    pub fn key(&self) -> ConversationKey {
        self.key
    }

    /// Returns true when the message was new and belongs to this pair.
    pub fn insert(&mut self, message: Message) -> bool {
        if ConversationKey::of(&message) != self.key || !self.seen.insert(message.id) {
            return false;
        }

        // Live delivery has no ordering guarantee; keep the view sorted.
        let position = self.messages.partition_point(|existing| {
            (existing.created_at, existing.id) <= (message.created_at, message.id)
        });
        self.messages.insert(position, message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn message(sender: Uuid, receiver: Uuid, seconds: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            content: format!("at {}", seconds),
            created_at: Utc::now() + Duration::seconds(seconds),
        }
    }

    #[test]
    fn key_is_order_independent() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(ConversationKey::new(a, b), ConversationKey::new(b, a));
        assert_eq!(ConversationKey::new(a, b).other(a), b);
        assert!(ConversationKey::new(a, b).contains(b));
    }

    #[test]
    fn grouping_counts_both_directions_and_orders_by_activity() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let messages = vec![
            message(a, b, 1),
            message(b, a, 5),
            message(a, c, 3),
        ];

        let summaries = group_conversations(&messages);
        assert_eq!(summaries.len(), 2);
        assert_eq!(ConversationKey::new(summaries[0].participant_a, summaries[0].participant_b), ConversationKey::new(a, b));
        assert_eq!(summaries[0].message_count, 2);
        assert_eq!(summaries[0].last_message_at, messages[1].created_at);
        assert_eq!(summaries[1].message_count, 1);
        assert!(summaries[0].participant_a < summaries[0].participant_b);
    }

    #[test]
    fn view_ignores_duplicate_deliveries() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = message(a, b, 1);
        let mut view = ConversationView::new(a, b);

        assert!(view.insert(first.clone()));
        assert!(!view.insert(first.clone()));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn view_sorts_out_of_order_arrivals_and_drops_other_pairs() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let late = message(b, a, 10);
        let early = message(a, b, 2);
        let mut view = ConversationView::new(b, a);

        assert!(view.insert(late.clone()));
        assert!(view.insert(early.clone()));
        assert!(!view.insert(message(a, c, 5)));

        let ids: Vec<Uuid> = view.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }
}
