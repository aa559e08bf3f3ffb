use chrono::NaiveDate;
use uuid::Uuid;

use ripple_types::Message;

use crate::lifecycle::{Delivery, LocalMessage};

/// Receipt state rendered next to an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    Sending,
    Delivered,
    Read,
}

#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub message: Message,
    pub receipt: Receipt,
    /// Sent by the viewing user, rendered on the outgoing side.
    pub mine: bool,
}

/// Messages of one calendar day (UTC), oldest first.
#[derive(Debug, Clone)]
pub struct DaySection {
    pub date: NaiveDate,
    pub messages: Vec<RenderedMessage>,
}

/// Day-grouped, receipt-annotated projection of a conversation.
pub struct ConversationView;

impl ConversationView {
    /// Build the render model from a local-state snapshot.
    ///
    /// Always re-sorts by the store-assigned timestamp: the change stream
    /// delivers in arrival order, which is not temporal order.
    pub fn compose(viewer: Uuid, entries: &[LocalMessage]) -> Vec<DaySection> {
        let mut sorted: Vec<LocalMessage> = entries.to_vec();
        sorted.sort_by(|a, b| {
            a.message
                .created_at
                .cmp(&b.message.created_at)
                .then_with(|| a.message.id.cmp(&b.message.id))
        });

        let mut sections: Vec<DaySection> = Vec::new();
        for entry in sorted {
            let date = entry.message.created_at.date_naive();
            let rendered = RenderedMessage {
                mine: entry.message.sender_id == viewer,
                receipt: receipt_of(&entry),
                message: entry.message,
            };

            match sections.last_mut() {
                Some(section) if section.date == date => section.messages.push(rendered),
                _ => sections.push(DaySection {
                    date,
                    messages: vec![rendered],
                }),
            }
        }
        sections
    }
}

fn receipt_of(entry: &LocalMessage) -> Receipt {
    match entry.delivery {
        Delivery::Pending => Receipt::Sending,
        Delivery::Delivered if entry.message.is_read() => Receipt::Read,
        Delivery::Delivered => Receipt::Delivered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ripple_types::{ConversationKey, MessageKind};

    fn entry(
        sender: Uuid,
        receiver: Uuid,
        at: chrono::DateTime<Utc>,
        delivery: Delivery,
        read: bool,
    ) -> LocalMessage {
        LocalMessage {
            message: Message {
                id: Uuid::new_v4(),
                conversation: ConversationKey::new(sender, receiver),
                sender_id: sender,
                receiver_id: receiver,
                content: "hello".into(),
                kind: MessageKind::Text,
                media_url: None,
                duration_seconds: None,
                created_at: at,
                read_at: read.then(|| at + Duration::seconds(5)),
                edited: false,
            },
            delivery,
        }
    }

    #[test]
    fn groups_by_day_and_resorts_arrival_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let monday = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap();

        // Arrival order scrambled on purpose.
        let entries = vec![
            entry(a, b, tuesday, Delivery::Delivered, false),
            entry(a, b, monday + Duration::minutes(10), Delivery::Delivered, false),
            entry(b, a, monday, Delivery::Delivered, false),
        ];

        let sections = ConversationView::compose(a, &entries);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].date, monday.date_naive());
        assert_eq!(sections[0].messages.len(), 2);
        assert!(!sections[0].messages[0].mine, "bob's earlier message first");
        assert_eq!(sections[1].date, tuesday.date_naive());
        assert_eq!(sections[1].messages.len(), 1);
    }

    #[test]
    fn receipt_states_follow_delivery_and_read() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();

        let entries = vec![
            entry(a, b, now, Delivery::Pending, false),
            entry(a, b, now + Duration::seconds(1), Delivery::Delivered, false),
            entry(a, b, now + Duration::seconds(2), Delivery::Delivered, true),
        ];

        let sections = ConversationView::compose(a, &entries);
        let receipts: Vec<Receipt> = sections
            .iter()
            .flat_map(|s| s.messages.iter().map(|m| m.receipt))
            .collect();
        assert_eq!(
            receipts,
            vec![Receipt::Sending, Receipt::Delivered, Receipt::Read]
        );
    }

    #[test]
    fn empty_snapshot_renders_no_sections() {
        assert!(ConversationView::compose(Uuid::new_v4(), &[]).is_empty());
    }
}
