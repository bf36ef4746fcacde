//! Transcript rendering and archiving
//!
//! On close, the channel's history becomes a plain-text artifact delivered
//! to the guild's log channel together with a participant summary. An empty
//! history is still a valid zero-line artifact.

use crate::core::{ChannelId, TicketType, UserId};
use crate::gateway::{ChannelMessage, ChatGateway, Embed, FileUpload, GatewayError, OutboundMessage};
use std::sync::Arc;
use tracing::info;

/// A rendered channel history plus its distinct human participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// One `[timestamp] author: content` line per message
    pub text: String,
    /// Mentions of distinct non-automated authors, in order of first message
    pub participants: Vec<String>,
}

impl Transcript {
    /// Render a chronological history into transcript form
    #[must_use]
    pub fn render(history: &[ChannelMessage]) -> Self {
        let mut lines = Vec::with_capacity(history.len());
        let mut participants = Vec::new();
        for message in history {
            lines.push(format!(
                "[{}] {}: {}",
                message.timestamp.format("%Y-%m-%d %H:%M:%S%:z"),
                message.author_name,
                message.content
            ));
            if !message.author_is_bot {
                let mention = message.author.mention();
                if !participants.contains(&mention) {
                    participants.push(mention);
                }
            }
        }
        Self {
            text: lines.join("\n"),
            participants,
        }
    }
}

/// Delivers transcripts to a guild's log channel
#[derive(Clone)]
pub struct TranscriptArchiver {
    gateway: Arc<dyn ChatGateway>,
}

impl TranscriptArchiver {
    /// Create an archiver over the given gateway
    #[must_use]
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Deliver a transcript and its summary as one message
    ///
    /// The attachment is named `<type>-ticket-<number>.txt` with the number
    /// zero-padded to four digits; the summary embed names the participants
    /// (or "None") and the closing actor.
    pub async fn archive(
        &self,
        log_channel: ChannelId,
        ticket_type: TicketType,
        number: u64,
        transcript: &Transcript,
        closed_by: UserId,
    ) -> Result<(), GatewayError> {
        let participants_text = if transcript.participants.is_empty() {
            "None".to_string()
        } else {
            transcript.participants.join(", ")
        };

        let embed = Embed::new(
            format!("Transcript: {ticket_type} Ticket #{number}"),
            format!(
                "**Participants:** {participants_text}\n**Closed by:** {}",
                closed_by.mention()
            ),
        );
        let file = FileUpload {
            filename: ticket_type.transcript_filename(number),
            contents: transcript.text.clone().into_bytes(),
        };

        self.gateway
            .send_message(log_channel, OutboundMessage::new().embed(embed).file(file))
            .await?;
        info!(channel = %log_channel, %ticket_type, number, "transcript archived");
        Ok(())
    }
}
