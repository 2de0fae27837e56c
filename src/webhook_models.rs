use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Chat webhook body - a single message or an array of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChatPayload {
    Single(InboundMessage),
    Batch(Vec<InboundMessage>),
}

impl ChatPayload {
    /// Convert to a vec of messages for uniform processing
    pub fn into_messages(self) -> Vec<InboundMessage> {
        match self {
            ChatPayload::Single(message) => vec![message],
            ChatPayload::Batch(messages) => messages,
        }
    }
}

/// One message as delivered by the chat transport.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Conversation the message came from; replies go back here.
    #[serde(alias = "from")]
    pub channel_id: String,

    #[serde(alias = "body")]
    pub text: String,

    /// Transport id, used to drop redeliveries.
    #[serde(default, alias = "id", deserialize_with = "string_or_number")]
    pub message_id: Option<String>,
}

impl InboundMessage {
    /// Dedup key for this message, when the transport gave it an id.
    pub fn fingerprint(&self) -> Option<String> {
        let message_id = self.message_id.as_deref()?;
        let mut hasher = Sha256::new();
        hasher.update(self.channel_id.as_bytes());
        hasher.update(b":");
        hasher.update(message_id.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }
}

/// Response sent back to the chat transport
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatWebhookResponse {
    pub status: String,
    pub received: usize,
    pub replied: usize,
    pub ignored: usize,
    pub duplicates: usize,
    pub replies: Vec<OutboundReply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundReply {
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub text: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    }))
}
