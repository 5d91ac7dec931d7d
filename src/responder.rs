// src/responder.rs
use rand::seq::SliceRandom;
use rand::Rng;

pub const BOT_RESPONSES: [&str; 8] = [
    "I understand what you're asking. Let me think about this carefully and provide you with a comprehensive response.",
    "That's an interesting question! Here's my take on it, based on the information you've provided.",
    "I can help you with that. Let me break this down into manageable parts for better understanding.",
    "Great question! This is something that many people wonder about. Here's what I think:",
    "I appreciate you sharing this with me. Based on your input, here are some thoughts and suggestions:",
    "This is definitely worth exploring further. Let me provide you with some insights and practical advice.",
    "I can see why this might be challenging. Here's how I'd approach this situation:",
    "That's a thoughtful inquiry. Let me share some perspectives that might be helpful for your situation.",
];

/// Picks a canned reply uniformly at random. The user's message plays no
/// part in the choice.
pub fn generate_response<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    BOT_RESPONSES.choose(rng).copied().unwrap_or(BOT_RESPONSES[0])
}
